// Property-based tests for the HTTP error contract and response shapes

use axum::body::to_bytes;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::errors::{AppError, AuthError, DatabaseError, StorageError, TourApiError};
use common::pagination::{PageQuery, Paginated};
use proptest::prelude::*;
use serde_json::Value;

async fn render(err: AppError) -> (StatusCode, Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn app_error_strategy() -> impl Strategy<Value = (AppError, StatusCode, String)> {
    ("[A-Za-z0-9 ]{1,40}", 0usize..6).prop_map(|(msg, kind)| {
        let (err, status) = match kind {
            0 => (AppError::bad_request(msg.clone()), StatusCode::BAD_REQUEST),
            1 => (AppError::unauthorized(msg.clone()), StatusCode::UNAUTHORIZED),
            2 => (AppError::forbidden(msg.clone()), StatusCode::FORBIDDEN),
            3 => (AppError::not_found(msg.clone()), StatusCode::NOT_FOUND),
            4 => (AppError::conflict(msg.clone()), StatusCode::CONFLICT),
            _ => (AppError::internal(msg.clone()), StatusCode::INTERNAL_SERVER_ERROR),
        };
        (err, status, msg)
    })
}

// Every error renders as its status with a `{"message": ...}` body and nothing else
#[test]
fn property_error_body_is_message_only() {
    proptest!(|((err, expected_status, msg) in app_error_strategy())| {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (status, body) = runtime.block_on(render(err));

        prop_assert_eq!(status, expected_status);
        let object = body.as_object().unwrap();
        prop_assert_eq!(object.len(), 1);
        prop_assert_eq!(object["message"].as_str(), Some(msg.as_str()));
    });
}

// Internal details of database failures never reach the client
#[test]
fn property_database_failures_are_opaque() {
    proptest!(|(detail in "[a-z_ ]{5,40}")| {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        for err in [
            DatabaseError::QueryFailed(detail.clone()),
            DatabaseError::ConnectionFailed(detail.clone()),
            DatabaseError::MigrationFailed(detail.clone()),
        ] {
            let (status, body) = runtime.block_on(render(AppError::from(err)));
            prop_assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            prop_assert_eq!(body["message"].as_str(), Some("Database error"));
        }
    });
}

#[test]
fn property_upstream_body_is_not_leaked() {
    proptest!(|(status in 500u16..600, upstream in "[a-z]{10,30}")| {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let err = TourApiError::UpstreamStatus { status, body: upstream.clone() };
        let (code, body) = runtime.block_on(render(AppError::from(err)));

        prop_assert_eq!(code, StatusCode::INTERNAL_SERVER_ERROR);
        prop_assert!(!body["message"].as_str().unwrap().contains(&upstream));
    });
}

#[tokio::test]
async fn test_domain_errors_map_to_statuses() {
    let cases = vec![
        (AppError::from(AuthError::InvalidCredentials), StatusCode::UNAUTHORIZED),
        (AppError::from(AuthError::RefreshTokenReused), StatusCode::UNAUTHORIZED),
        (
            AppError::from(AuthError::InsufficientPermissions("admin".into())),
            StatusCode::FORBIDDEN,
        ),
        (
            AppError::from(DatabaseError::NotFound("Album not found".into())),
            StatusCode::NOT_FOUND,
        ),
        (
            AppError::from(DatabaseError::Conflict("already answered".into())),
            StatusCode::CONFLICT,
        ),
        (
            AppError::from(DatabaseError::DuplicateKey("email".into())),
            StatusCode::CONFLICT,
        ),
        (
            AppError::from(StorageError::InvalidUpload("too big".into())),
            StatusCode::BAD_REQUEST,
        ),
        (
            AppError::from(StorageError::ObjectStoreError("s3 down".into())),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
        (
            AppError::from(TourApiError::NotFound("126508".into())),
            StatusCode::NOT_FOUND,
        ),
    ];

    for (err, expected) in cases {
        let (status, _) = render(err).await;
        assert_eq!(status, expected);
    }
}

// The paginated envelope always exposes the same fields
#[test]
fn property_paginated_json_shape() {
    proptest!(|(
        items in prop::collection::vec(0u32..1000, 0..10),
        extra in 0u64..100,
        page in 1u32..50,
        count in 1u32..50,
    )| {
        let total = items.len() as u64 + extra;
        let query = PageQuery::new(page, count);
        let json = serde_json::to_value(Paginated::new(items.clone(), total, &query)).unwrap();

        prop_assert_eq!(json["items"].as_array().unwrap().len(), items.len());
        prop_assert_eq!(json["total"].as_u64(), Some(total));
        prop_assert_eq!(json["page"].as_u64(), Some(page as u64));
        prop_assert_eq!(json["count"].as_u64(), Some(count as u64));
        prop_assert!(json["total_pages"].is_u64());
    });
}
