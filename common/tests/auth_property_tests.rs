// Property-based tests for token issuance, rotation and revocation

use chrono::{Duration, Utc};
use common::auth::{InMemoryRefreshTokenStore, TokenService};
use common::errors::{AppError, AuthError};
use common::models::UserRole;
use proptest::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

fn create_test_service(store: Arc<InMemoryRefreshTokenStore>) -> TokenService {
    TokenService::new("test-secret-key-for-property-tests", 60, 14, store)
}

fn role_strategy() -> impl Strategy<Value = UserRole> {
    prop_oneof![Just(UserRole::User), Just(UserRole::Admin)]
}

// Access tokens carry the identity they were issued for
#[test]
fn property_access_token_preserves_identity() {
    proptest!(|(
        local in "[a-z]{3,12}",
        role in role_strategy(),
    )| {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let store = Arc::new(InMemoryRefreshTokenStore::new());
            let service = create_test_service(store.clone());
            let user_id = Uuid::new_v4();
            let email = format!("{}@example.com", local);

            let pair = service.issue_pair(user_id, &email, role).await.unwrap();
            let claims = service.validate_access(&pair.access_token).unwrap();

            prop_assert_eq!(claims.user_id(), Some(user_id));
            prop_assert_eq!(&claims.email, &email);
            prop_assert_eq!(claims.role, role);
            prop_assert!(pair.refresh_expires_at > pair.access_expires_at);
            prop_assert_eq!(store.live_count().await, 1);
            Ok(())
        })?;
    });
}

// A chain of refreshes keeps exactly one live refresh token, and every
// token already exchanged is rejected afterwards
#[test]
fn property_rotation_chain_is_single_use() {
    proptest!(ProptestConfig::with_cases(32), |(rotations in 1usize..6)| {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let store = Arc::new(InMemoryRefreshTokenStore::new());
            let service = create_test_service(store.clone());
            let user_id = Uuid::new_v4();

            let mut pair = service
                .issue_pair(user_id, "rotate@example.com", UserRole::User)
                .await
                .unwrap();
            let mut used = Vec::new();

            for _ in 0..rotations {
                let next = service.refresh(&pair.refresh_token).await.unwrap();
                prop_assert_ne!(&next.refresh_token, &pair.refresh_token);
                used.push(pair.refresh_token.clone());
                pair = next;
                prop_assert_eq!(store.live_count().await, 1);
            }

            // Replaying any spent token is treated as theft
            let replayed = service.refresh(&used[0]).await;
            prop_assert!(matches!(replayed, Err(AuthError::RefreshTokenReused)));
            prop_assert_eq!(store.live_count().await, 0);
            prop_assert!(service.refresh(&pair.refresh_token).await.is_err());
            Ok(())
        })?;
    });
}

// Refresh tokens never authenticate requests and access tokens never refresh
#[test]
fn property_token_types_are_not_interchangeable() {
    proptest!(|(role in role_strategy())| {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let store = Arc::new(InMemoryRefreshTokenStore::new());
            let service = create_test_service(store.clone());
            let pair = service
                .issue_pair(Uuid::new_v4(), "kind@example.com", role)
                .await
                .unwrap();

            prop_assert!(matches!(
                service.validate_access(&pair.refresh_token),
                Err(AuthError::InvalidToken(_))
            ));
            prop_assert!(matches!(
                service.refresh(&pair.access_token).await,
                Err(AuthError::InvalidToken(_))
            ));
            // The failed refresh attempt did not consume the real refresh token
            prop_assert_eq!(store.live_count().await, 1);
            Ok(())
        })?;
    });
}

// Any single-character change to a token invalidates its signature
#[test]
fn property_tampered_token_is_rejected() {
    proptest!(|(position in any::<prop::sample::Index>())| {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let service = create_test_service(Arc::new(InMemoryRefreshTokenStore::new()));
        let pair = runtime
            .block_on(service.issue_pair(Uuid::new_v4(), "tamper@example.com", UserRole::User))
            .unwrap();

        let mut bytes = pair.access_token.into_bytes();
        let idx = position.index(bytes.len());
        prop_assume!(bytes[idx] != b'.');
        bytes[idx] = if bytes[idx] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        prop_assert!(service.validate_access(&tampered).is_err());
    });
}

// Access tokens expire after their TTL and the error maps to 401
#[test]
fn property_access_token_expiry() {
    proptest!(|(minutes_past in 61i64..10_000)| {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let service = create_test_service(Arc::new(InMemoryRefreshTokenStore::new()));
        let issued_at = Utc::now() - Duration::minutes(minutes_past);
        let pair = runtime
            .block_on(service.issue_pair_at(Uuid::new_v4(), "old@example.com", UserRole::User, issued_at))
            .unwrap();

        let err = service.validate_access(&pair.access_token).unwrap_err();
        prop_assert!(matches!(err, AuthError::TokenExpired));
        prop_assert!(matches!(AppError::from(err), AppError::Unauthorized(_)));
    });
}

#[tokio::test]
async fn test_revoke_all_ends_every_session() {
    let store = Arc::new(InMemoryRefreshTokenStore::new());
    let service = create_test_service(store.clone());
    let user_id = Uuid::new_v4();
    let other = Uuid::new_v4();

    let mut sessions = Vec::new();
    for _ in 0..3 {
        sessions.push(
            service
                .issue_pair(user_id, "many@example.com", UserRole::User)
                .await
                .unwrap(),
        );
    }
    let bystander = service
        .issue_pair(other, "other@example.com", UserRole::User)
        .await
        .unwrap();

    assert_eq!(service.revoke_all(user_id).await.unwrap(), 3);
    for session in &sessions {
        assert!(service.refresh(&session.refresh_token).await.is_err());
    }
    assert!(service.refresh(&bystander.refresh_token).await.is_ok());
}

#[tokio::test]
async fn test_token_from_other_secret_is_rejected() {
    let store = Arc::new(InMemoryRefreshTokenStore::new());
    let ours = create_test_service(store.clone());
    let theirs = TokenService::new("some-other-secret", 60, 14, store);

    let pair = theirs
        .issue_pair(Uuid::new_v4(), "x@example.com", UserRole::Admin)
        .await
        .unwrap();
    assert!(ours.validate_access(&pair.access_token).is_err());
    assert!(ours.refresh(&pair.refresh_token).await.is_err());
}
