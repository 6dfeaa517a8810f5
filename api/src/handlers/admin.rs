use axum::{extract::State, Extension};
use common::errors::AppError;
use common::models::Solution;
use common::pagination::{PageQuery, Paginated};
use common::validation::{required_text, MAX_CONTENTS_LENGTH};
use serde::Deserialize;
use uuid::Uuid;

use crate::extract::{Json, Path, Query};
use crate::handlers::inquiry::InquirySummary;
use crate::handlers::{MessageResponse, SuccessResponse};
use crate::middleware::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AdminInquiryQuery {
    pub answered: Option<bool>,
    pub page: Option<u32>,
    pub count: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SolutionRequest {
    pub contents: String,
}

/// All inquiries, optionally filtered by `answered`
#[tracing::instrument(skip(state))]
pub async fn list_inquiries(
    State(state): State<AppState>,
    Query(query): Query<AdminInquiryQuery>,
) -> Result<SuccessResponse<Paginated<InquirySummary>>, AppError> {
    let page = PageQuery {
        page: query.page,
        count: query.count,
    };
    let (inquiries, total) = state.inquiries().list_all(query.answered, &page).await?;
    Ok(SuccessResponse::new(
        Paginated::new(inquiries, total, &page).map(InquirySummary::from),
    ))
}

#[tracing::instrument(skip(state, req))]
pub async fn create_solution(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentUser>,
    Path(inquiry_id): Path<Uuid>,
    Json(req): Json<SolutionRequest>,
) -> Result<SuccessResponse<Solution>, AppError> {
    let contents = required_text("contents", &req.contents, MAX_CONTENTS_LENGTH)?;
    let solution = state
        .inquiries()
        .create_solution(inquiry_id, admin.id, &contents)
        .await?;
    Ok(SuccessResponse::created(solution))
}

#[tracing::instrument(skip(state, req))]
pub async fn update_solution(
    State(state): State<AppState>,
    Path(solution_id): Path<Uuid>,
    Json(req): Json<SolutionRequest>,
) -> Result<SuccessResponse<Solution>, AppError> {
    let contents = required_text("contents", &req.contents, MAX_CONTENTS_LENGTH)?;
    let solution = state
        .inquiries()
        .update_solution(solution_id, &contents)
        .await?;
    Ok(SuccessResponse::new(solution))
}

/// Removing the answer reopens the inquiry
#[tracing::instrument(skip(state))]
pub async fn delete_solution(
    State(state): State<AppState>,
    Path(solution_id): Path<Uuid>,
) -> Result<SuccessResponse<MessageResponse>, AppError> {
    state.inquiries().delete_solution(solution_id).await?;
    Ok(MessageResponse::new("Solution deleted"))
}
