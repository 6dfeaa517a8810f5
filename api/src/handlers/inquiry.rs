use axum::{extract::State, Extension};
use chrono::{DateTime, Utc};
use common::errors::AppError;
use common::models::{Inquiry, InquiryImage, Solution};
use common::pagination::{PageQuery, Paginated};
use common::storage::{UploadPrefix, UploadService};
use common::validation::{required_text, MAX_CONTENTS_LENGTH, MAX_TITLE_LENGTH};
use serde::Serialize;
use uuid::Uuid;

use crate::extract::{Path, Query};
use crate::handlers::multipart::MultipartForm;
use crate::handlers::{MessageResponse, SuccessResponse};
use crate::middleware::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct InquirySummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub answered: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Inquiry> for InquirySummary {
    fn from(inquiry: Inquiry) -> Self {
        Self {
            id: inquiry.id,
            user_id: inquiry.user_id,
            title: inquiry.title,
            answered: inquiry.answered,
            created_at: inquiry.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InquiryImageResponse {
    pub id: Uuid,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct InquiryDetailResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub contents: String,
    pub answered: bool,
    pub images: Vec<InquiryImageResponse>,
    pub solution: Option<Solution>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InquiryDetailResponse {
    fn new(
        inquiry: Inquiry,
        images: Vec<InquiryImage>,
        solution: Option<Solution>,
        uploads: &UploadService,
    ) -> Self {
        Self {
            id: inquiry.id,
            user_id: inquiry.user_id,
            title: inquiry.title,
            contents: inquiry.contents,
            answered: inquiry.answered,
            images: images
                .into_iter()
                .map(|i| InquiryImageResponse {
                    url: uploads.url(&i.object_key),
                    id: i.id,
                })
                .collect(),
            solution,
            created_at: inquiry.created_at,
            updated_at: inquiry.updated_at,
        }
    }
}

/// Load an inquiry the caller may see: the author, or any admin
async fn visible_inquiry(
    state: &AppState,
    user: &CurrentUser,
    inquiry_id: Uuid,
) -> Result<Inquiry, AppError> {
    let inquiry = state
        .inquiries()
        .find(inquiry_id)
        .await?
        .ok_or_else(|| AppError::not_found("Inquiry not found"))?;

    if inquiry.user_id != user.id && !user.is_admin() {
        tracing::warn!(user_id = %user.id, inquiry_id = %inquiry_id, "Access to another user's inquiry denied");
        return Err(AppError::forbidden("Not your inquiry"));
    }
    Ok(inquiry)
}

#[tracing::instrument(skip(state))]
pub async fn list_my_inquiries(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(page): Query<PageQuery>,
) -> Result<SuccessResponse<Paginated<InquirySummary>>, AppError> {
    let (inquiries, total) = state.inquiries().list_by_user(user.id, &page).await?;
    Ok(SuccessResponse::new(
        Paginated::new(inquiries, total, &page).map(InquirySummary::from),
    ))
}

/// Multipart: `title`, `contents`, optional `images`
#[tracing::instrument(skip(state, form))]
pub async fn create_inquiry(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    mut form: MultipartForm,
) -> Result<SuccessResponse<InquiryDetailResponse>, AppError> {
    let title = required_text("title", form.text("title").unwrap_or_default(), MAX_TITLE_LENGTH)?;
    let contents = required_text(
        "contents",
        form.text("contents").unwrap_or_default(),
        MAX_CONTENTS_LENGTH,
    )?;
    let files = form.take_files("images");

    let keys: Vec<String> = if files.is_empty() {
        Vec::new()
    } else {
        state
            .uploads
            .upload_all(UploadPrefix::Inquiries, user.id, &files)
            .await?
            .into_iter()
            .map(|s| s.key)
            .collect()
    };

    let (inquiry, images) = match state
        .inquiries()
        .create(user.id, &title, &contents, &keys)
        .await
    {
        Ok(created) => created,
        Err(e) => {
            state.uploads.delete_best_effort(&keys).await;
            return Err(e.into());
        }
    };

    Ok(SuccessResponse::created(InquiryDetailResponse::new(
        inquiry,
        images,
        None,
        &state.uploads,
    )))
}

#[tracing::instrument(skip(state))]
pub async fn get_inquiry(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(inquiry_id): Path<Uuid>,
) -> Result<SuccessResponse<InquiryDetailResponse>, AppError> {
    let inquiry = visible_inquiry(&state, &user, inquiry_id).await?;
    let repo = state.inquiries();
    let images = repo.images(inquiry.id).await?;
    let solution = repo.solution_for(inquiry.id).await?;

    Ok(SuccessResponse::new(InquiryDetailResponse::new(
        inquiry,
        images,
        solution,
        &state.uploads,
    )))
}

/// Only the author may withdraw an unanswered inquiry
#[tracing::instrument(skip(state))]
pub async fn delete_inquiry(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(inquiry_id): Path<Uuid>,
) -> Result<SuccessResponse<MessageResponse>, AppError> {
    let inquiry = state
        .inquiries()
        .find(inquiry_id)
        .await?
        .ok_or_else(|| AppError::not_found("Inquiry not found"))?;
    if inquiry.user_id != user.id {
        return Err(AppError::forbidden("Not your inquiry"));
    }

    state.inquiries().soft_delete(inquiry_id).await?;
    Ok(MessageResponse::new("Inquiry deleted"))
}
