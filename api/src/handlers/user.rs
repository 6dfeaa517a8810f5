use axum::{extract::State, Extension};
use chrono::{DateTime, NaiveDate, Utc};
use common::db::repositories::ProfileUpdate;
use common::errors::AppError;
use common::models::{User, UserRole};
use common::storage::{UploadPrefix, UploadService};
use common::validation::{required_text, validate_not_future, MAX_NICKNAME_LENGTH};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::extract::Json;
use crate::handlers::multipart::MultipartForm;
use crate::handlers::{MessageResponse, SuccessResponse};
use crate::middleware::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub nickname: String,
    pub birthday: Option<NaiveDate>,
    pub profile_image_url: Option<String>,
    pub invite_code: String,
    pub cup_id: Option<Uuid>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl UserResponse {
    pub fn new(user: User, uploads: &UploadService) -> Self {
        Self {
            profile_image_url: uploads.url_opt(user.profile_image.as_deref()),
            id: user.id,
            email: user.email,
            nickname: user.nickname,
            birthday: user.birthday,
            invite_code: user.invite_code,
            cup_id: user.cup_id,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// Public view of a couple member
#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub id: Uuid,
    pub nickname: String,
    pub birthday: Option<NaiveDate>,
    pub profile_image_url: Option<String>,
}

impl MemberResponse {
    pub fn new(user: User, uploads: &UploadService) -> Self {
        Self {
            profile_image_url: uploads.url_opt(user.profile_image.as_deref()),
            id: user.id,
            nickname: user.nickname,
            birthday: user.birthday,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub nickname: Option<String>,
    pub birthday: Option<NaiveDate>,
}

/// Caller's own profile
#[tracing::instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<SuccessResponse<UserResponse>, AppError> {
    let me = state.users().get_active(user.id).await?;
    Ok(SuccessResponse::new(UserResponse::new(me, &state.uploads)))
}

#[tracing::instrument(skip(state, req))]
pub async fn update_me(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<SuccessResponse<UserResponse>, AppError> {
    let nickname = req
        .nickname
        .as_deref()
        .map(|n| required_text("nickname", n, MAX_NICKNAME_LENGTH))
        .transpose()?;
    if let Some(birthday) = req.birthday {
        validate_not_future("birthday", birthday, Utc::now().date_naive())?;
    }

    let update = ProfileUpdate {
        nickname,
        birthday: req.birthday,
    };
    let updated = state.users().update_profile(user.id, &update).await?;

    tracing::info!(user_id = %user.id, "Profile updated");
    Ok(SuccessResponse::new(UserResponse::new(updated, &state.uploads)))
}

/// Replace the profile image; the previous object is removed afterwards
#[tracing::instrument(skip(state, form))]
pub async fn put_profile_image(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    mut form: MultipartForm,
) -> Result<SuccessResponse<UserResponse>, AppError> {
    let file = form.require_file("image")?;

    let stored = state
        .uploads
        .upload(UploadPrefix::Profiles, user.id, &file)
        .await?;

    let previous = match state.users().set_profile_image(user.id, &stored.key).await {
        Ok(previous) => previous,
        Err(e) => {
            state.uploads.delete_best_effort(&[stored.key]).await;
            return Err(e.into());
        }
    };
    if let Some(previous) = previous {
        state.uploads.delete_best_effort(&[previous]).await;
    }

    let me = state.users().get_active(user.id).await?;
    tracing::info!(user_id = %user.id, "Profile image replaced");
    Ok(SuccessResponse::new(UserResponse::new(me, &state.uploads)))
}

/// Soft delete the caller's account
#[tracing::instrument(skip(state))]
pub async fn delete_me(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<SuccessResponse<MessageResponse>, AppError> {
    state.accounts.delete_account(user.id).await?;
    Ok(MessageResponse::new("Account deleted"))
}
