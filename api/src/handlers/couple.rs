use axum::{extract::State, Extension};
use chrono::{DateTime, NaiveDate, Utc};
use common::errors::AppError;
use common::models::Couple;
use common::storage::UploadPrefix;
use common::validation::{normalize_invite_code, validate_not_future};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::extract::Json;
use crate::handlers::multipart::MultipartForm;
use crate::handlers::user::MemberResponse;
use crate::handlers::{MessageResponse, SuccessResponse};
use crate::middleware::{CoupleContext, CurrentUser};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateCoupleRequest {
    pub partner_code: String,
    pub start_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCoupleRequest {
    pub start_date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct CoupleResponse {
    pub id: Uuid,
    pub start_date: NaiveDate,
    pub days_together: i64,
    pub thumbnail_url: Option<String>,
    pub members: Vec<MemberResponse>,
    pub created_at: DateTime<Utc>,
}

async fn couple_response(state: &AppState, couple: Couple) -> Result<CoupleResponse, AppError> {
    let users = state.users();
    let mut members = Vec::with_capacity(2);
    for member_id in [couple.user1_id, couple.user2_id] {
        if let Some(member) = users.find_by_id(member_id).await? {
            members.push(MemberResponse::new(member, &state.uploads));
        }
    }

    Ok(CoupleResponse {
        id: couple.id,
        start_date: couple.start_date,
        days_together: couple.days_together(Utc::now().date_naive()),
        thumbnail_url: state.uploads.url_opt(couple.thumbnail.as_deref()),
        members,
        created_at: couple.created_at,
    })
}

/// Pair the caller with the owner of `partner_code`
#[tracing::instrument(skip(state, req))]
pub async fn create_couple(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateCoupleRequest>,
) -> Result<SuccessResponse<CoupleResponse>, AppError> {
    let code = normalize_invite_code(&req.partner_code)?;
    validate_not_future("start_date", req.start_date, Utc::now().date_naive())?;

    let users = state.users();
    let me = users.get_active(user.id).await?;
    if me.cup_id.is_some() {
        return Err(AppError::conflict("You are already in a couple"));
    }

    let partner = users
        .find_by_invite_code(&code)
        .await?
        .ok_or_else(|| AppError::not_found("No user with this invite code"))?;
    if partner.id == me.id {
        return Err(AppError::bad_request("You cannot pair with yourself"));
    }

    let couple = state
        .couples()
        .create(me.id, partner.id, req.start_date)
        .await?;

    tracing::info!(cup_id = %couple.id, user_id = %me.id, partner_id = %partner.id, "Couple created");
    Ok(SuccessResponse::created(couple_response(&state, couple).await?))
}

#[tracing::instrument(skip(state, ctx))]
pub async fn get_couple(
    State(state): State<AppState>,
    Extension(ctx): Extension<CoupleContext>,
) -> Result<SuccessResponse<CoupleResponse>, AppError> {
    let couple = ctx.0;
    Ok(SuccessResponse::new(couple_response(&state, couple).await?))
}

#[tracing::instrument(skip(state, ctx, req))]
pub async fn update_couple(
    State(state): State<AppState>,
    Extension(ctx): Extension<CoupleContext>,
    Json(req): Json<UpdateCoupleRequest>,
) -> Result<SuccessResponse<CoupleResponse>, AppError> {
    let couple = ctx.0;
    validate_not_future("start_date", req.start_date, Utc::now().date_naive())?;

    let updated = state
        .couples()
        .update_start_date(couple.id, req.start_date)
        .await?;
    Ok(SuccessResponse::new(couple_response(&state, updated).await?))
}

#[tracing::instrument(skip(state, ctx, form))]
pub async fn put_thumbnail(
    State(state): State<AppState>,
    Extension(ctx): Extension<CoupleContext>,
    mut form: MultipartForm,
) -> Result<SuccessResponse<CoupleResponse>, AppError> {
    let couple = ctx.0;
    let file = form.require_file("image")?;

    let stored = state
        .uploads
        .upload(UploadPrefix::Couples, couple.id, &file)
        .await?;

    let couples = state.couples();
    let previous = match couples.set_thumbnail(couple.id, &stored.key).await {
        Ok(previous) => previous,
        Err(e) => {
            state.uploads.delete_best_effort(&[stored.key]).await;
            return Err(e.into());
        }
    };
    if let Some(previous) = previous {
        state.uploads.delete_best_effort(&[previous]).await;
    }

    let updated = couples
        .find_by_id(couple.id)
        .await?
        .ok_or_else(|| AppError::not_found("Couple not found"))?;
    Ok(SuccessResponse::new(couple_response(&state, updated).await?))
}

/// Break up: both members become single again
#[tracing::instrument(skip(state, ctx))]
pub async fn delete_couple(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Extension(ctx): Extension<CoupleContext>,
) -> Result<SuccessResponse<MessageResponse>, AppError> {
    let couple = ctx.0;
    state.couples().dissolve(couple.id).await?;
    tracing::info!(cup_id = %couple.id, user_id = %user.id, "Couple dissolved");
    Ok(MessageResponse::new("Couple dissolved"))
}
