use axum::{extract::State, Extension};
use chrono::NaiveDate;
use common::auth::{SignupRequest, TokenPair};
use common::errors::AppError;
use serde::{Deserialize, Serialize};

use crate::extract::Json;
use crate::handlers::user::UserResponse;
use crate::handlers::{MessageResponse, SuccessResponse};
use crate::middleware::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignupBody {
    pub email: String,
    pub password: String,
    pub nickname: String,
    pub birthday: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserResponse,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct LogoutAllResponse {
    pub revoked_sessions: u64,
}

#[tracing::instrument(skip(state, req))]
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupBody>,
) -> Result<SuccessResponse<UserResponse>, AppError> {
    let user = state
        .accounts
        .signup(SignupRequest {
            email: req.email,
            password: req.password,
            nickname: req.nickname,
            birthday: req.birthday,
        })
        .await?;

    Ok(SuccessResponse::created(UserResponse::new(user, &state.uploads)))
}

#[tracing::instrument(skip(state, req))]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<SuccessResponse<LoginResponse>, AppError> {
    if req.email.trim().is_empty() {
        return Err(AppError::bad_request("Email is required"));
    }
    if req.password.is_empty() {
        return Err(AppError::bad_request("Password is required"));
    }

    let (user, tokens) = state.accounts.login(&req.email, &req.password).await?;

    Ok(SuccessResponse::new(LoginResponse {
        user: UserResponse::new(user, &state.uploads),
        tokens,
    }))
}

/// Exchange a refresh token for a new pair; the presented token is consumed
#[tracing::instrument(skip(state, req))]
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(req): Json<RefreshTokenRequest>,
) -> Result<SuccessResponse<TokenPair>, AppError> {
    if req.refresh_token.trim().is_empty() {
        return Err(AppError::bad_request("refresh_token is required"));
    }

    let pair = state.tokens.refresh(req.refresh_token.trim()).await?;
    Ok(SuccessResponse::new(pair))
}

#[tracing::instrument(skip(state, req))]
pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<RefreshTokenRequest>,
) -> Result<SuccessResponse<MessageResponse>, AppError> {
    state
        .accounts
        .logout(user.id, req.refresh_token.trim())
        .await?;
    Ok(MessageResponse::new("Logged out"))
}

#[tracing::instrument(skip(state))]
pub async fn logout_all(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<SuccessResponse<LogoutAllResponse>, AppError> {
    let revoked_sessions = state.accounts.logout_all(user.id).await?;
    Ok(SuccessResponse::new(LogoutAllResponse { revoked_sessions }))
}
