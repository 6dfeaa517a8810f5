use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use common::errors::{AppError, AuthError};
use common::models::UserRole;
use uuid::Uuid;

use crate::state::AppState;

/// Caller identity taken from a valid access token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: Uuid,
    pub role: UserRole,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value
pub(crate) fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

/// Authentication middleware that validates access tokens
#[tracing::instrument(skip(state, req, next))]
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?;

    let token = bearer_token(header_value).ok_or_else(|| {
        tracing::warn!("Invalid authorization header format");
        AppError::unauthorized("Invalid Authorization header format")
    })?;

    let claims = state.tokens.validate_access(token).map_err(|e| {
        tracing::warn!(error = %e, "Rejected access token");
        AppError::from(e)
    })?;

    let id = claims
        .user_id()
        .ok_or_else(|| AppError::from(AuthError::InvalidToken("subject is not a UUID".to_string())))?;

    req.extensions_mut().insert(CurrentUser {
        id,
        role: claims.role,
    });

    Ok(next.run(req).await)
}
