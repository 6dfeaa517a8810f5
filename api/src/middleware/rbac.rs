use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
    Extension,
};
use common::errors::AppError;
use common::models::Couple;
use std::collections::HashMap;
use uuid::Uuid;

use super::CurrentUser;
use crate::extract::Path;
use crate::state::AppState;

/// The couple a couple-scoped request operates on
#[derive(Debug, Clone)]
pub struct CoupleContext(pub Couple);

/// Only admins pass
#[tracing::instrument(skip(req, next))]
pub async fn admin_guard(
    Extension(user): Extension<CurrentUser>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !user.is_admin() {
        tracing::warn!(user_id = %user.id, path = %req.uri().path(), "Non-admin on admin route");
        return Err(AppError::forbidden("Admin privileges required"));
    }

    tracing::info!(
        user_id = %user.id,
        method = %req.method(),
        path = %req.uri().path(),
        "Admin operation"
    );

    Ok(next.run(req).await)
}

/// Routes under `/:cup_id` are open only to members of that couple
#[tracing::instrument(skip(state, params, req, next))]
pub async fn couple_guard(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(params): Path<HashMap<String, String>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let cup_id = params
        .get("cup_id")
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .ok_or_else(|| AppError::bad_request("Invalid couple id"))?;

    let caller = state.users().get_active(user.id).await?;
    if caller.cup_id != Some(cup_id) {
        tracing::warn!(user_id = %user.id, cup_id = %cup_id, "Access to another couple denied");
        return Err(AppError::forbidden("Not a member of this couple"));
    }

    let couple = state
        .couples()
        .find_by_id(cup_id)
        .await?
        .ok_or_else(|| AppError::not_found("Couple not found"))?;

    req.extensions_mut().insert(CoupleContext(couple));
    Ok(next.run(req).await)
}
