use axum::{extract::State, Extension};
use chrono::NaiveDate;
use common::db::repositories::{DateWindow, EventInput};
use common::errors::AppError;
use common::models::CalendarEvent;
use common::validation::{
    optional_text, required_text, validate_date_range, MAX_CONTENTS_LENGTH, MAX_TITLE_LENGTH,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::extract::{Json, Path, Query};
use crate::handlers::{MessageResponse, SuccessResponse};
use crate::middleware::{CoupleContext, CurrentUser};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListEventsQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct EventRequest {
    pub title: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl EventRequest {
    fn validate(self) -> Result<EventInput, AppError> {
        let title = required_text("title", &self.title, MAX_TITLE_LENGTH)?;
        let description =
            optional_text("description", self.description.as_deref(), MAX_CONTENTS_LENGTH)?;
        validate_date_range(self.start_date, self.end_date)?;
        Ok(EventInput {
            title,
            description,
            start_date: self.start_date,
            end_date: self.end_date,
        })
    }
}

/// Events of the couple, optionally limited to a year or a month
#[tracing::instrument(skip(state, ctx))]
pub async fn list_events(
    State(state): State<AppState>,
    Extension(ctx): Extension<CoupleContext>,
    Query(query): Query<ListEventsQuery>,
) -> Result<SuccessResponse<Vec<CalendarEvent>>, AppError> {
    let window = DateWindow::from_query(query.year, query.month)?;
    let events = state.calendar().list(ctx.0.id, window).await?;
    Ok(SuccessResponse::new(events))
}

#[tracing::instrument(skip(state, ctx, req))]
pub async fn create_event(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Extension(ctx): Extension<CoupleContext>,
    Json(req): Json<EventRequest>,
) -> Result<SuccessResponse<CalendarEvent>, AppError> {
    let input = req.validate()?;
    let event = state.calendar().create(ctx.0.id, user.id, &input).await?;
    Ok(SuccessResponse::created(event))
}

#[tracing::instrument(skip(state, ctx, req))]
pub async fn update_event(
    State(state): State<AppState>,
    Extension(ctx): Extension<CoupleContext>,
    Path((_cup_id, event_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<EventRequest>,
) -> Result<SuccessResponse<CalendarEvent>, AppError> {
    let input = req.validate()?;
    let event = state.calendar().update(ctx.0.id, event_id, &input).await?;
    Ok(SuccessResponse::new(event))
}

#[tracing::instrument(skip(state, ctx))]
pub async fn delete_event(
    State(state): State<AppState>,
    Extension(ctx): Extension<CoupleContext>,
    Path((_cup_id, event_id)): Path<(Uuid, Uuid)>,
) -> Result<SuccessResponse<MessageResponse>, AppError> {
    state.calendar().delete(ctx.0.id, event_id).await?;
    Ok(MessageResponse::new("Event deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(start: (i32, u32, u32), end: (i32, u32, u32)) -> EventRequest {
        EventRequest {
            title: " Anniversary ".to_string(),
            description: Some("".to_string()),
            start_date: NaiveDate::from_ymd_opt(start.0, start.1, start.2).expect("date"),
            end_date: NaiveDate::from_ymd_opt(end.0, end.1, end.2).expect("date"),
        }
    }

    #[test]
    fn test_valid_event_is_normalized() {
        let input = request((2024, 5, 1), (2024, 5, 2)).validate().expect("valid");
        assert_eq!(input.title, "Anniversary");
        assert_eq!(input.description, None);
    }

    #[test]
    fn test_end_before_start_is_rejected() {
        let result = request((2024, 5, 2), (2024, 5, 1)).validate();
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_blank_title_is_rejected() {
        let mut req = request((2024, 5, 1), (2024, 5, 1));
        req.title = "  ".to_string();
        assert!(matches!(req.validate(), Err(AppError::BadRequest(_))));
    }
}
