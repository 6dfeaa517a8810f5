use axum::{extract::State, Extension};
use common::errors::AppError;
use common::models::{DatePlace, DatePlaceDetail};
use common::pagination::{PageQuery, Paginated};
use common::tour::AreaFilter;
use serde::{Deserialize, Serialize};

use crate::extract::{Path, Query};
use crate::handlers::{MessageResponse, SuccessResponse};
use crate::middleware::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PlaceListQuery {
    pub area_code: Option<String>,
    pub sigungu_code: Option<String>,
    pub content_type_id: Option<String>,
    pub page: Option<u32>,
    pub count: Option<u32>,
}

impl PlaceListQuery {
    fn split(self) -> (AreaFilter, PageQuery) {
        let blank_to_none = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        (
            AreaFilter {
                area_code: blank_to_none(self.area_code),
                sigungu_code: blank_to_none(self.sigungu_code),
                content_type_id: blank_to_none(self.content_type_id),
            },
            PageQuery {
                page: self.page,
                count: self.count,
            },
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct PlaceSearchQuery {
    pub keyword: Option<String>,
    pub area_code: Option<String>,
    pub sigungu_code: Option<String>,
    pub content_type_id: Option<String>,
    pub page: Option<u32>,
    pub count: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct PlaceDetailResponse {
    #[serde(flatten)]
    pub detail: DatePlaceDetail,
    pub liked: bool,
}

/// Places from the open-data API by area
#[tracing::instrument(skip(state))]
pub async fn list_places(
    State(state): State<AppState>,
    Query(query): Query<PlaceListQuery>,
) -> Result<SuccessResponse<Paginated<DatePlace>>, AppError> {
    let (filter, page) = query.split();
    let places = state.tour.area_based_list(&filter, &page).await?;
    Ok(SuccessResponse::new(places))
}

#[tracing::instrument(skip(state))]
pub async fn search_places(
    State(state): State<AppState>,
    Query(query): Query<PlaceSearchQuery>,
) -> Result<SuccessResponse<Paginated<DatePlace>>, AppError> {
    let keyword = query
        .keyword
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| AppError::bad_request("Missing required field: keyword"))?
        .to_string();

    let (filter, page) = PlaceListQuery {
        area_code: query.area_code,
        sigungu_code: query.sigungu_code,
        content_type_id: query.content_type_id,
        page: query.page,
        count: query.count,
    }
    .split();

    let places = state.tour.search_keyword(&keyword, &filter, &page).await?;
    Ok(SuccessResponse::new(places))
}

/// Snapshots of the places the caller liked
#[tracing::instrument(skip(state))]
pub async fn list_liked(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(page): Query<PageQuery>,
) -> Result<SuccessResponse<Paginated<DatePlace>>, AppError> {
    let (places, total) = state.date_places().list_liked(user.id, &page).await?;
    Ok(SuccessResponse::new(Paginated::new(places, total, &page)))
}

#[tracing::instrument(skip(state))]
pub async fn get_place(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(content_id): Path<String>,
) -> Result<SuccessResponse<PlaceDetailResponse>, AppError> {
    let detail = state.tour.detail(&content_id).await?;
    let liked = state
        .date_places()
        .is_liked(user.id, &detail.place.content_id)
        .await?;
    Ok(SuccessResponse::new(PlaceDetailResponse { detail, liked }))
}

/// Store a snapshot of the place, then like it
#[tracing::instrument(skip(state))]
pub async fn like_place(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(content_id): Path<String>,
) -> Result<SuccessResponse<DatePlace>, AppError> {
    let detail = state.tour.detail(&content_id).await?;
    let places = state.date_places();
    places.upsert(&detail.place).await?;
    places.like(user.id, &detail.place.content_id).await?;

    tracing::info!(user_id = %user.id, content_id = %detail.place.content_id, "Place liked");
    Ok(SuccessResponse::new(detail.place))
}

#[tracing::instrument(skip(state))]
pub async fn unlike_place(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(content_id): Path<String>,
) -> Result<SuccessResponse<MessageResponse>, AppError> {
    state.date_places().unlike(user.id, &content_id).await?;
    Ok(MessageResponse::new("Place unliked"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_filters_are_dropped() {
        let (filter, page) = PlaceListQuery {
            area_code: Some("1".to_string()),
            sigungu_code: Some("  ".to_string()),
            content_type_id: None,
            page: Some(2),
            count: None,
        }
        .split();

        assert_eq!(filter.area_code.as_deref(), Some("1"));
        assert_eq!(filter.sigungu_code, None);
        assert_eq!(page.page(), 2);
    }
}
