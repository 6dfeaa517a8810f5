use axum::{extract::State, Extension};
use chrono::{DateTime, Utc};
use common::db::repositories::NewPhoto;
use common::errors::AppError;
use common::models::{Album, AlbumPhoto, AlbumSort};
use common::pagination::{PageQuery, Paginated};
use common::storage::{StoredObject, UploadPrefix, UploadService};
use common::validation::{required_text, MAX_TITLE_LENGTH};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::extract::{Json, Path, Query};
use crate::handlers::multipart::MultipartForm;
use crate::handlers::{MessageResponse, SuccessResponse};
use crate::middleware::CoupleContext;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListAlbumsQuery {
    pub page: Option<u32>,
    pub count: Option<u32>,
    #[serde(default)]
    pub sort: AlbumSort,
}

#[derive(Debug, Deserialize)]
pub struct DeletePhotosRequest {
    pub photo_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct AlbumResponse {
    pub id: Uuid,
    pub cup_id: Uuid,
    pub title: String,
    pub thumbnail_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AlbumResponse {
    fn new(album: Album, uploads: &UploadService) -> Self {
        Self {
            thumbnail_url: uploads.url_opt(album.thumbnail.as_deref()),
            id: album.id,
            cup_id: album.cup_id,
            title: album.title,
            created_at: album.created_at,
            updated_at: album.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PhotoResponse {
    pub id: Uuid,
    pub url: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

impl PhotoResponse {
    fn new(photo: AlbumPhoto, uploads: &UploadService) -> Self {
        Self {
            url: uploads.url(&photo.object_key),
            id: photo.id,
            content_type: photo.content_type,
            size_bytes: photo.size_bytes,
            created_at: photo.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AlbumDetailResponse {
    #[serde(flatten)]
    pub album: AlbumResponse,
    pub photos: Vec<PhotoResponse>,
}

fn new_photos(stored: &[StoredObject]) -> Vec<NewPhoto> {
    stored
        .iter()
        .map(|s| NewPhoto {
            object_key: s.key.clone(),
            content_type: s.content_type.clone(),
            size_bytes: s.size_bytes,
        })
        .collect()
}

#[tracing::instrument(skip(state, ctx))]
pub async fn list_albums(
    State(state): State<AppState>,
    Extension(ctx): Extension<CoupleContext>,
    Query(query): Query<ListAlbumsQuery>,
) -> Result<SuccessResponse<Paginated<AlbumResponse>>, AppError> {
    let page = PageQuery {
        page: query.page,
        count: query.count,
    };
    let (albums, total) = state.albums().list(ctx.0.id, &page, query.sort).await?;

    let page = Paginated::new(albums, total, &page).map(|a| AlbumResponse::new(a, &state.uploads));
    Ok(SuccessResponse::new(page))
}

/// Multipart: `title`, optional `thumbnail`
#[tracing::instrument(skip(state, ctx, form))]
pub async fn create_album(
    State(state): State<AppState>,
    Extension(ctx): Extension<CoupleContext>,
    mut form: MultipartForm,
) -> Result<SuccessResponse<AlbumResponse>, AppError> {
    let cup_id = ctx.0.id;
    let title = required_text("title", form.text("title").unwrap_or_default(), MAX_TITLE_LENGTH)?;

    let thumbnail = match form.take_file("thumbnail")? {
        Some(file) => Some(state.uploads.upload(UploadPrefix::Albums, cup_id, &file).await?),
        None => None,
    };
    let thumbnail_key = thumbnail.as_ref().map(|t| t.key.as_str());

    let album = match state.albums().create(cup_id, &title, thumbnail_key).await {
        Ok(album) => album,
        Err(e) => {
            if let Some(stored) = thumbnail {
                state.uploads.delete_best_effort(&[stored.key]).await;
            }
            return Err(e.into());
        }
    };

    Ok(SuccessResponse::created(AlbumResponse::new(album, &state.uploads)))
}

#[tracing::instrument(skip(state, ctx))]
pub async fn get_album(
    State(state): State<AppState>,
    Extension(ctx): Extension<CoupleContext>,
    Path((_cup_id, album_id)): Path<(Uuid, Uuid)>,
) -> Result<SuccessResponse<AlbumDetailResponse>, AppError> {
    let albums = state.albums();
    let album = albums.find(ctx.0.id, album_id).await?;
    let photos = albums.list_photos(album.id).await?;

    Ok(SuccessResponse::new(AlbumDetailResponse {
        album: AlbumResponse::new(album, &state.uploads),
        photos: photos
            .into_iter()
            .map(|p| PhotoResponse::new(p, &state.uploads))
            .collect(),
    }))
}

/// Multipart: optional `title`, optional `thumbnail`
#[tracing::instrument(skip(state, ctx, form))]
pub async fn update_album(
    State(state): State<AppState>,
    Extension(ctx): Extension<CoupleContext>,
    Path((_cup_id, album_id)): Path<(Uuid, Uuid)>,
    mut form: MultipartForm,
) -> Result<SuccessResponse<AlbumResponse>, AppError> {
    let cup_id = ctx.0.id;
    let title = form
        .text("title")
        .map(|t| required_text("title", t, MAX_TITLE_LENGTH))
        .transpose()?;
    let thumbnail_file = form.take_file("thumbnail")?;

    if title.is_none() && thumbnail_file.is_none() {
        return Err(AppError::bad_request("Nothing to update"));
    }

    let albums = state.albums();
    // Check ownership before touching object storage
    albums.find(cup_id, album_id).await?;

    let thumbnail = match thumbnail_file {
        Some(file) => Some(state.uploads.upload(UploadPrefix::Albums, cup_id, &file).await?),
        None => None,
    };
    let thumbnail_key = thumbnail.as_ref().map(|t| t.key.as_str());

    let (album, replaced) = match albums
        .update(cup_id, album_id, title.as_deref(), thumbnail_key)
        .await
    {
        Ok(result) => result,
        Err(e) => {
            if let Some(stored) = thumbnail {
                state.uploads.delete_best_effort(&[stored.key]).await;
            }
            return Err(e.into());
        }
    };
    if let Some(replaced) = replaced {
        state.uploads.delete_best_effort(&[replaced]).await;
    }

    Ok(SuccessResponse::new(AlbumResponse::new(album, &state.uploads)))
}

#[tracing::instrument(skip(state, ctx))]
pub async fn delete_album(
    State(state): State<AppState>,
    Extension(ctx): Extension<CoupleContext>,
    Path((_cup_id, album_id)): Path<(Uuid, Uuid)>,
) -> Result<SuccessResponse<MessageResponse>, AppError> {
    let keys = state.albums().delete(ctx.0.id, album_id).await?;
    state.uploads.delete_best_effort(&keys).await;
    Ok(MessageResponse::new("Album deleted"))
}

/// Multipart: one or more `images`
#[tracing::instrument(skip(state, ctx, form))]
pub async fn add_photos(
    State(state): State<AppState>,
    Extension(ctx): Extension<CoupleContext>,
    Path((_cup_id, album_id)): Path<(Uuid, Uuid)>,
    mut form: MultipartForm,
) -> Result<SuccessResponse<Vec<PhotoResponse>>, AppError> {
    let cup_id = ctx.0.id;
    let files = form.take_files("images");
    if files.is_empty() {
        return Err(AppError::bad_request("Missing file: images"));
    }

    let albums = state.albums();
    albums.find(cup_id, album_id).await?;

    let stored = state
        .uploads
        .upload_all(UploadPrefix::Albums, cup_id, &files)
        .await?;

    let photos = match albums.add_photos(album_id, &new_photos(&stored)).await {
        Ok(photos) => photos,
        Err(e) => {
            let keys: Vec<String> = stored.into_iter().map(|s| s.key).collect();
            state.uploads.delete_best_effort(&keys).await;
            return Err(e.into());
        }
    };

    Ok(SuccessResponse::created(
        photos
            .into_iter()
            .map(|p| PhotoResponse::new(p, &state.uploads))
            .collect(),
    ))
}

#[tracing::instrument(skip(state, ctx, req))]
pub async fn delete_photos(
    State(state): State<AppState>,
    Extension(ctx): Extension<CoupleContext>,
    Path((_cup_id, album_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<DeletePhotosRequest>,
) -> Result<SuccessResponse<MessageResponse>, AppError> {
    if req.photo_ids.is_empty() {
        return Err(AppError::bad_request("photo_ids must not be empty"));
    }

    let albums = state.albums();
    albums.find(ctx.0.id, album_id).await?;
    let keys = albums.delete_photos(album_id, &req.photo_ids).await?;
    state.uploads.delete_best_effort(&keys).await;

    Ok(MessageResponse::new(format!("{} photo(s) deleted", keys.len())))
}
