// Album and album photo repository

use crate::db::DbPool;
use crate::errors::DatabaseError;
use crate::models::{Album, AlbumPhoto, AlbumSort};
use crate::pagination::PageQuery;
use chrono::Utc;
use sqlx::Row;
use tracing::instrument;
use uuid::Uuid;

const ALBUM_COLUMNS: &str = "id, cup_id, title, thumbnail, created_at, updated_at";
const PHOTO_COLUMNS: &str = "id, album_id, object_key, content_type, size_bytes, created_at";

/// A photo about to be attached to an album
#[derive(Debug, Clone)]
pub struct NewPhoto {
    pub object_key: String,
    pub content_type: String,
    pub size_bytes: i64,
}

#[derive(Clone)]
pub struct AlbumRepository {
    pool: DbPool,
}

impl AlbumRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// One page of a couple's albums and the total album count
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        cup_id: Uuid,
        page: &PageQuery,
        sort: AlbumSort,
    ) -> Result<(Vec<Album>, u64), DatabaseError> {
        // ORDER BY comes from a fixed whitelist, never from the request
        let albums = sqlx::query_as::<_, Album>(&format!(
            "SELECT {} FROM albums WHERE cup_id = $1 ORDER BY {} LIMIT $2 OFFSET $3",
            ALBUM_COLUMNS,
            sort.order_by()
        ))
        .bind(cup_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool.pool())
        .await?;

        let total = self.count(cup_id).await?;
        Ok((albums, total))
    }

    #[instrument(skip(self))]
    pub async fn count(&self, cup_id: Uuid) -> Result<u64, DatabaseError> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM albums WHERE cup_id = $1")
            .bind(cup_id)
            .fetch_one(self.pool.pool())
            .await?;

        let count: i64 = row.try_get("count")?;
        Ok(count as u64)
    }

    /// Find an album belonging to the given couple
    #[instrument(skip(self))]
    pub async fn find(&self, cup_id: Uuid, album_id: Uuid) -> Result<Album, DatabaseError> {
        sqlx::query_as::<_, Album>(&format!(
            "SELECT {} FROM albums WHERE id = $1 AND cup_id = $2",
            ALBUM_COLUMNS
        ))
        .bind(album_id)
        .bind(cup_id)
        .fetch_optional(self.pool.pool())
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Album not found: {}", album_id)))
    }

    #[instrument(skip(self))]
    pub async fn create(
        &self,
        cup_id: Uuid,
        title: &str,
        thumbnail: Option<&str>,
    ) -> Result<Album, DatabaseError> {
        let now = Utc::now();
        let album = sqlx::query_as::<_, Album>(&format!(
            r#"
            INSERT INTO albums (id, cup_id, title, thumbnail, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING {}
            "#,
            ALBUM_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(cup_id)
        .bind(title)
        .bind(thumbnail)
        .bind(now)
        .fetch_one(self.pool.pool())
        .await?;

        tracing::info!(album_id = %album.id, cup_id = %cup_id, "Album created");
        Ok(album)
    }

    /// Update title and/or thumbnail.
    ///
    /// Returns the updated album and the replaced thumbnail key, if a new
    /// thumbnail was set over an existing one.
    #[instrument(skip(self))]
    pub async fn update(
        &self,
        cup_id: Uuid,
        album_id: Uuid,
        title: Option<&str>,
        thumbnail: Option<&str>,
    ) -> Result<(Album, Option<String>), DatabaseError> {
        let mut tx = self.pool.pool().begin().await?;

        let previous: Option<Option<String>> = sqlx::query_scalar(
            "SELECT thumbnail FROM albums WHERE id = $1 AND cup_id = $2 FOR UPDATE",
        )
        .bind(album_id)
        .bind(cup_id)
        .fetch_optional(&mut *tx)
        .await?;

        let previous = previous
            .ok_or_else(|| DatabaseError::NotFound(format!("Album not found: {}", album_id)))?;

        let album = sqlx::query_as::<_, Album>(&format!(
            r#"
            UPDATE albums
            SET title = COALESCE($2, title),
                thumbnail = COALESCE($3, thumbnail),
                updated_at = $4
            WHERE id = $1
            RETURNING {}
            "#,
            ALBUM_COLUMNS
        ))
        .bind(album_id)
        .bind(title)
        .bind(thumbnail)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let replaced = match thumbnail {
            Some(_) => previous,
            None => None,
        };

        tracing::info!(album_id = %album_id, "Album updated");
        Ok((album, replaced))
    }

    /// Delete an album with its photos, returning every object key to clean up
    #[instrument(skip(self))]
    pub async fn delete(&self, cup_id: Uuid, album_id: Uuid) -> Result<Vec<String>, DatabaseError> {
        let mut tx = self.pool.pool().begin().await?;

        let mut keys: Vec<String> =
            sqlx::query_scalar("SELECT object_key FROM album_photos WHERE album_id = $1")
                .bind(album_id)
                .fetch_all(&mut *tx)
                .await?;

        let thumbnail: Option<Option<String>> = sqlx::query_scalar(
            "DELETE FROM albums WHERE id = $1 AND cup_id = $2 RETURNING thumbnail",
        )
        .bind(album_id)
        .bind(cup_id)
        .fetch_optional(&mut *tx)
        .await?;

        let thumbnail = thumbnail
            .ok_or_else(|| DatabaseError::NotFound(format!("Album not found: {}", album_id)))?;

        tx.commit().await?;

        keys.extend(thumbnail);
        tracing::info!(album_id = %album_id, objects = keys.len(), "Album deleted");
        Ok(keys)
    }

    /// Attach photos in a single transaction
    #[instrument(skip(self, photos), fields(count = photos.len()))]
    pub async fn add_photos(
        &self,
        album_id: Uuid,
        photos: &[NewPhoto],
    ) -> Result<Vec<AlbumPhoto>, DatabaseError> {
        let mut tx = self.pool.pool().begin().await?;
        let now = Utc::now();
        let mut inserted = Vec::with_capacity(photos.len());

        for photo in photos {
            let row = sqlx::query_as::<_, AlbumPhoto>(&format!(
                r#"
                INSERT INTO album_photos (id, album_id, object_key, content_type, size_bytes, created_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING {}
                "#,
                PHOTO_COLUMNS
            ))
            .bind(Uuid::new_v4())
            .bind(album_id)
            .bind(&photo.object_key)
            .bind(&photo.content_type)
            .bind(photo.size_bytes)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;
            inserted.push(row);
        }

        sqlx::query("UPDATE albums SET updated_at = $2 WHERE id = $1")
            .bind(album_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(album_id = %album_id, count = inserted.len(), "Photos added");
        Ok(inserted)
    }

    #[instrument(skip(self))]
    pub async fn list_photos(&self, album_id: Uuid) -> Result<Vec<AlbumPhoto>, DatabaseError> {
        let photos = sqlx::query_as::<_, AlbumPhoto>(&format!(
            "SELECT {} FROM album_photos WHERE album_id = $1 ORDER BY created_at, id",
            PHOTO_COLUMNS
        ))
        .bind(album_id)
        .fetch_all(self.pool.pool())
        .await?;

        Ok(photos)
    }

    /// Delete the given photos of one album, returning their object keys.
    /// Ids that do not belong to the album are ignored.
    #[instrument(skip(self, photo_ids), fields(count = photo_ids.len()))]
    pub async fn delete_photos(
        &self,
        album_id: Uuid,
        photo_ids: &[Uuid],
    ) -> Result<Vec<String>, DatabaseError> {
        let keys: Vec<String> = sqlx::query_scalar(
            "DELETE FROM album_photos WHERE album_id = $1 AND id = ANY($2) RETURNING object_key",
        )
        .bind(album_id)
        .bind(photo_ids)
        .fetch_all(self.pool.pool())
        .await?;

        tracing::info!(album_id = %album_id, deleted = keys.len(), "Photos deleted");
        Ok(keys)
    }
}
