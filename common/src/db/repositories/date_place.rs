// Date place snapshots and likes

use crate::db::DbPool;
use crate::errors::DatabaseError;
use crate::models::DatePlace;
use crate::pagination::PageQuery;
use chrono::Utc;
use sqlx::Row;
use tracing::instrument;
use uuid::Uuid;

#[derive(Clone)]
pub struct DatePlaceRepository {
    pool: DbPool,
}

impl DatePlaceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Store or refresh the local snapshot of an open-data place
    #[instrument(skip(self, place), fields(content_id = %place.content_id))]
    pub async fn upsert(&self, place: &DatePlace) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO date_places (
                content_id, content_type_id, title, address, area_code, sigungu_code,
                map_x, map_y, image_url, tel, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (content_id) DO UPDATE SET
                content_type_id = EXCLUDED.content_type_id,
                title = EXCLUDED.title,
                address = EXCLUDED.address,
                area_code = EXCLUDED.area_code,
                sigungu_code = EXCLUDED.sigungu_code,
                map_x = EXCLUDED.map_x,
                map_y = EXCLUDED.map_y,
                image_url = EXCLUDED.image_url,
                tel = EXCLUDED.tel,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&place.content_id)
        .bind(&place.content_type_id)
        .bind(&place.title)
        .bind(&place.address)
        .bind(&place.area_code)
        .bind(&place.sigungu_code)
        .bind(place.map_x)
        .bind(place.map_y)
        .bind(&place.image_url)
        .bind(&place.tel)
        .bind(Utc::now())
        .execute(self.pool.pool())
        .await?;

        Ok(())
    }

    /// Like a place; liking it again is a no-op
    #[instrument(skip(self))]
    pub async fn like(&self, user_id: Uuid, content_id: &str) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            INSERT INTO place_likes (user_id, content_id, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, content_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(content_id)
        .bind(Utc::now())
        .execute(self.pool.pool())
        .await?;

        if result.rows_affected() > 0 {
            tracing::info!(user_id = %user_id, content_id = %content_id, "Place liked");
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn unlike(&self, user_id: Uuid, content_id: &str) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM place_likes WHERE user_id = $1 AND content_id = $2")
            .bind(user_id)
            .bind(content_id)
            .execute(self.pool.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!(
                "Liked place not found: {}",
                content_id
            )));
        }

        tracing::info!(user_id = %user_id, content_id = %content_id, "Place unliked");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn is_liked(&self, user_id: Uuid, content_id: &str) -> Result<bool, DatabaseError> {
        let liked: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM place_likes WHERE user_id = $1 AND content_id = $2)",
        )
        .bind(user_id)
        .bind(content_id)
        .fetch_one(self.pool.pool())
        .await?;

        Ok(liked)
    }

    /// A user's liked places, most recently liked first
    #[instrument(skip(self))]
    pub async fn list_liked(
        &self,
        user_id: Uuid,
        page: &PageQuery,
    ) -> Result<(Vec<DatePlace>, u64), DatabaseError> {
        let places = sqlx::query_as::<_, DatePlace>(
            r#"
            SELECT p.content_id, p.content_type_id, p.title, p.address, p.area_code,
                   p.sigungu_code, p.map_x, p.map_y, p.image_url, p.tel
            FROM place_likes l
            INNER JOIN date_places p ON p.content_id = l.content_id
            WHERE l.user_id = $1
            ORDER BY l.created_at DESC, p.content_id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool.pool())
        .await?;

        let row = sqlx::query("SELECT COUNT(*) as count FROM place_likes WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.pool.pool())
            .await?;
        let total: i64 = row.try_get("count")?;

        Ok((places, total as u64))
    }
}
