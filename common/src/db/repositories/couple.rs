// Couple repository
// Forming and dissolving a couple always updates both members in the same transaction

use crate::db::DbPool;
use crate::errors::DatabaseError;
use crate::models::Couple;
use chrono::{NaiveDate, Utc};
use tracing::instrument;
use uuid::Uuid;

const COUPLE_COLUMNS: &str =
    "id, user1_id, user2_id, start_date, thumbnail, deleted, created_at, updated_at";

#[derive(Clone)]
pub struct CoupleRepository {
    pool: DbPool,
}

impl CoupleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a couple and link both users to it.
    ///
    /// Fails with `Conflict` when either user already belongs to a couple
    /// and with `NotFound` when either user does not exist.
    #[instrument(skip(self))]
    pub async fn create(
        &self,
        user1_id: Uuid,
        user2_id: Uuid,
        start_date: NaiveDate,
    ) -> Result<Couple, DatabaseError> {
        let mut tx = self.pool.pool().begin().await?;

        // Lock both rows in a stable order so concurrent pairings cannot deadlock
        let members: Vec<(Uuid, Option<Uuid>)> = sqlx::query_as(
            r#"
            SELECT id, cup_id FROM users
            WHERE id = ANY($1) AND NOT deleted
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(vec![user1_id, user2_id])
        .fetch_all(&mut *tx)
        .await?;

        if members.len() != 2 {
            return Err(DatabaseError::NotFound("User not found".to_string()));
        }
        if members.iter().any(|(_, cup_id)| cup_id.is_some()) {
            return Err(DatabaseError::Conflict(
                "User is already in a couple".to_string(),
            ));
        }

        let now = Utc::now();
        let couple = sqlx::query_as::<_, Couple>(&format!(
            r#"
            INSERT INTO couples (id, user1_id, user2_id, start_date, thumbnail, deleted, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NULL, FALSE, $5, $5)
            RETURNING {}
            "#,
            COUPLE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(user1_id)
        .bind(user2_id)
        .bind(start_date)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE users SET cup_id = $1, updated_at = $2 WHERE id = ANY($3)")
            .bind(couple.id)
            .bind(now)
            .bind(vec![user1_id, user2_id])
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(cup_id = %couple.id, "Couple created");
        Ok(couple)
    }

    /// Find a non-deleted couple
    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Couple>, DatabaseError> {
        let couple = sqlx::query_as::<_, Couple>(&format!(
            "SELECT {} FROM couples WHERE id = $1 AND NOT deleted",
            COUPLE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool.pool())
        .await?;

        Ok(couple)
    }

    #[instrument(skip(self))]
    pub async fn update_start_date(
        &self,
        id: Uuid,
        start_date: NaiveDate,
    ) -> Result<Couple, DatabaseError> {
        let couple = sqlx::query_as::<_, Couple>(&format!(
            r#"
            UPDATE couples SET start_date = $2, updated_at = $3
            WHERE id = $1 AND NOT deleted
            RETURNING {}
            "#,
            COUPLE_COLUMNS
        ))
        .bind(id)
        .bind(start_date)
        .bind(Utc::now())
        .fetch_optional(self.pool.pool())
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Couple not found: {}", id)))?;

        tracing::info!(cup_id = %id, "Couple start date updated");
        Ok(couple)
    }

    /// Replace the thumbnail, returning the previous object key
    #[instrument(skip(self))]
    pub async fn set_thumbnail(
        &self,
        id: Uuid,
        object_key: &str,
    ) -> Result<Option<String>, DatabaseError> {
        let mut tx = self.pool.pool().begin().await?;

        let previous: Option<Option<String>> = sqlx::query_scalar(
            "SELECT thumbnail FROM couples WHERE id = $1 AND NOT deleted FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let previous =
            previous.ok_or_else(|| DatabaseError::NotFound(format!("Couple not found: {}", id)))?;

        sqlx::query("UPDATE couples SET thumbnail = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(object_key)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(cup_id = %id, "Couple thumbnail updated");
        Ok(previous)
    }

    /// Soft delete the couple and unlink its members
    #[instrument(skip(self))]
    pub async fn dissolve(&self, id: Uuid) -> Result<(), DatabaseError> {
        let mut tx = self.pool.pool().begin().await?;
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE couples SET deleted = TRUE, updated_at = $2 WHERE id = $1 AND NOT deleted",
        )
        .bind(id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Couple not found: {}", id)));
        }

        sqlx::query("UPDATE users SET cup_id = NULL, updated_at = $2 WHERE cup_id = $1")
            .bind(id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(cup_id = %id, "Couple dissolved");
        Ok(())
    }
}
