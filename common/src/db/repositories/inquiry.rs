// Inquiry and solution repository
// An inquiry's `answered` flag always matches whether a solution row exists

use crate::db::DbPool;
use crate::errors::DatabaseError;
use crate::models::{Inquiry, InquiryImage, Solution};
use crate::pagination::PageQuery;
use chrono::Utc;
use sqlx::Row;
use tracing::instrument;
use uuid::Uuid;

const INQUIRY_COLUMNS: &str =
    "id, user_id, title, contents, answered, deleted, created_at, updated_at";
const SOLUTION_COLUMNS: &str = "id, inquiry_id, admin_id, contents, created_at, updated_at";

#[derive(Clone)]
pub struct InquiryRepository {
    pool: DbPool,
}

impl InquiryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert an inquiry with its attachment keys in one transaction
    #[instrument(skip(self, contents, image_keys), fields(images = image_keys.len()))]
    pub async fn create(
        &self,
        user_id: Uuid,
        title: &str,
        contents: &str,
        image_keys: &[String],
    ) -> Result<(Inquiry, Vec<InquiryImage>), DatabaseError> {
        let mut tx = self.pool.pool().begin().await?;
        let now = Utc::now();

        let inquiry = sqlx::query_as::<_, Inquiry>(&format!(
            r#"
            INSERT INTO inquiries (id, user_id, title, contents, answered, deleted, created_at, updated_at)
            VALUES ($1, $2, $3, $4, FALSE, FALSE, $5, $5)
            RETURNING {}
            "#,
            INQUIRY_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(title)
        .bind(contents)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let mut images = Vec::with_capacity(image_keys.len());
        for key in image_keys {
            let image = sqlx::query_as::<_, InquiryImage>(
                r#"
                INSERT INTO inquiry_images (id, inquiry_id, object_key, created_at)
                VALUES ($1, $2, $3, $4)
                RETURNING id, inquiry_id, object_key, created_at
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(inquiry.id)
            .bind(key)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;
            images.push(image);
        }

        tx.commit().await?;

        tracing::info!(inquiry_id = %inquiry.id, user_id = %user_id, "Inquiry created");
        Ok((inquiry, images))
    }

    /// A user's own inquiries, newest first
    #[instrument(skip(self))]
    pub async fn list_by_user(
        &self,
        user_id: Uuid,
        page: &PageQuery,
    ) -> Result<(Vec<Inquiry>, u64), DatabaseError> {
        let inquiries = sqlx::query_as::<_, Inquiry>(&format!(
            r#"
            SELECT {} FROM inquiries
            WHERE user_id = $1 AND NOT deleted
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
            INQUIRY_COLUMNS
        ))
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool.pool())
        .await?;

        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM inquiries WHERE user_id = $1 AND NOT deleted",
        )
        .bind(user_id)
        .fetch_one(self.pool.pool())
        .await?;
        let total: i64 = row.try_get("count")?;

        Ok((inquiries, total as u64))
    }

    /// Every inquiry for the admin console, optionally filtered by `answered`
    #[instrument(skip(self))]
    pub async fn list_all(
        &self,
        answered: Option<bool>,
        page: &PageQuery,
    ) -> Result<(Vec<Inquiry>, u64), DatabaseError> {
        let inquiries = sqlx::query_as::<_, Inquiry>(&format!(
            r#"
            SELECT {} FROM inquiries
            WHERE NOT deleted AND ($1::BOOLEAN IS NULL OR answered = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
            INQUIRY_COLUMNS
        ))
        .bind(answered)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool.pool())
        .await?;

        let row = sqlx::query(
            r#"
            SELECT COUNT(*) as count FROM inquiries
            WHERE NOT deleted AND ($1::BOOLEAN IS NULL OR answered = $1)
            "#,
        )
        .bind(answered)
        .fetch_one(self.pool.pool())
        .await?;
        let total: i64 = row.try_get("count")?;

        Ok((inquiries, total as u64))
    }

    /// Find a non-deleted inquiry
    #[instrument(skip(self))]
    pub async fn find(&self, id: Uuid) -> Result<Option<Inquiry>, DatabaseError> {
        let inquiry = sqlx::query_as::<_, Inquiry>(&format!(
            "SELECT {} FROM inquiries WHERE id = $1 AND NOT deleted",
            INQUIRY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool.pool())
        .await?;

        Ok(inquiry)
    }

    #[instrument(skip(self))]
    pub async fn images(&self, inquiry_id: Uuid) -> Result<Vec<InquiryImage>, DatabaseError> {
        let images = sqlx::query_as::<_, InquiryImage>(
            r#"
            SELECT id, inquiry_id, object_key, created_at
            FROM inquiry_images
            WHERE inquiry_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(inquiry_id)
        .fetch_all(self.pool.pool())
        .await?;

        Ok(images)
    }

    #[instrument(skip(self))]
    pub async fn solution_for(&self, inquiry_id: Uuid) -> Result<Option<Solution>, DatabaseError> {
        let solution = sqlx::query_as::<_, Solution>(&format!(
            "SELECT {} FROM solutions WHERE inquiry_id = $1",
            SOLUTION_COLUMNS
        ))
        .bind(inquiry_id)
        .fetch_optional(self.pool.pool())
        .await?;

        Ok(solution)
    }

    /// Soft delete an unanswered inquiry; answered ones are kept (`Conflict`)
    #[instrument(skip(self))]
    pub async fn soft_delete(&self, id: Uuid) -> Result<(), DatabaseError> {
        let mut tx = self.pool.pool().begin().await?;

        let answered: Option<bool> = sqlx::query_scalar(
            "SELECT answered FROM inquiries WHERE id = $1 AND NOT deleted FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        match answered {
            None => return Err(DatabaseError::NotFound(format!("Inquiry not found: {}", id))),
            Some(true) => {
                return Err(DatabaseError::Conflict(
                    "Answered inquiries can not be deleted".to_string(),
                ))
            }
            Some(false) => {}
        }

        sqlx::query("UPDATE inquiries SET deleted = TRUE, updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(inquiry_id = %id, "Inquiry soft deleted");
        Ok(())
    }

    /// Answer an inquiry. A second solution for the same inquiry is a `Conflict`.
    #[instrument(skip(self, contents))]
    pub async fn create_solution(
        &self,
        inquiry_id: Uuid,
        admin_id: Uuid,
        contents: &str,
    ) -> Result<Solution, DatabaseError> {
        let mut tx = self.pool.pool().begin().await?;

        let answered: Option<bool> = sqlx::query_scalar(
            "SELECT answered FROM inquiries WHERE id = $1 AND NOT deleted FOR UPDATE",
        )
        .bind(inquiry_id)
        .fetch_optional(&mut *tx)
        .await?;

        match answered {
            None => {
                return Err(DatabaseError::NotFound(format!(
                    "Inquiry not found: {}",
                    inquiry_id
                )))
            }
            Some(true) => {
                return Err(DatabaseError::Conflict(
                    "Inquiry already has a solution".to_string(),
                ))
            }
            Some(false) => {}
        }

        let now = Utc::now();
        let solution = sqlx::query_as::<_, Solution>(&format!(
            r#"
            INSERT INTO solutions (id, inquiry_id, admin_id, contents, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING {}
            "#,
            SOLUTION_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(inquiry_id)
        .bind(admin_id)
        .bind(contents)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE inquiries SET answered = TRUE, updated_at = $2 WHERE id = $1")
            .bind(inquiry_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(solution_id = %solution.id, inquiry_id = %inquiry_id, "Solution created");
        Ok(solution)
    }

    #[instrument(skip(self, contents))]
    pub async fn update_solution(
        &self,
        solution_id: Uuid,
        contents: &str,
    ) -> Result<Solution, DatabaseError> {
        let solution = sqlx::query_as::<_, Solution>(&format!(
            r#"
            UPDATE solutions SET contents = $2, updated_at = $3
            WHERE id = $1
            RETURNING {}
            "#,
            SOLUTION_COLUMNS
        ))
        .bind(solution_id)
        .bind(contents)
        .bind(Utc::now())
        .fetch_optional(self.pool.pool())
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Solution not found: {}", solution_id)))?;

        tracing::info!(solution_id = %solution_id, "Solution updated");
        Ok(solution)
    }

    /// Remove a solution and mark its inquiry unanswered again
    #[instrument(skip(self))]
    pub async fn delete_solution(&self, solution_id: Uuid) -> Result<(), DatabaseError> {
        let mut tx = self.pool.pool().begin().await?;

        let inquiry_id: Option<Uuid> =
            sqlx::query_scalar("DELETE FROM solutions WHERE id = $1 RETURNING inquiry_id")
                .bind(solution_id)
                .fetch_optional(&mut *tx)
                .await?;

        let inquiry_id = inquiry_id
            .ok_or_else(|| DatabaseError::NotFound(format!("Solution not found: {}", solution_id)))?;

        sqlx::query("UPDATE inquiries SET answered = FALSE, updated_at = $2 WHERE id = $1")
            .bind(inquiry_id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(solution_id = %solution_id, inquiry_id = %inquiry_id, "Solution deleted");
        Ok(())
    }
}
