// Calendar event repository

use crate::db::DbPool;
use crate::errors::{DatabaseError, ValidationError};
use crate::models::CalendarEvent;
use chrono::{NaiveDate, Utc};
use tracing::instrument;
use uuid::Uuid;

const EVENT_COLUMNS: &str =
    "id, cup_id, title, description, start_date, end_date, created_by, created_at, updated_at";

/// Inclusive date window covering a whole year or a single month
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub first: NaiveDate,
    pub last: NaiveDate,
}

impl DateWindow {
    /// Build the window for `year` or `year`/`month`.
    /// A month without a year is rejected.
    pub fn from_query(year: Option<i32>, month: Option<u32>) -> Result<Option<Self>, ValidationError> {
        match (year, month) {
            (None, None) => Ok(None),
            (None, Some(_)) => Err(ValidationError::MissingField("year".to_string())),
            (Some(year), None) => {
                let first = NaiveDate::from_ymd_opt(year, 1, 1)
                    .ok_or_else(|| ValidationError::invalid("year", "out of range"))?;
                let last = NaiveDate::from_ymd_opt(year, 12, 31)
                    .ok_or_else(|| ValidationError::invalid("year", "out of range"))?;
                Ok(Some(Self { first, last }))
            }
            (Some(year), Some(month)) => {
                let first = NaiveDate::from_ymd_opt(year, month, 1)
                    .ok_or_else(|| ValidationError::invalid("month", "must be between 1 and 12"))?;
                let next = if month == 12 {
                    NaiveDate::from_ymd_opt(year + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(year, month + 1, 1)
                };
                let last = next
                    .and_then(|d| d.pred_opt())
                    .ok_or_else(|| ValidationError::invalid("year", "out of range"))?;
                Ok(Some(Self { first, last }))
            }
        }
    }

    /// Whether an event spanning `start..=end` overlaps this window
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        start <= self.last && end >= self.first
    }
}

/// New event or full replacement of an existing one
#[derive(Debug, Clone)]
pub struct EventInput {
    pub title: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Clone)]
pub struct CalendarRepository {
    pool: DbPool,
}

impl CalendarRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Events of a couple, optionally limited to those overlapping `window`
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        cup_id: Uuid,
        window: Option<DateWindow>,
    ) -> Result<Vec<CalendarEvent>, DatabaseError> {
        let events = match window {
            Some(window) => {
                sqlx::query_as::<_, CalendarEvent>(&format!(
                    r#"
                    SELECT {} FROM calendar_events
                    WHERE cup_id = $1 AND start_date <= $3 AND end_date >= $2
                    ORDER BY start_date, created_at
                    "#,
                    EVENT_COLUMNS
                ))
                .bind(cup_id)
                .bind(window.first)
                .bind(window.last)
                .fetch_all(self.pool.pool())
                .await?
            }
            None => {
                sqlx::query_as::<_, CalendarEvent>(&format!(
                    "SELECT {} FROM calendar_events WHERE cup_id = $1 ORDER BY start_date, created_at",
                    EVENT_COLUMNS
                ))
                .bind(cup_id)
                .fetch_all(self.pool.pool())
                .await?
            }
        };

        Ok(events)
    }

    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        cup_id: Uuid,
        created_by: Uuid,
        input: &EventInput,
    ) -> Result<CalendarEvent, DatabaseError> {
        let event = sqlx::query_as::<_, CalendarEvent>(&format!(
            r#"
            INSERT INTO calendar_events (
                id, cup_id, title, description, start_date, end_date,
                created_by, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING {}
            "#,
            EVENT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(cup_id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(created_by)
        .bind(Utc::now())
        .fetch_one(self.pool.pool())
        .await?;

        tracing::info!(event_id = %event.id, cup_id = %cup_id, "Calendar event created");
        Ok(event)
    }

    #[instrument(skip(self))]
    pub async fn find(&self, cup_id: Uuid, event_id: Uuid) -> Result<CalendarEvent, DatabaseError> {
        sqlx::query_as::<_, CalendarEvent>(&format!(
            "SELECT {} FROM calendar_events WHERE id = $1 AND cup_id = $2",
            EVENT_COLUMNS
        ))
        .bind(event_id)
        .bind(cup_id)
        .fetch_optional(self.pool.pool())
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Calendar event not found: {}", event_id)))
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        cup_id: Uuid,
        event_id: Uuid,
        input: &EventInput,
    ) -> Result<CalendarEvent, DatabaseError> {
        let event = sqlx::query_as::<_, CalendarEvent>(&format!(
            r#"
            UPDATE calendar_events
            SET title = $3, description = $4, start_date = $5, end_date = $6, updated_at = $7
            WHERE id = $1 AND cup_id = $2
            RETURNING {}
            "#,
            EVENT_COLUMNS
        ))
        .bind(event_id)
        .bind(cup_id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(Utc::now())
        .fetch_optional(self.pool.pool())
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Calendar event not found: {}", event_id)))?;

        tracing::info!(event_id = %event_id, "Calendar event updated");
        Ok(event)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, cup_id: Uuid, event_id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM calendar_events WHERE id = $1 AND cup_id = $2")
            .bind(event_id)
            .bind(cup_id)
            .execute(self.pool.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!(
                "Calendar event not found: {}",
                event_id
            )));
        }

        tracing::info!(event_id = %event_id, "Calendar event deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn test_no_filter() {
        assert_eq!(DateWindow::from_query(None, None).expect("ok"), None);
    }

    #[test]
    fn test_month_requires_year() {
        assert!(matches!(
            DateWindow::from_query(None, Some(3)),
            Err(ValidationError::MissingField(_))
        ));
    }

    #[test]
    fn test_month_windows() {
        let feb = DateWindow::from_query(Some(2024), Some(2))
            .expect("ok")
            .expect("window");
        assert_eq!(feb.first, date(2024, 2, 1));
        assert_eq!(feb.last, date(2024, 2, 29));

        let dec = DateWindow::from_query(Some(2023), Some(12))
            .expect("ok")
            .expect("window");
        assert_eq!(dec.last, date(2023, 12, 31));

        assert!(DateWindow::from_query(Some(2024), Some(13)).is_err());
        assert!(DateWindow::from_query(Some(2024), Some(0)).is_err());
    }

    #[test]
    fn test_year_window() {
        let year = DateWindow::from_query(Some(2024), None)
            .expect("ok")
            .expect("window");
        assert_eq!(year.first, date(2024, 1, 1));
        assert_eq!(year.last, date(2024, 12, 31));
    }

    #[test]
    fn test_overlap_includes_spanning_events() {
        let may = DateWindow::from_query(Some(2024), Some(5))
            .expect("ok")
            .expect("window");
        // Trip from late April into May
        assert!(may.overlaps(date(2024, 4, 28), date(2024, 5, 2)));
        assert!(may.overlaps(date(2024, 5, 31), date(2024, 5, 31)));
        assert!(!may.overlaps(date(2024, 4, 1), date(2024, 4, 30)));
        assert!(!may.overlaps(date(2024, 6, 1), date(2024, 6, 3)));
    }
}
