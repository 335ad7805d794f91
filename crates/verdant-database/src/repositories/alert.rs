//! Alert repository implementation.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::PgPool;

use verdant_core::error::{AppError, ErrorKind};
use verdant_core::result::AppResult;
use verdant_core::types::{AlertId, GardenId};
use verdant_entity::alert::Alert;
use verdant_entity::garden::Recipient;

use crate::store::AlertRepository;

/// Columns selected for every alert query, with the garden name joined in.
const ALERT_COLUMNS: &str = "a.id, a.garden_id, g.name AS garden_name, a.description, \
     a.scheduled_date, a.scheduled_time, a.status, a.pre_notified, a.created_by, a.created_at";

/// Matches alerts whose scheduled instant lies within the minute starting at `$1`.
const WITHIN_MINUTE: &str = "(a.scheduled_date + a.scheduled_time) >= $1 \
     AND (a.scheduled_date + a.scheduled_time) < $1 + INTERVAL '1 minute'";

/// Repository for alert state queries and transitions.
#[derive(Debug, Clone)]
pub struct PgAlertRepository {
    pool: PgPool,
}

impl PgAlertRepository {
    /// Create a new alert repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlertRepository for PgAlertRepository {
    async fn find_due_for_pre_notification(
        &self,
        instant: NaiveDateTime,
    ) -> AppResult<Vec<Alert>> {
        let sql = format!(
            "SELECT {ALERT_COLUMNS} FROM alerts a JOIN gardens g ON g.id = a.garden_id \
             WHERE a.status = 'active' AND a.pre_notified = FALSE AND {WITHIN_MINUTE} \
             ORDER BY a.created_at"
        );

        sqlx::query_as::<_, Alert>(&sql)
            .bind(instant)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    "Failed to query alerts due for reminder",
                    e,
                )
            })
    }

    async fn find_due_now(&self, instant: NaiveDateTime) -> AppResult<Vec<Alert>> {
        let sql = format!(
            "SELECT {ALERT_COLUMNS} FROM alerts a JOIN gardens g ON g.id = a.garden_id \
             WHERE a.status = 'active' AND {WITHIN_MINUTE} \
             ORDER BY a.created_at"
        );

        sqlx::query_as::<_, Alert>(&sql)
            .bind(instant)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to query due alerts", e)
            })
    }

    async fn mark_pre_notified(&self, alert_id: AlertId) -> AppResult<()> {
        sqlx::query("UPDATE alerts SET pre_notified = TRUE WHERE id = $1")
            .bind(alert_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to set reminder flag", e)
            })?;
        Ok(())
    }

    async fn transition_to_completed(&self, alert_id: AlertId) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE alerts SET status = 'completed' WHERE id = $1 AND status = 'active'",
        )
        .bind(alert_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to complete alert", e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn get_garden_recipients(&self, garden_id: GardenId) -> AppResult<Vec<Recipient>> {
        sqlx::query_as::<_, Recipient>(
            "SELECT user_id, username, role FROM ( \
                 SELECT u.id AS user_id, u.username, 'owner'::TEXT AS role, 0 AS rank \
                 FROM gardens g JOIN users u ON u.id = g.owner_id WHERE g.id = $1 \
                 UNION ALL \
                 SELECT u.id AS user_id, u.username, 'collaborator'::TEXT AS role, 1 AS rank \
                 FROM garden_collaborators c \
                 JOIN gardens g ON g.id = c.garden_id \
                 JOIN users u ON u.id = c.user_id \
                 WHERE c.garden_id = $1 AND c.status = 'active' AND c.user_id <> g.owner_id \
             ) members ORDER BY rank, username",
        )
        .bind(garden_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to resolve garden recipients", e)
        })
    }
}
