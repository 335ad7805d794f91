//! Alert schema preparation.
//!
//! With `run_migrations` on, pending migrations are applied at startup.
//! With it off, the schema is only checked and startup fails while any
//! embedded migration is still pending.

use sqlx::PgPool;
use sqlx::migrate::Migrator;
use tracing::info;

use verdant_core::error::{AppError, ErrorKind};
use verdant_core::result::AppResult;

/// Migrations embedded from the workspace `migrations/` directory.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Tables every scan and dispatch touches.
pub const REQUIRED_TABLES: [&str; 5] = [
    "users",
    "gardens",
    "garden_collaborators",
    "alerts",
    "notifications",
];

/// Apply or verify the alert schema.
pub async fn prepare_schema(pool: &PgPool, apply: bool) -> AppResult<()> {
    if apply {
        info!(known = MIGRATOR.iter().count(), "Applying alert schema migrations");
        MIGRATOR.run(pool).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                format!("Failed to run migrations: {e}"),
                e,
            )
        })?;
        info!("Alert schema is up to date");
        return Ok(());
    }

    let applied = applied_versions(pool).await?;
    let pending = pending_versions(known_versions(), &applied);
    if !pending.is_empty() {
        return Err(AppError::configuration(format!(
            "Alert schema is missing migrations {pending:?} and run_migrations is disabled"
        )));
    }

    info!(applied = applied.len(), "Alert schema verified");
    Ok(())
}

/// Whether every table in [`REQUIRED_TABLES`] exists.
pub async fn schema_present(pool: &PgPool) -> AppResult<bool> {
    let missing: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM UNNEST($1::text[]) AS t(name) WHERE to_regclass(t.name) IS NULL",
    )
    .bind(&REQUIRED_TABLES[..])
    .fetch_one(pool)
    .await
    .map_err(|e| AppError::with_source(ErrorKind::Database, "Schema check failed", e))?;

    Ok(missing == 0)
}

fn known_versions() -> Vec<i64> {
    MIGRATOR
        .iter()
        .filter(|m| !m.migration_type.is_down_migration())
        .map(|m| m.version)
        .collect()
}

async fn applied_versions(pool: &PgPool) -> AppResult<Vec<i64>> {
    let tracked: bool =
        sqlx::query_scalar("SELECT to_regclass('_sqlx_migrations') IS NOT NULL")
            .fetch_one(pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to inspect migrations", e)
            })?;
    if !tracked {
        return Ok(Vec::new());
    }

    sqlx::query_scalar("SELECT version FROM _sqlx_migrations WHERE success ORDER BY version")
        .fetch_all(pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to read applied migrations", e)
        })
}

/// Known versions not yet applied, ascending.
fn pending_versions(known: Vec<i64>, applied: &[i64]) -> Vec<i64> {
    let mut pending: Vec<i64> = known
        .into_iter()
        .filter(|v| !applied.contains(v))
        .collect();
    pending.sort_unstable();
    pending
}
