use crate::domain::error::{AppError, Result};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::str::FromStr;
use std::time::Duration;

const CHECKLIST_SCHEMA_V1: &str = include_str!("../../../resources/checklist/schema.sql");
const CURRENT_SCHEMA_VERSION: i64 = 1;

#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub busy_timeout: Duration,
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 4,
            busy_timeout: Duration::from_secs(5),
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Clone)]
pub struct ChecklistDb {
    pool: SqlitePool,
}

impl ChecklistDb {
    pub async fn connect(database_url: &str, settings: &PoolSettings) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::DatabaseError(format!("Failed to parse checklist DB URL: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(settings.busy_timeout)
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect checklist DB: {e}")))?;

        Self::from_pool(pool).await
    }

    /// Single-connection in-memory database; the connection is never recycled
    /// because dropping it would drop the data.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| AppError::DatabaseError(format!("Failed to parse in-memory DB URL: {e}")))?
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to open in-memory DB: {e}")))?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self> {
        apply_migrations(&pool).await?;

        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Checklist DB health check failed: {e}")))?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

async fn apply_migrations(pool: &SqlitePool) -> Result<()> {
    // PRAGMA user_version tracks the schema; v1 is the full schema.
    let version: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(format!("Failed to read checklist DB user_version: {e}"))
        })?;

    if version >= CURRENT_SCHEMA_VERSION {
        return Ok(());
    }

    tracing::info!(from = version, to = CURRENT_SCHEMA_VERSION, "Migrating checklist DB");
    apply_schema(pool, CHECKLIST_SCHEMA_V1).await?;

    let pragma = format!("PRAGMA user_version = {}", CURRENT_SCHEMA_VERSION);
    sqlx::query(&pragma).execute(pool).await.map_err(|e| {
        AppError::DatabaseError(format!("Failed to set checklist DB user_version: {e}"))
    })?;

    Ok(())
}

async fn apply_schema(pool: &SqlitePool, schema: &str) -> Result<()> {
    for statement in schema.split(';') {
        let stmt = statement.trim();
        if stmt.is_empty() {
            continue;
        }
        sqlx::query(stmt).execute(pool).await.map_err(|e| {
            AppError::DatabaseError(format!("Failed to apply checklist schema: {e}"))
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_db_is_migrated() {
        let db = ChecklistDb::in_memory().await.unwrap();

        let version: i64 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(version, CURRENT_SCHEMA_VERSION);

        let tables: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN \
             ('checklist_templates', 'questions', 'inspections', 'inspection_answers', 'answer_photos')",
        )
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(tables, 5);
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let db = ChecklistDb::in_memory().await.unwrap();
        apply_migrations(db.pool()).await.unwrap();
    }
}
