//! Connection pool and schema bootstrap

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::schema::SCHEMA;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Shared handle to the document store
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open the pool and make sure every table exists
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let mut options = SqliteConnectOptions::from_str(&config.database_url)
            .map_err(|e| StoreError::Configuration(e.to_string()))?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms));

        let mut pool_options = SqlitePoolOptions::new().max_connections(config.max_connections.max(1));

        if config.is_in_memory() {
            // Every connection to :memory: is its own database; keep exactly one alive.
            pool_options = pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        } else {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let pool = pool_options.connect_with(options).await?;
        let db = Self { pool };
        db.init_schema().await?;

        info!(url = %config.database_url, "Store opened");
        Ok(db)
    }

    /// Create tables and indexes if they don't exist
    pub async fn init_schema(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!(statements = SCHEMA.len(), "Schema ready");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Start a transaction; dropped without commit it rolls back
    pub async fn begin(&self) -> StoreResult<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_in_memory_schema_is_created() {
        let db = Database::connect(&StoreConfig::in_memory()).await.unwrap();
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN \
             ('accounts', 'tasks', 'submissions', 'ledger_entries', 'notifications')",
        )
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(count, 5);
    }

    #[tokio::test]
    async fn test_file_database_reopens() {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig::at_path(dir.path().join("taskpay.db"));

        let db = Database::connect(&config).await.unwrap();
        db.close().await;

        // Second open must not fail on existing tables
        let db = Database::connect(&config).await.unwrap();
        db.init_schema().await.unwrap();
    }

    #[tokio::test]
    async fn test_bad_url_is_configuration_error() {
        let config = StoreConfig {
            database_url: "postgres://nope".to_string(),
            ..StoreConfig::default()
        };
        let err = Database::connect(&config).await.unwrap_err();
        assert!(matches!(err, StoreError::Configuration(_)));
    }
}
