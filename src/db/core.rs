use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    Pool, Sqlite,
};
use std::fmt;
use std::str::FromStr;
use tokio::time::Duration;
use tracing::{info, instrument};

use crate::TARGET_DB;

/// Default database file, overridden by `DATABASE_PATH`.
pub const DEFAULT_DATABASE_PATH: &str = "nomenclator.db";

#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Get access to the database pool
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

impl Database {
    /// Opens (creating if missing) the SQLite file at `database_path` and ensures the schema.
    #[instrument(target = "db", level = "info")]
    pub async fn new(database_path: &str) -> Result<Self, sqlx::Error> {
        info!(target: TARGET_DB, "Creating database pool for: {}", database_path);

        let connect_options =
            SqliteConnectOptions::from_str(&format!("sqlite://{}", database_path))?
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .busy_timeout(Duration::from_secs(5))
                .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;

        info!(target: TARGET_DB, "Database pool created");

        let db = Database { pool };
        db.initialize_schema().await?;

        Ok(db)
    }

    /// Opens the database named by `DATABASE_PATH`, or the default file.
    pub async fn from_env() -> Result<Self, sqlx::Error> {
        let database_path =
            std::env::var("DATABASE_PATH").unwrap_or_else(|_| DEFAULT_DATABASE_PATH.to_string());
        Database::new(&database_path).await
    }

    /// Private in-memory database. A single connection that never expires, so
    /// the data lives as long as the pool.
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let db = Database { pool };
        db.initialize_schema().await?;

        Ok(db)
    }

    /// Row counts of the benchmark tables.
    pub async fn collect_stats(&self) -> Result<TableCounts, sqlx::Error> {
        let history_rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM benchmark_history;")
            .fetch_one(&self.pool)
            .await?;
        let priority_rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM model_priority;")
            .fetch_one(&self.pool)
            .await?;

        Ok(TableCounts {
            history_rows,
            priority_rows,
        })
    }
}

/// Rows stored per table, displayed as `history:priorities`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableCounts {
    pub history_rows: i64,
    pub priority_rows: i64,
}

impl fmt::Display for TableCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.history_rows, self.priority_rows)
    }
}
