use tracing::info;

use super::core::Database;
use crate::TARGET_DB;

impl Database {
    pub(crate) async fn initialize_schema(&self) -> Result<(), sqlx::Error> {
        let mut conn = self.pool().acquire().await?;
        sqlx::query(
            r#"
            -- One row per model per benchmark invocation
            CREATE TABLE IF NOT EXISTS benchmark_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                report_id TEXT NOT NULL,
                model TEXT NOT NULL,
                priority INTEGER NOT NULL,
                speed REAL NOT NULL,
                success_rate REAL NOT NULL,
                status TEXT NOT NULL,
                stats TEXT NOT NULL, -- full run as JSON
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_benchmark_history_created_at ON benchmark_history (created_at);
            CREATE INDEX IF NOT EXISTS idx_benchmark_history_model ON benchmark_history (model);

            -- Current model order consumed by the classifier
            CREATE TABLE IF NOT EXISTS model_priority (
                model TEXT PRIMARY KEY,
                priority INTEGER NOT NULL,
                speed REAL NOT NULL,
                success_rate REAL NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_model_priority_priority ON model_priority (priority);
            "#,
        )
        .execute(&mut *conn)
        .await?;
        info!(target: TARGET_DB, "Tables ensured to exist");

        Ok(())
    }
}
