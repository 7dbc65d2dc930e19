use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::core::Database;
use crate::benchmark::{BenchmarkReport, BenchmarkRun};
use crate::db::Row;
use crate::TARGET_DB;

/// A stored benchmark run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub report_id: String,
    pub created_at: String,
    pub run: BenchmarkRun,
}

impl Database {
    /// Stores every run of a report.
    #[instrument(target = "db", level = "info", skip(self, report), fields(report_id = %report.id))]
    pub async fn save_report(&self, report: &BenchmarkReport) -> Result<(), sqlx::Error> {
        let report_id = report.id.to_string();
        let created_at = report.started_at.to_rfc3339();
        let mut tx = self.pool().begin().await?;

        for run in &report.runs {
            let stats = serde_json::to_string(run).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
            sqlx::query(
                r#"
                INSERT INTO benchmark_history
                    (report_id, model, priority, speed, success_rate, status, stats, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&report_id)
            .bind(&run.model)
            .bind(run.priority as i64)
            .bind(run.speed)
            .bind(run.success_rate)
            .bind(run.status.to_string())
            .bind(stats)
            .bind(&created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!(target: TARGET_DB, "Saved benchmark report {} ({} runs)", report_id, report.runs.len());
        Ok(())
    }

    /// Most recent runs first.
    pub async fn recent_history(&self, limit: i64) -> Result<Vec<HistoryEntry>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT report_id, stats, created_at
            FROM benchmark_history
            ORDER BY created_at DESC, id DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter()
            .map(|row| -> Result<HistoryEntry, sqlx::Error> {
                let stats: String = row.get("stats");
                let run: BenchmarkRun =
                    serde_json::from_str(&stats).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
                Ok(HistoryEntry {
                    report_id: row.get("report_id"),
                    created_at: row.get("created_at"),
                    run,
                })
            })
            .collect()
    }

    /// Replaces the stored ranking with the one in `runs`. Models missing from
    /// `runs` lose their priority, so the table always holds a single ranking.
    #[instrument(target = "db", level = "info", skip(self, runs))]
    pub async fn update_priorities(&self, runs: &[BenchmarkRun]) -> Result<(), sqlx::Error> {
        let updated_at = Utc::now().to_rfc3339();
        let mut tx = self.pool().begin().await?;

        let dropped = sqlx::query("DELETE FROM model_priority")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        debug!(target: TARGET_DB, "Cleared {} stored priorities", dropped);

        for run in runs {
            debug!(target: TARGET_DB, "Model {} -> priority {}", run.model, run.priority);
            sqlx::query(
                r#"
                INSERT INTO model_priority (model, priority, speed, success_rate, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(model) DO UPDATE SET
                    priority = ?2,
                    speed = ?3,
                    success_rate = ?4,
                    updated_at = ?5
                "#,
            )
            .bind(&run.model)
            .bind(run.priority as i64)
            .bind(run.speed)
            .bind(run.success_rate)
            .bind(&updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Models by stored priority, best first.
    pub async fn model_order(&self) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT model FROM model_priority ORDER BY priority ASC, model ASC",
        )
        .fetch_all(self.pool())
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::rank_runs;

    fn run(model: &str, speed: f64) -> BenchmarkRun {
        let mut run = BenchmarkRun::construction_failure(model, &["Nut M8".to_string()], "n/a");
        run.speed = speed;
        run
    }

    #[tokio::test]
    async fn test_save_and_read_history() {
        let db = Database::in_memory().await.unwrap();
        let mut runs = vec![run("llama3", 1.0), run("qwen2.5", 3.0)];
        rank_runs(&mut runs);
        let report = BenchmarkReport::new(Utc::now(), runs);

        db.save_report(&report).await.unwrap();

        let history = db.recent_history(10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history
            .iter()
            .all(|entry| entry.report_id == report.id.to_string()));
        let stored: Vec<&BenchmarkRun> = history.iter().map(|entry| &entry.run).collect();
        assert!(stored.contains(&&report.runs[0]));
        assert!(stored.contains(&&report.runs[1]));

        assert_eq!(db.recent_history(1).await.unwrap().len(), 1);
        let counts = db.collect_stats().await.unwrap();
        assert_eq!(counts.history_rows, 2);
        assert_eq!(counts.priority_rows, 0);
    }

    #[tokio::test]
    async fn test_priorities_are_replaced() {
        let db = Database::in_memory().await.unwrap();
        assert!(db.model_order().await.unwrap().is_empty());

        let mut runs = vec![run("llama3", 1.0), run("qwen2.5", 3.0)];
        rank_runs(&mut runs);
        db.update_priorities(&runs).await.unwrap();
        assert_eq!(db.model_order().await.unwrap(), vec!["qwen2.5", "llama3"]);

        let mut runs = vec![run("llama3", 9.0), run("qwen2.5", 3.0)];
        rank_runs(&mut runs);
        db.update_priorities(&runs).await.unwrap();
        assert_eq!(db.model_order().await.unwrap(), vec!["llama3", "qwen2.5"]);
    }

    #[tokio::test]
    async fn test_subset_rebenchmark_replaces_whole_ranking() {
        let db = Database::in_memory().await.unwrap();

        let mut runs = vec![run("a", 1.0), run("b", 2.0), run("c", 3.0)];
        rank_runs(&mut runs);
        db.update_priorities(&runs).await.unwrap();
        assert_eq!(db.model_order().await.unwrap(), vec!["c", "b", "a"]);

        let mut runs = vec![run("a", 5.0), run("b", 2.0)];
        rank_runs(&mut runs);
        db.update_priorities(&runs).await.unwrap();
        assert_eq!(db.model_order().await.unwrap(), vec!["a", "b"]);
        assert_eq!(db.collect_stats().await.unwrap().to_string(), "0:2");
    }
}
