use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Overall outcome of one model's benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkStatus {
    Ok,
    Partial,
    Failed,
}

impl BenchmarkStatus {
    /// `failed` iff nothing succeeded and something failed.
    pub fn from_counts(success_count: usize, error_count: usize) -> Self {
        match (success_count, error_count) {
            (0, errors) if errors > 0 => BenchmarkStatus::Failed,
            (_, 0) => BenchmarkStatus::Ok,
            _ => BenchmarkStatus::Partial,
        }
    }
}

impl fmt::Display for BenchmarkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BenchmarkStatus::Ok => write!(f, "ok"),
            BenchmarkStatus::Partial => write!(f, "partial"),
            BenchmarkStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Result of one benchmark sample, however many attempts it took.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleOutcome {
    pub sample: String,
    pub success: bool,
    // From the first attempt to the final outcome
    pub latency_ms: f64,
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Measured performance of one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkRun {
    pub model: String,
    // 1-based rank after sorting
    pub priority: usize,
    // Successful samples per wall-clock second
    pub speed: f64,
    pub success_count: usize,
    pub error_count: usize,
    pub total_requests: usize,
    pub success_rate: f64,
    pub avg_latency_ms: f64,
    pub median_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub min_latency_ms: f64,
    pub max_latency_ms: f64,
    pub wall_clock_ms: f64,
    pub status: BenchmarkStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub samples: Vec<SampleOutcome>,
}

/// One benchmark invocation across all models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkReport {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub runs: Vec<BenchmarkRun>,
}

impl BenchmarkReport {
    pub fn new(started_at: DateTime<Utc>, runs: Vec<BenchmarkRun>) -> Self {
        BenchmarkReport {
            id: Uuid::new_v4(),
            started_at,
            runs,
        }
    }

    /// Model names, best first.
    pub fn ranking(&self) -> Vec<String> {
        let mut runs: Vec<&BenchmarkRun> = self.runs.iter().collect();
        runs.sort_by_key(|run| run.priority);
        runs.into_iter().map(|run| run.model.clone()).collect()
    }
}
