pub mod harness;
pub mod samples;
pub mod stats;
pub mod types;

pub use harness::{BenchmarkConfig, ClassifierFactory, ModelBenchmarkHarness, SharedClassifierFactory};
pub use samples::{default_samples, DEFAULT_SAMPLES};
pub use stats::{percentile, rank_runs};
pub use types::{BenchmarkReport, BenchmarkRun, BenchmarkStatus, SampleOutcome};
