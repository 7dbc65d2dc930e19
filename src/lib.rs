pub mod benchmark;
pub mod classifier;
pub mod db;
pub mod duplicates;
pub mod environment;
pub mod llm;
pub mod logging;
pub mod pipeline;
pub mod record;
pub mod taxonomy;
#[cfg(test)]
pub(crate) mod testing;
pub mod util;

pub use llm::{ClassificationBackend, CompletionRequest, LLMClient};

pub const TARGET_LLM_REQUEST: &str = "llm_request";
pub const TARGET_DB: &str = "db_query";
pub const TARGET_DUPLICATES: &str = "duplicates";
pub const TARGET_CLASSIFIER: &str = "classifier";
pub const TARGET_BENCHMARK: &str = "benchmark";
pub const TARGET_PIPELINE: &str = "pipeline";
