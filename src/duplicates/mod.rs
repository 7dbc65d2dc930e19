pub mod analyzer;
pub mod scoring;
pub mod summary;
pub mod types;
pub mod union_find;

pub use analyzer::analyze;
pub use scoring::{calculate_master_score, has_legal_form};
pub use summary::{summarize, MIXED_KEY_TYPE};
pub use types::*;
