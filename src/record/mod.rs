pub mod identity;
pub mod types;

pub use identity::{
    effective_quality_score, extract, IdentityBearing, IdentityFields, IdentityKey, KeyType,
    DEFAULT_QUALITY_SCORE,
};
pub use types::*;
