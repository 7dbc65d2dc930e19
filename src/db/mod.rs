mod benchmark;
pub mod core;
mod schema;

pub use self::benchmark::HistoryEntry;
pub use self::core::{Database, TableCounts, DEFAULT_DATABASE_PATH};
pub use sqlx::Row;
