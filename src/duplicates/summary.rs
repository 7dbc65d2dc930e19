use std::collections::HashSet;

use super::types::{DuplicateGroup, DuplicateSummary};

/// Label for groups whose combined key type names more than one scheme.
pub const MIXED_KEY_TYPE: &str = "mixed";

/// Counts groups by their final combined key type.
///
/// A group merged from an `inn_kpp` bucket and an `ogrn` bucket is counted once,
/// under `mixed`, never once per original key type.
pub fn summarize(groups: &[DuplicateGroup]) -> DuplicateSummary {
    let mut summary = DuplicateSummary {
        total_groups: groups.len(),
        ..DuplicateSummary::default()
    };
    let mut seen_records: HashSet<i64> = HashSet::new();

    for group in groups {
        let key_types = group.key_types();
        let label = match key_types.as_slice() {
            [single] => single.as_str(),
            _ => MIXED_KEY_TYPE,
        };
        *summary.by_key_type.entry(label.to_string()).or_insert(0) += 1;

        summary.merged_records += group.merged_count();
        for record in &group.items {
            seen_records.insert(record.id);
        }
    }

    summary.total_records = seen_records.len();
    summary
}
