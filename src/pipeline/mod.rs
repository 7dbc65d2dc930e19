pub mod tracker;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::info;

use crate::classifier::{ClassificationResult, HierarchicalClassifier};
use crate::duplicates::{analyze, summarize, DuplicateGroup, DuplicateSummary};
use crate::record::{extract, Record};
use crate::TARGET_PIPELINE;

pub use tracker::{PipelineStageTracker, StageSnapshot};

pub const DEFAULT_CLASSIFICATION_CONCURRENCY: usize = 4;

/// An input record with its duplicate-group membership and classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedRecord {
    pub record: Record,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_key: Option<String>,
    // Ungrouped records are their own master
    pub is_master: bool,
    pub classification: ClassificationResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutput {
    pub records: Vec<NormalizedRecord>,
    pub groups: Vec<DuplicateGroup>,
    pub summary: DuplicateSummary,
    pub stages: StageSnapshot,
}

/// Deduplicates `records`, classifies one representative per duplicate group
/// (the master) and every ungrouped record, and attaches each result to all
/// members. At most `concurrency` classifications run at once.
///
/// Records are returned in input order; a repeated ID is kept once.
pub async fn run_pipeline(
    records: &[Record],
    classifier: &HierarchicalClassifier,
    tracker: &PipelineStageTracker,
    concurrency: usize,
) -> PipelineOutput {
    let mut seen = HashSet::new();
    let unique: Vec<&Record> = records.iter().filter(|r| seen.insert(r.id)).collect();
    for record in &unique {
        tracker.record_seen(extract(*record).has_any());
    }

    let groups = analyze(records);
    let summary = summarize(&groups);
    tracker.groups_found(
        groups.len(),
        groups.iter().map(|group| group.items.len()).sum(),
    );

    let mut unit_of: HashMap<i64, usize> = HashMap::new();
    let mut group_of: HashMap<i64, usize> = HashMap::new();
    let mut representatives: Vec<&Record> = Vec::new();
    for (group_index, group) in groups.iter().enumerate() {
        let unit = representatives.len();
        representatives.push(&group.master_item);
        for item in &group.items {
            unit_of.insert(item.id, unit);
            group_of.insert(item.id, group_index);
        }
    }
    for record in &unique {
        if !unit_of.contains_key(&record.id) {
            unit_of.insert(record.id, representatives.len());
            representatives.push(*record);
        }
    }

    info!(target: TARGET_PIPELINE, "Classifying {} items for {} records ({} duplicate groups)", representatives.len(), unique.len(), groups.len());

    let classified: Vec<(usize, ClassificationResult)> =
        stream::iter(representatives.iter().enumerate().map(|(unit, record)| async move {
            let hint = record.category_hint().unwrap_or("");
            let result = classifier.classify(&record.name, hint).await;
            tracker.classified(result.path_source);
            (unit, result)
        }))
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut results: Vec<Option<ClassificationResult>> = vec![None; representatives.len()];
    for (unit, result) in classified {
        results[unit] = Some(result);
    }

    let normalized: Vec<NormalizedRecord> = unique
        .iter()
        .filter_map(|record| {
            let unit = *unit_of.get(&record.id)?;
            let classification = results.get(unit)?.clone()?;
            let group = group_of.get(&record.id).map(|&index| &groups[index]);
            Some(NormalizedRecord {
                record: (*record).clone(),
                group_key: group.map(|g| g.key.clone()),
                is_master: group.map_or(true, |g| g.master_item.id == record.id),
                classification,
            })
        })
        .collect();

    let stages = tracker.snapshot();
    info!(target: TARGET_PIPELINE, "Pipeline done: {} classified ({} local, {} ai, {} fallback)", stages.classified_total(), stages.classified_local, stages.classified_ai, stages.classified_fallback);

    PipelineOutput {
        records: normalized,
        groups,
        summary,
        stages,
    }
}
