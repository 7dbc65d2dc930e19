use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use super::scoring::select_master;
use super::types::{DuplicateGroup, EXACT_MATCH_CONFIDENCE, LABEL_SEPARATOR};
use super::union_find::RecordUnionFind;
use crate::record::{extract, IdentityFields, IdentityKey, Record};
use crate::TARGET_DUPLICATES;

/// Records sharing one identity key, before cluster merging.
struct KeyBucket {
    key: IdentityKey,
    members: Vec<usize>,
}

/// Buckets records by key in first-appearance order.
fn bucket_by<F>(identities: &[(usize, IdentityFields)], key_of: F) -> Vec<KeyBucket>
where
    F: Fn(&IdentityFields) -> Option<IdentityKey>,
{
    let mut positions: HashMap<IdentityKey, usize> = HashMap::new();
    let mut buckets: Vec<KeyBucket> = Vec::new();

    for (index, fields) in identities {
        let Some(key) = key_of(fields) else {
            continue;
        };
        match positions.get(&key) {
            Some(&position) => buckets[position].members.push(*index),
            None => {
                positions.insert(key.clone(), buckets.len());
                buckets.push(KeyBucket {
                    key,
                    members: vec![*index],
                });
            }
        }
    }

    buckets
}

/// Merged cluster under construction.
#[derive(Default)]
struct ClusterAccumulator {
    keys: Vec<String>,
    key_types: Vec<String>,
    members: Vec<usize>,
}

impl ClusterAccumulator {
    fn absorb(&mut self, bucket: &KeyBucket) {
        push_unique(&mut self.keys, bucket.key.label());
        push_unique(&mut self.key_types, bucket.key.key_type().as_str().to_string());
        self.members.extend(bucket.members.iter().copied());
    }
}

fn push_unique(labels: &mut Vec<String>, label: String) {
    if !labels.contains(&label) {
        labels.push(label);
    }
}

/// Groups records into duplicate clusters by identity key.
///
/// Tax keys and business IDs are bucketed independently; buckets with two or
/// more records are then merged through a union-find over record IDs, so
/// chains of partial overlaps always collapse into one group. Each group gets
/// the best-scoring record as its master.
///
/// Records repeating an already seen ID are ignored. Groups come out ordered
/// by their earliest member in the input, members in input order.
pub fn analyze(records: &[Record]) -> Vec<DuplicateGroup> {
    // First occurrence wins for repeated IDs
    let mut seen_ids: HashMap<i64, usize> = HashMap::new();
    let mut identities: Vec<(usize, IdentityFields)> = Vec::new();
    for (index, record) in records.iter().enumerate() {
        if seen_ids.contains_key(&record.id) {
            debug!(target: TARGET_DUPLICATES, "Skipping repeated record id {}", record.id);
            continue;
        }
        seen_ids.insert(record.id, index);
        identities.push((index, extract(record)));
    }

    let mut buckets = bucket_by(&identities, IdentityFields::tax_key);
    buckets.extend(bucket_by(&identities, IdentityFields::business_key));
    buckets.retain(|bucket| bucket.members.len() >= 2);

    debug!(
        target: TARGET_DUPLICATES,
        "Found {} candidate groups among {} records",
        buckets.len(),
        identities.len()
    );

    let mut sets = RecordUnionFind::new();
    for bucket in &buckets {
        let first_id = records[bucket.members[0]].id;
        sets.insert(first_id);
        for &member in &bucket.members[1..] {
            sets.union(first_id, records[member].id);
        }
    }

    let mut clusters: BTreeMap<usize, ClusterAccumulator> = BTreeMap::new();
    for bucket in &buckets {
        if let Some(root) = sets.find(records[bucket.members[0]].id) {
            clusters.entry(root).or_default().absorb(bucket);
        }
    }

    let mut groups: Vec<DuplicateGroup> = clusters
        .into_values()
        .filter_map(|mut cluster| {
            cluster.members.sort_unstable();
            cluster.members.dedup();
            build_group(records, cluster)
        })
        .collect();

    // Earliest member in the input decides group order
    groups.sort_by_key(|group| {
        group
            .items
            .first()
            .and_then(|first| seen_ids.get(&first.id).copied())
            .unwrap_or(usize::MAX)
    });

    info!(
        target: TARGET_DUPLICATES,
        "Duplicate analysis: {} records, {} groups, {} records grouped",
        records.len(),
        groups.len(),
        groups.iter().map(|group| group.items.len()).sum::<usize>()
    );

    groups
}

fn build_group(records: &[Record], cluster: ClusterAccumulator) -> Option<DuplicateGroup> {
    let members: Vec<&Record> = cluster.members.iter().map(|&index| &records[index]).collect();
    if members.len() < 2 {
        return None;
    }
    let master_index = select_master(&members)?;

    let group = DuplicateGroup {
        key: cluster.keys.join(LABEL_SEPARATOR),
        key_type: cluster.key_types.join(LABEL_SEPARATOR),
        items: members.iter().map(|&record| record.clone()).collect(),
        master_item: members[master_index].clone(),
        confidence: EXACT_MATCH_CONFIDENCE,
    };

    debug!(
        target: TARGET_DUPLICATES,
        "Group {} ({}): {} records, master {} '{}'",
        group.key,
        group.key_type,
        group.items.len(),
        group.master_item.id,
        group.master_item.name
    );

    Some(group)
}
