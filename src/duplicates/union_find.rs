use std::collections::HashMap;

/// Disjoint-set forest over record IDs, with path compression and union by rank.
#[derive(Debug, Default)]
pub struct RecordUnionFind {
    slots: HashMap<i64, usize>,
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl RecordUnionFind {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a record ID as its own singleton set; no-op if already known.
    pub fn insert(&mut self, record_id: i64) -> usize {
        if let Some(&slot) = self.slots.get(&record_id) {
            return slot;
        }
        let slot = self.parent.len();
        self.slots.insert(record_id, slot);
        self.parent.push(slot);
        self.rank.push(0);
        slot
    }

    /// Representative slot of the set containing `record_id`, if the ID is known.
    pub fn find(&mut self, record_id: i64) -> Option<usize> {
        let slot = *self.slots.get(&record_id)?;
        Some(self.find_slot(slot))
    }

    pub fn union(&mut self, a: i64, b: i64) {
        let root_a = {
            let slot = self.insert(a);
            self.find_slot(slot)
        };
        let root_b = {
            let slot = self.insert(b);
            self.find_slot(slot)
        };
        if root_a == root_b {
            return;
        }
        match self.rank[root_a].cmp(&self.rank[root_b]) {
            std::cmp::Ordering::Less => self.parent[root_a] = root_b,
            std::cmp::Ordering::Greater => self.parent[root_b] = root_a,
            std::cmp::Ordering::Equal => {
                self.parent[root_b] = root_a;
                self.rank[root_a] = self.rank[root_a].saturating_add(1);
            }
        }
    }

    #[cfg(test)]
    pub fn connected(&mut self, a: i64, b: i64) -> bool {
        match (self.find(a), self.find(b)) {
            (Some(root_a), Some(root_b)) => root_a == root_b,
            _ => false,
        }
    }

    fn find_slot(&mut self, slot: usize) -> usize {
        let mut root = slot;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        // Path compression
        let mut current = slot;
        while self.parent[current] != root {
            let next = self.parent[current];
            self.parent[current] = root;
            current = next;
        }
        root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_collapses() {
        let mut sets = RecordUnionFind::new();
        sets.union(1, 2);
        sets.union(2, 3);
        sets.insert(4);

        assert!(sets.connected(1, 3));
        assert!(!sets.connected(1, 4));
        assert_eq!(sets.find(99), None);
    }

    #[test]
    fn test_union_is_idempotent() {
        let mut sets = RecordUnionFind::new();
        sets.union(10, 20);
        sets.union(20, 10);
        sets.union(10, 10);
        assert!(sets.connected(10, 20));
        assert_eq!(sets.find(10), sets.find(20));
    }
}
