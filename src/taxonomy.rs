use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

use crate::util::normalize_name;
use crate::TARGET_CLASSIFIER;

/// Leaf names shorter than this are never substring-matched.
const MIN_SUBSTRING_LEAF_CHARS: usize = 3;

/// A node of the classification tree. Nodes without children are leaves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyNode {
    pub code: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TaxonomyNode>,
}

impl TaxonomyNode {
    pub fn leaf(code: &str, name: &str) -> Self {
        TaxonomyNode {
            code: code.to_string(),
            name: name.to_string(),
            children: Vec::new(),
        }
    }

    pub fn branch(code: &str, name: &str, children: Vec<TaxonomyNode>) -> Self {
        TaxonomyNode {
            code: code.to_string(),
            name: name.to_string(),
            children,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

#[derive(Debug, Clone)]
struct LeafIndexEntry {
    code: String,
    name: String,
    normalized: String,
    // Codes of every ancestor, root first
    ancestors: Vec<String>,
}

/// How a leaf was found without asking a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalMatchKind {
    Exact,
    Substring,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalMatch {
    pub code: String,
    pub name: String,
    pub kind: LocalMatchKind,
}

/// Read-only classification tree with a flattened leaf index for local lookups.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    roots: Vec<TaxonomyNode>,
    leaves: Vec<LeafIndexEntry>,
}

impl Taxonomy {
    /// Validates and indexes a tree. Codes must be unique and non-empty.
    pub fn new(roots: Vec<TaxonomyNode>) -> Result<Self> {
        if roots.is_empty() {
            bail!("taxonomy has no root categories");
        }

        let mut codes = HashSet::new();
        let mut leaves = Vec::new();
        let mut stack: Vec<(&TaxonomyNode, Vec<String>)> =
            roots.iter().rev().map(|node| (node, Vec::new())).collect();

        while let Some((node, ancestors)) = stack.pop() {
            if node.code.trim().is_empty() {
                bail!("taxonomy node '{}' has an empty code", node.name);
            }
            if !codes.insert(node.code.clone()) {
                bail!("duplicate taxonomy code '{}'", node.code);
            }

            if node.is_leaf() {
                leaves.push(LeafIndexEntry {
                    code: node.code.clone(),
                    name: node.name.clone(),
                    normalized: normalize_name(&node.name),
                    ancestors,
                });
            } else {
                let mut path = ancestors;
                path.push(node.code.clone());
                for child in node.children.iter().rev() {
                    stack.push((child, path.clone()));
                }
            }
        }

        info!(
            target: TARGET_CLASSIFIER,
            "Loaded taxonomy: {} root categories, {} nodes, {} leaves",
            roots.len(),
            codes.len(),
            leaves.len()
        );

        Ok(Taxonomy { roots, leaves })
    }

    /// Loads a JSON array of root nodes from disk.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read taxonomy file {}", path.display()))?;
        let roots: Vec<TaxonomyNode> = serde_json::from_str(&raw)
            .with_context(|| format!("invalid taxonomy JSON in {}", path.display()))?;
        Self::new(roots)
    }

    pub fn roots(&self) -> &[TaxonomyNode] {
        &self.roots
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    #[cfg(test)]
    pub fn find(&self, code: &str) -> Option<&TaxonomyNode> {
        let mut stack: Vec<&TaxonomyNode> = self.roots.iter().collect();
        while let Some(node) = stack.pop() {
            if node.code == code {
                return Some(node);
            }
            stack.extend(node.children.iter());
        }
        None
    }

    /// Branch node named by a category hint, matched by code or by normalized name.
    pub fn find_branch(&self, hint: &str) -> Option<&TaxonomyNode> {
        let hint = hint.trim();
        if hint.is_empty() {
            return None;
        }
        let normalized_hint = normalize_name(hint);
        let mut stack: Vec<&TaxonomyNode> = self.roots.iter().rev().collect();
        while let Some(node) = stack.pop() {
            if !node.is_leaf()
                && (node.code == hint || normalize_name(&node.name) == normalized_hint)
            {
                return Some(node);
            }
            stack.extend(node.children.iter().rev());
        }
        None
    }

    /// Resolves an item to a leaf without a model: exact name match first, then
    /// the longest leaf name contained in the item name. `within` restricts the
    /// search to the subtree of that branch code.
    pub fn resolve_local(&self, item_name: &str, within: Option<&str>) -> Option<LocalMatch> {
        let normalized = normalize_name(item_name);
        if normalized.is_empty() {
            return None;
        }

        let candidates = self.leaves.iter().filter(|leaf| match within {
            Some(branch) => leaf.ancestors.iter().any(|code| code == branch),
            None => true,
        });

        let mut best_substring: Option<&LeafIndexEntry> = None;
        for leaf in candidates {
            if leaf.normalized == normalized {
                return Some(LocalMatch {
                    code: leaf.code.clone(),
                    name: leaf.name.clone(),
                    kind: LocalMatchKind::Exact,
                });
            }
            if leaf.normalized.chars().count() >= MIN_SUBSTRING_LEAF_CHARS
                && contains_phrase(&normalized, &leaf.normalized)
                && best_substring
                    .map_or(true, |best| leaf.normalized.len() > best.normalized.len())
            {
                best_substring = Some(leaf);
            }
        }

        best_substring.map(|leaf| LocalMatch {
            code: leaf.code.clone(),
            name: leaf.name.clone(),
            kind: LocalMatchKind::Substring,
        })
    }
}

// Phrase match on word boundaries of already-normalized text.
fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    format!(" {} ", haystack).contains(&format!(" {} ", phrase))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_taxonomy() -> Taxonomy {
        Taxonomy::new(vec![
            TaxonomyNode::branch(
                "01",
                "Fasteners",
                vec![
                    TaxonomyNode::leaf("01.01", "Bolts"),
                    TaxonomyNode::leaf("01.02", "Nuts"),
                    TaxonomyNode::leaf("01.03", "Anchor bolts"),
                ],
            ),
            TaxonomyNode::branch(
                "02",
                "Electrical",
                vec![TaxonomyNode::branch(
                    "02.01",
                    "Cable",
                    vec![
                        TaxonomyNode::leaf("02.01.01", "Power cable"),
                        TaxonomyNode::leaf("02.01.02", "Data cable"),
                    ],
                )],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_indexes_all_leaves() {
        let taxonomy = sample_taxonomy();
        assert_eq!(taxonomy.leaf_count(), 5);
        assert_eq!(taxonomy.find("02.01.02").map(|n| n.name.as_str()), Some("Data cable"));
        assert!(taxonomy.find("99").is_none());
    }

    #[test]
    fn test_rejects_duplicate_and_empty_codes() {
        assert!(Taxonomy::new(vec![]).is_err());
        assert!(Taxonomy::new(vec![
            TaxonomyNode::leaf("01", "Bolts"),
            TaxonomyNode::leaf("01", "Nuts"),
        ])
        .is_err());
        assert!(Taxonomy::new(vec![TaxonomyNode::leaf(" ", "Bolts")]).is_err());
    }

    #[test]
    fn test_resolve_local_exact() {
        let taxonomy = sample_taxonomy();
        let found = taxonomy.resolve_local("  NUTS ", None).unwrap();
        assert_eq!(found.code, "01.02");
        assert_eq!(found.kind, LocalMatchKind::Exact);
    }

    #[test]
    fn test_resolve_local_prefers_longest_substring() {
        let taxonomy = sample_taxonomy();
        let found = taxonomy
            .resolve_local("Anchor bolts M10 zinc", None)
            .unwrap();
        assert_eq!(found.code, "01.03");
        assert_eq!(found.kind, LocalMatchKind::Substring);
    }

    #[test]
    fn test_resolve_local_respects_word_boundaries_and_subtree() {
        let taxonomy = sample_taxonomy();
        assert!(taxonomy.resolve_local("Boltsmith kit", None).is_none());
        assert!(taxonomy.resolve_local("Bolt M8x20", None).is_none());
        assert!(taxonomy
            .resolve_local("Power cable 3x2.5", Some("01"))
            .is_none());
        assert_eq!(
            taxonomy
                .resolve_local("Power cable 3x2.5", Some("02"))
                .map(|m| m.code),
            Some("02.01.01".to_string())
        );
    }

    #[test]
    fn test_find_branch_by_code_or_name() {
        let taxonomy = sample_taxonomy();
        assert_eq!(taxonomy.find_branch("02.01").map(|n| n.code.as_str()), Some("02.01"));
        assert_eq!(taxonomy.find_branch("fasteners").map(|n| n.code.as_str()), Some("01"));
        // leaves are not branches
        assert!(taxonomy.find_branch("Bolts").is_none());
        assert!(taxonomy.find_branch("").is_none());
    }

    #[tokio::test]
    async fn test_from_path_reports_missing_file() {
        let err = Taxonomy::from_path("/nonexistent/taxonomy.json")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to read taxonomy file"));
    }
}
