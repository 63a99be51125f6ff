//! Visible-Set Flattener
//!
//! Produces the linear sequence of displayed node ids: a depth-first walk from the roots that
//! does not descend into collapsed nodes. Two optional filters narrow the walk further:
//!
//! - **hidden nodes**: a node whose shown flag is off is skipped together with its subtree
//! - **search results**: only matches and the ancestors of matches are kept
//!
//! The sequence is recomputed from scratch on every call; callers cache it per state version.

use crate::index::NodeIndex;
use std::collections::HashSet;

/// One displayed node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatNode {
    /// Node id.
    pub id: String,
    /// Depth, 0 for roots.
    pub level: usize,
}

/// Optional pruning applied on top of expansion state.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlattenFilter<'a> {
    /// When set, only ids in this shown set (and their shown descendants) are kept.
    pub shown: Option<&'a HashSet<String>>,
    /// When set, only these matches and their ancestors are kept.
    pub matches: Option<&'a HashSet<String>>,
}

/// Depth-first, expansion-pruned ordering of every displayed node id.
pub fn visible_ordering(index: &NodeIndex, expanded: &HashSet<String>) -> Vec<String> {
    flatten(index, expanded, FlattenFilter::default())
        .into_iter()
        .map(|n| n.id)
        .collect()
}

/// Flatten the forest under `expanded`, applying `filter`.
pub fn flatten(index: &NodeIndex, expanded: &HashSet<String>, filter: FlattenFilter<'_>) -> Vec<FlatNode> {
    let keep = filter.matches.map(|matches| with_ancestors(index, matches));

    let mut out = Vec::new();
    let mut stack: Vec<&str> = index.roots().iter().rev().map(String::as_str).collect();
    while let Some(id) = stack.pop() {
        let Some(node) = index.get(id) else {
            continue;
        };
        if filter.shown.is_some_and(|shown| !shown.contains(id)) {
            continue;
        }
        if keep.as_ref().is_some_and(|keep| !keep.contains(id)) {
            continue;
        }
        out.push(FlatNode {
            id: node.id.clone(),
            level: node.level,
        });
        if expanded.contains(id) {
            stack.extend(node.children.iter().rev().map(String::as_str));
        }
    }
    out
}

fn with_ancestors(index: &NodeIndex, matches: &HashSet<String>) -> HashSet<String> {
    let mut keep: HashSet<String> = HashSet::with_capacity(matches.len() * 2);
    for id in matches {
        if !index.contains(id) || !keep.insert(id.clone()) {
            continue;
        }
        for ancestor in index.ancestors(id) {
            if !keep.insert(ancestor) {
                break;
            }
        }
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::hierarchy::{Hierarchy, LinkStrategy};
    use crate::item::Record;

    fn index() -> NodeIndex {
        let items = vec![
            Record::new("a"),
            Record::new("a1").with_parent("a"),
            Record::new("a1x").with_parent("a1"),
            Record::new("a2").with_parent("a"),
            Record::new("b"),
        ];
        Hierarchy::build(
            items,
            LinkStrategy::ParentAttribute,
            None,
            &mut Diagnostics::default(),
        )
        .index()
        .clone()
    }

    fn set(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_collapsed_nodes_prune_their_subtree() {
        let index = index();
        assert_eq!(visible_ordering(&index, &set(&[])), vec!["a", "b"]);
        assert_eq!(visible_ordering(&index, &set(&["a"])), vec!["a", "a1", "a2", "b"]);
        assert_eq!(
            visible_ordering(&index, &set(&["a", "a1"])),
            vec!["a", "a1", "a1x", "a2", "b"]
        );
        // Expanded but unreachable through a collapsed ancestor.
        assert_eq!(visible_ordering(&index, &set(&["a1"])), vec!["a", "b"]);
    }

    #[test]
    fn test_hidden_filter_drops_subtree() {
        let index = index();
        let shown = set(&["a", "a1x", "a2", "b"]);
        let flat = flatten(
            &index,
            &set(&["a", "a1"]),
            FlattenFilter {
                shown: Some(&shown),
                matches: None,
            },
        );
        let ids: Vec<&str> = flat.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "a2", "b"]);
    }

    #[test]
    fn test_search_filter_keeps_ancestors() {
        let index = index();
        let matches = set(&["a1x"]);
        let flat = flatten(
            &index,
            &set(&["a", "a1"]),
            FlattenFilter {
                shown: None,
                matches: Some(&matches),
            },
        );
        let ids: Vec<(&str, usize)> = flat.iter().map(|n| (n.id.as_str(), n.level)).collect();
        assert_eq!(ids, vec![("a", 0), ("a1", 1), ("a1x", 2)]);
    }
}
