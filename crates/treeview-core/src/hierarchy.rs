//! Hierarchy Builder
//!
//! Turns a flat, ordered list of records into a forest under one of three linkage strategies:
//!
//! - **Parent attribute**: each record names its parent's node id.
//! - **Association**: each record references its parent *record*; references are resolved
//!   through a record-key → node-id lookup.
//! - **Structure id**: each record carries a dotted path (`"1.2.3"`); records are ordered by that
//!   string so ancestors are always consumed before their descendants.
//!
//! Structural problems never fail a build. Records without an id (or with a duplicate id) are
//! dropped, unresolvable parents turn the node into a root, and parent cycles are broken by
//! re-rooting the first node of the cycle. Every such repair is reported to [`Diagnostics`].
//!
//! # Example
//!
//! ```rust
//! use treeview_core::{Diagnostics, Hierarchy, LinkStrategy, Record};
//!
//! let items = vec![
//!     Record::new("1"),
//!     Record::new("2").with_parent("1"),
//!     Record::new("3").with_parent("1"),
//! ];
//! let mut diagnostics = Diagnostics::default();
//! let tree = Hierarchy::build(items, LinkStrategy::ParentAttribute, None, &mut diagnostics);
//!
//! assert_eq!(tree.index().roots(), ["1"]);
//! assert_eq!(tree.node("3").unwrap().level, 1);
//! ```

use crate::diagnostics::{DiagnosticEvent, Diagnostics, DropReason};
use crate::index::{Node, NodeIndex};
use crate::item::{FieldValue, TreeItem};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Rule used to derive parent/child edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStrategy {
    /// Parent node id stored on each record.
    #[default]
    ParentAttribute,
    /// Parent record referenced through an association.
    Association,
    /// Dotted structure ids.
    StructureId,
}

/// Sibling sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Ascending, missing values last.
    #[default]
    Ascending,
    /// Descending, missing values first.
    Descending,
}

/// Sort every sibling list by a record field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    /// Field passed to [`TreeItem::field`].
    pub field: String,
    /// Direction, applied uniformly at every level.
    #[serde(default)]
    pub order: SortOrder,
}

impl SortSpec {
    /// Sort by `field` in `order`.
    pub fn new(field: impl Into<String>, order: SortOrder) -> Self {
        Self {
            field: field.into(),
            order,
        }
    }
}

/// A built forest: the records it was built from plus the node index.
#[derive(Debug, Clone)]
pub struct Hierarchy<R> {
    items: Vec<R>,
    index: NodeIndex,
}

impl<R> Default for Hierarchy<R> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: NodeIndex::default(),
        }
    }
}

impl<R: TreeItem> Hierarchy<R> {
    /// Build a forest from `items`.
    pub fn build(
        items: Vec<R>,
        strategy: LinkStrategy,
        sort: Option<&SortSpec>,
        diagnostics: &mut Diagnostics,
    ) -> Self {
        let mut builder = Builder::default();
        match strategy {
            LinkStrategy::ParentAttribute => builder.link_by_parent_id(&items, diagnostics),
            LinkStrategy::Association => builder.link_by_association(&items, diagnostics),
            LinkStrategy::StructureId => builder.link_by_structure_id(&items, diagnostics),
        }
        builder.break_cycles(diagnostics);
        if let Some(sort) = sort {
            builder.sort_siblings(&items, sort);
        }
        let index = builder.finish();
        tracing::debug!(
            items = items.len(),
            nodes = index.len(),
            roots = index.roots().len(),
            ?strategy,
            "built hierarchy"
        );
        Self { items, index }
    }

    /// Record behind `id`.
    pub fn record(&self, id: &str) -> Option<&R> {
        self.index.get(id).and_then(|n| self.items.get(n.record))
    }

    /// Named field of the record behind `id`.
    pub fn field(&self, id: &str, name: &str) -> Option<FieldValue> {
        self.record(id).and_then(|r| r.field(name))
    }

    /// Persisted expanded flag of the record behind `id`.
    pub(crate) fn expanded_flag(&self, id: &str) -> bool {
        self.record(id).and_then(|r| r.expanded_flag()) == Some(true)
    }

    /// Persisted shown flag of the record behind `id` (absent means shown).
    pub(crate) fn visible_flag(&self, id: &str) -> bool {
        self.record(id).and_then(|r| r.visible_flag()) != Some(false)
    }
}

impl<R> Hierarchy<R> {
    /// All records, including dropped ones, in input order.
    pub fn items(&self) -> &[R] {
        &self.items
    }

    /// Consume the hierarchy, returning its records.
    pub fn into_items(self) -> Vec<R> {
        self.items
    }

    /// The node index.
    pub fn index(&self) -> &NodeIndex {
        &self.index
    }

    /// Look up a node.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index.get(id)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` if the forest is empty.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[derive(Default)]
struct Builder {
    nodes: HashMap<String, Node>,
    /// Node ids in creation order.
    order: Vec<String>,
    roots: Vec<String>,
}

impl Builder {
    fn insert(&mut self, id: &str, record: usize) -> bool {
        if self.nodes.contains_key(id) {
            return false;
        }
        self.nodes.insert(id.to_string(), Node::new(id.to_string(), record));
        self.order.push(id.to_string());
        true
    }

    fn attach(&mut self, child: &str, parent: &str) {
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.children.push(child.to_string());
            parent_node.is_leaf = false;
        }
        if let Some(child_node) = self.nodes.get_mut(child) {
            child_node.parent_id = Some(parent.to_string());
        }
    }

    fn promote(&mut self, id: &str) {
        self.roots.push(id.to_string());
    }

    fn promote_orphan(&mut self, id: &str, missing_parent: &str, diagnostics: &mut Diagnostics) {
        diagnostics.record(DiagnosticEvent::OrphanPromoted {
            node_id: id.to_string(),
            missing_parent: missing_parent.to_string(),
        });
        self.promote(id);
    }

    /// First pass shared by the two-pass strategies. Returns `(node_id, record)` for every
    /// accepted record, in input order.
    fn create_nodes<R: TreeItem>(
        &mut self,
        items: &[R],
        diagnostics: &mut Diagnostics,
    ) -> Vec<(String, usize)> {
        let mut accepted = Vec::with_capacity(items.len());
        for (record, item) in items.iter().enumerate() {
            let Some(id) = item.node_id().filter(|id| !id.is_empty()) else {
                drop_item(item, DropReason::MissingId, diagnostics);
                continue;
            };
            if !self.insert(&id, record) {
                drop_item(item, DropReason::DuplicateId, diagnostics);
                continue;
            }
            accepted.push((id.into_owned(), record));
        }
        accepted
    }

    fn link_by_parent_id<R: TreeItem>(&mut self, items: &[R], diagnostics: &mut Diagnostics) {
        let accepted = self.create_nodes(items, diagnostics);
        for (id, record) in accepted {
            let parent = items[record]
                .parent_id()
                .filter(|p| !p.is_empty())
                .map(|p| p.into_owned());
            match parent {
                Some(parent) if parent != id && self.nodes.contains_key(&parent) => {
                    self.attach(&id, &parent);
                }
                Some(parent) => self.promote_orphan(&id, &parent, diagnostics),
                None => self.promote(&id),
            }
        }
    }

    fn link_by_association<R: TreeItem>(&mut self, items: &[R], diagnostics: &mut Diagnostics) {
        let accepted = self.create_nodes(items, diagnostics);
        let mut key_to_id: HashMap<String, String> = HashMap::with_capacity(accepted.len());
        for (id, record) in &accepted {
            key_to_id
                .entry(items[*record].record_key().into_owned())
                .or_insert_with(|| id.clone());
        }

        for (id, record) in accepted {
            let link = items[record].parent_link();
            let Some(parent_key) = link.first() else {
                self.promote(&id);
                continue;
            };
            match key_to_id.get(parent_key) {
                Some(parent) if *parent != id => {
                    let parent = parent.clone();
                    self.attach(&id, &parent);
                }
                _ => self.promote_orphan(&id, parent_key, diagnostics),
            }
        }
    }

    fn link_by_structure_id<R: TreeItem>(&mut self, items: &[R], diagnostics: &mut Diagnostics) {
        let mut keyed: Vec<(String, usize)> = Vec::with_capacity(items.len());
        for (record, item) in items.iter().enumerate() {
            match item.structure_id().filter(|s| !s.is_empty()) {
                Some(structure_id) => keyed.push((structure_id.into_owned(), record)),
                None => drop_item(item, DropReason::MissingStructureId, diagnostics),
            }
        }
        // Ancestors sort before descendants, so one pass with an incremental lookup suffices.
        keyed.sort_by(|a, b| a.0.cmp(&b.0));

        let mut by_structure: HashMap<String, String> = HashMap::with_capacity(keyed.len());
        for (structure_id, record) in keyed {
            let item = &items[record];
            let Some(id) = item.node_id().filter(|id| !id.is_empty()) else {
                drop_item(item, DropReason::MissingId, diagnostics);
                continue;
            };
            let id = id.into_owned();
            if !self.insert(&id, record) {
                drop_item(item, DropReason::DuplicateId, diagnostics);
                continue;
            }
            if let Some(node) = self.nodes.get_mut(&id) {
                node.structure_id = Some(structure_id.clone());
            }

            match structure_id.rsplit_once('.') {
                Some((parent_structure, _)) => match by_structure.get(parent_structure) {
                    Some(parent) => {
                        let parent = parent.clone();
                        self.attach(&id, &parent);
                    }
                    None => self.promote_orphan(&id, parent_structure, diagnostics),
                },
                None => self.promote(&id),
            }
            by_structure.entry(structure_id).or_insert(id);
        }
    }

    /// Re-root nodes that are unreachable from the roots (members of parent cycles).
    fn break_cycles(&mut self, diagnostics: &mut Diagnostics) {
        let mut reachable: HashSet<String> = HashSet::with_capacity(self.nodes.len());
        let roots = self.roots.clone();
        for root in &roots {
            self.mark_reachable(root, &mut reachable);
        }
        if reachable.len() == self.nodes.len() {
            return;
        }

        let order = self.order.clone();
        for id in order {
            if reachable.contains(&id) {
                continue;
            }
            let parent = self.nodes.get_mut(&id).and_then(|n| n.parent_id.take());
            if let Some(parent) = parent
                && let Some(parent_node) = self.nodes.get_mut(&parent)
            {
                parent_node.children.retain(|c| *c != id);
                parent_node.is_leaf = parent_node.children.is_empty();
            }
            diagnostics.record(DiagnosticEvent::CycleBroken {
                node_id: id.clone(),
            });
            self.promote(&id);
            self.mark_reachable(&id, &mut reachable);
        }
    }

    fn mark_reachable(&self, start: &str, reachable: &mut HashSet<String>) {
        let mut stack = vec![start.to_string()];
        while let Some(id) = stack.pop() {
            if !reachable.insert(id.clone()) {
                continue;
            }
            if let Some(node) = self.nodes.get(&id) {
                stack.extend(node.children.iter().cloned());
            }
        }
    }

    fn sort_siblings<R: TreeItem>(&mut self, items: &[R], sort: &SortSpec) {
        let keys: HashMap<String, Option<FieldValue>> = self
            .nodes
            .values()
            .map(|n| (n.id.clone(), items[n.record].field(&sort.field)))
            .collect();
        let compare = |a: &String, b: &String| {
            compare_field(
                keys.get(a).and_then(Option::as_ref),
                keys.get(b).and_then(Option::as_ref),
                sort.order,
            )
        };

        self.roots.sort_by(compare);
        for node in self.nodes.values_mut() {
            node.children.sort_by(compare);
        }
    }

    /// Derive `level` and `path` top-down from the final shape.
    fn finish(mut self) -> NodeIndex {
        let mut stack: Vec<(String, usize, Vec<String>)> = self
            .roots
            .iter()
            .rev()
            .map(|r| (r.clone(), 0, Vec::new()))
            .collect();
        while let Some((id, level, path)) = stack.pop() {
            let Some(node) = self.nodes.get_mut(&id) else {
                continue;
            };
            node.level = level;
            node.is_leaf = node.children.is_empty();
            let mut child_path = path.clone();
            child_path.push(id.clone());
            node.path = path;
            for child in node.children.iter().rev() {
                stack.push((child.clone(), level + 1, child_path.clone()));
            }
        }
        NodeIndex::from_parts(self.nodes, self.roots)
    }
}

fn drop_item<R: TreeItem>(item: &R, reason: DropReason, diagnostics: &mut Diagnostics) {
    diagnostics.record(DiagnosticEvent::DroppedItem {
        record_key: item.record_key().into_owned(),
        reason,
    });
}

/// Sibling ordering: missing values last when ascending and first when descending, then a
/// type-aware comparison with a string fallback for mixed types.
pub fn compare_field(a: Option<&FieldValue>, b: Option<&FieldValue>, order: SortOrder) -> Ordering {
    let (a, b) = match (a, b) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => {
            return match order {
                SortOrder::Ascending => Ordering::Greater,
                SortOrder::Descending => Ordering::Less,
            };
        }
        (Some(_), None) => {
            return match order {
                SortOrder::Ascending => Ordering::Less,
                SortOrder::Descending => Ordering::Greater,
            };
        }
        (Some(a), Some(b)) => (a, b),
    };

    let ordering = match (a, b) {
        (FieldValue::Text(a), FieldValue::Text(b)) => compare_text(a, b),
        (FieldValue::Number(a), FieldValue::Number(b)) => a.total_cmp(b),
        (FieldValue::Date(a), FieldValue::Date(b)) => a.cmp(b),
        _ => compare_text(&a.as_text(), &b.as_text()),
    };

    match order {
        SortOrder::Ascending => ordering,
        SortOrder::Descending => ordering.reverse(),
    }
}

/// Case-insensitive first, then exact, so `"apple" < "Banana" < "banana"`.
fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Record;

    fn build(items: Vec<Record>, strategy: LinkStrategy) -> (Hierarchy<Record>, Diagnostics) {
        let mut diagnostics = Diagnostics::default();
        let tree = Hierarchy::build(items, strategy, None, &mut diagnostics);
        (tree, diagnostics)
    }

    #[test]
    fn test_child_before_parent_gets_consistent_levels() {
        let items = vec![
            Record::new("c").with_parent("b"),
            Record::new("b").with_parent("a"),
            Record::new("a"),
        ];
        let (tree, _) = build(items, LinkStrategy::ParentAttribute);

        assert_eq!(tree.index().roots(), ["a"]);
        assert_eq!(tree.node("b").unwrap().level, 1);
        assert_eq!(tree.node("c").unwrap().level, 2);
        assert_eq!(tree.node("c").unwrap().path, vec!["a", "b"]);
    }

    #[test]
    fn test_parent_cycle_is_broken() {
        let items = vec![
            Record::new("x").with_parent("y"),
            Record::new("y").with_parent("x"),
            Record::new("z"),
        ];
        let (tree, diagnostics) = build(items, LinkStrategy::ParentAttribute);

        assert_eq!(tree.len(), 3);
        assert_eq!(tree.index().roots(), ["z", "x"]);
        assert_eq!(tree.node("y").unwrap().parent_id.as_deref(), Some("x"));
        assert!(tree.node("x").unwrap().is_root());
        assert!(
            diagnostics
                .events()
                .any(|e| matches!(e, DiagnosticEvent::CycleBroken { node_id } if node_id == "x"))
        );
    }

    #[test]
    fn test_self_parent_is_root() {
        let (tree, diagnostics) = build(
            vec![Record::new("a").with_parent("a")],
            LinkStrategy::ParentAttribute,
        );
        assert_eq!(tree.index().roots(), ["a"]);
        assert!(tree.node("a").unwrap().is_leaf);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_text_compare_is_case_insensitive_first() {
        assert_eq!(compare_text("apple", "Banana"), Ordering::Less);
        assert_eq!(compare_text("Banana", "banana"), Ordering::Less);
        assert_eq!(compare_text("b", "b"), Ordering::Equal);
    }
}
