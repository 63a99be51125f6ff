//! Selection model and selection serialization.
//!
//! Every mutating operation returns `true` iff the selected set actually changed, so the caller
//! can publish the selection exactly once per change.

use crate::hierarchy::Hierarchy;
use crate::index::{Node, NodeIndex};
use crate::item::TreeItem;
use crate::keyboard::Modifiers;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Selection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Every selection operation is a no-op.
    None,
    /// At most one node is selected.
    #[default]
    Single,
    /// Any number of nodes may be selected.
    Multiple,
}

/// How the selection is serialized for the selection sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionOutput {
    /// Comma-joined external record keys.
    RecordIds,
    /// Comma-joined node ids.
    #[default]
    NodeIds,
    /// Comma-joined structure ids (structure-id linkage only; nodes without one are skipped).
    StructureIds,
}

/// Selected node set plus the range anchor.
#[derive(Debug, Clone, Default)]
pub struct SelectionModel {
    mode: SelectionMode,
    multi_select: bool,
    selected: HashSet<String>,
    anchor: Option<String>,
}

impl SelectionModel {
    /// Create an empty selection. `multi_select` enables modifier clicks and range selection in
    /// [`SelectionMode::Multiple`].
    pub fn new(mode: SelectionMode, multi_select: bool) -> Self {
        Self {
            mode,
            multi_select,
            selected: HashSet::new(),
            anchor: None,
        }
    }

    /// Selection policy.
    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    /// Returns `true` if range and modifier selection are enabled.
    pub fn multi_select(&self) -> bool {
        self.multi_select
    }

    /// Selected ids, unordered.
    pub fn selected(&self) -> &HashSet<String> {
        &self.selected
    }

    /// Returns `true` if `id` is selected.
    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    /// Number of selected nodes.
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    /// Returns `true` if nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// The node a shift-click range starts from.
    pub fn anchor(&self) -> Option<&str> {
        self.anchor.as_deref()
    }

    /// Selected ids in depth-first tree order.
    pub fn ordered(&self, index: &NodeIndex) -> Vec<String> {
        if self.selected.is_empty() {
            return Vec::new();
        }
        index
            .depth_first()
            .into_iter()
            .filter(|id| self.selected.contains(id))
            .collect()
    }

    /// Replace the selection with `id`.
    pub fn select_node(&mut self, index: &NodeIndex, id: &str) -> bool {
        if self.mode == SelectionMode::None || !index.contains(id) {
            return false;
        }
        self.anchor = Some(id.to_string());
        if self.selected.len() == 1 && self.selected.contains(id) {
            return false;
        }
        self.selected.clear();
        self.selected.insert(id.to_string());
        true
    }

    /// Toggle `id`. In single mode this replaces the selection, like [`SelectionModel::select_node`].
    pub fn toggle(&mut self, index: &NodeIndex, id: &str) -> bool {
        match self.mode {
            SelectionMode::None => false,
            SelectionMode::Single => self.select_node(index, id),
            SelectionMode::Multiple => {
                if !index.contains(id) {
                    return false;
                }
                self.anchor = Some(id.to_string());
                if !self.selected.remove(id) {
                    self.selected.insert(id.to_string());
                }
                true
            }
        }
    }

    /// Add every node between `from` and `to` (inclusive) in the full depth-first ordering.
    /// No-op unless multi-select is enabled, and when either endpoint is unknown.
    pub fn select_range(&mut self, index: &NodeIndex, from: &str, to: &str) -> bool {
        if self.mode != SelectionMode::Multiple || !self.multi_select {
            return false;
        }
        let ordering = index.depth_first();
        let (Some(a), Some(b)) = (
            ordering.iter().position(|id| id == from),
            ordering.iter().position(|id| id == to),
        ) else {
            return false;
        };
        let (start, end) = (a.min(b), a.max(b));
        self.add(ordering[start..=end].iter().cloned())
    }

    /// Select every node.
    pub fn select_all(&mut self, index: &NodeIndex) -> bool {
        if self.mode != SelectionMode::Multiple {
            return false;
        }
        self.add(index.depth_first())
    }

    /// Add `ids` to the selection (multiple mode only).
    pub fn add_all<I>(&mut self, ids: I) -> bool
    where
        I: IntoIterator<Item = String>,
    {
        if self.mode != SelectionMode::Multiple {
            return false;
        }
        self.add(ids)
    }

    fn add<I>(&mut self, ids: I) -> bool
    where
        I: IntoIterator<Item = String>,
    {
        let before = self.selected.len();
        self.selected.extend(ids);
        self.selected.len() != before
    }

    /// Replace the selection with every node matching `predicate` (multiple mode only).
    pub fn select_by_predicate<F>(&mut self, index: &NodeIndex, mut predicate: F) -> bool
    where
        F: FnMut(&Node) -> bool,
    {
        if self.mode != SelectionMode::Multiple {
            return false;
        }
        let matching: HashSet<String> = index
            .nodes()
            .filter(|n| predicate(n))
            .map(|n| n.id.clone())
            .collect();
        self.replace(matching)
    }

    /// Select exactly the nodes that are not selected (multiple mode only).
    pub fn invert(&mut self, index: &NodeIndex) -> bool {
        if self.mode != SelectionMode::Multiple {
            return false;
        }
        let inverted: HashSet<String> = index
            .nodes()
            .filter(|n| !self.selected.contains(&n.id))
            .map(|n| n.id.clone())
            .collect();
        self.replace(inverted)
    }

    fn replace(&mut self, next: HashSet<String>) -> bool {
        if next == self.selected {
            return false;
        }
        self.selected = next;
        true
    }

    /// Empty the selection.
    pub fn clear(&mut self) -> bool {
        self.anchor = None;
        if self.selected.is_empty() {
            return false;
        }
        self.selected.clear();
        true
    }

    /// Click policy: ctrl/cmd toggles, shift extends from the anchor, anything else replaces.
    /// Modifiers are ignored unless multi-select is enabled in multiple mode.
    pub fn handle_click(&mut self, index: &NodeIndex, id: &str, modifiers: Modifiers) -> bool {
        if self.mode != SelectionMode::Multiple || !self.multi_select {
            return self.select_node(index, id);
        }
        if !index.contains(id) {
            return false;
        }
        if modifiers.ctrl || modifiers.meta {
            return self.toggle(index, id);
        }
        if modifiers.shift
            && let Some(anchor) = self.anchor.clone()
        {
            return self.select_range(index, &anchor, id);
        }
        self.select_node(index, id)
    }

    /// Drop ids that are no longer in `index`. Returns `true` if any were removed.
    pub fn retain(&mut self, index: &NodeIndex) -> bool {
        if self.anchor.as_deref().is_some_and(|a| !index.contains(a)) {
            self.anchor = None;
        }
        let before = self.selected.len();
        self.selected.retain(|id| index.contains(id));
        self.selected.len() != before
    }

    /// Serialize the selection in depth-first tree order.
    pub fn serialize<R: TreeItem>(&self, hierarchy: &Hierarchy<R>, output: SelectionOutput) -> String {
        let ordered = self.ordered(hierarchy.index());
        let parts: Vec<String> = match output {
            SelectionOutput::NodeIds => ordered,
            SelectionOutput::RecordIds => ordered
                .iter()
                .filter_map(|id| hierarchy.record(id))
                .map(|r| r.record_key().into_owned())
                .filter(|key| !key.is_empty())
                .collect(),
            SelectionOutput::StructureIds => ordered
                .iter()
                .filter_map(|id| hierarchy.node(id))
                .filter_map(|n| n.structure_id.clone())
                .collect(),
        };
        parts.join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::hierarchy::LinkStrategy;
    use crate::item::Record;

    fn tree() -> Hierarchy<Record> {
        let items = vec![
            Record::new("1").with_key("r1").with_structure_id("1"),
            Record::new("2").with_key("r2").with_structure_id("1.1"),
            Record::new("3").with_key("r3").with_structure_id("1.2"),
            Record::new("4").with_key("r4").with_structure_id("2"),
        ];
        Hierarchy::build(items, LinkStrategy::StructureId, None, &mut Diagnostics::default())
    }

    #[test]
    fn test_none_mode_is_inert() {
        let tree = tree();
        let mut selection = SelectionModel::new(SelectionMode::None, true);
        assert!(!selection.select_node(tree.index(), "1"));
        assert!(!selection.toggle(tree.index(), "1"));
        assert!(!selection.select_all(tree.index()));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_single_mode_replaces() {
        let tree = tree();
        let mut selection = SelectionModel::new(SelectionMode::Single, false);
        assert!(selection.select_node(tree.index(), "1"));
        assert!(!selection.select_node(tree.index(), "1"));
        assert!(selection.toggle(tree.index(), "2"));
        assert_eq!(selection.ordered(tree.index()), vec!["2"]);
    }

    #[test]
    fn test_range_uses_full_depth_first_order() {
        let tree = tree();
        let mut selection = SelectionModel::new(SelectionMode::Multiple, true);
        assert!(selection.select_range(tree.index(), "4", "2"));
        assert_eq!(selection.ordered(tree.index()), vec!["2", "3", "4"]);
        assert!(!selection.select_range(tree.index(), "4", "missing"));
    }

    #[test]
    fn test_click_modifiers() {
        let tree = tree();
        let mut selection = SelectionModel::new(SelectionMode::Multiple, true);
        selection.handle_click(tree.index(), "2", Modifiers::default());
        selection.handle_click(
            tree.index(),
            "4",
            Modifiers {
                shift: true,
                ..Modifiers::default()
            },
        );
        assert_eq!(selection.ordered(tree.index()), vec!["2", "3", "4"]);

        selection.handle_click(
            tree.index(),
            "3",
            Modifiers {
                ctrl: true,
                ..Modifiers::default()
            },
        );
        assert_eq!(selection.ordered(tree.index()), vec!["2", "4"]);
    }

    #[test]
    fn test_serialize_outputs() {
        let tree = tree();
        let mut selection = SelectionModel::new(SelectionMode::Multiple, true);
        selection.add_all(vec!["3".to_string(), "1".to_string()]);

        assert_eq!(selection.serialize(&tree, SelectionOutput::NodeIds), "1,3");
        assert_eq!(selection.serialize(&tree, SelectionOutput::RecordIds), "r1,r3");
        assert_eq!(selection.serialize(&tree, SelectionOutput::StructureIds), "1,1.2");
    }

    #[test]
    fn test_invert_and_clear() {
        let tree = tree();
        let mut selection = SelectionModel::new(SelectionMode::Multiple, false);
        selection.toggle(tree.index(), "1");
        assert!(selection.invert(tree.index()));
        assert_eq!(selection.ordered(tree.index()), vec!["2", "3", "4"]);
        assert!(selection.clear());
        assert!(!selection.clear());
    }
}
