//! State Store
//!
//! Holds the per-instance mutable tree state: the expanded set, the shown ("visible") set, the
//! focus pointer, and the undo/redo log.
//!
//! Every operation is total: unknown node ids are ignored. Operations that change a persisted
//! flag return the [`FlagWrite`]s the caller must forward to the host's flag sink, one per node
//! whose in-memory flag actually changed, in application order.
//!
//! # Example
//!
//! ```rust
//! use treeview_core::{Diagnostics, ExpandMode, Hierarchy, LinkStrategy, Record, TreeState};
//!
//! let items = vec![
//!     Record::new("a"),
//!     Record::new("b").with_parent("a"),
//!     Record::new("c").with_parent("b"),
//! ];
//! let tree = Hierarchy::build(items, LinkStrategy::ParentAttribute, None, &mut Diagnostics::default());
//!
//! let mut state = TreeState::new(ExpandMode::Multiple, Some(100));
//! state.seed(&tree, 0);
//!
//! let writes = state.toggle_visibility(tree.index(), "a");
//! assert_eq!(writes.len(), 3);
//! assert!(!state.is_visible("c"));
//!
//! state.undo();
//! assert!(state.is_visible("c"));
//! ```

use crate::hierarchy::Hierarchy;
use crate::history::{TreeAction, UndoRedoManager};
use crate::index::NodeIndex;
use crate::item::TreeItem;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Expansion policy for sibling groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpandMode {
    /// Expanding a node collapses its expanded siblings.
    Single,
    /// Any number of nodes may be expanded.
    #[default]
    Multiple,
}

/// Which persisted flag a [`FlagWrite`] targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlagKind {
    /// The expanded flag.
    Expanded,
    /// The shown flag.
    Visible,
}

/// A pending write-back to the host's flag sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagWrite {
    /// Node whose record should be updated.
    pub node_id: String,
    /// Which flag.
    pub flag: FlagKind,
    /// New value.
    pub value: bool,
}

impl FlagWrite {
    fn expanded(node_id: &str, value: bool) -> Self {
        Self {
            node_id: node_id.to_string(),
            flag: FlagKind::Expanded,
            value,
        }
    }

    fn visible(node_id: &str, value: bool) -> Self {
        Self {
            node_id: node_id.to_string(),
            flag: FlagKind::Visible,
            value,
        }
    }
}

/// Undo/redo availability snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HistoryState {
    /// Can undo.
    pub can_undo: bool,
    /// Can redo.
    pub can_redo: bool,
    /// Undo stack depth.
    pub undo_depth: usize,
    /// Redo stack depth.
    pub redo_depth: usize,
}

/// Expansion, visibility and focus state plus the undo/redo log.
#[derive(Debug)]
pub struct TreeState {
    expanded: HashSet<String>,
    visible: HashSet<String>,
    focused: Option<String>,
    expand_mode: ExpandMode,
    history: Option<UndoRedoManager>,
}

impl TreeState {
    /// Create an empty state. `max_history` of `None` disables undo/redo.
    pub fn new(expand_mode: ExpandMode, max_history: Option<usize>) -> Self {
        Self {
            expanded: HashSet::new(),
            visible: HashSet::new(),
            focused: None,
            expand_mode,
            history: max_history.map(UndoRedoManager::new),
        }
    }

    /// Initialize from the persisted per-record flags of `hierarchy`, then expand every non-leaf
    /// node above `default_expand_level`. Returns the expanded-flag writes caused by the default
    /// level (nodes whose persisted flag was not already set).
    pub fn seed<R: TreeItem>(
        &mut self,
        hierarchy: &Hierarchy<R>,
        default_expand_level: usize,
    ) -> Vec<FlagWrite> {
        self.expanded.clear();
        self.visible.clear();
        self.focused = None;
        if let Some(history) = self.history.as_mut() {
            history.clear();
        }

        let ids = hierarchy.index().depth_first();
        self.seed_ids(hierarchy, &ids, default_expand_level)
    }

    /// Carry state across a hierarchy rebuild: ids present in both `previous` and `hierarchy`
    /// keep their in-memory flags, new ids are seeded like [`TreeState::seed`]. The undo log is
    /// cleared because recorded actions may reference removed nodes.
    pub fn rebuild<R: TreeItem>(
        &mut self,
        previous: &NodeIndex,
        hierarchy: &Hierarchy<R>,
        default_expand_level: usize,
    ) -> Vec<FlagWrite> {
        let index = hierarchy.index();
        self.expanded.retain(|id| index.contains(id));
        self.visible.retain(|id| index.contains(id));
        if self.focused.as_deref().is_some_and(|id| !index.contains(id)) {
            self.focused = None;
        }
        if let Some(history) = self.history.as_mut() {
            history.clear();
        }

        let fresh: Vec<String> = index
            .depth_first()
            .into_iter()
            .filter(|id| !previous.contains(id))
            .collect();
        self.seed_ids(hierarchy, &fresh, default_expand_level)
    }

    fn seed_ids<R: TreeItem>(
        &mut self,
        hierarchy: &Hierarchy<R>,
        ids: &[String],
        default_expand_level: usize,
    ) -> Vec<FlagWrite> {
        let mut writes = Vec::new();
        for id in ids {
            let Some(node) = hierarchy.node(id) else {
                continue;
            };
            if hierarchy.visible_flag(id) {
                self.visible.insert(id.clone());
            }
            let persisted = hierarchy.expanded_flag(id);
            if persisted {
                self.expanded.insert(id.clone());
            } else if !node.is_leaf && node.level < default_expand_level {
                self.expanded.insert(id.clone());
                writes.push(FlagWrite::expanded(id, true));
            }
        }
        writes
    }

    /// Current expansion policy.
    pub fn expand_mode(&self) -> ExpandMode {
        self.expand_mode
    }

    /// Change the expansion policy. Existing expansions are kept.
    pub fn set_expand_mode(&mut self, mode: ExpandMode) {
        self.expand_mode = mode;
    }

    /// The expanded set.
    pub fn expanded(&self) -> &HashSet<String> {
        &self.expanded
    }

    /// The shown set.
    pub fn visible(&self) -> &HashSet<String> {
        &self.visible
    }

    /// Returns `true` if `id` is expanded.
    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }

    /// Returns `true` if the shown flag of `id` is on.
    pub fn is_visible(&self, id: &str) -> bool {
        self.visible.contains(id)
    }

    /// The keyboard focus target.
    pub fn focused(&self) -> Option<&str> {
        self.focused.as_deref()
    }

    /// Move focus to `id`. Returns `true` if focus changed.
    pub fn set_focus(&mut self, index: &NodeIndex, id: &str) -> bool {
        if !index.contains(id) || self.focused.as_deref() == Some(id) {
            return false;
        }
        self.focused = Some(id.to_string());
        true
    }

    /// Drop focus. Returns `true` if something was focused.
    pub fn clear_focus(&mut self) -> bool {
        self.focused.take().is_some()
    }

    /// Flip the expanded flag of `id`. In single-expand mode, expanding a child node first
    /// collapses its expanded siblings; roots stay independent. The whole change is one undo unit.
    pub fn toggle_expanded(&mut self, index: &NodeIndex, id: &str) -> Vec<FlagWrite> {
        if !index.contains(id) {
            return Vec::new();
        }

        let mut node_ids = Vec::new();
        let expanding = !self.expanded.contains(id);
        let has_parent = index.get(id).is_some_and(|n| n.parent_id.is_some());
        if expanding && has_parent && self.expand_mode == ExpandMode::Single {
            node_ids.extend(
                index
                    .siblings(id)
                    .iter()
                    .filter(|sibling| *sibling != id && self.expanded.contains(*sibling))
                    .cloned(),
            );
        }
        node_ids.push(id.to_string());

        let writes = self.flip_expanded(&node_ids);
        self.record(TreeAction::ToggleExpanded { node_ids });
        writes
    }

    /// Expand every listed node that is known and collapsed, as one undo unit. Never collapses
    /// anything and ignores single-expand mode.
    pub fn expand_many<I, S>(&mut self, index: &NodeIndex, ids: I) -> Vec<FlagWrite>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut node_ids: Vec<String> = Vec::new();
        for id in ids {
            let id = id.as_ref();
            if index.contains(id)
                && !self.expanded.contains(id)
                && !node_ids.iter().any(|n| n == id)
            {
                node_ids.push(id.to_string());
            }
        }
        if node_ids.is_empty() {
            return Vec::new();
        }

        let writes = self.flip_expanded(&node_ids);
        self.record(TreeAction::ToggleExpanded { node_ids });
        writes
    }

    /// Flip the shown flag of `id` and of every descendant, each node individually.
    pub fn toggle_visibility(&mut self, index: &NodeIndex, id: &str) -> Vec<FlagWrite> {
        let node_ids = index.subtree(id);
        if node_ids.is_empty() {
            return Vec::new();
        }

        let writes = self.flip_visible(&node_ids);
        self.record(TreeAction::ToggleVisibility { node_ids });
        writes
    }

    /// Set the shown flag of `id` alone. Recorded only when it changes.
    pub fn set_visibility(&mut self, index: &NodeIndex, id: &str, visible: bool) -> Vec<FlagWrite> {
        if !index.contains(id) || self.visible.contains(id) == visible {
            return Vec::new();
        }

        let node_ids = vec![id.to_string()];
        let writes = self.flip_visible(&node_ids);
        self.record(TreeAction::ToggleVisibility { node_ids });
        writes
    }

    /// Expand every non-leaf node.
    pub fn expand_all(&mut self, index: &NodeIndex) -> Vec<FlagWrite> {
        self.replace_expanded(index.non_leaf_ids(), index)
    }

    /// Collapse everything.
    pub fn collapse_all(&mut self, index: &NodeIndex) -> Vec<FlagWrite> {
        self.replace_expanded(HashSet::new(), index)
    }

    /// Expand exactly the non-leaf nodes whose depth is below `level`.
    pub fn expand_to_level(&mut self, index: &NodeIndex, level: usize) -> Vec<FlagWrite> {
        let after: HashSet<String> = index
            .nodes()
            .filter(|n| !n.is_leaf && n.level < level)
            .map(|n| n.id.clone())
            .collect();
        self.replace_expanded(after, index)
    }

    fn replace_expanded(&mut self, after: HashSet<String>, index: &NodeIndex) -> Vec<FlagWrite> {
        if after == self.expanded {
            return Vec::new();
        }
        let before = std::mem::replace(&mut self.expanded, after.clone());
        let writes = expanded_diff(index, &before, &after);
        self.record(TreeAction::ReplaceExpanded { before, after });
        writes
    }

    /// Revert the most recent action. No-op when there is nothing to undo.
    pub fn undo(&mut self) -> Vec<FlagWrite> {
        let Some(action) = self.history.as_mut().and_then(UndoRedoManager::pop_undo) else {
            return Vec::new();
        };
        tracing::debug!(action = action.kind(), "undo");
        self.apply(action, true)
    }

    /// Re-apply the most recently undone action. No-op when there is nothing to redo.
    pub fn redo(&mut self) -> Vec<FlagWrite> {
        let Some(action) = self.history.as_mut().and_then(UndoRedoManager::pop_redo) else {
            return Vec::new();
        };
        tracing::debug!(action = action.kind(), "redo");
        self.apply(action, false)
    }

    fn apply(&mut self, action: TreeAction, inverse: bool) -> Vec<FlagWrite> {
        match action {
            TreeAction::ToggleExpanded { node_ids } => self.flip_expanded(&node_ids),
            TreeAction::ToggleVisibility { node_ids } => self.flip_visible(&node_ids),
            TreeAction::ReplaceExpanded { before, after } => {
                let (from, to) = if inverse {
                    (after, before)
                } else {
                    (before, after)
                };
                let mut writes: Vec<FlagWrite> = from
                    .difference(&to)
                    .map(|id| FlagWrite::expanded(id, false))
                    .chain(to.difference(&from).map(|id| FlagWrite::expanded(id, true)))
                    .collect();
                writes.sort_by(|a, b| a.node_id.cmp(&b.node_id));
                self.expanded = to;
                writes
            }
        }
    }

    /// Returns `true` if an undo is available.
    pub fn can_undo(&self) -> bool {
        self.history.as_ref().is_some_and(UndoRedoManager::can_undo)
    }

    /// Returns `true` if a redo is available.
    pub fn can_redo(&self) -> bool {
        self.history.as_ref().is_some_and(UndoRedoManager::can_redo)
    }

    /// Snapshot of the undo/redo stacks.
    pub fn history_state(&self) -> HistoryState {
        match &self.history {
            Some(history) => HistoryState {
                can_undo: history.can_undo(),
                can_redo: history.can_redo(),
                undo_depth: history.undo_depth(),
                redo_depth: history.redo_depth(),
            },
            None => HistoryState::default(),
        }
    }

    /// Drop the undo/redo log.
    pub fn clear_history(&mut self) {
        if let Some(history) = self.history.as_mut() {
            history.clear();
        }
    }

    fn record(&mut self, action: TreeAction) {
        if let Some(history) = self.history.as_mut() {
            history.push(action);
        }
    }

    fn flip_expanded(&mut self, ids: &[String]) -> Vec<FlagWrite> {
        ids.iter()
            .map(|id| {
                let value = !self.expanded.remove(id);
                if value {
                    self.expanded.insert(id.clone());
                }
                FlagWrite::expanded(id, value)
            })
            .collect()
    }

    fn flip_visible(&mut self, ids: &[String]) -> Vec<FlagWrite> {
        ids.iter()
            .map(|id| {
                let value = !self.visible.remove(id);
                if value {
                    self.visible.insert(id.clone());
                }
                FlagWrite::visible(id, value)
            })
            .collect()
    }
}

/// Writes for every node whose expanded flag differs between `before` and `after`, in
/// depth-first order.
fn expanded_diff(index: &NodeIndex, before: &HashSet<String>, after: &HashSet<String>) -> Vec<FlagWrite> {
    let mut writes: Vec<FlagWrite> = index
        .depth_first()
        .into_iter()
        .filter_map(|id| {
            let was = before.contains(&id);
            let now = after.contains(&id);
            (was != now).then(|| FlagWrite::expanded(&id, now))
        })
        .collect();
    // Ids that left the index still need their flag cleared.
    let mut stale: Vec<&String> = before
        .iter()
        .filter(|id| !after.contains(*id) && !index.contains(id))
        .collect();
    stale.sort();
    writes.extend(stale.into_iter().map(|id| FlagWrite::expanded(id, false)));
    writes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::hierarchy::LinkStrategy;
    use crate::item::Record;

    fn tree() -> Hierarchy<Record> {
        let items = vec![
            Record::new("a"),
            Record::new("a1").with_parent("a"),
            Record::new("a2").with_parent("a"),
            Record::new("a1x").with_parent("a1"),
            Record::new("a2x").with_parent("a2"),
            Record::new("b"),
            Record::new("bx").with_parent("b"),
        ];
        Hierarchy::build(
            items,
            LinkStrategy::ParentAttribute,
            None,
            &mut Diagnostics::default(),
        )
    }

    #[test]
    fn test_single_mode_collapses_siblings_in_one_undo_unit() {
        let tree = tree();
        let mut state = TreeState::new(ExpandMode::Single, Some(10));
        state.seed(&tree, 0);

        state.toggle_expanded(tree.index(), "a1");
        let writes = state.toggle_expanded(tree.index(), "a2");
        assert_eq!(
            writes,
            vec![FlagWrite::expanded("a1", false), FlagWrite::expanded("a2", true)]
        );
        assert!(!state.is_expanded("a1"));

        state.undo();
        assert!(state.is_expanded("a1"));
        assert!(!state.is_expanded("a2"));
    }

    #[test]
    fn test_single_mode_leaves_roots_independent() {
        let tree = tree();
        let mut state = TreeState::new(ExpandMode::Single, None);
        state.seed(&tree, 0);

        state.toggle_expanded(tree.index(), "a");
        let writes = state.toggle_expanded(tree.index(), "b");
        assert_eq!(writes.len(), 1);
        assert!(state.is_expanded("a"));
        assert!(state.is_expanded("b"));
    }

    #[test]
    fn test_unknown_ids_are_ignored() {
        let tree = tree();
        let mut state = TreeState::new(ExpandMode::Multiple, Some(10));
        state.seed(&tree, 0);

        assert!(state.toggle_expanded(tree.index(), "nope").is_empty());
        assert!(state.toggle_visibility(tree.index(), "nope").is_empty());
        assert!(!state.set_focus(tree.index(), "nope"));
        assert!(!state.can_undo());
    }

    #[test]
    fn test_set_visibility_records_only_changes() {
        let tree = tree();
        let mut state = TreeState::new(ExpandMode::Multiple, Some(10));
        state.seed(&tree, 0);

        assert!(state.set_visibility(tree.index(), "a", true).is_empty());
        assert_eq!(state.set_visibility(tree.index(), "a", false).len(), 1);
        assert!(state.is_visible("a1"));
        assert_eq!(state.history_state().undo_depth, 1);
    }

    #[test]
    fn test_seed_applies_default_level_and_persisted_flags() {
        let items = vec![
            Record::new("r"),
            Record::new("c").with_parent("r").with_expanded(true),
            Record::new("g").with_parent("c").with_visible(false),
            Record::new("gg").with_parent("g"),
        ];
        let tree = Hierarchy::build(
            items,
            LinkStrategy::ParentAttribute,
            None,
            &mut Diagnostics::default(),
        );
        let mut state = TreeState::new(ExpandMode::Multiple, None);
        let writes = state.seed(&tree, 1);

        assert_eq!(writes, vec![FlagWrite::expanded("r", true)]);
        assert!(state.is_expanded("c"));
        assert!(!state.is_expanded("g"));
        assert!(!state.is_visible("g"));
        assert!(state.is_visible("gg"));
    }

    #[test]
    fn test_rebuild_keeps_surviving_state() {
        let tree = tree();
        let mut state = TreeState::new(ExpandMode::Multiple, Some(10));
        state.seed(&tree, 0);
        state.toggle_expanded(tree.index(), "a");
        state.set_focus(tree.index(), "bx");

        let mut items = tree.items().to_vec();
        items.retain(|r| r.id.as_deref() != Some("b") && r.id.as_deref() != Some("bx"));
        items.push(Record::new("c").with_expanded(true));
        let next = Hierarchy::build(
            items,
            LinkStrategy::ParentAttribute,
            None,
            &mut Diagnostics::default(),
        );
        let writes = state.rebuild(tree.index(), &next, 0);

        assert!(writes.is_empty());
        assert!(state.is_expanded("a"));
        assert!(state.is_expanded("c"));
        assert_eq!(state.focused(), None);
        assert!(!state.can_undo());
    }
}
