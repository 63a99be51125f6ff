//! Undo/redo log.
//!
//! Every undoable state change is recorded as one [`TreeAction`]. Toggle actions are their own
//! inverse; replacement actions carry both the previous and the new set, so either direction can
//! be re-applied exactly.

use std::collections::{HashSet, VecDeque};

/// Default number of actions kept in the undo log.
pub const DEFAULT_MAX_HISTORY: usize = 100;

/// One undoable unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeAction {
    /// Flip the expanded flag of every listed node (e.g. one toggle, or a toggle plus the sibling
    /// collapses of single-expand mode, or a batch of ancestor expansions).
    ToggleExpanded {
        /// Affected nodes.
        node_ids: Vec<String>,
    },
    /// Flip the shown flag of every listed node (a node plus its descendants).
    ToggleVisibility {
        /// Affected nodes.
        node_ids: Vec<String>,
    },
    /// Replace the whole expanded set (expand all, collapse all, expand to level).
    ReplaceExpanded {
        /// Expanded set before the action.
        before: HashSet<String>,
        /// Expanded set after the action.
        after: HashSet<String>,
    },
}

impl TreeAction {
    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ToggleExpanded { .. } => "toggle_expanded",
            Self::ToggleVisibility { .. } => "toggle_visibility",
            Self::ReplaceExpanded { .. } => "replace_expanded",
        }
    }
}

/// Past/future action stacks.
#[derive(Debug)]
pub(crate) struct UndoRedoManager {
    undo_stack: VecDeque<TreeAction>,
    redo_stack: Vec<TreeAction>,
    max_undo: usize,
}

impl UndoRedoManager {
    pub(crate) fn new(max_undo: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_undo,
        }
    }

    pub(crate) fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub(crate) fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub(crate) fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub(crate) fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Record a fresh action. Any redo future is discarded.
    pub(crate) fn push(&mut self, action: TreeAction) {
        self.redo_stack.clear();
        if self.max_undo == 0 {
            return;
        }
        while self.undo_stack.len() >= self.max_undo {
            self.undo_stack.pop_front();
        }
        self.undo_stack.push_back(action);
    }

    /// Move the latest past action to the future and return it for inverse application.
    pub(crate) fn pop_undo(&mut self) -> Option<TreeAction> {
        let action = self.undo_stack.pop_back()?;
        self.redo_stack.push(action.clone());
        Some(action)
    }

    /// Move the nearest future action back to the past and return it for re-application.
    pub(crate) fn pop_redo(&mut self) -> Option<TreeAction> {
        let action = self.redo_stack.pop()?;
        self.undo_stack.push_back(action.clone());
        Some(action)
    }

    pub(crate) fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toggle(id: &str) -> TreeAction {
        TreeAction::ToggleExpanded {
            node_ids: vec![id.to_string()],
        }
    }

    #[test]
    fn test_push_clears_redo() {
        let mut history = UndoRedoManager::new(10);
        history.push(toggle("a"));
        history.push(toggle("b"));
        assert_eq!(history.pop_undo(), Some(toggle("b")));
        assert!(history.can_redo());

        history.push(toggle("c"));
        assert!(!history.can_redo());
        assert_eq!(history.undo_depth(), 2);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut history = UndoRedoManager::new(2);
        history.push(toggle("a"));
        history.push(toggle("b"));
        history.push(toggle("c"));
        assert_eq!(history.undo_depth(), 2);
        assert_eq!(history.pop_undo(), Some(toggle("c")));
        assert_eq!(history.pop_undo(), Some(toggle("b")));
        assert_eq!(history.pop_undo(), None);
        assert_eq!(history.redo_depth(), 2);
    }
}
