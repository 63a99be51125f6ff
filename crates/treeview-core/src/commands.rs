//! Command Interface Layer
//!
//! A single command enum covering every mutation a frontend can ask for, so hosts can drive a
//! [`TreeView`] from a message queue, a script, or a recorded session.
//!
//! # Example
//!
//! ```rust
//! use treeview_core::{
//!     CommandResult, ExpandCommand, Record, SelectionCommand, TreeCommand, TreeConfig, TreeView,
//! };
//!
//! let items = vec![Record::new("root"), Record::new("leaf").with_parent("root")];
//! let mut view = TreeView::new(items, TreeConfig::default()).unwrap();
//!
//! let results = view.execute_batch(vec![
//!     TreeCommand::Expand(ExpandCommand::Toggle { node_id: "root".into() }),
//!     TreeCommand::Selection(SelectionCommand::Select { node_id: "leaf".into() }),
//! ]);
//! assert_eq!(results, vec![CommandResult::Changed, CommandResult::Changed]);
//! assert_eq!(view.selected_ids(), vec!["leaf"]);
//! ```

use crate::item::TreeItem;
use crate::keyboard::{KeyInput, KeyOutcome, Modifiers};
use crate::virtualizer::Align;
use crate::view::TreeView;
use std::time::Instant;

/// Expansion commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpandCommand {
    /// Flip one node.
    Toggle {
        /// Target node.
        node_id: String,
    },
    /// Expand the listed nodes as one undo unit.
    ExpandMany {
        /// Target nodes.
        node_ids: Vec<String>,
    },
    /// Expand every non-leaf node.
    ExpandAll,
    /// Collapse every node.
    CollapseAll,
    /// Expand exactly the non-leaf nodes above `level`.
    ExpandToLevel {
        /// Depth limit.
        level: usize,
    },
    /// Trigger the lazy-load action.
    LoadChildren {
        /// Target node.
        node_id: String,
    },
}

/// Visibility commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisibilityCommand {
    /// Flip a node and its descendants.
    Toggle {
        /// Target node.
        node_id: String,
    },
    /// Set one node's flag.
    Set {
        /// Target node.
        node_id: String,
        /// New value.
        visible: bool,
    },
}

/// Selection commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionCommand {
    /// Replace the selection and focus the node.
    Select {
        /// Target node.
        node_id: String,
    },
    /// Toggle membership.
    Toggle {
        /// Target node.
        node_id: String,
    },
    /// Add an inclusive depth-first range.
    Range {
        /// One endpoint.
        from: String,
        /// Other endpoint.
        to: String,
    },
    /// Select every node.
    SelectAll,
    /// Add every displayed node.
    SelectAllVisible,
    /// Invert the selection.
    Invert,
    /// Empty the selection.
    Clear,
    /// Click with modifiers.
    Click {
        /// Target node.
        node_id: String,
        /// Held modifiers.
        modifiers: Modifiers,
    },
}

/// Focus commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusCommand {
    /// Focus a node.
    Set {
        /// Target node.
        node_id: String,
    },
    /// Drop focus.
    Clear,
    /// Focus and select a breadcrumb step.
    Breadcrumb {
        /// Target node.
        node_id: String,
    },
    /// Record a hover.
    Hover {
        /// Target node.
        node_id: String,
    },
}

/// Search commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCommand {
    /// A keystroke in the search box.
    SetQuery {
        /// Full query text.
        query: String,
        /// Time of the keystroke.
        at: Instant,
    },
    /// Drive the debounce timer.
    Tick {
        /// Current time.
        now: Instant,
    },
    /// Evaluate the pending query now.
    Flush,
    /// Clear query and results.
    Clear,
    /// Union server-provided match ids.
    ServerResults {
        /// Matching node ids.
        node_ids: Vec<String>,
    },
}

/// Scroll and viewport commands
#[derive(Debug, Clone, PartialEq)]
pub enum ViewCommand {
    /// Set the viewport extent.
    SetViewport {
        /// Extent in the same unit as item sizes.
        size: f64,
    },
    /// Scroll to an absolute offset.
    ScrollToOffset {
        /// Target offset.
        offset: f64,
    },
    /// Scroll to a displayed position.
    ScrollToIndex {
        /// Displayed position.
        index: usize,
        /// Alignment.
        align: Align,
    },
    /// Scroll to a node's row.
    ScrollToNode {
        /// Target node.
        node_id: String,
        /// Alignment.
        align: Align,
    },
    /// Record a rendered row size.
    Measure {
        /// Displayed position.
        index: usize,
        /// Rendered size.
        size: f64,
    },
}

/// History commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryCommand {
    /// Undo the last action.
    Undo,
    /// Redo the last undone action.
    Redo,
}

/// Unified command enum
#[derive(Debug, Clone, PartialEq)]
pub enum TreeCommand {
    /// Expansion command
    Expand(ExpandCommand),
    /// Visibility command
    Visibility(VisibilityCommand),
    /// Selection command
    Selection(SelectionCommand),
    /// Focus command
    Focus(FocusCommand),
    /// Search command
    Search(SearchCommand),
    /// Scroll and viewport command
    View(ViewCommand),
    /// History command
    History(HistoryCommand),
    /// Key press
    Key(KeyInput),
}

/// Command execution result
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandResult {
    /// State changed.
    Changed,
    /// Nothing to do (unknown id, no-op, disabled feature).
    Unchanged,
    /// Scroll commands report the resulting offset.
    Offset(f64),
    /// Key presses report what they did.
    Key(KeyOutcome),
}

impl CommandResult {
    fn from_changed(changed: bool) -> Self {
        if changed {
            Self::Changed
        } else {
            Self::Unchanged
        }
    }
}

impl<R: TreeItem> TreeView<R> {
    /// Execute one command.
    pub fn execute(&mut self, command: TreeCommand) -> CommandResult {
        tracing::trace!(?command, "execute");
        match command {
            TreeCommand::Expand(cmd) => self.execute_expand(cmd),
            TreeCommand::Visibility(cmd) => self.execute_visibility(cmd),
            TreeCommand::Selection(cmd) => self.execute_selection(cmd),
            TreeCommand::Focus(cmd) => self.execute_focus(cmd),
            TreeCommand::Search(cmd) => self.execute_search(cmd),
            TreeCommand::View(cmd) => self.execute_view(cmd),
            TreeCommand::History(cmd) => CommandResult::from_changed(match cmd {
                HistoryCommand::Undo => self.undo(),
                HistoryCommand::Redo => self.redo(),
            }),
            TreeCommand::Key(input) => CommandResult::Key(self.handle_key(input)),
        }
    }

    /// Execute commands in order.
    pub fn execute_batch(&mut self, commands: Vec<TreeCommand>) -> Vec<CommandResult> {
        commands
            .into_iter()
            .map(|command| self.execute(command))
            .collect()
    }

    fn execute_expand(&mut self, command: ExpandCommand) -> CommandResult {
        let changed = match command {
            ExpandCommand::Toggle { node_id } => self.toggle_expanded(&node_id),
            ExpandCommand::ExpandMany { node_ids } => self.expand_many(node_ids),
            ExpandCommand::ExpandAll => self.expand_all(),
            ExpandCommand::CollapseAll => self.collapse_all(),
            ExpandCommand::ExpandToLevel { level } => self.expand_to_level(level),
            ExpandCommand::LoadChildren { node_id } => self.load_children(&node_id),
        };
        CommandResult::from_changed(changed)
    }

    fn execute_visibility(&mut self, command: VisibilityCommand) -> CommandResult {
        let changed = match command {
            VisibilityCommand::Toggle { node_id } => self.toggle_visibility(&node_id),
            VisibilityCommand::Set { node_id, visible } => self.set_visibility(&node_id, visible),
        };
        CommandResult::from_changed(changed)
    }

    fn execute_selection(&mut self, command: SelectionCommand) -> CommandResult {
        let changed = match command {
            SelectionCommand::Select { node_id } => self.select_node(&node_id),
            SelectionCommand::Toggle { node_id } => self.toggle_selection(&node_id),
            SelectionCommand::Range { from, to } => self.select_range(&from, &to),
            SelectionCommand::SelectAll => self.select_all(),
            SelectionCommand::SelectAllVisible => self.select_all_visible(),
            SelectionCommand::Invert => self.invert_selection(),
            SelectionCommand::Clear => self.clear_selection(),
            SelectionCommand::Click { node_id, modifiers } => self.node_click(&node_id, modifiers),
        };
        CommandResult::from_changed(changed)
    }

    fn execute_focus(&mut self, command: FocusCommand) -> CommandResult {
        let changed = match command {
            FocusCommand::Set { node_id } => self.set_focus(&node_id),
            FocusCommand::Clear => self.clear_focus(),
            FocusCommand::Breadcrumb { node_id } => self.focus_breadcrumb(&node_id),
            FocusCommand::Hover { node_id } => self.node_hover(&node_id),
        };
        CommandResult::from_changed(changed)
    }

    fn execute_search(&mut self, command: SearchCommand) -> CommandResult {
        let changed = match command {
            SearchCommand::SetQuery { query, at } => {
                let before = self.version();
                self.set_search_query(&query, at);
                self.has_changed_since(before)
            }
            SearchCommand::Tick { now } => self.tick(now),
            SearchCommand::Flush => self.flush_search(),
            SearchCommand::Clear => self.clear_search(),
            SearchCommand::ServerResults { node_ids } => self.apply_server_results(node_ids),
        };
        CommandResult::from_changed(changed)
    }

    fn execute_view(&mut self, command: ViewCommand) -> CommandResult {
        match command {
            ViewCommand::SetViewport { size } => {
                let before = self.version();
                self.set_viewport(size);
                CommandResult::from_changed(self.has_changed_since(before))
            }
            ViewCommand::ScrollToOffset { offset } => {
                self.scroll_to_offset(offset);
                CommandResult::Offset(self.virtualizer().scroll_offset())
            }
            ViewCommand::ScrollToIndex { index, align } => {
                CommandResult::Offset(self.scroll_to_index(index, align))
            }
            ViewCommand::ScrollToNode { node_id, align } => {
                if self.scroll_to_node(&node_id, align) {
                    CommandResult::Offset(self.virtualizer().scroll_offset())
                } else {
                    CommandResult::Unchanged
                }
            }
            ViewCommand::Measure { index, size } => {
                CommandResult::from_changed(self.measure(index, size))
            }
        }
    }
}
