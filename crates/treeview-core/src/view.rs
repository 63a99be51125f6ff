//! Tree View
//!
//! [`TreeView`] is the single owner of one tree instance: the built hierarchy, the state store,
//! selection, search, the virtualization window, diagnostics, and the host collaborators (flag
//! sink, selection sink, external actions).
//!
//! Every mutation goes through a view method (or a [`TreeCommand`](crate::TreeCommand)), which
//!
//! 1. applies the in-memory change,
//! 2. forwards the resulting flag writes to the flag sink,
//! 3. recomputes the displayed sequence when the change can affect it,
//! 4. increments the version and notifies subscribers.
//!
//! Operations with unknown node ids are no-ops.
//!
//! # Example
//!
//! ```rust
//! use treeview_core::{Record, TreeConfig, TreeView};
//!
//! let items = vec![
//!     Record::new("1").with_field("name", "Fruit"),
//!     Record::new("2").with_parent("1").with_field("name", "Apple"),
//!     Record::new("3").with_parent("1").with_field("name", "Banana"),
//! ];
//! let config = TreeConfig::default().with_label_field("name");
//! let mut view = TreeView::new(items, config).unwrap();
//!
//! assert_eq!(view.visible_ordering(), ["1"]);
//! view.toggle_expanded("1");
//! assert_eq!(view.visible_ordering(), ["1", "2", "3"]);
//!
//! let rows = view.visible_rows();
//! assert_eq!(rows[2].label, "Banana");
//! assert_eq!(rows[2].aria.pos_in_set, 2);
//!
//! view.undo();
//! assert_eq!(view.displayed_count(), 1);
//! ```

use crate::config::TreeConfig;
use crate::diagnostics::{DiagnosticEvent, Diagnostics};
use crate::error::{ActionError, ConfigError};
use crate::events::{Listeners, Subscription, TreeChange, TreeChangeKind};
use crate::flatten::{FlatNode, FlattenFilter, flatten};
use crate::hierarchy::Hierarchy;
use crate::index::{Node, NodeIndex};
use crate::item::{ContextAction, ExternalAction, FlagSink, SelectionSink, TreeItem};
use crate::keyboard::Modifiers;
use crate::row::{BreadcrumbItem, RowContext, RowModel};
use crate::search::{QueryUpdate, SearchEngine, SearchMode, required_expansions};
use crate::selection::{SelectionMode, SelectionModel};
use crate::state::{FlagKind, FlagWrite, HistoryState, TreeState};
use crate::virtualizer::{Align, VirtualWindow, Virtualizer};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Instant;

/// Host operations the view can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionSlot {
    /// Load the children of a node; the host answers with [`TreeView::set_items`].
    LazyLoad,
    /// Run a server-side search; the host answers with [`TreeView::apply_server_results`].
    ServerSearch,
    /// Notified once per selection change, after the selection sink was written.
    SelectionChange,
    /// Notified after a visibility toggle.
    VisibilityChange,
    /// A row was clicked.
    NodeClick,
    /// A row was hovered.
    NodeHover,
}

impl ActionSlot {
    fn label(self) -> &'static str {
        match self {
            Self::LazyLoad => "lazy_load",
            Self::ServerSearch => "server_search",
            Self::SelectionChange => "selection_change",
            Self::VisibilityChange => "visibility_change",
            Self::NodeClick => "node_click",
            Self::NodeHover => "node_hover",
        }
    }
}

/// Node counts for debugging overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TreeMetrics {
    /// Nodes in the hierarchy.
    pub total_nodes: usize,
    /// Expanded nodes.
    pub expanded_count: usize,
    /// Selected nodes.
    pub selected_count: usize,
    /// Nodes whose shown flag is on.
    pub shown_count: usize,
    /// Rows in the displayed sequence.
    pub displayed_count: usize,
    /// Current search matches.
    pub match_count: usize,
}

/// Builder for [`TreeView`].
pub struct TreeViewBuilder<R> {
    items: Vec<R>,
    config: TreeConfig,
    flag_sink: Option<Box<dyn FlagSink<R>>>,
    selection_sink: Option<Box<dyn SelectionSink>>,
    actions: HashMap<ActionSlot, Box<dyn ExternalAction>>,
    context_actions: Vec<ContextAction<R>>,
    diagnostics: Diagnostics,
}

impl<R: TreeItem> TreeViewBuilder<R> {
    /// Set the configuration.
    pub fn config(mut self, config: TreeConfig) -> Self {
        self.config = config;
        self
    }

    /// Receive expanded/shown flag changes.
    pub fn flag_sink(mut self, sink: impl FlagSink<R> + 'static) -> Self {
        self.flag_sink = Some(Box::new(sink));
        self
    }

    /// Receive the serialized selection.
    pub fn selection_sink(mut self, sink: impl SelectionSink + 'static) -> Self {
        self.selection_sink = Some(Box::new(sink));
        self
    }

    /// Install an external action.
    pub fn action(mut self, slot: ActionSlot, action: impl ExternalAction + 'static) -> Self {
        self.actions.insert(slot, Box::new(action));
        self
    }

    /// Append a context-menu entry. Entries keep their insertion order.
    pub fn context_action(mut self, action: ContextAction<R>) -> Self {
        self.context_actions.push(action);
        self
    }

    /// Observe diagnostic events, including the ones raised while building the hierarchy.
    pub fn on_diagnostic<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&DiagnosticEvent) + 'static,
    {
        self.diagnostics.set_callback(callback);
        self
    }

    /// Validate the configuration and build the view.
    pub fn build(self) -> Result<TreeView<R>, ConfigError> {
        let Self {
            items,
            config,
            flag_sink,
            selection_sink,
            actions,
            context_actions,
            mut diagnostics,
        } = self;
        config.validate()?;
        diagnostics.set_capacity(config.diagnostics_capacity);

        let hierarchy = Hierarchy::build(
            items,
            config.link_strategy,
            config.sort.as_ref(),
            &mut diagnostics,
        );
        let mut state = TreeState::new(config.expand_mode, config.history_capacity());
        let writes = state.seed(&hierarchy, config.default_expand_level);

        let selection = SelectionModel::new(config.selection_mode, config.enable_multi_select);
        let search = SearchEngine::new(
            config.search_mode,
            config.search_fields.clone(),
            config.search_options,
            config.min_query_chars,
            config.search_debounce(),
        );
        let mut virtualizer = Virtualizer::new(0, config.item_size).with_overscan(config.overscan);
        virtualizer.set_enabled(config.virtual_scrolling);

        let mut view = TreeView {
            config,
            hierarchy,
            state,
            selection,
            search,
            virtualizer,
            diagnostics,
            flag_sink,
            selection_sink,
            actions,
            context_actions,
            listeners: Listeners::default(),
            version: 0,
            displayed: Vec::new(),
            positions: HashMap::new(),
            is_loading: false,
            loaded: HashSet::new(),
            hovered: None,
        };
        view.write_flags(&writes);
        view.refresh_display();
        tracing::debug!(
            nodes = view.hierarchy.len(),
            displayed = view.displayed.len(),
            "tree view ready"
        );
        Ok(view)
    }
}

/// One tree instance.
pub struct TreeView<R> {
    config: TreeConfig,
    hierarchy: Hierarchy<R>,
    state: TreeState,
    selection: SelectionModel,
    search: SearchEngine,
    virtualizer: Virtualizer,
    diagnostics: Diagnostics,
    flag_sink: Option<Box<dyn FlagSink<R>>>,
    selection_sink: Option<Box<dyn SelectionSink>>,
    actions: HashMap<ActionSlot, Box<dyn ExternalAction>>,
    context_actions: Vec<ContextAction<R>>,
    listeners: Listeners,
    version: u64,
    displayed: Vec<FlatNode>,
    positions: HashMap<String, usize>,
    is_loading: bool,
    loaded: HashSet<String>,
    hovered: Option<String>,
}

impl<R> fmt::Debug for TreeView<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeView")
            .field("nodes", &self.hierarchy.len())
            .field("displayed", &self.displayed.len())
            .field("version", &self.version)
            .field("focused", &self.state.focused())
            .field("selected", &self.selection.len())
            .field("is_loading", &self.is_loading)
            .finish()
    }
}

impl<R: TreeItem> TreeView<R> {
    /// Start building a view over `items`.
    pub fn builder(items: Vec<R>) -> TreeViewBuilder<R> {
        TreeViewBuilder {
            items,
            config: TreeConfig::default(),
            flag_sink: None,
            selection_sink: None,
            actions: HashMap::new(),
            context_actions: Vec::new(),
            diagnostics: Diagnostics::default(),
        }
    }

    /// Build a view without collaborators.
    pub fn new(items: Vec<R>, config: TreeConfig) -> Result<Self, ConfigError> {
        Self::builder(items).config(config).build()
    }

    // ----- Queries -------------------------------------------------------------------------

    /// The configuration.
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// The built hierarchy.
    pub fn hierarchy(&self) -> &Hierarchy<R> {
        &self.hierarchy
    }

    /// The node index.
    pub fn index(&self) -> &NodeIndex {
        self.hierarchy.index()
    }

    /// Look up a node.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.hierarchy.node(id)
    }

    /// Number of nodes in the hierarchy.
    pub fn node_count(&self) -> usize {
        self.hierarchy.len()
    }

    /// Descendant ids of `id`, depth-first.
    pub fn descendants(&self, id: &str) -> Vec<String> {
        self.index().descendants(id)
    }

    /// Ancestor ids of `id`, nearest first.
    pub fn ancestors(&self, id: &str) -> Vec<String> {
        self.index().ancestors(id)
    }

    /// Follow a root-to-node id path.
    pub fn find_by_path<S: AsRef<str>>(&self, path: &[S]) -> Option<&Node> {
        self.index().find_by_path(path)
    }

    /// Height of the subtree below `id`.
    pub fn subtree_depth(&self, id: &str) -> usize {
        self.index().subtree_depth(id)
    }

    /// The state store.
    pub fn state(&self) -> &TreeState {
        &self.state
    }

    /// The selection model.
    pub fn selection(&self) -> &SelectionModel {
        &self.selection
    }

    /// The search engine.
    pub fn search(&self) -> &SearchEngine {
        &self.search
    }

    /// The virtualization window.
    pub fn virtualizer(&self) -> &Virtualizer {
        &self.virtualizer
    }

    /// Absorbed problems.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Mutable access to the diagnostics log (draining, callbacks).
    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    /// Returns `true` if `id` is expanded.
    pub fn is_expanded(&self, id: &str) -> bool {
        self.state.is_expanded(id)
    }

    /// Returns `true` if the shown flag of `id` is on.
    pub fn is_visible(&self, id: &str) -> bool {
        self.state.is_visible(id)
    }

    /// Returns `true` if `id` is selected.
    pub fn is_selected(&self, id: &str) -> bool {
        self.selection.is_selected(id)
    }

    /// The keyboard focus target.
    pub fn focused(&self) -> Option<&str> {
        self.state.focused()
    }

    /// The last hovered node.
    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    /// Returns `true` while a lazy load is running.
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Returns `true` while a search evaluation is running.
    pub fn is_searching(&self) -> bool {
        self.search.is_searching()
    }

    /// Undo/redo availability.
    pub fn history(&self) -> HistoryState {
        self.state.history_state()
    }

    /// Returns `true` if an undo is available.
    pub fn can_undo(&self) -> bool {
        self.state.can_undo()
    }

    /// Returns `true` if a redo is available.
    pub fn can_redo(&self) -> bool {
        self.state.can_redo()
    }

    /// Current version; incremented by every change.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns `true` if anything changed after `version`.
    pub fn has_changed_since(&self, version: u64) -> bool {
        self.version > version
    }

    /// The displayed sequence.
    pub fn displayed(&self) -> &[FlatNode] {
        &self.displayed
    }

    /// Number of displayed rows.
    pub fn displayed_count(&self) -> usize {
        self.displayed.len()
    }

    /// Displayed node ids in order (keyboard navigation ordering).
    pub fn visible_ordering(&self) -> Vec<String> {
        self.displayed.iter().map(|n| n.id.clone()).collect()
    }

    /// Position of `id` in the displayed sequence.
    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    /// Selected ids in tree order.
    pub fn selected_ids(&self) -> Vec<String> {
        self.selection.ordered(self.index())
    }

    /// Records behind the selected nodes, in tree order.
    pub fn selected_items(&self) -> Vec<&R> {
        self.selected_ids()
            .iter()
            .filter_map(|id| self.hierarchy.record(id))
            .collect()
    }

    /// The serialized selection, as written to the selection sink.
    pub fn selection_value(&self) -> String {
        self.selection
            .serialize(&self.hierarchy, self.config.selection_output)
    }

    /// Node counts.
    pub fn metrics(&self) -> TreeMetrics {
        TreeMetrics {
            total_nodes: self.hierarchy.len(),
            expanded_count: self.state.expanded().len(),
            selected_count: self.selection.len(),
            shown_count: self.state.visible().len(),
            displayed_count: self.displayed.len(),
            match_count: self.search.highlighted().len(),
        }
    }

    // ----- Rows ----------------------------------------------------------------------------

    fn row_context(&self) -> RowContext<'_, R> {
        RowContext {
            hierarchy: &self.hierarchy,
            state: &self.state,
            selection: &self.selection,
            search: &self.search,
            label_field: self.config.label_field.as_deref(),
            indent_size: self.config.indent_size,
        }
    }

    /// Display label of `id`.
    pub fn label(&self, id: &str) -> String {
        self.row_context().label(id)
    }

    /// Row model for displayed position `index`.
    pub fn row(&self, index: usize) -> Option<RowModel> {
        let node = self.displayed.get(index)?;
        self.row_context().row(index, &node.id)
    }

    /// Row models for the displayed positions in `range` (clamped).
    pub fn rows(&self, range: std::ops::Range<usize>) -> Vec<RowModel> {
        let end = range.end.min(self.displayed.len());
        let start = range.start.min(end);
        let context = self.row_context();
        self.displayed[start..end]
            .iter()
            .enumerate()
            .filter_map(|(offset, node)| context.row(start + offset, &node.id))
            .collect()
    }

    /// The current virtualization window.
    pub fn window(&self) -> VirtualWindow {
        self.virtualizer.window()
    }

    /// Row models for the current window.
    pub fn visible_rows(&self) -> Vec<RowModel> {
        self.rows(self.virtualizer.range())
    }

    /// Root-to-focused path.
    pub fn breadcrumb(&self) -> Vec<BreadcrumbItem> {
        match self.state.focused() {
            Some(id) => self.row_context().breadcrumb(id),
            None => Vec::new(),
        }
    }

    // ----- Subscriptions -------------------------------------------------------------------

    /// Observe changes until the returned guard is dropped.
    #[must_use = "dropping the subscription unregisters the callback"]
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&TreeChange) + 'static,
    {
        self.listeners.subscribe(callback)
    }

    /// Release instance-scoped resources: cancels the pending search and unregisters every
    /// subscriber.
    pub fn teardown(&mut self) {
        if self.search.cancel_pending() {
            tracing::debug!("cancelled pending search on teardown");
        }
        self.listeners.clear();
    }

    fn bump(&mut self, kind: TreeChangeKind) {
        let old_version = self.version;
        self.version += 1;
        self.listeners
            .notify(&TreeChange::new(kind, old_version, self.version));
    }

    fn refresh_display(&mut self) {
        let filter = FlattenFilter {
            shown: self
                .config
                .hide_hidden_nodes
                .then(|| self.state.visible()),
            matches: (self.config.filter_to_search_results && self.search.is_active())
                .then(|| self.search.highlighted()),
        };
        self.displayed = flatten(self.hierarchy.index(), self.state.expanded(), filter);
        self.positions = self
            .displayed
            .iter()
            .enumerate()
            .map(|(position, node)| (node.id.clone(), position))
            .collect();
        self.virtualizer.set_count(self.displayed.len());
    }

    fn write_flags(&mut self, writes: &[FlagWrite]) {
        let Some(sink) = self.flag_sink.as_mut() else {
            return;
        };
        for write in writes {
            let Some(record) = self.hierarchy.record(&write.node_id) else {
                continue;
            };
            match write.flag {
                FlagKind::Expanded => sink.set_expanded(record, write.value),
                FlagKind::Visible => sink.set_visible(record, write.value),
            }
        }
    }

    /// Forward writes, refresh, and notify. Returns `true` if anything changed.
    fn commit(&mut self, writes: Vec<FlagWrite>) -> bool {
        if writes.is_empty() {
            return false;
        }
        self.write_flags(&writes);
        self.refresh_display();
        if writes.iter().any(|w| w.flag == FlagKind::Expanded) {
            self.bump(TreeChangeKind::Expansion);
        }
        if writes.iter().any(|w| w.flag == FlagKind::Visible) {
            self.bump(TreeChangeKind::Visibility);
        }
        true
    }

    fn run_action(&mut self, slot: ActionSlot) -> bool {
        let Some(action) = self.actions.get_mut(&slot) else {
            return false;
        };
        if !action.can_execute() {
            tracing::debug!(slot = slot.label(), "action not executable");
            return false;
        }
        match action.execute() {
            Ok(()) => true,
            Err(err) => {
                let name = action.name().to_string();
                self.diagnostics.record(DiagnosticEvent::ActionFailed {
                    action: name,
                    message: err.to_string(),
                });
                false
            }
        }
    }

    // ----- Expansion -----------------------------------------------------------------------

    /// Flip the expanded flag of `id` (collapsing siblings first in single-expand mode).
    pub fn toggle_expanded(&mut self, id: &str) -> bool {
        let expanding = !self.state.is_expanded(id);
        let writes = self.state.toggle_expanded(self.hierarchy.index(), id);
        let changed = self.commit(writes);
        if changed && expanding && self.needs_load(id) {
            self.load_children(id);
        }
        changed
    }

    /// Expand `id` if it is collapsed.
    pub fn expand(&mut self, id: &str) -> bool {
        if self.state.is_expanded(id) {
            return false;
        }
        self.toggle_expanded(id)
    }

    /// Collapse `id` if it is expanded.
    pub fn collapse(&mut self, id: &str) -> bool {
        if !self.state.is_expanded(id) {
            return false;
        }
        self.toggle_expanded(id)
    }

    /// Expand every listed collapsed node as one undo unit.
    pub fn expand_many<I, S>(&mut self, ids: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let writes = self.state.expand_many(self.hierarchy.index(), ids);
        self.commit(writes)
    }

    /// Expand every non-leaf node.
    pub fn expand_all(&mut self) -> bool {
        let writes = self.state.expand_all(self.hierarchy.index());
        self.commit(writes)
    }

    /// Collapse every node.
    pub fn collapse_all(&mut self) -> bool {
        let writes = self.state.collapse_all(self.hierarchy.index());
        self.commit(writes)
    }

    /// Expand exactly the non-leaf nodes above depth `level`.
    pub fn expand_to_level(&mut self, level: usize) -> bool {
        let writes = self.state.expand_to_level(self.hierarchy.index(), level);
        self.commit(writes)
    }

    // ----- Visibility ----------------------------------------------------------------------

    /// Flip the shown flag of `id` and all of its descendants, then run the visibility action.
    pub fn toggle_visibility(&mut self, id: &str) -> bool {
        let writes = self.state.toggle_visibility(self.hierarchy.index(), id);
        if !self.commit(writes) {
            return false;
        }
        self.run_action(ActionSlot::VisibilityChange);
        true
    }

    /// Set the shown flag of `id` alone.
    pub fn set_visibility(&mut self, id: &str, visible: bool) -> bool {
        let writes = self
            .state
            .set_visibility(self.hierarchy.index(), id, visible);
        self.commit(writes)
    }

    // ----- History -------------------------------------------------------------------------

    /// Revert the most recent expansion or visibility action.
    pub fn undo(&mut self) -> bool {
        let writes = self.state.undo();
        self.commit(writes)
    }

    /// Re-apply the most recently undone action.
    pub fn redo(&mut self) -> bool {
        let writes = self.state.redo();
        self.commit(writes)
    }

    // ----- Focus ---------------------------------------------------------------------------

    /// Move focus to `id` and scroll its row into view.
    pub fn set_focus(&mut self, id: &str) -> bool {
        if !self.state.set_focus(self.hierarchy.index(), id) {
            return false;
        }
        self.scroll_node_into_view(id);
        self.bump(TreeChangeKind::Focus);
        true
    }

    /// Drop focus.
    pub fn clear_focus(&mut self) -> bool {
        if !self.state.clear_focus() {
            return false;
        }
        self.bump(TreeChangeKind::Focus);
        true
    }

    /// Focus and select a breadcrumb step.
    pub fn focus_breadcrumb(&mut self, id: &str) -> bool {
        let focused = self.set_focus(id);
        let selected = self.select_node(id);
        focused || selected
    }

    // ----- Selection -----------------------------------------------------------------------

    fn publish_selection(&mut self) {
        let value = self
            .selection
            .serialize(&self.hierarchy, self.config.selection_output);
        if let Some(sink) = self.selection_sink.as_mut() {
            sink.set_value(&value);
        }
        self.run_action(ActionSlot::SelectionChange);
        self.bump(TreeChangeKind::Selection);
    }

    fn selection_changed(&mut self, changed: bool) -> bool {
        if changed {
            self.publish_selection();
        }
        changed
    }

    /// Replace the selection with `id` and focus it.
    pub fn select_node(&mut self, id: &str) -> bool {
        let changed = self.selection.select_node(self.hierarchy.index(), id);
        if self.selection.mode() != SelectionMode::None {
            self.set_focus(id);
        }
        self.selection_changed(changed)
    }

    /// Toggle `id` in the selection.
    pub fn toggle_selection(&mut self, id: &str) -> bool {
        let changed = self.selection.toggle(self.hierarchy.index(), id);
        self.selection_changed(changed)
    }

    /// Add the depth-first range between `from` and `to`.
    pub fn select_range(&mut self, from: &str, to: &str) -> bool {
        let changed = self.selection.select_range(self.hierarchy.index(), from, to);
        self.selection_changed(changed)
    }

    /// Select every node.
    pub fn select_all(&mut self) -> bool {
        let changed = self.selection.select_all(self.hierarchy.index());
        self.selection_changed(changed)
    }

    /// Add every displayed node to the selection.
    pub fn select_all_visible(&mut self) -> bool {
        let ids = self.visible_ordering();
        let changed = self.selection.add_all(ids);
        self.selection_changed(changed)
    }

    /// Replace the selection with the nodes matching `predicate`.
    pub fn select_by_predicate<F>(&mut self, predicate: F) -> bool
    where
        F: FnMut(&Node) -> bool,
    {
        let changed = self
            .selection
            .select_by_predicate(self.hierarchy.index(), predicate);
        self.selection_changed(changed)
    }

    /// Select exactly the unselected nodes.
    pub fn invert_selection(&mut self) -> bool {
        let changed = self.selection.invert(self.hierarchy.index());
        self.selection_changed(changed)
    }

    /// Empty the selection.
    pub fn clear_selection(&mut self) -> bool {
        let changed = self.selection.clear();
        self.selection_changed(changed)
    }

    /// Select per click modifiers, focus the node, run the click action, and trigger a lazy
    /// load for unloaded childless nodes.
    pub fn node_click(&mut self, id: &str, modifiers: Modifiers) -> bool {
        if !self.hierarchy.index().contains(id) {
            return false;
        }
        let changed = self
            .selection
            .handle_click(self.hierarchy.index(), id, modifiers);
        self.set_focus(id);
        self.selection_changed(changed);
        self.run_action(ActionSlot::NodeClick);
        if self.needs_load(id) {
            self.load_children(id);
        }
        true
    }

    /// Record a hover and run the hover action.
    pub fn node_hover(&mut self, id: &str) -> bool {
        if !self.hierarchy.index().contains(id) || self.hovered.as_deref() == Some(id) {
            return false;
        }
        self.hovered = Some(id.to_string());
        self.run_action(ActionSlot::NodeHover);
        true
    }

    // ----- Context menu ------------------------------------------------------------------

    /// Labels of the context-menu entries that apply to `id`, in insertion order. Empty for
    /// unknown nodes.
    pub fn context_actions(&self, id: &str) -> Vec<&str> {
        let Some(record) = self.hierarchy.record(id) else {
            return Vec::new();
        };
        self.context_actions
            .iter()
            .filter(|action| action.can_execute(record))
            .map(ContextAction::label)
            .collect()
    }

    /// Run the context-menu entry `label` against `id`.
    ///
    /// Unknown nodes, unknown labels and entries whose guard rejects the node fail with
    /// [`ActionError::NotExecutable`]. Failures reported by the entry itself are also recorded
    /// as [`DiagnosticEvent::ActionFailed`].
    pub fn run_context_action(&mut self, id: &str, label: &str) -> Result<(), ActionError> {
        let not_executable = || ActionError::NotExecutable(label.to_string());
        let record = self.hierarchy.record(id).ok_or_else(not_executable)?;
        let action = self
            .context_actions
            .iter_mut()
            .find(|action| action.label() == label)
            .ok_or_else(not_executable)?;

        match action.execute(record) {
            Ok(()) => Ok(()),
            Err(err @ ActionError::NotExecutable(_)) => {
                tracing::debug!(node_id = %id, action = %label, "context action not executable");
                Err(err)
            }
            Err(err) => {
                self.diagnostics.record(DiagnosticEvent::ActionFailed {
                    action: label.to_string(),
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    // ----- Search --------------------------------------------------------------------------

    /// Record a keystroke in the search box. Empty input clears at once; anything else is
    /// evaluated by [`TreeView::tick`] after the debounce delay.
    pub fn set_search_query(&mut self, query: &str, now: Instant) {
        let had_results = self.search.is_active();
        if self.search.set_query(query, now) == QueryUpdate::Cleared && had_results {
            self.refresh_display();
            self.bump(TreeChangeKind::Search);
        }
    }

    /// Drive time-based work. Returns `true` if a debounced search was evaluated.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.search.poll(now) {
            Some(query) => {
                self.evaluate_search(&query);
                true
            }
            None => false,
        }
    }

    /// Evaluate the pending query now, skipping the rest of the delay.
    pub fn flush_search(&mut self) -> bool {
        match self.search.flush() {
            Some(query) => {
                self.evaluate_search(&query);
                true
            }
            None => false,
        }
    }

    /// Clear the query, pending evaluation and results. Returns `false` when no search was in
    /// progress, without notifying subscribers.
    pub fn clear_search(&mut self) -> bool {
        let search = &self.search;
        if search.query().is_empty()
            && !search.is_active()
            && !search.is_pending()
            && !search.is_searching()
        {
            return false;
        }
        let had_results = search.is_active();
        self.search.clear();
        if had_results {
            self.refresh_display();
        }
        self.bump(TreeChangeKind::Search);
        true
    }

    /// Evaluate `query` immediately.
    pub fn evaluate_search(&mut self, query: &str) {
        if !self.search.accepts(query) {
            self.search.clear_results();
            self.refresh_display();
            self.bump(TreeChangeKind::Search);
            return;
        }

        self.search.begin();
        self.bump(TreeChangeKind::Search);
        let awaiting_server =
            self.search.mode() != SearchMode::Client && self.run_action(ActionSlot::ServerSearch);

        let results = match self.search.run_client(&self.hierarchy, query) {
            Ok(results) => results,
            Err(err) => {
                self.diagnostics.record(DiagnosticEvent::InvalidSearch {
                    query: query.to_string(),
                    message: err.to_string(),
                });
                Vec::new()
            }
        };
        tracing::debug!(query, matches = results.len(), "search evaluated");

        let expansions = required_expansions(
            self.hierarchy.index(),
            results.iter().map(|m| m.node_id.as_str()),
        );
        let writes = self.state.expand_many(self.hierarchy.index(), expansions);
        self.search.finish(query, results);
        if awaiting_server {
            // Stays set until the host answers with `apply_server_results`.
            self.search.begin();
        }
        if !self.commit(writes) {
            self.refresh_display();
        }
        self.bump(TreeChangeKind::Search);
    }

    /// Union server-provided match ids into the results and reveal them.
    pub fn apply_server_results<I, S>(&mut self, ids: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let was_searching = self.search.is_searching();
        let added = self
            .search
            .merge_server_results(self.hierarchy.index(), ids);
        if added.is_empty() {
            if was_searching {
                self.bump(TreeChangeKind::Search);
            }
            return false;
        }
        let expansions =
            required_expansions(self.hierarchy.index(), added.iter().map(String::as_str));
        let writes = self.state.expand_many(self.hierarchy.index(), expansions);
        if !self.commit(writes) {
            self.refresh_display();
        }
        self.bump(TreeChangeKind::Search);
        true
    }

    // ----- Loading -------------------------------------------------------------------------

    fn needs_load(&self, id: &str) -> bool {
        self.config.lazy_load_children
            && !self.loaded.contains(id)
            && self.hierarchy.node(id).is_some_and(|n| n.children.is_empty())
    }

    /// Trigger the lazy-load action for `id` once. The host answers with
    /// [`TreeView::set_items`].
    pub fn load_children(&mut self, id: &str) -> bool {
        if !self.config.lazy_load_children
            || !self.actions.contains_key(&ActionSlot::LazyLoad)
            || !self.hierarchy.index().contains(id)
            || !self.loaded.insert(id.to_string())
        {
            return false;
        }

        self.is_loading = true;
        self.bump(TreeChangeKind::Loading);
        let ok = self.run_action(ActionSlot::LazyLoad);
        if !ok {
            self.loaded.remove(id);
        }
        self.is_loading = false;
        self.bump(TreeChangeKind::Loading);
        ok
    }

    /// Replace the items and rebuild the hierarchy. In-memory state is kept for ids that
    /// survive; new ids are seeded from their persisted flags. Undo history is cleared.
    pub fn set_items(&mut self, items: Vec<R>) {
        let next = Hierarchy::build(
            items,
            self.config.link_strategy,
            self.config.sort.as_ref(),
            &mut self.diagnostics,
        );
        let previous = std::mem::replace(&mut self.hierarchy, next);
        let writes = self.state.rebuild(
            previous.index(),
            &self.hierarchy,
            self.config.default_expand_level,
        );
        drop(previous);
        self.write_flags(&writes);

        let index = self.hierarchy.index();
        self.loaded.retain(|id| index.contains(id));
        if self.hovered.as_deref().is_some_and(|id| !index.contains(id)) {
            self.hovered = None;
        }
        self.search.retain(index);
        let selection_changed = self.selection.retain(index);

        self.refresh_display();
        self.bump(TreeChangeKind::Structure);
        self.selection_changed(selection_changed);
    }

    // ----- Scrolling -----------------------------------------------------------------------

    /// Set the viewport extent.
    pub fn set_viewport(&mut self, viewport: f64) {
        if self.virtualizer.viewport() == viewport {
            return;
        }
        self.virtualizer.set_viewport(viewport);
        self.bump(TreeChangeKind::Scroll);
    }

    /// Scroll to `offset`.
    pub fn scroll_to_offset(&mut self, offset: f64) {
        let before = self.virtualizer.scroll_offset();
        self.virtualizer.scroll_to_offset(offset);
        if self.virtualizer.scroll_offset() != before {
            self.bump(TreeChangeKind::Scroll);
        }
    }

    /// Scroll so that displayed position `index` lands per `align`.
    pub fn scroll_to_index(&mut self, index: usize, align: Align) -> f64 {
        let before = self.virtualizer.scroll_offset();
        let after = self.virtualizer.scroll_to_index(index, align);
        if after != before {
            self.bump(TreeChangeKind::Scroll);
        }
        after
    }

    /// Scroll to the row of `id`, if displayed.
    pub fn scroll_to_node(&mut self, id: &str, align: Align) -> bool {
        match self.position_of(id) {
            Some(index) => {
                self.scroll_to_index(index, align);
                true
            }
            None => false,
        }
    }

    /// Scroll the minimum distance to show the row of `id`. No-op until a viewport is set.
    pub fn scroll_node_into_view(&mut self, id: &str) -> bool {
        if self.virtualizer.viewport() <= 0.0 {
            return false;
        }
        self.scroll_to_node(id, Align::Auto)
    }

    /// Record the rendered size of displayed position `index`.
    pub fn measure(&mut self, index: usize, size: f64) -> bool {
        if !self.virtualizer.measure(index, size) {
            return false;
        }
        self.bump(TreeChangeKind::Scroll);
        true
    }
}
