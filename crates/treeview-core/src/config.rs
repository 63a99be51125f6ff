//! View configuration.
//!
//! [`TreeConfig`] is plain data: it can be built in code through the `with_*` setters or loaded
//! from JSON, with every missing field taking its default.
//!
//! ```rust
//! use treeview_core::{ExpandMode, LinkStrategy, TreeConfig};
//!
//! let config: TreeConfig = serde_json::from_str(
//!     r#"{ "link_strategy": "structure_id", "expand_mode": "single", "search_fields": ["name"] }"#,
//! )
//! .unwrap();
//! assert_eq!(config.link_strategy, LinkStrategy::StructureId);
//! assert_eq!(config.expand_mode, ExpandMode::Single);
//! assert_eq!(config.min_query_chars, 2);
//! assert!(config.validate().is_ok());
//! ```

use crate::diagnostics::DEFAULT_DIAGNOSTICS_CAPACITY;
use crate::error::ConfigError;
use crate::hierarchy::{LinkStrategy, SortSpec};
use crate::history::DEFAULT_MAX_HISTORY;
use crate::search::{DEFAULT_MIN_QUERY_CHARS, DEFAULT_SEARCH_DEBOUNCE, SearchMode, SearchOptions};
use crate::selection::{SelectionMode, SelectionOutput};
use crate::state::ExpandMode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default row size.
pub const DEFAULT_ITEM_SIZE: f64 = 32.0;
/// Default overscan.
pub const DEFAULT_OVERSCAN: usize = 5;
/// Default indentation step.
pub const DEFAULT_INDENT_SIZE: f64 = 20.0;

/// Everything that shapes a [`TreeView`](crate::TreeView).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// How parent/child edges are derived.
    pub link_strategy: LinkStrategy,
    /// Optional sibling sort.
    pub sort: Option<SortSpec>,
    /// Non-leaf nodes above this depth start expanded.
    pub default_expand_level: usize,
    /// Sibling expansion policy.
    pub expand_mode: ExpandMode,
    /// Selection policy.
    pub selection_mode: SelectionMode,
    /// Modifier clicks and range selection in multiple mode.
    pub enable_multi_select: bool,
    /// Selection serialization.
    pub selection_output: SelectionOutput,
    /// Where search matches come from.
    pub search_mode: SearchMode,
    /// Fields scanned by client-side search.
    pub search_fields: Vec<String>,
    /// Matching options.
    pub search_options: SearchOptions,
    /// Debounce delay in milliseconds.
    pub search_debounce_ms: u64,
    /// Queries shorter than this (in characters) clear the results. At least 2.
    pub min_query_chars: usize,
    /// Record actions for undo/redo.
    pub enable_undo_redo: bool,
    /// Undo log capacity.
    pub max_history: usize,
    /// Process key input.
    pub enable_keyboard_navigation: bool,
    /// Window the displayed rows.
    pub virtual_scrolling: bool,
    /// Estimated row size.
    pub item_size: f64,
    /// Extra rows materialized on each side of the viewport.
    pub overscan: usize,
    /// Indentation per level.
    pub indent_size: f64,
    /// Field used as the row label; the node id is used when absent.
    pub label_field: Option<String>,
    /// Leave nodes whose shown flag is off (and their subtrees) out of the display.
    pub hide_hidden_nodes: bool,
    /// While a search is active, display only matches and their ancestors.
    pub filter_to_search_results: bool,
    /// Run the lazy-load action the first time a node is expanded.
    pub lazy_load_children: bool,
    /// Retained diagnostic events.
    pub diagnostics_capacity: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            link_strategy: LinkStrategy::default(),
            sort: None,
            default_expand_level: 0,
            expand_mode: ExpandMode::default(),
            selection_mode: SelectionMode::default(),
            enable_multi_select: false,
            selection_output: SelectionOutput::default(),
            search_mode: SearchMode::default(),
            search_fields: Vec::new(),
            search_options: SearchOptions::default(),
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE.as_millis() as u64,
            min_query_chars: DEFAULT_MIN_QUERY_CHARS,
            enable_undo_redo: true,
            max_history: DEFAULT_MAX_HISTORY,
            enable_keyboard_navigation: true,
            virtual_scrolling: true,
            item_size: DEFAULT_ITEM_SIZE,
            overscan: DEFAULT_OVERSCAN,
            indent_size: DEFAULT_INDENT_SIZE,
            label_field: None,
            hide_hidden_nodes: false,
            filter_to_search_results: false,
            lazy_load_children: false,
            diagnostics_capacity: DEFAULT_DIAGNOSTICS_CAPACITY,
        }
    }
}

impl TreeConfig {
    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.item_size.is_finite() || self.item_size <= 0.0 {
            return Err(ConfigError::InvalidItemSize(self.item_size));
        }
        if !self.indent_size.is_finite() || self.indent_size < 0.0 {
            return Err(ConfigError::InvalidIndentSize(self.indent_size));
        }
        if self.min_query_chars < DEFAULT_MIN_QUERY_CHARS {
            return Err(ConfigError::InvalidMinQueryChars(self.min_query_chars));
        }
        if self.enable_undo_redo && self.max_history == 0 {
            return Err(ConfigError::EmptyHistory);
        }
        Ok(())
    }

    /// Debounce delay.
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    /// Undo log capacity, or `None` when undo/redo is disabled.
    pub fn history_capacity(&self) -> Option<usize> {
        self.enable_undo_redo.then_some(self.max_history)
    }

    /// Set the linkage strategy.
    pub fn with_link_strategy(mut self, strategy: LinkStrategy) -> Self {
        self.link_strategy = strategy;
        self
    }

    /// Sort siblings.
    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Set the initial expansion depth.
    pub fn with_default_expand_level(mut self, level: usize) -> Self {
        self.default_expand_level = level;
        self
    }

    /// Set the expansion policy.
    pub fn with_expand_mode(mut self, mode: ExpandMode) -> Self {
        self.expand_mode = mode;
        self
    }

    /// Set the selection policy and multi-select switch.
    pub fn with_selection(mut self, mode: SelectionMode, multi_select: bool) -> Self {
        self.selection_mode = mode;
        self.enable_multi_select = multi_select;
        self
    }

    /// Set the selection serialization.
    pub fn with_selection_output(mut self, output: SelectionOutput) -> Self {
        self.selection_output = output;
        self
    }

    /// Set the search mode.
    pub fn with_search_mode(mut self, mode: SearchMode) -> Self {
        self.search_mode = mode;
        self
    }

    /// Set the searchable fields.
    pub fn with_search_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Set the matching options.
    pub fn with_search_options(mut self, options: SearchOptions) -> Self {
        self.search_options = options;
        self
    }

    /// Set the debounce delay.
    pub fn with_search_debounce(mut self, delay: Duration) -> Self {
        self.search_debounce_ms = delay.as_millis() as u64;
        self
    }

    /// Enable or disable undo/redo.
    pub fn with_undo_redo(mut self, enabled: bool) -> Self {
        self.enable_undo_redo = enabled;
        self
    }

    /// Set the undo log capacity.
    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    /// Enable or disable keyboard handling.
    pub fn with_keyboard_navigation(mut self, enabled: bool) -> Self {
        self.enable_keyboard_navigation = enabled;
        self
    }

    /// Enable or disable windowing.
    pub fn with_virtual_scrolling(mut self, enabled: bool) -> Self {
        self.virtual_scrolling = enabled;
        self
    }

    /// Set the estimated row size.
    pub fn with_item_size(mut self, item_size: f64) -> Self {
        self.item_size = item_size;
        self
    }

    /// Set the overscan.
    pub fn with_overscan(mut self, overscan: usize) -> Self {
        self.overscan = overscan;
        self
    }

    /// Set the indentation step.
    pub fn with_indent_size(mut self, indent_size: f64) -> Self {
        self.indent_size = indent_size;
        self
    }

    /// Use `field` as the row label.
    pub fn with_label_field(mut self, field: impl Into<String>) -> Self {
        self.label_field = Some(field.into());
        self
    }

    /// Leave hidden nodes out of the display.
    pub fn with_hide_hidden_nodes(mut self, hide: bool) -> Self {
        self.hide_hidden_nodes = hide;
        self
    }

    /// Display only search matches and their ancestors while searching.
    pub fn with_filter_to_search_results(mut self, filter: bool) -> Self {
        self.filter_to_search_results = filter;
        self
    }

    /// Run the lazy-load action on first expansion.
    pub fn with_lazy_load_children(mut self, lazy: bool) -> Self {
        self.lazy_load_children = lazy;
        self
    }
}
