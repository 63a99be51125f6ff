#![warn(missing_docs)]
//! Treeview Core - Headless Interactive Tree View Engine
//!
//! # Overview
//!
//! `treeview-core` is the state and layout kernel of an interactive tree (hierarchical list)
//! widget. It builds a forest from flat host records, tracks expansion, visibility, selection
//! and focus with undo/redo, searches with debouncing, and computes the flattened, windowed
//! sequence of rows a renderer has to draw. It does not draw anything itself.
//!
//! # Core Features
//!
//! - **Three linkage strategies**: parent attribute, parent reference, dotted structure ids
//! - **Total operations**: malformed data (orphans, duplicates, cycles) is absorbed and reported
//!   through [`Diagnostics`], never returned as an error
//! - **Undo/Redo**: expansion and visibility actions, bounded history
//! - **Search**: client, server or hybrid, with ancestor expansion and match highlighting
//! - **Virtualization**: variable-height rows, overscan, aligned scroll-to-index
//! - **State Tracking**: version numbers and RAII change subscriptions
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  TreeView / Commands / Keyboard             │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  Row Model (guides, ARIA, labels)           │  ← Rendering Data
//! ├─────────────────────────────────────────────┤
//! │  Virtualizer                                │  ← Windowing
//! ├─────────────────────────────────────────────┤
//! │  Flattener (expansion, hidden, search)      │  ← Displayed Sequence
//! ├─────────────────────────────────────────────┤
//! │  State Store / Selection / Search           │  ← Mutable State
//! ├─────────────────────────────────────────────┤
//! │  Hierarchy Builder + Node Index             │  ← Structure
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use treeview_core::{Record, TreeConfig, TreeKey, TreeView};
//!
//! let items = vec![
//!     Record::new("1").with_structure_id("1").with_field("name", "Documents"),
//!     Record::new("2").with_structure_id("1.1").with_field("name", "Invoices"),
//!     Record::new("3").with_structure_id("1.2").with_field("name", "Receipts"),
//!     Record::new("4").with_structure_id("2").with_field("name", "Pictures"),
//! ];
//! let config = TreeConfig::default()
//!     .with_link_strategy(treeview_core::LinkStrategy::StructureId)
//!     .with_label_field("name");
//! let mut view = TreeView::new(items, config).unwrap();
//! view.set_viewport(320.0);
//!
//! view.handle_key(TreeKey::Down);
//! view.handle_key(TreeKey::Right);
//! assert_eq!(view.visible_ordering(), ["1", "2", "3", "4"]);
//!
//! for row in view.visible_rows() {
//!     println!("{}{} {}", row.guide_prefix(), row.disclosure(), row.label);
//! }
//! ```
//!
//! ## Observing Changes
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use treeview_core::{Record, TreeConfig, TreeView};
//!
//! let mut view = TreeView::new(
//!     vec![Record::new("a"), Record::new("b").with_parent("a")],
//!     TreeConfig::default(),
//! )
//! .unwrap();
//!
//! let changes = Rc::new(Cell::new(0));
//! let counter = changes.clone();
//! let subscription = view.subscribe(move |change| {
//!     println!("{:?}: {} -> {}", change.kind, change.old_version, change.new_version);
//!     counter.set(counter.get() + 1);
//! });
//!
//! view.expand_all();
//! drop(subscription);
//! view.collapse_all();
//! assert_eq!(changes.get(), 1);
//! ```
//!
//! # Module Description
//!
//! - [`item`] - Host record access, flag/selection sinks, external and context-menu actions
//! - [`hierarchy`] - Forest construction and sibling sorting
//! - [`index`] - Node arena and structural queries
//! - [`state`] - Expansion, visibility and focus with undo/redo
//! - [`selection`] - Selection modes and serialization
//! - [`search`] - Matching, debounced search engine, highlighting
//! - [`flatten`] - Displayed sequence computation
//! - [`virtualizer`] - Windowing over variable-size rows
//! - [`row`] - Row model for renderers
//! - [`keyboard`] - Key bindings
//! - [`commands`] - Unified command interface
//! - [`view`] - The facade owning all of the above
//!
//! # Unicode Support
//!
//! - Search offsets are in characters, not bytes
//! - Label width is measured in terminal cells (CJK double width)
//! - Truncation never splits a grapheme cluster

pub mod commands;
pub mod config;
pub mod debounce;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod flatten;
pub mod hierarchy;
pub mod history;
pub mod index;
pub mod item;
pub mod keyboard;
pub mod row;
pub mod search;
pub mod selection;
pub mod state;
pub mod view;
pub mod virtualizer;

pub use commands::{
    CommandResult, ExpandCommand, FocusCommand, HistoryCommand, SearchCommand, SelectionCommand,
    TreeCommand, ViewCommand, VisibilityCommand,
};
pub use config::TreeConfig;
pub use debounce::Debouncer;
pub use diagnostics::{DiagnosticCallback, DiagnosticEvent, Diagnostics, DropReason};
pub use error::{ActionError, ConfigError};
pub use events::{Listeners, Subscription, TreeChange, TreeChangeCallback, TreeChangeKind};
pub use flatten::{FlatNode, FlattenFilter, flatten, visible_ordering};
pub use hierarchy::{Hierarchy, LinkStrategy, SortOrder, SortSpec};
pub use history::TreeAction;
pub use index::{Node, NodeIndex};
pub use item::{
    ActionFn, ContextAction, ExternalAction, FieldValue, FlagSink, ParentLink, Record,
    SelectionSink, TreeItem,
};
pub use keyboard::{KeyInput, KeyOutcome, Modifiers, TreeKey};
pub use row::{
    AriaAttributes, BreadcrumbItem, Connector, Guide, RowModel, display_width, truncate_to_width,
};
pub use search::{
    FieldMatch, HighlightSegment, Matcher, NodeMatch, QueryUpdate, SearchEngine, SearchError,
    SearchMatch, SearchMode, SearchOptions, highlight_segments, required_expansions, search_nodes,
};
pub use selection::{SelectionMode, SelectionModel, SelectionOutput};
pub use state::{ExpandMode, FlagKind, FlagWrite, HistoryState, TreeState};
pub use view::{ActionSlot, TreeMetrics, TreeView, TreeViewBuilder};
pub use virtualizer::{Align, VirtualItem, VirtualWindow, Virtualizer};
