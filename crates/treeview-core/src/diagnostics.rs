//! Observability hook for absorbed data problems.
//!
//! Malformed structural data never fails a build: the builder drops or re-roots the offending
//! records and reports what it did here. Each event is also emitted through `tracing`.

use std::collections::VecDeque;
use std::fmt;

/// Default number of events retained by [`Diagnostics`].
pub const DEFAULT_DIAGNOSTICS_CAPACITY: usize = 256;

/// Why a record was left out of the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The record has no node id.
    MissingId,
    /// Another record already claimed the node id.
    DuplicateId,
    /// The structure-id strategy is active and the record has no structure id.
    MissingStructureId,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::MissingId => "missing node id",
            Self::DuplicateId => "duplicate node id",
            Self::MissingStructureId => "missing structure id",
        };
        f.write_str(text)
    }
}

/// One absorbed problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticEvent {
    /// A record was left out of the hierarchy.
    DroppedItem {
        /// Key of the dropped record.
        record_key: String,
        /// Why it was dropped.
        reason: DropReason,
    },
    /// A node's declared parent could not be resolved, so it became a root.
    OrphanPromoted {
        /// The promoted node.
        node_id: String,
        /// The unresolved parent reference (node id, record key or structure id).
        missing_parent: String,
    },
    /// A node was part of a parent cycle and was detached to become a root.
    CycleBroken {
        /// The detached node.
        node_id: String,
    },
    /// An external action reported a failure.
    ActionFailed {
        /// Action name.
        action: String,
        /// Failure description.
        message: String,
    },
    /// A search query could not be evaluated (e.g. an invalid regex).
    InvalidSearch {
        /// The query.
        query: String,
        /// Failure description.
        message: String,
    },
}

/// Callback invoked for every recorded event.
pub type DiagnosticCallback = Box<dyn FnMut(&DiagnosticEvent)>;

/// Bounded event log plus an optional callback.
pub struct Diagnostics {
    events: VecDeque<DiagnosticEvent>,
    capacity: usize,
    callback: Option<DiagnosticCallback>,
}

impl Diagnostics {
    /// Create a log that keeps the most recent `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::new(),
            capacity,
            callback: None,
        }
    }

    /// Install a callback invoked synchronously for every event.
    pub fn set_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&DiagnosticEvent) + 'static,
    {
        self.callback = Some(Box::new(callback));
    }

    /// Change the retention limit, dropping the oldest events if needed.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        while self.events.len() > capacity {
            self.events.pop_front();
        }
    }

    /// Retention limit.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Remove the callback.
    pub fn clear_callback(&mut self) {
        self.callback = None;
    }

    /// Record an event.
    pub fn record(&mut self, event: DiagnosticEvent) {
        match &event {
            DiagnosticEvent::DroppedItem { record_key, reason } => {
                tracing::debug!(record_key = %record_key, reason = %reason, "dropped tree item");
            }
            DiagnosticEvent::OrphanPromoted {
                node_id,
                missing_parent,
            } => {
                tracing::debug!(
                    node_id = %node_id,
                    missing_parent = %missing_parent,
                    "promoted orphan node to root"
                );
            }
            DiagnosticEvent::CycleBroken { node_id } => {
                tracing::warn!(node_id = %node_id, "broke parent cycle");
            }
            DiagnosticEvent::ActionFailed { action, message } => {
                tracing::warn!(action = %action, error = %message, "external action failed");
            }
            DiagnosticEvent::InvalidSearch { query, message } => {
                tracing::debug!(query = %query, error = %message, "search query rejected");
            }
        }

        if let Some(callback) = self.callback.as_mut() {
            callback(&event);
        }

        if self.capacity == 0 {
            return;
        }
        if self.events.len() >= self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Retained events, oldest first.
    pub fn events(&self) -> impl Iterator<Item = &DiagnosticEvent> {
        self.events.iter()
    }

    /// Number of retained events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if no events are retained.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Remove and return all retained events.
    pub fn drain(&mut self) -> Vec<DiagnosticEvent> {
        self.events.drain(..).collect()
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(DEFAULT_DIAGNOSTICS_CAPACITY)
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("events", &self.events)
            .field("capacity", &self.capacity)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}
