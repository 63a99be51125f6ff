//! Error types.
//!
//! The tree state operations themselves are total and never fail; errors only surface from
//! configuration validation and from external actions (lazy loading, server search, notification
//! callbacks), which the engine absorbs into diagnostics.

use thiserror::Error;

/// Invalid [`TreeConfig`](crate::TreeConfig) values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// The default row size must be a finite, positive number.
    #[error("invalid item size: {0}")]
    InvalidItemSize(f64),
    /// The indentation step must be a finite, non-negative number.
    #[error("invalid indent size: {0}")]
    InvalidIndentSize(f64),
    /// Queries shorter than one character cannot be searched.
    #[error("minimum query length must be at least 2, got {0}")]
    InvalidMinQueryChars(usize),
    /// Undo/redo is enabled but the history cannot hold a single action.
    #[error("history capacity must be at least 1 when undo/redo is enabled")]
    EmptyHistory,
}

/// Failure reported by an external action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// The action's `can_execute` guard was false when it was triggered.
    #[error("action `{0}` cannot execute")]
    NotExecutable(String),
    /// The action ran and reported a failure.
    #[error("action `{action}` failed: {message}")]
    Failed {
        /// Name of the action that failed.
        action: String,
        /// Failure description supplied by the action.
        message: String,
    },
}

impl ActionError {
    /// Convenience constructor for [`ActionError::Failed`].
    pub fn failed(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            action: action.into(),
            message: message.into(),
        }
    }
}
