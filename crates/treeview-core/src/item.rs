//! Collaborator contracts.
//!
//! The engine never owns a data source. It reads records through [`TreeItem`], writes persisted
//! flags back through [`FlagSink`], publishes the selection through [`SelectionSink`], and triggers
//! host-side work (lazy loading, server search, notifications) through [`ExternalAction`].

use crate::error::ActionError;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Typed value read from a record field (sort keys, searchable text, labels).
///
/// Deserialization is untagged, so JSON numbers always become [`FieldValue::Number`].
/// [`FieldValue::Date`] only exists when a host builds it in code, e.g. from its own
/// [`TreeItem::field`] implementation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Boolean value.
    Bool(bool),
    /// Numeric value.
    Number(f64),
    /// Textual value.
    Text(String),
    /// Timestamp in milliseconds since the Unix epoch. Never produced by deserialization.
    Date(i64),
}

impl FieldValue {
    /// Textual form used for search matching and string-fallback ordering.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(text) => Cow::Borrowed(text.as_str()),
            other => Cow::Owned(other.to_string()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{}", value),
            Self::Number(value) => write!(f, "{}", value),
            Self::Text(value) => f.write_str(value),
            Self::Date(millis) => write!(f, "{}", millis),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Parent reference used by the association linkage strategy.
///
/// Each entry is the [`TreeItem::record_key`] of another record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ParentLink {
    /// No parent (root).
    #[default]
    None,
    /// Zero-or-one association.
    One(String),
    /// Zero-or-many association; only the first entry is used.
    Many(Vec<String>),
}

impl ParentLink {
    /// The record key the node is attached under, if any.
    pub fn first(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::One(key) => Some(key.as_str()),
            Self::Many(keys) => keys.first().map(String::as_str),
        }
    }
}

/// Read access to one external record.
///
/// Empty strings are treated the same as absent values.
pub trait TreeItem {
    /// Identifier of the external record itself (used by the association strategy and by
    /// record-id selection output).
    fn record_key(&self) -> Cow<'_, str>;

    /// Node identifier. Records without one are dropped from the hierarchy.
    fn node_id(&self) -> Option<Cow<'_, str>>;

    /// Explicit parent node id (parent-attribute strategy).
    fn parent_id(&self) -> Option<Cow<'_, str>> {
        None
    }

    /// Associated parent record(s) (association strategy).
    fn parent_link(&self) -> ParentLink {
        ParentLink::None
    }

    /// Dotted structure id such as `"1.2.3"` (structure-id strategy).
    fn structure_id(&self) -> Option<Cow<'_, str>> {
        None
    }

    /// Persisted "shown" flag. Absent means shown.
    fn visible_flag(&self) -> Option<bool> {
        None
    }

    /// Persisted expanded flag. Absent means collapsed.
    fn expanded_flag(&self) -> Option<bool> {
        None
    }

    /// Named attribute value (sort keys, searchable fields, labels).
    fn field(&self, _name: &str) -> Option<FieldValue> {
        None
    }
}

/// Write-back target for persisted per-record flags.
pub trait FlagSink<R> {
    /// Called after the in-memory expanded flag of `record`'s node changed.
    fn set_expanded(&mut self, record: &R, expanded: bool);

    /// Called after the in-memory shown flag of `record`'s node changed.
    fn set_visible(&mut self, record: &R, visible: bool);
}

/// Settable string slot receiving the serialized selection.
pub trait SelectionSink {
    /// Store the serialized selection.
    fn set_value(&mut self, value: &str);
}

/// Zero-argument host operation guarded by `can_execute`.
///
/// The engine only triggers actions; if the host performs asynchronous work it reports the
/// outcome later by feeding new items or results back into the view.
pub trait ExternalAction {
    /// Name used in diagnostics.
    fn name(&self) -> &str {
        "action"
    }

    /// Whether the action may run right now.
    fn can_execute(&self) -> bool {
        true
    }

    /// Run the action.
    fn execute(&mut self) -> Result<(), ActionError>;
}

/// [`ExternalAction`] backed by a closure.
pub struct ActionFn<F> {
    name: String,
    enabled: bool,
    run: F,
}

impl<F> ActionFn<F>
where
    F: FnMut() -> Result<(), ActionError>,
{
    /// Wrap `run` as an always-executable action.
    pub fn new(name: impl Into<String>, run: F) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            run,
        }
    }

    /// Set the `can_execute` guard.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl<F> ExternalAction for ActionFn<F>
where
    F: FnMut() -> Result<(), ActionError>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn can_execute(&self) -> bool {
        self.enabled
    }

    fn execute(&mut self) -> Result<(), ActionError> {
        (self.run)()
    }
}

type ContextGuard<R> = Box<dyn Fn(&R) -> bool>;
type ContextRun<R> = Box<dyn FnMut(&R) -> Result<(), ActionError>>;

/// Labeled per-node operation offered by a context menu.
///
/// The guard decides, per record, whether the entry is offered at all.
pub struct ContextAction<R> {
    label: String,
    can_execute: ContextGuard<R>,
    action: ContextRun<R>,
}

impl<R> ContextAction<R> {
    /// An entry offered for every node.
    pub fn new<F>(label: impl Into<String>, action: F) -> Self
    where
        F: FnMut(&R) -> Result<(), ActionError> + 'static,
    {
        Self {
            label: label.into(),
            can_execute: Box::new(|_| true),
            action: Box::new(action),
        }
    }

    /// Offer the entry only for records accepted by `guard`.
    pub fn with_guard<G>(mut self, guard: G) -> Self
    where
        G: Fn(&R) -> bool + 'static,
    {
        self.can_execute = Box::new(guard);
        self
    }

    /// Menu label, also the name used in diagnostics.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether the entry applies to `record`.
    pub fn can_execute(&self, record: &R) -> bool {
        (self.can_execute)(record)
    }

    /// Run against `record`. Fails with [`ActionError::NotExecutable`] when the guard rejects it.
    pub fn execute(&mut self, record: &R) -> Result<(), ActionError> {
        if !self.can_execute(record) {
            return Err(ActionError::NotExecutable(self.label.clone()));
        }
        (self.action)(record)
    }
}

impl<R> fmt::Debug for ContextAction<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextAction")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// A ready-made in-memory record, convenient for hosts that hold plain data
/// (and for deserializing tree data from JSON).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Record {
    /// External record identifier. Falls back to `id` when empty.
    pub key: String,
    /// Node identifier.
    pub id: Option<String>,
    /// Parent node identifier.
    pub parent_id: Option<String>,
    /// Keys of associated parent records.
    pub parent_refs: Vec<String>,
    /// Dotted structure id.
    pub structure_id: Option<String>,
    /// Persisted shown flag.
    pub visible: Option<bool>,
    /// Persisted expanded flag.
    pub expanded: Option<bool>,
    /// Named attributes.
    pub fields: BTreeMap<String, FieldValue>,
}

impl Record {
    /// Create a record whose key and node id are both `id`.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            key: id.clone(),
            id: Some(id),
            ..Self::default()
        }
    }

    /// Set the external record key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Set the parent node id.
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Associate with a parent record key.
    pub fn with_parent_ref(mut self, key: impl Into<String>) -> Self {
        self.parent_refs.push(key.into());
        self
    }

    /// Set the dotted structure id.
    pub fn with_structure_id(mut self, structure_id: impl Into<String>) -> Self {
        self.structure_id = Some(structure_id.into());
        self
    }

    /// Set the persisted shown flag.
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = Some(visible);
        self
    }

    /// Set the persisted expanded flag.
    pub fn with_expanded(mut self, expanded: bool) -> Self {
        self.expanded = Some(expanded);
        self
    }

    /// Set a named attribute.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}

fn non_empty(value: &Option<String>) -> Option<Cow<'_, str>> {
    value
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(Cow::Borrowed)
}

impl TreeItem for Record {
    fn record_key(&self) -> Cow<'_, str> {
        if self.key.is_empty() {
            Cow::Borrowed(self.id.as_deref().unwrap_or_default())
        } else {
            Cow::Borrowed(self.key.as_str())
        }
    }

    fn node_id(&self) -> Option<Cow<'_, str>> {
        non_empty(&self.id)
    }

    fn parent_id(&self) -> Option<Cow<'_, str>> {
        non_empty(&self.parent_id)
    }

    fn parent_link(&self) -> ParentLink {
        match self.parent_refs.as_slice() {
            [] => ParentLink::None,
            [one] => ParentLink::One(one.clone()),
            many => ParentLink::Many(many.to_vec()),
        }
    }

    fn structure_id(&self) -> Option<Cow<'_, str>> {
        non_empty(&self.structure_id)
    }

    fn visible_flag(&self) -> Option<bool> {
        self.visible
    }

    fn expanded_flag(&self) -> Option<bool> {
        self.expanded
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        self.fields.get(name).cloned()
    }
}
