//! Search Engine
//!
//! Client-side matching scans the configured searchable fields of every node. Matching uses
//! **character offsets** (not byte offsets) for all reported ranges and supports:
//!
//! - plain substring search (escaped and compiled into a regex), case-insensitive by default
//! - regex search
//! - optional whole-word matching
//!
//! [`SearchEngine`] holds the per-instance search state: the current query, the debounced
//! pending query, the result set and the transient "searching" flag. Orchestration that touches
//! other components (expanding ancestors, running the server action) lives in the view.

use crate::debounce::Debouncer;
use crate::hierarchy::Hierarchy;
use crate::index::NodeIndex;
use crate::item::TreeItem;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Default minimum query length, in characters.
pub const DEFAULT_MIN_QUERY_CHARS: usize = 2;

/// Default debounce delay.
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Where matches come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Match node fields locally.
    #[default]
    Client,
    /// Delegate to the server-search action; results arrive through
    /// [`TreeView::apply_server_results`](crate::TreeView::apply_server_results).
    Server,
    /// Run the server action and match locally; results are the union.
    Hybrid,
}

/// Options that control how matching is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// If `true`, performs a case-sensitive search.
    pub case_sensitive: bool,
    /// If `true`, matches only whole words (alphanumeric and `_`).
    pub whole_word: bool,
    /// If `true`, treats the query as a regex pattern.
    pub regex: bool,
}

/// A half-open character range within a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchMatch {
    /// Inclusive start character offset.
    pub start: usize,
    /// Exclusive end character offset.
    pub end: usize,
}

impl SearchMatch {
    /// Returns the length of the match in characters.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns `true` if the match is empty.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Search errors.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The provided regex pattern failed to compile.
    #[error("invalid regex: {0}")]
    InvalidRegex(#[from] regex::Error),
}

/// First match of the query within one searchable field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMatch {
    /// Field name.
    pub field: String,
    /// Full field value as text.
    pub value: String,
    /// Matched range within `value`.
    pub range: SearchMatch,
}

impl FieldMatch {
    /// The matched substring.
    pub fn matched_text(&self) -> &str {
        let index = CharIndex::new(&self.value);
        let start = index.char_to_byte(self.range.start);
        let end = index.char_to_byte(self.range.end);
        self.value.get(start..end).unwrap_or_default()
    }
}

/// A matching node and the fields that matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeMatch {
    /// Matching node.
    pub node_id: String,
    /// Matching fields, in configured field order. Empty for server-provided results.
    pub matches: Vec<FieldMatch>,
}

/// One run of a label split by [`highlight_segments`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightSegment {
    /// Text of the run.
    pub text: String,
    /// `true` if the run is a match.
    pub highlighted: bool,
}

#[derive(Debug)]
pub(crate) struct CharIndex {
    char_to_byte: Vec<usize>,
    text_len: usize,
}

impl CharIndex {
    pub(crate) fn new(text: &str) -> Self {
        let mut char_to_byte: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        char_to_byte.push(text.len());
        Self {
            char_to_byte,
            text_len: text.len(),
        }
    }

    pub(crate) fn char_count(&self) -> usize {
        self.char_to_byte.len().saturating_sub(1)
    }

    pub(crate) fn char_to_byte(&self, char_offset: usize) -> usize {
        let clamped = char_offset.min(self.char_count());
        self.char_to_byte
            .get(clamped)
            .copied()
            .unwrap_or(self.text_len)
    }

    pub(crate) fn byte_to_char(&self, byte_offset: usize) -> usize {
        let clamped = byte_offset.min(self.text_len);
        match self.char_to_byte.binary_search(&clamped) {
            Ok(idx) | Err(idx) => idx,
        }
    }

    fn char_at(&self, text: &str, char_offset: usize) -> Option<char> {
        if char_offset >= self.char_count() {
            return None;
        }
        let start = self.char_to_byte[char_offset];
        let end = self.char_to_byte[char_offset + 1];
        text.get(start..end)?.chars().next()
    }
}

/// A query compiled once and applied to many field values.
#[derive(Debug, Clone)]
pub struct Matcher {
    regex: Regex,
    whole_word: bool,
}

impl Matcher {
    /// Compile `query` under `options`.
    pub fn new(query: &str, options: SearchOptions) -> Result<Self, SearchError> {
        let pattern = if options.regex {
            query.to_string()
        } else {
            regex::escape(query)
        };
        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(!options.case_sensitive)
            .build()?;
        Ok(Self {
            regex,
            whole_word: options.whole_word,
        })
    }

    /// First non-empty match in `text`.
    pub fn find(&self, text: &str) -> Option<SearchMatch> {
        self.find_iter(text).next()
    }

    /// All non-overlapping, non-empty matches in `text`.
    pub fn find_all(&self, text: &str) -> Vec<SearchMatch> {
        self.find_iter(text).collect()
    }

    fn find_iter<'a>(&'a self, text: &'a str) -> impl Iterator<Item = SearchMatch> + 'a {
        let index = CharIndex::new(text);
        self.regex.find_iter(text).filter_map(move |m| {
            let candidate = SearchMatch {
                start: index.byte_to_char(m.start()),
                end: index.byte_to_char(m.end()),
            };
            if candidate.is_empty() {
                return None;
            }
            if self.whole_word && !is_whole_word(text, &index, candidate) {
                return None;
            }
            Some(candidate)
        })
    }
}

fn is_word_char(ch: char) -> bool {
    ch == '_' || ch.is_alphanumeric()
}

fn is_whole_word(text: &str, index: &CharIndex, m: SearchMatch) -> bool {
    let before = if m.start == 0 {
        None
    } else {
        index.char_at(text, m.start - 1)
    };
    let after = index.char_at(text, m.end);

    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}

/// Match every node of `hierarchy` against `query`, in depth-first order.
///
/// A node matches if at least one of `fields` matches. An empty query matches nothing.
pub fn search_nodes<R: TreeItem>(
    hierarchy: &Hierarchy<R>,
    fields: &[String],
    query: &str,
    options: SearchOptions,
) -> Result<Vec<NodeMatch>, SearchError> {
    if query.is_empty() || fields.is_empty() {
        return Ok(Vec::new());
    }
    let matcher = Matcher::new(query, options)?;

    let mut results = Vec::new();
    for node_id in hierarchy.index().depth_first() {
        let matches: Vec<FieldMatch> = fields
            .iter()
            .filter_map(|field| {
                let value = hierarchy.field(&node_id, field)?.as_text().into_owned();
                let range = matcher.find(&value)?;
                Some(FieldMatch {
                    field: field.clone(),
                    value,
                    range,
                })
            })
            .collect();
        if !matches.is_empty() {
            results.push(NodeMatch { node_id, matches });
        }
    }
    Ok(results)
}

/// Every ancestor of every id in `matches`, deduplicated, outermost first per chain.
pub fn required_expansions<'a, I>(index: &NodeIndex, matches: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    for id in matches {
        for ancestor in index.ancestors(id).into_iter().rev() {
            if seen.insert(ancestor.clone()) {
                out.push(ancestor);
            }
        }
    }
    out
}

/// Split `text` into plain and highlighted runs for every match of `query`.
///
/// An empty query, or one that fails to compile, yields `text` as a single plain run.
pub fn highlight_segments(text: &str, query: &str, options: SearchOptions) -> Vec<HighlightSegment> {
    let plain = || {
        vec![HighlightSegment {
            text: text.to_string(),
            highlighted: false,
        }]
    };
    if query.is_empty() || text.is_empty() {
        return plain();
    }
    let Ok(matcher) = Matcher::new(query, options) else {
        return plain();
    };

    let index = CharIndex::new(text);
    let mut segments = Vec::new();
    let mut last = 0;
    for m in matcher.find_all(text) {
        let start = index.char_to_byte(m.start);
        let end = index.char_to_byte(m.end);
        if start > last {
            segments.push(HighlightSegment {
                text: text[last..start].to_string(),
                highlighted: false,
            });
        }
        segments.push(HighlightSegment {
            text: text[start..end].to_string(),
            highlighted: true,
        });
        last = end;
    }
    if last < text.len() {
        segments.push(HighlightSegment {
            text: text[last..].to_string(),
            highlighted: false,
        });
    }
    segments
}

/// Result of feeding a new query to [`SearchEngine::set_query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryUpdate {
    /// The query is empty; results were cleared immediately.
    Cleared,
    /// Evaluation is scheduled after the debounce delay.
    Scheduled,
}

/// Per-instance search state.
#[derive(Debug)]
pub struct SearchEngine {
    mode: SearchMode,
    fields: Vec<String>,
    options: SearchOptions,
    min_query_chars: usize,
    query: String,
    applied: Option<String>,
    results: Vec<NodeMatch>,
    highlighted: HashSet<String>,
    is_searching: bool,
    debouncer: Debouncer<String>,
}

impl SearchEngine {
    /// Create an idle engine.
    pub fn new(
        mode: SearchMode,
        fields: Vec<String>,
        options: SearchOptions,
        min_query_chars: usize,
        debounce: Duration,
    ) -> Self {
        Self {
            mode,
            fields,
            options,
            min_query_chars,
            query: String::new(),
            applied: None,
            results: Vec::new(),
            highlighted: HashSet::new(),
            is_searching: false,
            debouncer: Debouncer::new(debounce),
        }
    }

    /// Search mode.
    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    /// Searchable fields.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Matching options.
    pub fn options(&self) -> SearchOptions {
        self.options
    }

    /// The query as last typed (not necessarily evaluated yet).
    pub fn query(&self) -> &str {
        &self.query
    }

    /// The last evaluated query, while its results are in effect.
    pub fn applied_query(&self) -> Option<&str> {
        self.applied.as_deref()
    }

    /// Returns `true` while the results of an evaluated query are in effect.
    pub fn is_active(&self) -> bool {
        self.applied.is_some()
    }

    /// Ordered matches of the last evaluation.
    pub fn results(&self) -> &[NodeMatch] {
        &self.results
    }

    /// Ids of every current match.
    pub fn highlighted(&self) -> &HashSet<String> {
        &self.highlighted
    }

    /// Returns `true` if `id` is a current match.
    pub fn is_match(&self, id: &str) -> bool {
        self.highlighted.contains(id)
    }

    /// Returns `true` while an evaluation is in progress.
    pub fn is_searching(&self) -> bool {
        self.is_searching
    }

    /// Returns `true` while a query waits for the debounce delay.
    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// When the pending query becomes due.
    pub fn deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// Returns `true` if `query` is long enough to be evaluated. One-character queries never are.
    pub fn accepts(&self, query: &str) -> bool {
        query.chars().count() >= self.min_query_chars.max(DEFAULT_MIN_QUERY_CHARS)
    }

    /// Record a keystroke. Empty queries clear at once; anything else is debounced.
    pub fn set_query(&mut self, query: &str, now: Instant) -> QueryUpdate {
        self.query = query.to_string();
        if query.is_empty() {
            self.debouncer.cancel();
            self.clear_results();
            return QueryUpdate::Cleared;
        }
        if self.debouncer.arm(self.query.clone(), now) {
            tracing::trace!(query = %self.query, "superseded pending search");
        }
        QueryUpdate::Scheduled
    }

    /// Release the pending query if it has been stable long enough.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        self.debouncer.poll(now)
    }

    /// Release the pending query immediately.
    pub fn flush(&mut self) -> Option<String> {
        self.debouncer.flush()
    }

    /// Drop the pending query. Returns `true` if one was pending.
    pub fn cancel_pending(&mut self) -> bool {
        self.debouncer.cancel()
    }

    pub(crate) fn begin(&mut self) {
        self.is_searching = true;
    }

    /// Match locally, as the mode requires.
    pub(crate) fn run_client<R: TreeItem>(
        &self,
        hierarchy: &Hierarchy<R>,
        query: &str,
    ) -> Result<Vec<NodeMatch>, SearchError> {
        match self.mode {
            SearchMode::Client | SearchMode::Hybrid => {
                search_nodes(hierarchy, &self.fields, query, self.options)
            }
            SearchMode::Server => Ok(Vec::new()),
        }
    }

    pub(crate) fn finish(&mut self, query: &str, results: Vec<NodeMatch>) {
        self.applied = Some(query.to_string());
        self.highlighted = results.iter().map(|m| m.node_id.clone()).collect();
        self.results = results;
        self.is_searching = false;
    }

    /// Union externally provided match ids into the result set. Returns the ids that were new.
    pub(crate) fn merge_server_results<I, S>(&mut self, index: &NodeIndex, ids: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = Vec::new();
        for id in ids {
            let id = id.as_ref();
            if index.contains(id) && self.highlighted.insert(id.to_string()) {
                added.push(id.to_string());
                self.results.push(NodeMatch {
                    node_id: id.to_string(),
                    matches: Vec::new(),
                });
            }
        }
        self.is_searching = false;
        added
    }

    /// Clear results and the searching flag. The typed query is kept.
    pub fn clear_results(&mut self) {
        self.applied = None;
        self.results.clear();
        self.highlighted.clear();
        self.is_searching = false;
    }

    /// Clear everything, including the typed and pending query.
    pub fn clear(&mut self) {
        self.query.clear();
        self.debouncer.cancel();
        self.clear_results();
    }

    /// Drop matches for ids no longer in `index`.
    pub(crate) fn retain(&mut self, index: &NodeIndex) {
        self.results.retain(|m| index.contains(&m.node_id));
        self.highlighted.retain(|id| index.contains(id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_case_insensitive_substring() {
        let matcher = Matcher::new("ALP", SearchOptions::default()).unwrap();
        assert_eq!(matcher.find("Alpha"), Some(SearchMatch { start: 0, end: 3 }));
    }

    #[test]
    fn test_char_offsets_for_multibyte_text() {
        let matcher = Matcher::new("ß", SearchOptions::default()).unwrap();
        assert_eq!(matcher.find("aéß"), Some(SearchMatch { start: 2, end: 3 }));
    }

    #[test]
    fn test_whole_word() {
        let options = SearchOptions {
            whole_word: true,
            ..SearchOptions::default()
        };
        let matcher = Matcher::new("cat", options).unwrap();
        assert_eq!(matcher.find_all("concat cat cats"), vec![SearchMatch { start: 7, end: 10 }]);
    }

    #[test]
    fn test_invalid_regex() {
        let options = SearchOptions {
            regex: true,
            ..SearchOptions::default()
        };
        assert!(matches!(Matcher::new("(", options), Err(SearchError::InvalidRegex(_))));
    }

    #[test]
    fn test_highlight_segments() {
        let segments = highlight_segments("Banana", "an", SearchOptions::default());
        let texts: Vec<(&str, bool)> = segments
            .iter()
            .map(|s| (s.text.as_str(), s.highlighted))
            .collect();
        assert_eq!(
            texts,
            vec![("B", false), ("an", true), ("an", true), ("a", false)]
        );
        assert_eq!(highlight_segments("x", "", SearchOptions::default()).len(), 1);
    }

    #[test]
    fn test_empty_query_clears_immediately() {
        let now = Instant::now();
        let mut engine = SearchEngine::new(
            SearchMode::Client,
            vec!["name".to_string()],
            SearchOptions::default(),
            DEFAULT_MIN_QUERY_CHARS,
            DEFAULT_SEARCH_DEBOUNCE,
        );
        assert_eq!(engine.set_query("ab", now), QueryUpdate::Scheduled);
        assert!(engine.is_pending());
        assert_eq!(engine.set_query("", now), QueryUpdate::Cleared);
        assert!(!engine.is_pending());
        assert!(!engine.accepts("a"));
        assert!(engine.accepts("ab"));
    }

    #[test]
    fn test_single_character_queries_never_run() {
        let engine = SearchEngine::new(
            SearchMode::Client,
            vec!["name".to_string()],
            SearchOptions::default(),
            1,
            DEFAULT_SEARCH_DEBOUNCE,
        );
        assert!(!engine.accepts("x"));
        assert!(engine.accepts("xy"));
    }
}
