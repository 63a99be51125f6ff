//! Presentation contract.
//!
//! A renderer needs one [`RowModel`] per materialized row: indentation, connector guides
//! derived from the node's `path`, state flags, a label, and ARIA-style `treeitem` attributes.
//! Label helpers measure text in terminal cells (UAX #11) and truncate on grapheme boundaries.

use crate::hierarchy::Hierarchy;
use crate::item::TreeItem;
use crate::search::SearchEngine;
use crate::selection::SelectionModel;
use crate::state::TreeState;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Suffix appended by [`truncate_to_width`].
pub const ELLIPSIS: &str = "…";

/// Vertical guide drawn for one ancestor level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guide {
    /// The ancestor at this level has later siblings: draw a continuing line.
    Line,
    /// Nothing to draw.
    Blank,
}

/// Connector joining a row to its parent's guide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    /// Roots have no connector.
    None,
    /// More siblings follow.
    Tee,
    /// Last sibling.
    Corner,
}

/// ARIA `treeitem` attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AriaAttributes {
    /// Always `"treeitem"`.
    pub role: &'static str,
    /// 1-based depth.
    pub level: usize,
    /// `None` for leaves.
    pub expanded: Option<bool>,
    /// Selected flag.
    pub selected: bool,
    /// Size of the sibling group.
    pub set_size: usize,
    /// 1-based position in the sibling group.
    pub pos_in_set: usize,
}

/// Everything a renderer needs for one row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowModel {
    /// Position in the flattened sequence.
    pub index: usize,
    /// Node id.
    pub node_id: String,
    /// Depth, 0 for roots.
    pub level: usize,
    /// Leading indentation (`level * indent_size`).
    pub indent: f64,
    /// One guide per ancestor level below the root.
    pub guides: Vec<Guide>,
    /// Connector to the parent.
    pub connector: Connector,
    /// Display label.
    pub label: String,
    /// No children.
    pub is_leaf: bool,
    /// Expanded flag.
    pub is_expanded: bool,
    /// Selected flag.
    pub is_selected: bool,
    /// Keyboard focus target.
    pub is_focused: bool,
    /// Current search match.
    pub is_highlighted: bool,
    /// Shown flag.
    pub is_visible: bool,
    /// Accessibility attributes.
    pub aria: AriaAttributes,
}

impl RowModel {
    /// Text prefix for character-cell renderers, e.g. `"│  ├─ "`. Roots get an empty prefix.
    pub fn guide_prefix(&self) -> String {
        let mut prefix = String::with_capacity((self.guides.len() + 1) * 4);
        for guide in &self.guides {
            prefix.push_str(match guide {
                Guide::Line => "│  ",
                Guide::Blank => "   ",
            });
        }
        prefix.push_str(match self.connector {
            Connector::None => "",
            Connector::Tee => "├─ ",
            Connector::Corner => "└─ ",
        });
        prefix
    }

    /// Disclosure marker: `▾` expanded, `▸` collapsed, blank for leaves.
    pub fn disclosure(&self) -> &'static str {
        if self.is_leaf {
            " "
        } else if self.is_expanded {
            "▾"
        } else {
            "▸"
        }
    }
}

/// One breadcrumb step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreadcrumbItem {
    /// Node id.
    pub node_id: String,
    /// Display label.
    pub label: String,
    /// `true` for the last (current) step.
    pub is_current: bool,
}

/// Borrowed view of every component a row reads from.
pub(crate) struct RowContext<'a, R> {
    pub(crate) hierarchy: &'a Hierarchy<R>,
    pub(crate) state: &'a TreeState,
    pub(crate) selection: &'a SelectionModel,
    pub(crate) search: &'a SearchEngine,
    pub(crate) label_field: Option<&'a str>,
    pub(crate) indent_size: f64,
}

impl<R: TreeItem> RowContext<'_, R> {
    pub(crate) fn row(&self, index: usize, node_id: &str) -> Option<RowModel> {
        let tree = self.hierarchy.index();
        let node = tree.get(node_id)?;

        let guides = node
            .path
            .iter()
            .skip(1)
            .map(|ancestor| {
                if tree.is_last_sibling(ancestor) {
                    Guide::Blank
                } else {
                    Guide::Line
                }
            })
            .collect();
        let connector = if node.is_root() {
            Connector::None
        } else if tree.is_last_sibling(node_id) {
            Connector::Corner
        } else {
            Connector::Tee
        };

        let is_expanded = self.state.is_expanded(node_id);
        let is_selected = self.selection.is_selected(node_id);
        let (pos_in_set, set_size) = tree.sibling_position(node_id).unwrap_or((1, 1));

        Some(RowModel {
            index,
            node_id: node_id.to_string(),
            level: node.level,
            indent: node.level as f64 * self.indent_size,
            guides,
            connector,
            label: self.label(node_id),
            is_leaf: node.is_leaf,
            is_expanded,
            is_selected,
            is_focused: self.state.focused() == Some(node_id),
            is_highlighted: self.search.is_match(node_id),
            is_visible: self.state.is_visible(node_id),
            aria: AriaAttributes {
                role: "treeitem",
                level: node.level + 1,
                expanded: (!node.is_leaf).then_some(is_expanded),
                selected: is_selected,
                set_size,
                pos_in_set,
            },
        })
    }

    /// Label field text, falling back to the node id.
    pub(crate) fn label(&self, node_id: &str) -> String {
        self.label_field
            .and_then(|field| self.hierarchy.field(node_id, field))
            .map(|value| value.as_text().into_owned())
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| node_id.to_string())
    }

    pub(crate) fn breadcrumb(&self, node_id: &str) -> Vec<BreadcrumbItem> {
        let Some(node) = self.hierarchy.node(node_id) else {
            return Vec::new();
        };
        node.path
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(node_id))
            .map(|id| BreadcrumbItem {
                node_id: id.to_string(),
                label: self.label(id),
                is_current: id == node_id,
            })
            .collect()
    }
}

/// Width of `text` in terminal cells.
pub fn display_width(text: &str) -> usize {
    UnicodeWidthStr::width(text)
}

/// Cut `text` to at most `max_width` cells, ending in [`ELLIPSIS`] when shortened. Never splits
/// a grapheme cluster.
pub fn truncate_to_width(text: &str, max_width: usize) -> String {
    if display_width(text) <= max_width {
        return text.to_string();
    }
    let ellipsis_width = display_width(ELLIPSIS);
    if max_width < ellipsis_width {
        return String::new();
    }

    let budget = max_width - ellipsis_width;
    let mut out = String::new();
    let mut used = 0;
    for grapheme in text.graphemes(true) {
        let width = display_width(grapheme);
        if used + width > budget {
            break;
        }
        used += width;
        out.push_str(grapheme);
    }
    out.push_str(ELLIPSIS);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_ascii() {
        assert_eq!(truncate_to_width("hello", 10), "hello");
        assert_eq!(truncate_to_width("hello world", 6), "hello…");
        assert_eq!(truncate_to_width("hello", 0), "");
    }

    #[test]
    fn test_truncate_wide_and_combining() {
        // Each CJK char is two cells.
        assert_eq!(truncate_to_width("日本語テキスト", 6), "日本…");
        // "e" + combining acute stays one grapheme.
        assert_eq!(truncate_to_width("e\u{301}e\u{301}e\u{301}", 2), "e\u{301}…");
        assert_eq!(display_width("日本"), 4);
    }
}
