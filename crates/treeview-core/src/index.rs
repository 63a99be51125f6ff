//! Node arena and lookup index.
//!
//! Nodes live in a single map keyed by node id. Parent/child edges are stored as ids and resolved
//! through the index, so there are no owning back-references.

use std::collections::{HashMap, HashSet};

/// One hierarchy entry wrapping an external record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Unique node id.
    pub id: String,
    /// Parent node id; `None` for roots.
    pub parent_id: Option<String>,
    /// Ordered child ids.
    pub children: Vec<String>,
    /// Depth, 0 for roots.
    pub level: usize,
    /// Ancestor ids from the root down to the parent.
    pub path: Vec<String>,
    /// `true` iff the node has no children.
    pub is_leaf: bool,
    /// Dotted structure id (structure-id strategy only).
    pub structure_id: Option<String>,
    /// Position of the originating record in the hierarchy's item list.
    pub record: usize,
}

impl Node {
    pub(crate) fn new(id: String, record: usize) -> Self {
        Self {
            id,
            parent_id: None,
            children: Vec::new(),
            level: 0,
            path: Vec::new(),
            is_leaf: true,
            structure_id: None,
            record,
        }
    }

    /// Returns `true` for roots.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Id → node mapping plus the ordered root list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeIndex {
    nodes: HashMap<String, Node>,
    roots: Vec<String>,
}

impl NodeIndex {
    pub(crate) fn from_parts(nodes: HashMap<String, Node>, roots: Vec<String>) -> Self {
        Self { nodes, roots }
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if there are no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node.
    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Returns `true` if `id` is in the index.
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Root ids in display order.
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    /// Unordered iteration over all nodes.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Parent of `id`.
    pub fn parent(&self, id: &str) -> Option<&Node> {
        let parent_id = self.get(id)?.parent_id.as_deref()?;
        self.get(parent_id)
    }

    /// Children of `id` in order.
    pub fn children(&self, id: &str) -> impl Iterator<Item = &Node> {
        self.get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|child| self.get(child))
    }

    /// The sibling group containing `id` (the parent's children, or the roots), including `id`.
    pub fn siblings(&self, id: &str) -> &[String] {
        match self.get(id) {
            Some(node) => match node.parent_id.as_deref().and_then(|p| self.get(p)) {
                Some(parent) => &parent.children,
                None => &self.roots,
            },
            None => &[],
        }
    }

    /// Ancestor ids, nearest first.
    pub fn ancestors(&self, id: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut current = self.get(id).and_then(|n| n.parent_id.as_deref());
        while let Some(parent_id) = current {
            out.push(parent_id.to_string());
            current = self.get(parent_id).and_then(|n| n.parent_id.as_deref());
        }
        out
    }

    /// Descendant ids in depth-first order, excluding `id`.
    pub fn descendants(&self, id: &str) -> Vec<String> {
        let Some(node) = self.get(id) else {
            return Vec::new();
        };
        self.depth_first_from(&node.children)
    }

    /// `id` followed by its descendants in depth-first order.
    pub fn subtree(&self, id: &str) -> Vec<String> {
        if !self.contains(id) {
            return Vec::new();
        }
        self.depth_first_from(std::slice::from_ref(&id.to_string()))
    }

    /// All node ids in depth-first order, ignoring expansion.
    pub fn depth_first(&self) -> Vec<String> {
        self.depth_first_from(&self.roots)
    }

    fn depth_first_from(&self, starts: &[String]) -> Vec<String> {
        let mut out = Vec::new();
        let mut stack: Vec<&str> = starts.iter().rev().map(String::as_str).collect();
        while let Some(id) = stack.pop() {
            let Some(node) = self.get(id) else {
                continue;
            };
            out.push(node.id.clone());
            stack.extend(node.children.iter().rev().map(String::as_str));
        }
        out
    }

    /// Ids of every node that has children.
    pub fn non_leaf_ids(&self) -> HashSet<String> {
        self.nodes
            .values()
            .filter(|n| !n.is_leaf)
            .map(|n| n.id.clone())
            .collect()
    }

    /// Follow a root-to-node id path.
    pub fn find_by_path<S: AsRef<str>>(&self, path: &[S]) -> Option<&Node> {
        let (first, rest) = path.split_first()?;
        let first = first.as_ref();
        if !self.roots.iter().any(|r| r == first) {
            return None;
        }
        let mut current = self.get(first)?;
        for step in rest {
            let step = step.as_ref();
            if !current.children.iter().any(|c| c == step) {
                return None;
            }
            current = self.get(step)?;
        }
        Some(current)
    }

    /// Height of the subtree below `id` (0 for leaves and unknown ids).
    pub fn subtree_depth(&self, id: &str) -> usize {
        let Some(node) = self.get(id) else {
            return 0;
        };
        self.descendants(id)
            .iter()
            .filter_map(|d| self.get(d))
            .map(|d| d.level - node.level)
            .max()
            .unwrap_or(0)
    }

    /// Returns `true` if `id` is the last entry of its sibling group.
    pub fn is_last_sibling(&self, id: &str) -> bool {
        self.siblings(id).last().is_some_and(|last| last == id)
    }

    /// 1-based position of `id` within its sibling group, and the group size.
    pub fn sibling_position(&self, id: &str) -> Option<(usize, usize)> {
        let siblings = self.siblings(id);
        let pos = siblings.iter().position(|s| s == id)?;
        Some((pos + 1, siblings.len()))
    }
}
