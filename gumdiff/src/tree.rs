//! Arena-backed syntax trees.
//!
//! Canonicalizers produce owned [`Node`] values; the diff works on [`Tree`],
//! which lays nodes out in an [`indextree::Arena`]. A node's identity is its
//! arena index. Slots are never freed, so a detached node keeps its id and
//! its data for as long as the tree lives.

use core::fmt;

use indextree::{Arena, NodeId};

use crate::metadata::{NodeMetadata, attach_metadata};

/// Source span of a node: 1-based lines, 0-based columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodePosition {
    /// Line the node starts on
    pub start_line: usize,
    /// Column the node starts at
    pub start_col: usize,
    /// Line the node ends on
    pub end_line: usize,
    /// Column the node ends at
    pub end_col: usize,
}

impl fmt::Display for NodePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.start_line, self.start_col, self.end_line, self.end_col
        )
    }
}

/// An owned syntax node, as produced by a canonicalizer.
///
/// Equality compares label, value and children recursively. Positions are
/// cosmetic and ignored.
#[derive(Debug, Clone, Default)]
pub struct Node {
    /// Syntactic category, e.g. `IfStatement`
    pub label: String,
    /// Literal payload; empty for structural nodes
    pub value: String,
    /// Ordered children
    pub children: Vec<Node>,
    /// Where the node came from, if known
    pub position: Option<NodePosition>,
}

impl Node {
    /// Create a node with children.
    pub fn new(label: impl Into<String>, value: impl Into<String>, children: Vec<Node>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            children,
            position: None,
        }
    }

    /// Create a childless node.
    pub fn leaf(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(label, value, Vec::new())
    }

    /// Attach a source position.
    pub fn with_position(mut self, position: NodePosition) -> Self {
        self.position = Some(position);
        self
    }

    /// Whether this node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label && self.value == other.value && self.children == other.children
    }
}

impl Eq for Node {}

/// Per-node payload stored in the arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeData {
    /// Syntactic category
    pub label: String,
    /// Literal payload
    pub value: String,
    /// Derived size/height/hash, present once [`attach_metadata`] ran
    pub metadata: Option<NodeMetadata>,
    /// Source span
    pub position: Option<NodePosition>,
}

impl NodeData {
    /// Create node data without metadata or position.
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            metadata: None,
            position: None,
        }
    }
}

/// A rooted, ordered tree stored in an arena.
#[derive(Debug, Clone)]
pub struct Tree {
    /// The arena holding all nodes
    pub arena: Arena<NodeData>,
    /// The root node ID
    pub root: NodeId,
}

impl Tree {
    /// Create a tree consisting of a single root node.
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(NodeData::new(label, value));
        Self { arena, root }
    }

    /// Lay an owned node tree out in an arena, linking every child to its
    /// parent. Metadata is not computed.
    pub fn from_node(node: &Node) -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(Self::data_of(node));

        let mut stack: Vec<(&Node, NodeId)> = vec![(node, root)];
        while let Some((owned, id)) = stack.pop() {
            let mut child_ids = Vec::with_capacity(owned.children.len());
            for child in &owned.children {
                let child_id = arena.new_node(Self::data_of(child));
                id.append(child_id, &mut arena);
                child_ids.push(child_id);
            }
            for (child, child_id) in owned.children.iter().zip(child_ids).rev() {
                stack.push((child, child_id));
            }
        }

        Self { arena, root }
    }

    /// Lay out an owned node tree and attach metadata in one go.
    pub fn build(node: &Node) -> Self {
        let mut tree = Self::from_node(node);
        attach_metadata(&mut tree);
        tree
    }

    fn data_of(node: &Node) -> NodeData {
        NodeData {
            label: node.label.clone(),
            value: node.value.clone(),
            metadata: None,
            position: node.position,
        }
    }

    /// Append a new child under `parent`, returning its id.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        label: impl Into<String>,
        value: impl Into<String>,
    ) -> NodeId {
        let child = self.arena.new_node(NodeData::new(label, value));
        parent.append(child, &mut self.arena);
        child
    }

    /// Allocate a detached node.
    pub fn new_node(&mut self, label: impl Into<String>, value: impl Into<String>) -> NodeId {
        self.arena.new_node(NodeData::new(label, value))
    }

    /// Get the data of a node.
    pub fn get(&self, id: NodeId) -> &NodeData {
        self.arena
            .get(id)
            .expect("node id does not belong to this tree")
            .get()
    }

    fn get_mut(&mut self, id: NodeId) -> &mut NodeData {
        self.arena
            .get_mut(id)
            .expect("node id does not belong to this tree")
            .get_mut()
    }

    /// Whether `id` was allocated by this tree's arena.
    pub fn contains(&self, id: NodeId) -> bool {
        self.arena.get(id).is_some()
    }

    /// A node's label.
    pub fn label(&self, id: NodeId) -> &str {
        &self.get(id).label
    }

    /// A node's value.
    pub fn value(&self, id: NodeId) -> &str {
        &self.get(id).value
    }

    /// Replace a node's value.
    pub fn set_value(&mut self, id: NodeId, value: impl Into<String>) {
        self.get_mut(id).value = value.into();
    }

    /// A node's metadata.
    ///
    /// # Panics
    ///
    /// Panics if metadata was never attached. Every structural comparison
    /// relies on it, so reaching this without it is a logic error.
    pub fn metadata(&self, id: NodeId) -> &NodeMetadata {
        self.get(id)
            .metadata
            .as_ref()
            .expect("metadata must be attached before structural comparison")
    }

    /// A node's metadata, if it has been computed.
    pub fn try_metadata(&self, id: NodeId) -> Option<&NodeMetadata> {
        self.get(id).metadata.as_ref()
    }

    pub(crate) fn set_metadata(&mut self, id: NodeId, metadata: NodeMetadata) {
        self.get_mut(id).metadata = Some(metadata);
    }

    /// A node's parent.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena.get(id).and_then(|n| n.parent())
    }

    /// A node's children in order.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children(&self.arena)
    }

    /// Number of children.
    pub fn child_count(&self, id: NodeId) -> usize {
        self.children(id).count()
    }

    /// Whether the node has no children.
    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.arena
            .get(id)
            .is_none_or(|n| n.first_child().is_none())
    }

    /// Whether the node is the tree's current root.
    pub fn is_root(&self, id: NodeId) -> bool {
        id == self.root
    }

    /// Index of the node among its parent's children, or `None` if it has no
    /// parent.
    pub fn position_in_siblings(&self, id: NodeId) -> Option<usize> {
        self.parent(id)?;
        Some(id.preceding_siblings(&self.arena).count() - 1)
    }

    /// Total number of nodes ever allocated, including detached ones.
    pub fn node_count(&self) -> usize {
        self.arena.count()
    }

    /// Two nodes may be matched only when their labels agree.
    pub fn can_match(&self, id: NodeId, other: &Tree, other_id: NodeId) -> bool {
        self.label(id) == other.label(other_id)
    }

    /// Isomorphism check in O(1) through the structural hash.
    pub fn isomorphic_to(&self, id: NodeId, other: &Tree, other_id: NodeId) -> bool {
        self.metadata(id).hashcode == other.metadata(other_id).hashcode
    }

    /// Same shape and labels at every position; values may differ.
    pub fn isomorphic_to_without_values(&self, id: NodeId, other: &Tree, other_id: NodeId) -> bool {
        if !self.can_match(id, other, other_id)
            || self.child_count(id) != other.child_count(other_id)
        {
            return false;
        }
        self.children(id)
            .zip(other.children(other_id))
            .all(|(a, b)| self.isomorphic_to_without_values(a, other, b))
    }

    /// Structural equality of two subtrees: labels, values and children.
    pub fn subtree_eq(&self, id: NodeId, other: &Tree, other_id: NodeId) -> bool {
        let a = self.get(id);
        let b = other.get(other_id);
        if a.label != b.label
            || a.value != b.value
            || self.child_count(id) != other.child_count(other_id)
        {
            return false;
        }
        self.children(id)
            .zip(other.children(other_id))
            .all(|(x, y)| self.subtree_eq(x, other, y))
    }

    /// Owned copy of the subtree rooted at `id`.
    pub fn to_node(&self, id: NodeId) -> Node {
        let data = self.get(id);
        Node {
            label: data.label.clone(),
            value: data.value.clone(),
            children: self.children(id).map(|c| self.to_node(c)).collect(),
            position: data.position,
        }
    }

    /// Owned copy of the whole tree.
    pub fn to_root_node(&self) -> Node {
        self.to_node(self.root)
    }

    /// Splice a detached node into `parent`'s children at `position`.
    ///
    /// # Panics
    ///
    /// Panics if `position` is past the end of the child list.
    pub fn insert_child(&mut self, parent: NodeId, node: NodeId, position: usize) {
        let sibling = self.children(parent).nth(position);
        match sibling {
            Some(sibling) => sibling.insert_before(node, &mut self.arena),
            None => {
                assert_eq!(
                    position,
                    self.child_count(parent),
                    "insert position past the end of the child list"
                );
                parent.append(node, &mut self.arena);
            }
        }
    }

    /// Unlink a node (and its subtree) from its parent.
    pub fn detach(&mut self, node: NodeId) {
        node.detach(&mut self.arena);
    }

    /// Make a detached node the root of the tree.
    pub fn set_root(&mut self, node: NodeId) {
        self.detach(node);
        self.root = node;
    }
}

impl PartialEq for Tree {
    fn eq(&self, other: &Self) -> bool {
        self.subtree_eq(self.root, other, other.root)
    }
}
