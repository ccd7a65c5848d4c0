//! Edit operations and edit scripts.
//!
//! Operations refer to nodes by their id in the source tree's arena. Ids of
//! inserted nodes are the ids the arena handed out while the script was
//! generated, so replaying a script on a fresh copy of the original source
//! tree allocates exactly the same ids in the same order.

use core::fmt;

use facet::Facet;
use indextree::NodeId;

use crate::error::DiffError;
use crate::tree::Tree;

/// One edit operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOp {
    /// Create a node and splice it into `parent` at `position`.
    Insert {
        /// Id of the new node
        node: NodeId,
        /// Parent to insert under; `None` makes the node the new root
        parent: Option<NodeId>,
        /// Index among the parent's children (0-indexed)
        position: usize,
        /// Label of the new node
        label: String,
        /// Value of the new node
        value: String,
    },

    /// Unlink a node from its parent.
    Delete {
        /// The node being deleted
        node: NodeId,
        /// Its parent at the time of deletion
        parent: Option<NodeId>,
    },

    /// Relocate a node (with its subtree).
    Move {
        /// The node being moved
        node: NodeId,
        /// New parent; `None` makes the node the new root
        parent: Option<NodeId>,
        /// Index among the new parent's children, counted after the node was
        /// unlinked from its old place
        position: usize,
    },

    /// Replace a node's value.
    Update {
        /// The node being updated
        node: NodeId,
        /// Value before the update
        old_value: String,
        /// Value after the update
        new_value: String,
    },
}

impl EditOp {
    /// The node the operation acts on.
    pub fn node(&self) -> NodeId {
        match self {
            EditOp::Insert { node, .. }
            | EditOp::Delete { node, .. }
            | EditOp::Move { node, .. }
            | EditOp::Update { node, .. } => *node,
        }
    }

    /// Replay this operation on `tree`.
    ///
    /// Unlike the generator, which trusts its own bookkeeping, replay checks
    /// every id and position and reports inconsistencies as errors.
    pub fn apply(&self, tree: &mut Tree) -> Result<(), DiffError> {
        match self {
            EditOp::Insert {
                node,
                parent,
                position,
                label,
                value,
            } => {
                if let Some(parent) = parent {
                    check_position(tree, *parent, *position)?;
                }
                let created = tree.new_node(label.clone(), value.clone());
                if created != *node {
                    return Err(DiffError::InsertMismatch {
                        expected: usize::from(*node),
                        actual: usize::from(created),
                    });
                }
                match parent {
                    Some(parent) => tree.insert_child(*parent, created, *position),
                    None => tree.set_root(created),
                }
            }
            EditOp::Delete { node, .. } => {
                check_node(tree, *node)?;
                tree.detach(*node);
            }
            EditOp::Move {
                node,
                parent,
                position,
            } => {
                check_node(tree, *node)?;
                tree.detach(*node);
                match parent {
                    Some(parent) => {
                        check_position(tree, *parent, *position)?;
                        tree.insert_child(*parent, *node, *position);
                    }
                    None => tree.set_root(*node),
                }
            }
            EditOp::Update {
                node, new_value, ..
            } => {
                check_node(tree, *node)?;
                tree.set_value(*node, new_value.clone());
            }
        }
        Ok(())
    }
}

fn check_node(tree: &Tree, node: NodeId) -> Result<(), DiffError> {
    if tree.contains(node) {
        Ok(())
    } else {
        Err(DiffError::UnknownNode {
            index: usize::from(node),
        })
    }
}

fn check_position(tree: &Tree, parent: NodeId, position: usize) -> Result<(), DiffError> {
    check_node(tree, parent)?;
    let len = tree.child_count(parent);
    if position > len {
        return Err(DiffError::PositionOutOfBounds { position, len });
    }
    Ok(())
}

impl fmt::Display for EditOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditOp::Insert {
                node,
                parent,
                position,
                label,
                value,
            } => {
                write!(f, "Insert(s:{} {label} {value:?} @{position}", usize::from(*node))?;
                match parent {
                    Some(parent) => write!(f, " under s:{})", usize::from(*parent)),
                    None => write!(f, " as root)"),
                }
            }
            EditOp::Delete { node, .. } => write!(f, "Delete(s:{})", usize::from(*node)),
            EditOp::Move {
                node,
                parent,
                position,
            } => {
                write!(f, "Move(s:{} @{position}", usize::from(*node))?;
                match parent {
                    Some(parent) => write!(f, " under s:{})", usize::from(*parent)),
                    None => write!(f, " as root)"),
                }
            }
            EditOp::Update {
                node,
                old_value,
                new_value,
            } => write!(
                f,
                "Update(s:{} {old_value:?} → {new_value:?})",
                usize::from(*node)
            ),
        }
    }
}

/// An ordered list of edit operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditScript {
    ops: Vec<EditOp>,
}

impl EditScript {
    /// An empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operation.
    pub fn push(&mut self, op: EditOp) {
        self.ops.push(op);
    }

    /// Number of operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether the script is empty.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Operations in order.
    pub fn iter(&self) -> core::slice::Iter<'_, EditOp> {
        self.ops.iter()
    }

    /// Operations as a slice.
    pub fn ops(&self) -> &[EditOp] {
        &self.ops
    }

    /// Apply every operation, in order, to a copy of `source`.
    ///
    /// `source` must be the tree the script was generated from.
    pub fn replay(&self, source: &Tree) -> Result<Tree, DiffError> {
        let mut tree = source.clone();
        for op in &self.ops {
            op.apply(&mut tree)?;
        }
        Ok(tree)
    }

    /// Serializable, reference-free view of every operation.
    ///
    /// `tree` must hold every node the script mentions: the edited source
    /// tree of the diff run, or a replayed copy.
    pub fn standalone(&self, tree: &Tree) -> Vec<StandaloneOp> {
        self.ops.iter().map(|op| op.standalone(tree)).collect()
    }
}

impl FromIterator<EditOp> for EditScript {
    fn from_iter<I: IntoIterator<Item = EditOp>>(iter: I) -> Self {
        Self {
            ops: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for EditScript {
    type Item = EditOp;
    type IntoIter = std::vec::IntoIter<EditOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

impl<'a> IntoIterator for &'a EditScript {
    type Item = &'a EditOp;
    type IntoIter = core::slice::Iter<'a, EditOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}

impl fmt::Display for EditScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Edit script ({} ops):", self.ops.len())?;
        for op in &self.ops {
            write!(f, "\n{op}")?;
        }
        Ok(())
    }
}

/// A node stripped of its links, for display and serialization.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
pub struct StandaloneNode {
    /// Syntactic category
    pub label: String,
    /// Literal payload
    pub value: String,
}

impl StandaloneNode {
    fn of(tree: &Tree, id: NodeId) -> Self {
        Self {
            label: tree.label(id).to_owned(),
            value: tree.value(id).to_owned(),
        }
    }
}

impl fmt::Display for StandaloneNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value.is_empty() {
            f.write_str(&self.label)
        } else {
            write!(f, "{} {:?}", self.label, self.value)
        }
    }
}

/// An edit operation with nodes replaced by their label and value.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum StandaloneOp {
    /// A node was inserted
    Insert {
        /// The inserted node
        node: StandaloneNode,
        /// Its parent, or `None` for a new root
        parent: Option<StandaloneNode>,
        /// Index among the parent's children
        position: usize,
    },
    /// A node was deleted
    Delete {
        /// The deleted node
        node: StandaloneNode,
    },
    /// A node was moved
    Move {
        /// The moved node
        node: StandaloneNode,
        /// Its new parent, or `None` for a new root
        parent: Option<StandaloneNode>,
        /// Index among the new parent's children
        position: usize,
    },
    /// A node's value changed
    Update {
        /// The node, carrying its value from before the update
        node: StandaloneNode,
        /// The new value
        value: String,
    },
}

impl EditOp {
    /// Reference-free view of this operation. See [`EditScript::standalone`].
    pub fn standalone(&self, tree: &Tree) -> StandaloneOp {
        let parent_of = |parent: &Option<NodeId>| parent.map(|p| StandaloneNode::of(tree, p));
        match self {
            EditOp::Insert {
                parent,
                position,
                label,
                value,
                ..
            } => StandaloneOp::Insert {
                node: StandaloneNode {
                    label: label.clone(),
                    value: value.clone(),
                },
                parent: parent_of(parent),
                position: *position,
            },
            EditOp::Delete { node, .. } => StandaloneOp::Delete {
                node: StandaloneNode::of(tree, *node),
            },
            EditOp::Move {
                node,
                parent,
                position,
            } => StandaloneOp::Move {
                node: StandaloneNode::of(tree, *node),
                parent: parent_of(parent),
                position: *position,
            },
            EditOp::Update {
                node,
                old_value,
                new_value,
            } => StandaloneOp::Update {
                node: StandaloneNode {
                    label: tree.label(*node).to_owned(),
                    value: old_value.clone(),
                },
                value: new_value.clone(),
            },
        }
    }
}

impl fmt::Display for StandaloneOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StandaloneOp::Insert {
                node,
                parent,
                position,
            } => match parent {
                Some(parent) => write!(f, "Insert({node} @{position} under {parent})"),
                None => write!(f, "Insert({node} as root)"),
            },
            StandaloneOp::Delete { node } => write!(f, "Delete({node})"),
            StandaloneOp::Move {
                node,
                parent,
                position,
            } => match parent {
                Some(parent) => write!(f, "Move({node} @{position} under {parent})"),
                None => write!(f, "Move({node} as root)"),
            },
            StandaloneOp::Update { node, value } => write!(f, "Update({node} → {value:?})"),
        }
    }
}
