//! Lazy tree walks.
//!
//! Every walk starts at an arbitrary node and borrows the tree; nothing is
//! materialized up front, so partial walks (`take_while`, `find`) stay cheap.

use std::collections::VecDeque;

use indextree::{NodeEdge, NodeId};

use crate::tree::Tree;

/// Node before children, children left to right.
pub fn pre_order(tree: &Tree, start: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    start.descendants(&tree.arena)
}

/// Pre-order walk that skips `start` itself.
pub fn descendants(tree: &Tree, start: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    pre_order(tree, start).skip(1)
}

/// Children before their parent, left to right.
pub fn post_order(tree: &Tree, start: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    start.traverse(&tree.arena).filter_map(|edge| match edge {
        NodeEdge::End(id) => Some(id),
        NodeEdge::Start(_) => None,
    })
}

/// Level order.
pub fn bfs(tree: &Tree, start: NodeId) -> Bfs<'_> {
    Bfs {
        tree,
        queue: VecDeque::from([start]),
    }
}

/// Breadth-first iterator returned by [`bfs`].
pub struct Bfs<'a> {
    tree: &'a Tree,
    queue: VecDeque<NodeId>,
}

impl Iterator for Bfs<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.queue.pop_front()?;
        self.queue.extend(self.tree.children(id));
        Some(id)
    }
}
