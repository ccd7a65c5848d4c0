//! Derived structural metadata: subtree size, height and a positional hash.
//!
//! The hash follows the syntax-tree fingerprinting scheme of Chilowicz et al.
//! (ICPC 2009), as used by GumTree: every node contributes a start marker and
//! an end marker, and children are weighted by powers of a base whose
//! exponents grow with the cumulative size of the preceding siblings. Two
//! subtrees hash equal exactly when they have the same shape, labels and
//! values (modulo 64-bit collisions).

use core::hash::{Hash, Hasher};

use indextree::NodeId;
use rapidhash::RapidHasher;

use crate::traversal::post_order;
use crate::tree::Tree;
use crate::trace;

/// Base of the positional hash.
pub const DEFAULT_HASH_BASE: u64 = 33;

const HASH_START: &str = "HASH_START";
const HASH_END: &str = "HASH_END";

/// Size, height and structural hash of a subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeMetadata {
    /// Structural hash; equal iff the subtrees are isomorphic
    pub hashcode: u64,
    /// 1 for a leaf, otherwise 1 + the tallest child
    pub height: usize,
    /// Number of nodes in the subtree, including this one
    pub size: usize,
}

/// Compute metadata for every node reachable from the root, bottom-up.
pub fn attach_metadata(tree: &mut Tree) {
    attach_metadata_with_base(tree, DEFAULT_HASH_BASE);
}

/// Like [`attach_metadata`], with an explicit hash base.
pub fn attach_metadata_with_base(tree: &mut Tree, base: u64) {
    let order: Vec<NodeId> = post_order(tree, tree.root).collect();
    for id in order {
        let metadata = compute(tree, id, base);
        trace!(
            node = usize::from(id),
            size = metadata.size,
            height = metadata.height,
            "attach_metadata"
        );
        tree.set_metadata(id, metadata);
    }
}

fn compute(tree: &Tree, id: NodeId, base: u64) -> NodeMetadata {
    let mut size = 1;
    let mut tallest = 0;
    let mut acc: u64 = 0;
    let mut cumulative: u64 = 0;

    for child in tree.children(id) {
        let child_meta = tree.metadata(child);
        acc = acc.wrapping_add(
            child_meta
                .hashcode
                .wrapping_mul(factor(base, 2 * cumulative + 1)),
        );
        cumulative += child_meta.size as u64;
        size += child_meta.size;
        tallest = tallest.max(child_meta.height);
    }

    let data = tree.get(id);
    let start = marker_hash(&data.label, &data.value, HASH_START);
    let end = marker_hash(&data.label, &data.value, HASH_END);
    // For a leaf `cumulative` is 0, so this reduces to start + end * base.
    let hashcode = start
        .wrapping_add(acc)
        .wrapping_add(end.wrapping_mul(factor(base, 2 * cumulative + 1)));

    NodeMetadata {
        hashcode,
        height: tallest + 1,
        size,
    }
}

fn marker_hash(label: &str, value: &str, marker: &str) -> u64 {
    let mut hasher = RapidHasher::default();
    label.hash(&mut hasher);
    value.hash(&mut hasher);
    marker.hash(&mut hasher);
    hasher.finish()
}

/// `base^exp` in wrapping arithmetic.
fn factor(base: u64, mut exp: u64) -> u64 {
    let mut result: u64 = 1;
    let mut square = base;
    while exp > 0 {
        if exp & 1 == 1 {
            result = result.wrapping_mul(square);
        }
        square = square.wrapping_mul(square);
        exp >>= 1;
    }
    result
}
