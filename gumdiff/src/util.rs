//! Small algorithms shared by the matcher and the script generator.

use core::hash::Hash;
use std::collections::BTreeMap;

use indexmap::IndexMap;
use indextree::NodeId;

use crate::tree::Tree;

/// Group items by key, keeping groups in first-seen order and items in input
/// order.
pub fn group_by<T, K, F>(items: impl IntoIterator<Item = T>, mut key: F) -> IndexMap<K, Vec<T>>
where
    K: Hash + Eq,
    F: FnMut(&T) -> K,
{
    let mut groups: IndexMap<K, Vec<T>> = IndexMap::new();
    for item in items {
        groups.entry(key(&item)).or_default().push(item);
    }
    groups
}

/// Longest common subsequence of `source` and `target` under `eq`.
///
/// Returns the aligned pairs in order. When several alignments have the same
/// length, the one that skips source elements first wins.
pub fn longest_common_subsequence<T, F>(source: &[T], target: &[T], eq: F) -> Vec<(T, T)>
where
    T: Copy,
    F: Fn(&T, &T) -> bool,
{
    let (n, m) = (source.len(), target.len());
    let width = m + 1;
    // table[s * width + t]: LCS length of source[s..] and target[t..]
    let mut table = vec![0usize; (n + 1) * width];

    for s in (0..n).rev() {
        for t in (0..m).rev() {
            table[s * width + t] = if eq(&source[s], &target[t]) {
                table[(s + 1) * width + t + 1] + 1
            } else {
                table[(s + 1) * width + t].max(table[s * width + t + 1])
            };
        }
    }

    let mut pairs = Vec::with_capacity(table[0]);
    let (mut s, mut t) = (0, 0);
    while s < n && t < m {
        if eq(&source[s], &target[t]) {
            pairs.push((source[s], target[t]));
            s += 1;
            t += 1;
        } else if table[(s + 1) * width + t] >= table[s * width + t + 1] {
            s += 1;
        } else {
            t += 1;
        }
    }
    pairs
}

/// Priority queue of nodes keyed by subtree height, tallest first.
///
/// Nodes must carry metadata.
#[derive(Debug, Default)]
pub struct HeightQueue {
    buckets: BTreeMap<usize, Vec<NodeId>>,
    len: usize,
}

impl HeightQueue {
    /// An empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one node.
    pub fn push(&mut self, tree: &Tree, id: NodeId) {
        let height = tree.metadata(id).height;
        self.buckets.entry(height).or_default().push(id);
        self.len += 1;
    }

    /// Add every child of `id`.
    pub fn open(&mut self, tree: &Tree, id: NodeId) {
        for child in tree.children(id) {
            self.push(tree, child);
        }
    }

    /// Remove and return every node at the current maximum height.
    ///
    /// Nodes come out ordered by label, value, arity and hash, ties in
    /// insertion order, so draining is deterministic.
    pub fn pop(&mut self, tree: &Tree) -> Vec<NodeId> {
        let Some((_, mut nodes)) = self.buckets.pop_last() else {
            return Vec::new();
        };
        self.len -= nodes.len();
        nodes.sort_by(|&a, &b| {
            let (da, db) = (tree.get(a), tree.get(b));
            da.label
                .cmp(&db.label)
                .then_with(|| da.value.cmp(&db.value))
                .then_with(|| tree.child_count(a).cmp(&tree.child_count(b)))
                .then_with(|| tree.metadata(a).hashcode.cmp(&tree.metadata(b).hashcode))
        });
        nodes
    }

    /// Height of the tallest queued node, or 0 when empty.
    pub fn peek_max(&self) -> usize {
        self.buckets.last_key_value().map_or(0, |(&h, _)| h)
    }

    /// Number of queued nodes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Node;
    use facet_testhelpers::test;

    fn lcs(a: &str, b: &str) -> String {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        longest_common_subsequence(&a, &b, |x, y| x == y)
            .into_iter()
            .map(|(x, _)| x)
            .collect()
    }

    #[test]
    fn test_lcs_empty() {
        assert_eq!(lcs("", ""), "");
        assert_eq!(lcs("abc", ""), "");
        assert_eq!(lcs("", "abc"), "");
    }

    #[test]
    fn test_lcs_reversed_prefers_skipping_source() {
        assert_eq!(lcs("12345", "54321"), "5");
    }

    #[test]
    fn test_lcs_basic() {
        assert_eq!(lcs("1_2_3_4_5", "235"), "235");
        assert_eq!(lcs("ABCD", "ACBAD"), "ACD");
        assert_eq!(lcs("saippuakauppias", "saippua"), "saippua");
        assert_eq!(lcs("saippuakauppias", "kauppias"), "kauppias");
    }

    #[test]
    fn test_lcs_custom_equality() {
        let a = [1, 2, 3];
        let b = [10, 30];
        let pairs = longest_common_subsequence(&a, &b, |x, y| x * 10 == *y);
        assert_eq!(pairs, vec![(1, 10), (3, 30)]);
    }

    #[test]
    fn test_group_by_keeps_first_seen_order() {
        let groups = group_by(["bb", "a", "cc", "d", "eee"], |s| s.len());
        let keys: Vec<_> = groups.keys().copied().collect();
        assert_eq!(keys, vec![2, 1, 3]);
        assert_eq!(groups[&2], vec!["bb", "cc"]);
        assert_eq!(groups[&1], vec!["a", "d"]);
    }

    #[test]
    fn test_height_queue() {
        // root(3) -> [x(2) -> [leaf], y(1), z(2) -> [leaf]]
        let tree = Tree::build(&Node::new(
            "root",
            "",
            vec![
                Node::new("x", "", vec![Node::leaf("leaf", "")]),
                Node::leaf("y", ""),
                Node::new("w", "", vec![Node::leaf("leaf", "")]),
            ],
        ));

        let mut queue = HeightQueue::new();
        assert_eq!(queue.peek_max(), 0);
        assert!(queue.pop(&tree).is_empty());

        queue.push(&tree, tree.root);
        assert_eq!(queue.peek_max(), 3);
        assert_eq!(queue.pop(&tree), vec![tree.root]);
        assert!(queue.is_empty());

        queue.open(&tree, tree.root);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.peek_max(), 2);

        let tallest = queue.pop(&tree);
        let labels: Vec<_> = tallest.iter().map(|&id| tree.label(id)).collect();
        assert_eq!(labels, vec!["w", "x"]);
        assert_eq!(queue.peek_max(), 1);
        assert_eq!(queue.len(), 1);

        let rest = queue.pop(&tree);
        assert_eq!(tree.label(rest[0]), "y");
        assert_eq!(queue.peek_max(), 0);
    }
}
