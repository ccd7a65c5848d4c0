//! State shared by the matcher and the script generator.

use indextree::NodeId;
use rapidhash::RapidHashSet as HashSet;

use crate::script::EditScript;
use crate::traversal::pre_order;
use crate::tree::Tree;

/// One source node paired with one target node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatchingPair {
    /// Node in the source tree
    pub source: NodeId,
    /// Node in the target tree
    pub target: NodeId,
}

impl MatchingPair {
    /// Pair two nodes.
    pub fn new(source: NodeId, target: NodeId) -> Self {
        Self { source, target }
    }
}

/// A bijective partial mapping between source and target nodes.
/// Uses Vec for O(1) lookups indexed by NodeId.
#[derive(Debug, Clone, Default)]
pub struct MatchingSet {
    /// Map from source node to target node (indexed by the source NodeId)
    source_to_target: Vec<Option<NodeId>>,
    /// Map from target node to source node (indexed by the target NodeId)
    target_to_source: Vec<Option<NodeId>>,
    /// Pairs in the order they were added
    pairs: Vec<MatchingPair>,
}

impl MatchingSet {
    /// Create an empty matching.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty matching sized for trees of the given node counts.
    pub fn with_capacity(source_nodes: usize, target_nodes: usize) -> Self {
        Self {
            source_to_target: vec![None; source_nodes + 1],
            target_to_source: vec![None; target_nodes + 1],
            pairs: Vec::new(),
        }
    }

    /// Add a pair.
    ///
    /// # Panics
    ///
    /// Panics if either node is already matched.
    pub fn add(&mut self, pair: MatchingPair) {
        assert!(
            !self.contains_source(pair.source),
            "source node {} is already matched",
            usize::from(pair.source)
        );
        assert!(
            !self.contains_target(pair.target),
            "target node {} is already matched",
            usize::from(pair.target)
        );

        let s_idx = usize::from(pair.source);
        let t_idx = usize::from(pair.target);
        if s_idx >= self.source_to_target.len() {
            self.source_to_target.resize(s_idx + 1, None);
        }
        if t_idx >= self.target_to_source.len() {
            self.target_to_source.resize(t_idx + 1, None);
        }

        self.source_to_target[s_idx] = Some(pair.target);
        self.target_to_source[t_idx] = Some(pair.source);
        self.pairs.push(pair);
    }

    /// Add several pairs, in order.
    pub fn extend(&mut self, pairs: impl IntoIterator<Item = MatchingPair>) {
        for pair in pairs {
            self.add(pair);
        }
    }

    /// Whether a source node is matched.
    #[inline(always)]
    pub fn contains_source(&self, source: NodeId) -> bool {
        self.partner_of_source(source).is_some()
    }

    /// Whether a target node is matched.
    #[inline(always)]
    pub fn contains_target(&self, target: NodeId) -> bool {
        self.partner_of_target(target).is_some()
    }

    /// The target node matched to `source`.
    #[inline(always)]
    pub fn partner_of_source(&self, source: NodeId) -> Option<NodeId> {
        self.source_to_target
            .get(usize::from(source))
            .copied()
            .flatten()
    }

    /// The source node matched to `target`.
    #[inline(always)]
    pub fn partner_of_target(&self, target: NodeId) -> Option<NodeId> {
        self.target_to_source
            .get(usize::from(target))
            .copied()
            .flatten()
    }

    /// Whether this exact pair is in the matching.
    pub fn contains(&self, pair: MatchingPair) -> bool {
        self.partner_of_source(pair.source) == Some(pair.target)
    }

    /// All pairs, in the order they were added.
    pub fn pairs(&self) -> &[MatchingPair] {
        &self.pairs
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the matching is empty.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Everything a diff run works on.
///
/// The context owns copies of both input trees. Node ids are preserved by the
/// copy, so ids found here refer to the same nodes in the caller's trees.
/// The source copy is rewritten in place by the script generator; the
/// caller's trees are never touched.
#[derive(Debug, Clone)]
pub struct DiffContext {
    /// Working copy of the source tree
    pub source: Tree,
    /// Copy of the target tree
    pub target: Tree,
    /// Source nodes currently part of the diff
    source_nodes: HashSet<NodeId>,
    /// Target nodes
    target_nodes: HashSet<NodeId>,
    /// Pairs found so far
    pub matching: MatchingSet,
    /// Operations recorded so far
    pub edit_script: EditScript,
}

impl DiffContext {
    /// Register every node of both trees and start with an empty matching.
    pub fn new(source: &Tree, target: &Tree) -> Self {
        let source_nodes: HashSet<NodeId> = pre_order(source, source.root).collect();
        let target_nodes: HashSet<NodeId> = pre_order(target, target.root).collect();
        let matching = MatchingSet::with_capacity(source.node_count(), target.node_count());
        Self {
            source: source.clone(),
            target: target.clone(),
            source_nodes,
            target_nodes,
            matching,
            edit_script: EditScript::new(),
        }
    }

    /// Root of the (current) source tree.
    pub fn source_root(&self) -> NodeId {
        self.source.root
    }

    /// Root of the target tree.
    pub fn target_root(&self) -> NodeId {
        self.target.root
    }

    /// Whether `id` is a registered source node.
    pub fn is_source_node(&self, id: NodeId) -> bool {
        self.source_nodes.contains(&id)
    }

    /// Whether `id` is a registered target node.
    pub fn is_target_node(&self, id: NodeId) -> bool {
        self.target_nodes.contains(&id)
    }

    /// Number of registered source nodes.
    pub fn source_len(&self) -> usize {
        self.source_nodes.len()
    }

    /// Register `node` and its current subtree.
    ///
    /// # Panics
    ///
    /// Panics if any of them is already registered.
    pub fn add_source(&mut self, node: NodeId) {
        let subtree: Vec<NodeId> = pre_order(&self.source, node).collect();
        for id in subtree {
            assert!(
                self.source_nodes.insert(id),
                "source node {} registered twice",
                usize::from(id)
            );
        }
    }

    /// Deregister `node` and its current subtree.
    ///
    /// # Panics
    ///
    /// Panics if any of them is not registered.
    pub fn remove_source(&mut self, node: NodeId) {
        let subtree: Vec<NodeId> = pre_order(&self.source, node).collect();
        for id in subtree {
            assert!(
                self.source_nodes.remove(&id),
                "source node {} is not registered",
                usize::from(id)
            );
        }
    }

    /// The target counterpart of a source node.
    pub fn partner_of_source(&self, source: NodeId) -> Option<NodeId> {
        self.matching.partner_of_source(source)
    }

    /// The source counterpart of a target node.
    pub fn partner_of_target(&self, target: NodeId) -> Option<NodeId> {
        self.matching.partner_of_target(target)
    }

    /// Whether a source node has no counterpart yet.
    pub fn source_unmatched(&self, source: NodeId) -> bool {
        !self.matching.contains_source(source)
    }

    /// Whether a target node has no counterpart yet.
    pub fn target_unmatched(&self, target: NodeId) -> bool {
        !self.matching.contains_target(target)
    }
}
