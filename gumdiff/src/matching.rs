//! GumTree node matching algorithm.
//!
//! Implements two-phase matching (Falleri et al., ASE 2014):
//! 1. Top-down: greedily match the largest isomorphic subtrees ("anchors")
//! 2. Bottom-up: match remaining containers by the ratio of already matched
//!    descendants, then recover finer matches among their children

use core::fmt;

use indexmap::IndexMap;
use indextree::NodeId;
use rapidhash::{RapidHashMap as HashMap, RapidHashSet as HashSet};

use crate::context::{DiffContext, MatchingPair, MatchingSet};
use crate::error::DiffError;
use crate::traversal::{descendants, post_order, pre_order};
use crate::tree::Tree;
use crate::util::{HeightQueue, group_by, longest_common_subsequence};
use crate::{debug, trace};

#[cfg(feature = "matching-stats")]
use core::cell::RefCell;

#[cfg(feature = "matching-stats")]
thread_local! {
    static DICE_CALLS: RefCell<usize> = const { RefCell::new(0) };
    static DICE_CACHE_HITS: RefCell<usize> = const { RefCell::new(0) };
}

/// Reset matching statistics (call before a matching run)
#[cfg(feature = "matching-stats")]
pub fn reset_stats() {
    DICE_CALLS.with(|c| *c.borrow_mut() = 0);
    DICE_CACHE_HITS.with(|c| *c.borrow_mut() = 0);
}

/// Get matching statistics: (dice_calls, dice_cache_hits)
#[cfg(feature = "matching-stats")]
pub fn get_stats() -> (usize, usize) {
    let calls = DICE_CALLS.with(|c| *c.borrow());
    let hits = DICE_CACHE_HITS.with(|c| *c.borrow());
    (calls, hits)
}

/// Minimum subtree height considered during anchor matching.
pub const DEFAULT_MIN_HEIGHT: usize = 2;
/// Largest subtree for which recovery matching is attempted.
pub const DEFAULT_MAX_SIZE: usize = 100;
/// Minimum Dice coefficient for a container match.
pub const DEFAULT_MIN_DICE: f64 = 0.5;

/// Tuning knobs for the GumTree matcher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchingConfig {
    /// Subtrees shorter than this are never anchors. Values below 1 act as 1.
    /// Default: 2
    pub min_height: usize,

    /// Recovery matching is skipped when either subtree of a container match
    /// has more nodes than this.
    /// Default: 100
    pub max_size: usize,

    /// Minimum Dice coefficient for accepting a container match.
    /// Default: 0.5
    pub min_dice: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            min_height: DEFAULT_MIN_HEIGHT,
            max_size: DEFAULT_MAX_SIZE,
            min_dice: DEFAULT_MIN_DICE,
        }
    }
}

/// Populates the matching set of a [`DiffContext`].
pub trait Matcher {
    /// Compute a matching between the context's source and target trees.
    fn find_matching_nodes(&mut self, ctx: &mut DiffContext) -> Result<(), DiffError>;
}

/// Available matching algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatcherKind {
    /// GumTree top-down + bottom-up matching
    #[default]
    GumTree,
    /// Matches nothing
    Stub,
    /// ChangeDistiller leaf/inner-node matching (not implemented)
    ChangeDistiller,
}

impl MatcherKind {
    /// Command-line name of the matcher.
    pub fn name(self) -> &'static str {
        match self {
            MatcherKind::GumTree => "gumtree",
            MatcherKind::Stub => "stub",
            MatcherKind::ChangeDistiller => "change-distiller",
        }
    }
}

impl fmt::Display for MatcherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Instantiate a matcher.
///
/// Selecting a matcher that is not implemented fails here, before any work
/// is done.
pub fn build_matcher(
    kind: MatcherKind,
    config: &MatchingConfig,
) -> Result<Box<dyn Matcher>, DiffError> {
    match kind {
        MatcherKind::GumTree => Ok(Box::new(GumTreeMatcher::new(*config))),
        MatcherKind::Stub => Ok(Box::new(StubMatcher)),
        MatcherKind::ChangeDistiller => Err(DiffError::UnimplementedMatcher {
            name: kind.name().to_string(),
        }),
    }
}

/// A matcher that pairs nothing: the resulting script deletes the whole
/// source and inserts the whole target.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubMatcher;

impl Matcher for StubMatcher {
    fn find_matching_nodes(&mut self, ctx: &mut DiffContext) -> Result<(), DiffError> {
        ctx.matching = MatchingSet::new();
        Ok(())
    }
}

/// Nodes of both trees sharing one hashcode.
#[derive(Debug, Default)]
struct Mapping {
    sources: Vec<NodeId>,
    targets: Vec<NodeId>,
}

impl Mapping {
    /// Exactly one node on each side.
    fn is_unique(&self) -> bool {
        self.sources.len() == 1 && self.targets.len() == 1
    }

    /// Nodes on one side only.
    fn is_unmatched(&self) -> bool {
        self.sources.is_empty() || self.targets.is_empty()
    }

    /// Size of the largest source subtree.
    fn max_size(&self, tree: &Tree) -> usize {
        self.sources
            .iter()
            .map(|&id| tree.metadata(id).size)
            .max()
            .unwrap_or(0)
    }
}

/// Groups equally tall nodes by hashcode, in first-seen order.
#[derive(Debug, Default)]
struct MappingStore {
    mappings: IndexMap<u64, Mapping>,
}

impl MappingStore {
    fn add_source(&mut self, tree: &Tree, id: NodeId) {
        let hash = tree.metadata(id).hashcode;
        self.mappings.entry(hash).or_default().sources.push(id);
    }

    fn add_target(&mut self, tree: &Tree, id: NodeId) {
        let hash = tree.metadata(id).hashcode;
        self.mappings.entry(hash).or_default().targets.push(id);
    }
}

/// The GumTree matcher.
///
/// One instance may be reused across runs; [`GumTreeMatcher::prepare`]
/// resets all per-run state.
#[derive(Debug)]
pub struct GumTreeMatcher {
    config: MatchingConfig,
    /// (source, target) -> (matching size when computed, score)
    dice_cache: HashMap<(NodeId, NodeId), (usize, f64)>,
    source_descendants: HashMap<NodeId, Vec<NodeId>>,
    target_descendants: HashMap<NodeId, HashSet<NodeId>>,
}

impl Default for GumTreeMatcher {
    fn default() -> Self {
        Self::new(MatchingConfig::default())
    }
}

impl Matcher for GumTreeMatcher {
    fn find_matching_nodes(&mut self, ctx: &mut DiffContext) -> Result<(), DiffError> {
        debug!(
            source_nodes = ctx.source.node_count(),
            target_nodes = ctx.target.node_count(),
            "gumtree start"
        );
        self.prepare(ctx);

        self.match_anchors(ctx);
        debug!(matched = ctx.matching.len(), "after match_anchors");

        self.match_containers(ctx);
        debug!(matched = ctx.matching.len(), "after match_containers");

        Ok(())
    }
}

impl GumTreeMatcher {
    /// Create a matcher with the given configuration.
    pub fn new(config: MatchingConfig) -> Self {
        Self {
            config,
            dice_cache: HashMap::default(),
            source_descendants: HashMap::default(),
            target_descendants: HashMap::default(),
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Start a fresh run: empty matching, empty caches.
    pub fn prepare(&mut self, ctx: &mut DiffContext) {
        ctx.matching = MatchingSet::with_capacity(ctx.source.node_count(), ctx.target.node_count());
        self.dice_cache.clear();
        self.source_descendants.clear();
        self.target_descendants.clear();
    }

    /// Phase 1: greedy top-down search for the largest isomorphic subtrees.
    ///
    /// See section 3.1 of the GumTree paper.
    pub fn match_anchors(&mut self, ctx: &mut DiffContext) {
        trace!("match_anchors start");
        let mut candidates: Vec<Mapping> = Vec::new();

        let mut source_queue = HeightQueue::new();
        source_queue.push(&ctx.source, ctx.source.root);
        let mut target_queue = HeightQueue::new();
        target_queue.push(&ctx.target, ctx.target.root);

        // An empty queue peeks at height 0, so the bound must stay positive.
        let min_height = self.config.min_height.max(1);
        while source_queue.peek_max().min(target_queue.peek_max()) >= min_height {
            let source_height = source_queue.peek_max();
            let target_height = target_queue.peek_max();

            if source_height > target_height {
                for node in source_queue.pop(&ctx.source) {
                    source_queue.open(&ctx.source, node);
                }
                continue;
            }
            if source_height < target_height {
                for node in target_queue.pop(&ctx.target) {
                    target_queue.open(&ctx.target, node);
                }
                continue;
            }

            // Same height on both sides: the tallest nodes may be isomorphic.
            let mut store = MappingStore::default();
            for node in source_queue.pop(&ctx.source) {
                store.add_source(&ctx.source, node);
            }
            for node in target_queue.pop(&ctx.target) {
                store.add_target(&ctx.target, node);
            }

            for mapping in store.mappings.into_values() {
                if mapping.is_unique() {
                    let pair = MatchingPair::new(mapping.sources[0], mapping.targets[0]);
                    trace!(
                        source = usize::from(pair.source),
                        target = usize::from(pair.target),
                        height = source_height,
                        "anchor"
                    );
                    match_descendants(ctx, pair);
                } else if mapping.is_unmatched() {
                    // Isomorphic subtrees have equal heights, so look deeper.
                    for &node in &mapping.sources {
                        source_queue.open(&ctx.source, node);
                    }
                    for &node in &mapping.targets {
                        target_queue.open(&ctx.target, node);
                    }
                } else {
                    candidates.push(mapping);
                }
            }
        }

        debug!(candidates = candidates.len(), "resolving candidate mappings");

        // Larger subtrees first; sort is stable so ties keep discovery order.
        candidates.sort_by_key(|mapping| core::cmp::Reverse(mapping.max_size(&ctx.source)));

        for mapping in candidates {
            let mut pairs: Vec<(f64, MatchingPair)> = Vec::new();
            for &source in &mapping.sources {
                for &target in &mapping.targets {
                    let pair = MatchingPair::new(source, target);
                    pairs.push((self.parent_dice(ctx, pair), pair));
                }
            }
            pairs.sort_by(|a, b| b.0.total_cmp(&a.0));

            for (_, pair) in pairs {
                if ctx.matching.contains_source(pair.source)
                    || ctx.matching.contains_target(pair.target)
                {
                    continue;
                }
                match_descendants(ctx, pair);
            }
        }
    }

    /// Phase 2: bottom-up container matching with recovery.
    ///
    /// See section 3.2 of the GumTree paper.
    pub fn match_containers(&mut self, ctx: &mut DiffContext) {
        let before = ctx.matching.len();
        let root = ctx.source.root;
        let order: Vec<NodeId> = post_order(&ctx.source, root).collect();

        for node in order {
            if !ctx.source_unmatched(node) {
                continue;
            }

            // The roots correspond whatever their similarity, as long as
            // their labels agree. Labels are never edited, so roots of
            // different kinds stay apart and the generator replaces the root.
            if node == root && ctx.target_unmatched(ctx.target.root) {
                let pair = MatchingPair::new(root, ctx.target.root);
                self.attempt_recovery(ctx, pair);
                if ctx.source.can_match(root, &ctx.target, ctx.target.root) {
                    ctx.matching.add(pair);
                } else {
                    debug!(
                        source = ctx.source.label(root),
                        target = ctx.target.label(ctx.target.root),
                        "root labels differ, leaving roots unmatched"
                    );
                }
                continue;
            }

            if ctx.source.is_leaf(node) {
                continue;
            }

            let mut best: Option<(f64, MatchingPair)> = None;
            for pair in candidate_container_matches(ctx, node) {
                let dice = self.dice(ctx, pair.source, pair.target);
                if best.is_none_or(|(top, _)| dice > top) {
                    best = Some((dice, pair));
                }
            }

            match best {
                Some((dice, pair)) if dice >= self.config.min_dice => {
                    trace!(
                        source = usize::from(pair.source),
                        target = usize::from(pair.target),
                        dice,
                        "container"
                    );
                    self.attempt_recovery(ctx, pair);
                    ctx.matching.add(pair);
                }
                _ => {}
            }
        }

        debug!(
            found = ctx.matching.len() - before,
            "container matching done"
        );
    }

    /// Look for matches among the children of a freshly matched container.
    fn attempt_recovery(&mut self, ctx: &mut DiffContext, pair: MatchingPair) {
        let size = ctx
            .source
            .metadata(pair.source)
            .size
            .max(ctx.target.metadata(pair.target).size);
        if size > self.config.max_size {
            trace!(size, max_size = self.config.max_size, "skipping recovery");
            return;
        }

        lcs_recovery(ctx, pair, Tree::isomorphic_to);
        lcs_recovery(ctx, pair, Tree::isomorphic_to_without_values);
        self.histogram_recovery(ctx, pair);
    }

    /// Match children whose label is unique among the unmatched children on
    /// both sides.
    fn histogram_recovery(&mut self, ctx: &mut DiffContext, pair: MatchingPair) {
        let source_children: Vec<NodeId> = ctx
            .source
            .children(pair.source)
            .filter(|&c| ctx.source_unmatched(c))
            .collect();
        let target_children: Vec<NodeId> = ctx
            .target
            .children(pair.target)
            .filter(|&c| ctx.target_unmatched(c))
            .collect();

        let source_hist = group_by(source_children, |&c| ctx.source.label(c).to_owned());
        let target_hist = group_by(target_children, |&c| ctx.target.label(c).to_owned());

        for (label, sources) in &source_hist {
            let Some(targets) = target_hist.get(label) else {
                continue;
            };
            if sources.len() != 1 || targets.len() != 1 {
                continue;
            }
            let child = MatchingPair::new(sources[0], targets[0]);
            if ctx.matching.contains_source(child.source)
                || ctx.matching.contains_target(child.target)
            {
                continue;
            }
            trace!(label = %label, "histogram match");
            ctx.matching.add(child);
            self.attempt_recovery(ctx, child);
        }
    }

    /// Dice coefficient of the pair's parents (or the nodes themselves for
    /// roots).
    fn parent_dice(&mut self, ctx: &DiffContext, pair: MatchingPair) -> f64 {
        let source = ctx.source.parent(pair.source).unwrap_or(pair.source);
        let target = ctx.target.parent(pair.target).unwrap_or(pair.target);
        self.dice(ctx, source, target)
    }

    /// dice(s, t) = 2 × |matched descendant pairs| / (|desc(s)| + |desc(t)|)
    fn dice(&mut self, ctx: &DiffContext, source: NodeId, target: NodeId) -> f64 {
        #[cfg(feature = "matching-stats")]
        DICE_CALLS.with(|c| *c.borrow_mut() += 1);

        let generation = ctx.matching.len();
        if let Some(&(computed_at, score)) = self.dice_cache.get(&(source, target))
            && computed_at == generation
        {
            #[cfg(feature = "matching-stats")]
            DICE_CACHE_HITS.with(|c| *c.borrow_mut() += 1);
            return score;
        }

        let source_desc = self
            .source_descendants
            .entry(source)
            .or_insert_with(|| descendants(&ctx.source, source).collect());
        let target_desc = self
            .target_descendants
            .entry(target)
            .or_insert_with(|| descendants(&ctx.target, target).collect());

        let score = if source_desc.is_empty() && target_desc.is_empty() {
            1.0
        } else {
            let common = source_desc
                .iter()
                .filter(|&&s| {
                    ctx.partner_of_source(s)
                        .is_some_and(|t| target_desc.contains(&t))
                })
                .count();
            2.0 * common as f64 / (source_desc.len() + target_desc.len()) as f64
        };

        self.dice_cache.insert((source, target), (generation, score));
        score
    }
}

/// Match two isomorphic subtrees node by node, in pre-order.
///
/// # Panics
///
/// Panics if a pair disagrees on label or arity, or if a node is already
/// matched.
fn match_descendants(ctx: &mut DiffContext, pair: MatchingPair) {
    let mut stack = vec![pair];
    while let Some(pair) = stack.pop() {
        assert!(
            ctx.source.can_match(pair.source, &ctx.target, pair.target),
            "descendant match between different labels: {} vs {}",
            ctx.source.label(pair.source),
            ctx.target.label(pair.target)
        );
        let source_children: Vec<NodeId> = ctx.source.children(pair.source).collect();
        let target_children: Vec<NodeId> = ctx.target.children(pair.target).collect();
        assert_eq!(
            source_children.len(),
            target_children.len(),
            "descendant match between nodes of different arity"
        );

        ctx.matching.add(pair);
        for (s, t) in source_children.into_iter().zip(target_children).rev() {
            stack.push(MatchingPair::new(s, t));
        }
    }
}

/// Unmatched, label-compatible target ancestors of the partners of
/// `source`'s matched descendants.
fn candidate_container_matches(ctx: &DiffContext, source: NodeId) -> Vec<MatchingPair> {
    let mut seen: HashSet<NodeId> = HashSet::default();
    let mut candidates = Vec::new();

    for desc in descendants(&ctx.source, source) {
        let Some(mut target) = ctx.partner_of_source(desc) else {
            continue;
        };
        while let Some(parent) = ctx.target.parent(target) {
            target = parent;
            if !seen.insert(target) {
                break;
            }
            if ctx.target_unmatched(target) && ctx.source.can_match(source, &ctx.target, target) {
                candidates.push(MatchingPair::new(source, target));
            }
        }
    }
    candidates
}

/// Align the unmatched children of `pair` with an LCS under `eq`, matching
/// every aligned pair whose subtrees are still entirely unmatched.
fn lcs_recovery(
    ctx: &mut DiffContext,
    pair: MatchingPair,
    eq: fn(&Tree, NodeId, &Tree, NodeId) -> bool,
) {
    let source_children: Vec<NodeId> = ctx
        .source
        .children(pair.source)
        .filter(|&c| ctx.source_unmatched(c))
        .collect();
    let target_children: Vec<NodeId> = ctx
        .target
        .children(pair.target)
        .filter(|&c| ctx.target_unmatched(c))
        .collect();

    let aligned = longest_common_subsequence(&source_children, &target_children, |&s, &t| {
        eq(&ctx.source, s, &ctx.target, t)
    });

    for (s, t) in aligned {
        if pre_order(&ctx.source, s).any(|id| !ctx.source_unmatched(id)) {
            continue;
        }
        if pre_order(&ctx.target, t).any(|id| !ctx.target_unmatched(id)) {
            continue;
        }
        trace!(
            source = usize::from(s),
            target = usize::from(t),
            "lcs recovery"
        );
        match_descendants(ctx, MatchingPair::new(s, t));
    }
}
