//! Chawathe edit script generation algorithm.
//!
//! Generates an edit script (INSERT, UPDATE, MOVE, DELETE) from a node matching.
//! Based on "Change Detection in Hierarchically Structured Information" (Chawathe et al., 1996).
//!
//! The generator walks the target tree breadth-first and rewrites the
//! context's copy of the source tree as it goes, so that every processed
//! target node has a partner sitting at the right place:
//! 1. INSERT: target nodes without a partner get a fresh source node
//! 2. UPDATE: matched nodes with different values get the target's value
//! 3. MOVE: matched nodes under the wrong parent, or out of order among their
//!    siblings, are relocated
//! 4. DELETE: source nodes still unmatched at the end are removed

use core::fmt;

use indextree::NodeId;
use rapidhash::RapidHashSet as HashSet;

use crate::context::{DiffContext, MatchingPair};
use crate::script::{EditOp, EditScript};
use crate::traversal::{bfs, post_order};
use crate::util::longest_common_subsequence;
use crate::{debug, trace};

/// Turns a matching into an edit script.
pub trait EditScriptGenerator {
    /// Generate the script, rewriting `ctx.source` into the shape of
    /// `ctx.target` along the way.
    fn generate_edit_script(&mut self, ctx: &mut DiffContext) -> EditScript;
}

/// Available script generators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeneratorKind {
    /// Chawathe's algorithm with move support
    #[default]
    WithMove,
}

impl GeneratorKind {
    /// Command-line name of the generator.
    pub fn name(self) -> &'static str {
        match self {
            GeneratorKind::WithMove => "with-move",
        }
    }
}

impl fmt::Display for GeneratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Instantiate a generator.
pub fn build_generator(kind: GeneratorKind) -> Box<dyn EditScriptGenerator> {
    match kind {
        GeneratorKind::WithMove => Box::new(WithMoveGenerator::new()),
    }
}

/// Collects ops, logging each one.
struct Ops {
    script: EditScript,
}

impl Ops {
    fn new() -> Self {
        Self {
            script: EditScript::new(),
        }
    }

    fn push(&mut self, op: EditOp) {
        debug!(%op, "emit");
        self.script.push(op);
    }
}

/// Chawathe-style generator with move detection.
///
/// Keeps an "in order" mark per node: a node is in order when its position
/// among its siblings already agrees with its partner's. Marks are cleared
/// for a parent's children before they are aligned.
#[derive(Debug, Default)]
pub struct WithMoveGenerator {
    in_order_source: HashSet<NodeId>,
    in_order_target: HashSet<NodeId>,
    /// Source roots replaced during this run
    displaced_roots: Vec<NodeId>,
}

impl EditScriptGenerator for WithMoveGenerator {
    fn generate_edit_script(&mut self, ctx: &mut DiffContext) -> EditScript {
        self.in_order_source.clear();
        self.in_order_target.clear();
        self.displaced_roots.clear();

        debug!(
            matched = ctx.matching.len(),
            target_nodes = ctx.target.node_count(),
            "generate_edit_script start"
        );

        let mut ops = Ops::new();
        let order: Vec<NodeId> = bfs(&ctx.target, ctx.target.root).collect();
        for target in order {
            let source = match ctx.partner_of_target(target) {
                None => self.insert(ctx, &mut ops, target),
                Some(source) => {
                    self.update_and_move(ctx, &mut ops, source, target);
                    source
                }
            };
            self.in_order_source.insert(source);
            self.in_order_target.insert(target);
            self.align_children(ctx, &mut ops, source, target);
        }

        self.delete_unmatched(ctx, &mut ops);

        debug!(ops = ops.script.len(), "generate_edit_script done");
        ctx.edit_script = ops.script.clone();
        ops.script
    }
}

impl WithMoveGenerator {
    /// Create a generator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Give an unmatched target node a fresh source counterpart.
    fn insert(&mut self, ctx: &mut DiffContext, ops: &mut Ops, target: NodeId) -> NodeId {
        let label = ctx.target.label(target).to_owned();
        let value = ctx.target.value(target).to_owned();
        let parent = ctx
            .target
            .parent(target)
            .map(|p| ctx.partner_of_target(p).expect("target parent is processed first"));
        let position = self.find_position(ctx, target);

        let node = ctx.source.new_node(label.clone(), value.clone());
        match parent {
            Some(parent) => ctx.source.insert_child(parent, node, position),
            None => {
                let old_root = ctx.source.root;
                self.displaced_roots.push(old_root);
                ctx.source.set_root(node);
            }
        }
        ops.push(EditOp::Insert {
            node,
            parent,
            position,
            label,
            value,
        });

        ctx.add_source(node);
        ctx.matching.add(MatchingPair::new(node, target));
        node
    }

    /// Bring a matched source node's value and parent in line with its
    /// partner's.
    fn update_and_move(
        &mut self,
        ctx: &mut DiffContext,
        ops: &mut Ops,
        source: NodeId,
        target: NodeId,
    ) {
        if ctx.source.value(source) != ctx.target.value(target) {
            let old_value = ctx.source.value(source).to_owned();
            let new_value = ctx.target.value(target).to_owned();
            ctx.source.set_value(source, new_value.clone());
            ops.push(EditOp::Update {
                node: source,
                old_value,
                new_value,
            });
        }

        let Some(target_parent) = ctx.target.parent(target) else {
            // Roots correspond to roots.
            if source != ctx.source.root {
                let old_root = ctx.source.root;
                self.displaced_roots.push(old_root);
                ctx.source.set_root(source);
                ops.push(EditOp::Move {
                    node: source,
                    parent: None,
                    position: 0,
                });
            }
            return;
        };

        let current_parent_partner = ctx
            .source
            .parent(source)
            .and_then(|p| ctx.partner_of_source(p));
        if current_parent_partner != Some(target_parent) {
            let parent = ctx
                .partner_of_target(target_parent)
                .expect("target parent is processed first");
            let position = self.find_position(ctx, target);
            ctx.source.detach(source);
            ctx.source.insert_child(parent, source, position);
            ops.push(EditOp::Move {
                node: source,
                parent: Some(parent),
                position,
            });
        }
    }

    /// Reorder the matched children of `source` to agree with those of
    /// `target`, moving as few of them as an LCS allows.
    fn align_children(
        &mut self,
        ctx: &mut DiffContext,
        ops: &mut Ops,
        source: NodeId,
        target: NodeId,
    ) {
        let source_children: Vec<NodeId> = ctx.source.children(source).collect();
        let target_children: Vec<NodeId> = ctx.target.children(target).collect();
        for child in &source_children {
            self.in_order_source.remove(child);
        }
        for child in &target_children {
            self.in_order_target.remove(child);
        }

        let matched_source: Vec<NodeId> = source_children
            .iter()
            .copied()
            .filter(|&c| {
                ctx.partner_of_source(c)
                    .is_some_and(|p| target_children.contains(&p))
            })
            .collect();
        let matched_target: Vec<NodeId> = target_children
            .iter()
            .copied()
            .filter(|&c| {
                ctx.partner_of_target(c)
                    .is_some_and(|p| source_children.contains(&p))
            })
            .collect();

        let aligned: HashSet<(NodeId, NodeId)> =
            longest_common_subsequence(&matched_source, &matched_target, |&s, &t| {
                ctx.partner_of_source(s) == Some(t)
            })
            .into_iter()
            .collect();
        for &(s, t) in &aligned {
            self.in_order_source.insert(s);
            self.in_order_target.insert(t);
        }

        for target_child in matched_target {
            let source_child = ctx
                .partner_of_target(target_child)
                .expect("filtered to matched children");
            if aligned.contains(&(source_child, target_child)) {
                continue;
            }

            trace!(
                node = usize::from(source_child),
                "child out of order"
            );
            ctx.source.detach(source_child);
            let position = self.find_position(ctx, target_child);
            ctx.source.insert_child(source, source_child, position);
            ops.push(EditOp::Move {
                node: source_child,
                parent: Some(source),
                position,
            });
            self.in_order_source.insert(source_child);
            self.in_order_target.insert(target_child);
        }
    }

    /// Where `target`'s counterpart belongs among its new siblings: right
    /// after the partner of the closest in-order sibling to the left, or
    /// first if there is none.
    fn find_position(&self, ctx: &DiffContext, target: NodeId) -> usize {
        let Some(parent) = ctx.target.parent(target) else {
            return 0;
        };

        let mut rightmost = None;
        for sibling in ctx.target.children(parent) {
            if sibling == target {
                break;
            }
            if self.in_order_target.contains(&sibling) {
                rightmost = Some(sibling);
            }
        }

        rightmost
            .and_then(|sibling| ctx.partner_of_target(sibling))
            .and_then(|partner| ctx.source.position_in_siblings(partner))
            .map_or(0, |index| index + 1)
    }

    /// Remove every source node that is still unmatched, children first.
    fn delete_unmatched(&mut self, ctx: &mut DiffContext, ops: &mut Ops) {
        let mut roots = vec![ctx.source.root];
        // A replaced root may since have been moved into the new tree.
        roots.extend(
            self.displaced_roots
                .iter()
                .copied()
                .filter(|&r| ctx.source.parent(r).is_none() && r != ctx.source.root),
        );

        for root in roots {
            let order: Vec<NodeId> = post_order(&ctx.source, root).collect();
            for node in order {
                if !ctx.source_unmatched(node) {
                    continue;
                }
                let parent = ctx.source.parent(node);
                ctx.remove_source(node);
                ctx.source.detach(node);
                ops.push(EditOp::Delete { node, parent });
            }
        }
    }
}
