//! # Gumdiff
//!
//! Structural diffing of labeled ordered trees: GumTree matching followed by
//! Chawathe edit script generation.
//!
//! ## Algorithm Overview
//!
//! Gumdiff implements a tree diff algorithm based on:
//! - **GumTree** (Falleri et al., ASE 2014) for node matching
//! - **Chawathe algorithm** (1996) for edit script generation
//!
//! The algorithm works in phases:
//!
//! 1. **Metadata**: every node gets a height, a subtree size and a structural
//!    hash that is equal for isomorphic subtrees
//! 2. **Top-down matching**: match the tallest identical subtrees first
//!    ("anchors"), disambiguating repeats by how similar their parents are
//! 3. **Bottom-up matching**: match remaining inner nodes ("containers") by
//!    the Dice coefficient of their matched descendants, and recover smaller
//!    matches inside each container pair
//! 4. **Edit script generation**: produce INSERT, DELETE, UPDATE and MOVE
//!    operations that turn the source tree into the target
//!
//! ## Usage
//!
//! ```
//! use gumdiff::{DiffOptions, Node, Tree, diff};
//!
//! let source = Tree::build(&Node::new("call", "", vec![
//!     Node::leaf("identifier", "print"),
//!     Node::leaf("string", "'123'"),
//! ]));
//! let target = Tree::build(&Node::new("call", "", vec![
//!     Node::leaf("identifier", "print"),
//!     Node::leaf("string", "'321'"),
//! ]));
//!
//! let ctx = diff(&source, &target, &DiffOptions::default()).unwrap();
//! assert_eq!(ctx.edit_script.len(), 1);
//!
//! let replayed = ctx.edit_script.replay(&source).unwrap();
//! assert_eq!(replayed, target);
//! ```

#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]

pub use indextree;

mod tracing_macros;
#[allow(unused_imports)]
use tracing_macros::{debug, trace};

/// Edit script generation
pub mod chawathe;
/// State shared by matching and generation
pub mod context;
mod error;
/// GumTree matching algorithm
pub mod matching;
/// Heights, sizes and structural hashes
pub mod metadata;
/// Edit operations and scripts
pub mod script;
/// Display-oriented script condensation
pub mod simplify;
/// Tree traversal orders
pub mod traversal;
/// Tree representation
pub mod tree;
/// Grouping, LCS and the height-indexed priority queue
pub mod util;

#[cfg(test)]
mod fixtures;

pub use chawathe::{EditScriptGenerator, GeneratorKind, WithMoveGenerator, build_generator};
pub use context::{DiffContext, MatchingPair, MatchingSet};
pub use error::DiffError;
pub use matching::{
    GumTreeMatcher, Matcher, MatcherKind, MatchingConfig, StubMatcher, build_matcher,
};
#[cfg(feature = "matching-stats")]
pub use matching::{get_stats, reset_stats};
pub use metadata::{NodeMetadata, attach_metadata};
pub use script::{EditOp, EditScript, StandaloneNode, StandaloneOp};
pub use simplify::condense;
pub use tree::{Node, NodeData, NodePosition, Tree};

use rayon::prelude::*;

/// Which algorithms a diff run uses, and how they are tuned.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DiffOptions {
    /// Matching algorithm
    pub matcher: MatcherKind,
    /// Script generation algorithm
    pub generator: GeneratorKind,
    /// Matcher tuning
    pub matching: MatchingConfig,
}

/// Diff two trees.
///
/// Both trees must carry metadata (see [`Tree::build`]). The returned
/// context holds the matching, the edit script, and the rewritten working
/// copy of the source; the caller's trees are left as they were, so the
/// script can be replayed on `source` afterwards.
pub fn diff(
    source: &Tree,
    target: &Tree,
    options: &DiffOptions,
) -> Result<DiffContext, DiffError> {
    debug!(
        matcher = %options.matcher,
        generator = %options.generator,
        source_nodes = source.node_count(),
        target_nodes = target.node_count(),
        "diff start"
    );

    let mut ctx = DiffContext::new(source, target);
    let mut matcher = build_matcher(options.matcher, &options.matching)?;
    matcher.find_matching_nodes(&mut ctx)?;

    let mut generator = build_generator(options.generator);
    generator.generate_edit_script(&mut ctx);

    debug!(
        matched = ctx.matching.len(),
        ops = ctx.edit_script.len(),
        "diff done"
    );
    Ok(ctx)
}

/// Diff two trees with the GumTree matcher and return only the script.
///
/// # Example
///
/// ```
/// use gumdiff::{MatchingConfig, Node, Tree, diff_trees};
///
/// let source = Tree::build(&Node::new("root", "", vec![Node::leaf("leaf", "1")]));
/// let target = Tree::build(&Node::new("root", "", vec![Node::leaf("leaf", "2")]));
///
/// let script = diff_trees(&source, &target, &MatchingConfig::default());
/// assert_eq!(script.to_string().lines().next(), Some("Edit script (1 ops):"));
/// ```
pub fn diff_trees(source: &Tree, target: &Tree, config: &MatchingConfig) -> EditScript {
    let mut ctx = DiffContext::new(source, target);
    GumTreeMatcher::new(*config)
        .find_matching_nodes(&mut ctx)
        .expect("the GumTree matcher does not fail");
    WithMoveGenerator::new().generate_edit_script(&mut ctx)
}

/// Diff many independent tree pairs in parallel.
///
/// Each run has its own context; results come back in input order.
pub fn diff_batch(
    pairs: &[(Tree, Tree)],
    options: &DiffOptions,
) -> Vec<Result<DiffContext, DiffError>> {
    pairs
        .par_iter()
        .map(|(source, target)| diff(source, target, options))
        .collect()
}
