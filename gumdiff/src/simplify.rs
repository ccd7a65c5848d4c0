//! Edit script condensation.
//!
//! Collapses subtree operations for display:
//! - When a subtree is inserted, don't report the inserts of its descendants
//! - When a subtree is deleted, don't report the deletes of its descendants
//!
//! A condensed script is meant for people; it cannot be replayed.

use indextree::NodeId;
use rapidhash::RapidHashSet as HashSet;

use crate::debug;
use crate::script::{EditOp, EditScript};

/// Drop every insert or delete that is covered by an insert or delete of an
/// ancestor in the same script.
pub fn condense(script: &EditScript) -> EditScript {
    debug!(ops_count = script.len(), "condense start");

    let mut inserted: HashSet<NodeId> = HashSet::default();
    let mut deleted: HashSet<NodeId> = HashSet::default();
    for op in script {
        match op {
            EditOp::Insert { node, .. } => {
                inserted.insert(*node);
            }
            EditOp::Delete { node, .. } => {
                deleted.insert(*node);
            }
            EditOp::Move { .. } | EditOp::Update { .. } => {}
        }
    }

    let condensed: EditScript = script
        .iter()
        .filter(|op| match op {
            EditOp::Insert {
                parent: Some(parent),
                ..
            } => !inserted.contains(parent),
            EditOp::Delete {
                parent: Some(parent),
                ..
            } => !deleted.contains(parent),
            _ => true,
        })
        .cloned()
        .collect();

    debug!(
        before = script.len(),
        after = condensed.len(),
        "condense done"
    );
    condensed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DiffOptions, MatcherKind, Node, Tree, diff};
    use facet_testhelpers::test;

    #[test]
    fn test_condense_keeps_subtree_roots() {
        let source = Tree::build(&Node::new(
            "module",
            "",
            vec![
                Node::new("stmt", "", vec![Node::leaf("name", "keep")]),
                Node::new(
                    "import",
                    "",
                    vec![Node::new("dotted", "", vec![Node::leaf("name", "os")])],
                ),
            ],
        ));
        let target = Tree::build(&Node::new(
            "module",
            "",
            vec![
                Node::new("stmt", "", vec![Node::leaf("name", "keep")]),
                Node::new(
                    "call",
                    "",
                    vec![Node::leaf("name", "print"), Node::leaf("string", "'x'")],
                ),
            ],
        ));

        let ctx = diff(&source, &target, &DiffOptions::default()).unwrap();
        let full = &ctx.edit_script;
        let condensed = condense(full);

        assert!(condensed.len() < full.len(), "{condensed}");
        let inserts: Vec<_> = condensed
            .iter()
            .filter_map(|op| match op {
                EditOp::Insert { label, .. } => Some(label.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(inserts, vec!["call"]);
        let deletes = condensed
            .iter()
            .filter(|op| matches!(op, EditOp::Delete { .. }))
            .count();
        assert_eq!(deletes, 1, "{condensed}");
    }

    #[test]
    fn test_condense_leaves_moves_and_updates() {
        let source = Tree::build(&Node::new(
            "module",
            "",
            vec![Node::leaf("name", "a"), Node::leaf("name", "b")],
        ));
        let target = Tree::build(&Node::new(
            "module",
            "",
            vec![Node::leaf("name", "b"), Node::leaf("name", "c")],
        ));
        let options = DiffOptions {
            matcher: MatcherKind::GumTree,
            ..DiffOptions::default()
        };
        let ctx = diff(&source, &target, &options).unwrap();
        assert_eq!(condense(&ctx.edit_script), ctx.edit_script);
    }
}
