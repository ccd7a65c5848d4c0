//! End-to-end diffs of small Python programs.

use astdiff::{
    AstDiffError, DiffError, DiffOptions, ParseOptions, ParserKind, StandaloneOp, diff_code,
    diff_code_with,
};
use facet_testhelpers::test;
use gumdiff::{EditOp, MatcherKind};

fn standalone(source: &str, target: &str) -> Vec<StandaloneOp> {
    let (tree, ctx) = diff_code(source, target, &DiffOptions::default()).unwrap();
    let replayed = ctx.edit_script.replay(&tree).unwrap();
    assert_eq!(replayed, ctx.target, "replay did not reproduce the target");
    ctx.edit_script.standalone(&ctx.source)
}

fn render(ops: &[StandaloneOp]) -> Vec<String> {
    ops.iter().map(ToString::to_string).collect()
}

#[test]
fn test_changed_string_is_one_update() {
    let ops = standalone("print('123')", "print(\n'321')");
    assert_eq!(render(&ops), vec![r#"Update(string "'123'" → "'321'")"#]);
}

#[test]
fn test_removed_import() {
    let source = "\"\"\"test1\"\"\"\nimport os\n\nprint('x')\n";
    let target = "\"\"\"test2\"\"\"\n\nprint('x')\n";
    let ops = standalone(source, target);

    assert_eq!(
        render(&ops),
        vec![
            r#"Update(string "\"\"\"test1\"\"\"" → "\"\"\"test2\"\"\"")"#,
            r#"Delete(keyword "import")"#,
            r#"Delete(identifier "os")"#,
            "Delete(import_statement)",
        ]
    );
}

#[test]
fn test_empty_and_whitespace_files_are_equal() {
    assert!(standalone("", "").is_empty());
    assert!(standalone("", "\n    \n\n").is_empty());
}

#[test]
fn test_comments_and_parens_are_ignored() {
    let ops = standalone("a = (((1)))  # one", "# set a\na = 1");
    assert!(ops.is_empty(), "{:?}", render(&ops));
}

#[test]
fn test_reordered_functions_move() {
    let source = "\
def first(a):
    return a + 1

def second(b):
    return b * 2
";
    let target = "\
def second(b):
    return b * 2

def first(a):
    return a + 1
";
    let (_, ctx) = diff_code(source, target, &DiffOptions::default()).unwrap();
    assert_eq!(ctx.edit_script.len(), 1, "{}", ctx.edit_script);
    assert!(matches!(ctx.edit_script.ops()[0], EditOp::Move { .. }));
}

#[test]
fn test_renamed_function_updates_name() {
    let source = "def area(w, h):\n    return w * h\n";
    let target = "def surface(w, h):\n    return w * h\n";
    let ops = standalone(source, target);
    assert_eq!(
        render(&ops),
        vec![r#"Update(identifier "area" → "surface")"#]
    );
}

#[test]
fn test_syntax_errors_still_diff() {
    standalone("def broken(:\n    pass\n", "def broken():\n    pass\n");
}

#[test]
fn test_change_distiller_is_rejected() {
    let options = DiffOptions {
        matcher: MatcherKind::ChangeDistiller,
        ..DiffOptions::default()
    };
    let err = diff_code("x = 1", "x = 2", &options).unwrap_err();
    assert_eq!(
        err,
        AstDiffError::Diff {
            error: DiffError::UnimplementedMatcher {
                name: "change-distiller".into()
            }
        }
    );
}

#[test]
fn test_stub_matcher_rebuilds_the_tree() {
    let options = DiffOptions {
        matcher: MatcherKind::Stub,
        ..DiffOptions::default()
    };
    let (tree, ctx) = diff_code("x = 1", "y = 2", &options).unwrap();
    assert!(
        ctx.edit_script
            .iter()
            .all(|op| matches!(op, EditOp::Insert { .. } | EditOp::Delete { .. }))
    );
    assert_eq!(ctx.edit_script.replay(&tree).unwrap(), ctx.target);
}

#[test]
fn test_standalone_ops_serialize() {
    let ops = standalone("x = 1", "x = 2");
    let json = facet_json::to_string(&ops).expect("serialization should work");
    assert!(json.contains("Update"));
    assert!(json.contains("integer"));
}

#[test]
fn test_paths_are_read_from_disk() {
    let case = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/replay-cases/update_string.py");
    let mut parser = astdiff::PythonParser::new().unwrap();
    let tree = parser.parse(case).unwrap();
    // Both halves of the case file, as two expression statements.
    assert_eq!(tree.child_count(tree.root), 2);
}

#[test]
fn test_abstract_parser_reports_operator_changes() {
    let options = ParseOptions {
        kind: ParserKind::Abstract,
        ..ParseOptions::default()
    };
    let source = "if a == b:\n    x = 1\n    y = 2\n";
    let target = "if a != b:\n    x = 1\n    y = 2\n";
    let (tree, ctx) = diff_code_with(source, target, &DiffOptions::default(), options).unwrap();
    assert_eq!(ctx.edit_script.replay(&tree).unwrap(), ctx.target);

    let ops = ctx.edit_script.standalone(&ctx.source);
    assert_eq!(render(&ops), vec![r#"Update(comparison_operator "==" → "!=")"#]);
}
