use divan::{Bencher, black_box};
use gumdiff::{DiffOptions, MatchingConfig, Node, Tree, diff, diff_batch};

fn main() {
    divan::main();
}

/// A module of `n` small functions, each with a distinct name and body.
fn module(n: usize, renamed: Option<usize>) -> Node {
    let functions = (0..n)
        .map(|i| {
            let name = if Some(i) == renamed {
                format!("renamed_{i}")
            } else {
                format!("function_{i}")
            };
            Node::new(
                "function_definition",
                "",
                vec![
                    Node::leaf("identifier", name),
                    Node::new(
                        "parameters",
                        "",
                        vec![Node::leaf("identifier", "x"), Node::leaf("identifier", "y")],
                    ),
                    Node::new(
                        "block",
                        "",
                        vec![Node::new(
                            "return_statement",
                            "",
                            vec![Node::new(
                                "binary_operator",
                                "",
                                vec![
                                    Node::leaf("identifier", "x"),
                                    Node::leaf("operator", "+"),
                                    Node::leaf("integer", i.to_string()),
                                ],
                            )],
                        )],
                    ),
                ],
            )
        })
        .collect();
    Node::new("module", "", functions)
}

/// Same functions, with the first one moved to the end and one renamed.
fn shuffled(n: usize) -> Node {
    let mut node = module(n, Some(n / 2));
    node.children.rotate_left(1);
    node
}

fn bench_diff(bencher: Bencher, n: usize) {
    let source = Tree::build(&module(n, None));
    let target = Tree::build(&shuffled(n));
    let options = DiffOptions::default();
    bencher.bench_local(|| {
        let ctx = diff(black_box(&source), black_box(&target), &options).unwrap();
        black_box(ctx.edit_script);
    });
}

#[divan::bench]
fn diff_small(bencher: Bencher) {
    bench_diff(bencher, 10);
}

#[divan::bench]
fn diff_medium(bencher: Bencher) {
    bench_diff(bencher, 100);
}

#[divan::bench]
fn diff_large(bencher: Bencher) {
    bench_diff(bencher, 1000);
}

#[divan::bench]
fn diff_without_recovery(bencher: Bencher) {
    let source = Tree::build(&module(100, None));
    let target = Tree::build(&shuffled(100));
    let options = DiffOptions {
        matching: MatchingConfig {
            max_size: 0,
            ..MatchingConfig::default()
        },
        ..DiffOptions::default()
    };
    bencher.bench_local(|| {
        let ctx = diff(black_box(&source), black_box(&target), &options).unwrap();
        black_box(ctx.edit_script);
    });
}

#[divan::bench]
fn build_metadata(bencher: Bencher) {
    let node = module(1000, None);
    bencher.bench_local(|| black_box(Tree::build(black_box(&node))));
}

#[divan::bench]
fn batch_of_pairs(bencher: Bencher) {
    let pairs: Vec<(Tree, Tree)> = (0..32)
        .map(|i| {
            (
                Tree::build(&module(20 + i, None)),
                Tree::build(&shuffled(20 + i)),
            )
        })
        .collect();
    let options = DiffOptions::default();
    bencher.bench_local(|| black_box(diff_batch(black_box(&pairs), &options)));
}
