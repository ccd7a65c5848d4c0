use astdiff::{DiffOptions, PythonParser, diff_code};
use divan::{Bencher, black_box};

fn main() {
    divan::main();
}

/// A module with `n` small classes.
fn module(n: usize) -> String {
    (0..n)
        .map(|i| {
            format!(
                "class Shape{i}:\n    def __init__(self, w, h):\n        self.w = w\n        self.h = h\n\n    def area(self):\n        return self.w * self.h + {i}\n\n\n"
            )
        })
        .collect()
}

/// Helper to make a small change to the code
fn modify(code: &str) -> String {
    code.replacen("self.w * self.h", "self.h * self.w", 1)
        .replacen("def area", "def surface", 1)
}

#[divan::bench]
fn parse_medium(bencher: Bencher) {
    let code = module(50);
    let mut parser = PythonParser::new().unwrap();
    bencher.bench_local(|| black_box(parser.parse_code(black_box(&code)).unwrap()));
}

#[divan::bench]
fn diff_small(bencher: Bencher) {
    let old = module(5);
    let new = modify(&old);
    let options = DiffOptions::default();
    bencher.bench_local(|| black_box(diff_code(black_box(&old), black_box(&new), &options).unwrap()));
}

#[divan::bench]
fn diff_medium(bencher: Bencher) {
    let old = module(50);
    let new = modify(&old);
    let options = DiffOptions::default();
    bencher.bench_local(|| black_box(diff_code(black_box(&old), black_box(&new), &options).unwrap()));
}

#[divan::bench]
fn diff_large(bencher: Bencher) {
    let old = module(500);
    let new = modify(&old);
    let options = DiffOptions::default();
    bencher.bench_local(|| black_box(diff_code(black_box(&old), black_box(&new), &options).unwrap()));
}
