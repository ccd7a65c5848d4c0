//! Structural diffs of Python code.
//!
//! astdiff parses both inputs with tree-sitter, canonicalizes the syntax
//! trees, and hands them to [`gumdiff`] for matching and edit script
//! generation.
//!
//! # Example
//!
//! ```rust
//! use astdiff::{DiffOptions, diff_code};
//!
//! let options = DiffOptions::default();
//! let (source, ctx) = diff_code("print('123')", "print('321')", &options).unwrap();
//! assert_eq!(ctx.edit_script.len(), 1);
//!
//! for op in ctx.edit_script.standalone(&ctx.source) {
//!     println!("{op}");
//! }
//!
//! // The script turns the parsed source into the parsed target.
//! assert_eq!(ctx.edit_script.replay(&source).unwrap(), ctx.target);
//! ```

use facet::Facet;

mod tracing_macros;
#[allow(unused_imports)]
use tracing_macros::{debug, trace};

pub mod parser;

pub use gumdiff::{DiffContext, DiffError, DiffOptions, EditScript, StandaloneOp, Tree};
pub use parser::{ParseError, ParseOptions, ParserKind, PythonParser, build_parser};

/// Errors that can occur while diffing code.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
#[facet(derive(Error))]
#[repr(u8)]
pub enum AstDiffError {
    /// failed to parse the {side}: {error}
    Parse { side: String, error: ParseError },

    /// diff failed: {error}
    Diff { error: DiffError },
}

/// Parse both inputs (paths ending in `.py`, or code) and diff them.
///
/// Returns the parsed source tree alongside the context, since the script's
/// node ids refer to it.
pub fn diff_paths(
    source: &str,
    target: &str,
    options: &DiffOptions,
) -> Result<(Tree, DiffContext), AstDiffError> {
    diff_paths_with(source, target, options, ParseOptions::default())
}

/// [`diff_paths`] with explicit parser settings.
pub fn diff_paths_with(
    source: &str,
    target: &str,
    options: &DiffOptions,
    parse_options: ParseOptions,
) -> Result<(Tree, DiffContext), AstDiffError> {
    debug!(source, target, parser = %parse_options.kind, "comparing");
    run(source, target, options, parse_options, PythonParser::parse)
}

/// Parse two strings of code and diff them.
pub fn diff_code(
    source: &str,
    target: &str,
    options: &DiffOptions,
) -> Result<(Tree, DiffContext), AstDiffError> {
    diff_code_with(source, target, options, ParseOptions::default())
}

/// [`diff_code`] with explicit parser settings.
pub fn diff_code_with(
    source: &str,
    target: &str,
    options: &DiffOptions,
    parse_options: ParseOptions,
) -> Result<(Tree, DiffContext), AstDiffError> {
    run(source, target, options, parse_options, |parser, code| {
        parser.parse_code(code)
    })
}

fn run(
    source: &str,
    target: &str,
    options: &DiffOptions,
    parse_options: ParseOptions,
    parse: impl Fn(&mut PythonParser, &str) -> Result<Tree, ParseError>,
) -> Result<(Tree, DiffContext), AstDiffError> {
    let parse_side = |side: &str, input: &str| {
        let parse_error = |error| AstDiffError::Parse {
            side: side.to_owned(),
            error,
        };
        let mut parser = build_parser(parse_options.kind, parse_options).map_err(parse_error)?;
        parse(&mut parser, input).map_err(parse_error)
    };

    let source_tree = parse_side("source", source)?;
    let target_tree = parse_side("target", target)?;

    let ctx = gumdiff::diff(&source_tree, &target_tree, options)
        .map_err(|error| AstDiffError::Diff { error })?;
    Ok((source_tree, ctx))
}
