//! Python parser built on tree-sitter.
//!
//! tree-sitter produces a concrete syntax tree with full error recovery. The
//! canonicalizer below turns it into a [`Node`] tree that only keeps what
//! matters for a structural diff: layout, comments, and bracketing tokens are
//! dropped, so `a = (((1)))` and `a = 1` parse to the same tree.
//!
//! Two shapes are available (see [`ParserKind`]): the concrete tree keeps
//! keyword and operator tokens as leaves, the abstract tree keeps named nodes
//! only and records operators in the value of the node they belong to.

use core::fmt;
use std::path::Path;

use facet::Facet;
use gumdiff::{Node, NodePosition, Tree, attach_metadata};
use tree_sitter::Parser;

use crate::{debug, trace};

/// Tokens that only delimit structure.
const PUNCTUATION: &[&str] = &["(", ")", "[", "]", "{", "}", ",", ":", ";", "."];

/// Node kinds that carry no code.
const SKIPPED_KINDS: &[&str] = &["comment", "line_continuation"];

/// Grammar-only wrappers, inlined when they hold a single node.
const WRAPPER_KINDS: &[&str] = &["dotted_name", "type"];

/// Errors that can occur while parsing.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
#[facet(derive(Error))]
#[repr(u8)]
pub enum ParseError {
    /// the Python grammar could not be loaded: {message}
    Language { message: String },

    /// tree-sitter produced no tree
    NoTree,

    /// could not read {path}: {message}
    Io { path: String, message: String },
}

/// Which tree shape the canonicalizer produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParserKind {
    /// Concrete syntax: keywords and operators are `keyword`/`operator` leaves
    #[default]
    Concrete,
    /// Abstract syntax: named nodes only; operator tokens become the value of
    /// their node, other keywords are dropped
    Abstract,
}

impl ParserKind {
    /// Command-line name of the parser.
    pub fn name(self) -> &'static str {
        match self {
            ParserKind::Concrete => "concrete",
            ParserKind::Abstract => "abstract",
        }
    }
}

impl fmt::Display for ParserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parser settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Compute hashes, heights and sizes after parsing.
    /// Default: true
    pub attach_metadata: bool,

    /// Tree shape.
    /// Default: concrete
    pub kind: ParserKind,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            attach_metadata: true,
            kind: ParserKind::default(),
        }
    }
}

/// Instantiate a parser of the given kind.
pub fn build_parser(kind: ParserKind, options: ParseOptions) -> Result<PythonParser, ParseError> {
    PythonParser::with_options(ParseOptions { kind, ..options })
}

/// Parses Python code into canonical trees.
pub struct PythonParser {
    parser: Parser,
    options: ParseOptions,
}

impl PythonParser {
    /// Create a parser with default options.
    pub fn new() -> Result<Self, ParseError> {
        Self::with_options(ParseOptions::default())
    }

    /// Create a parser with the given options.
    pub fn with_options(options: ParseOptions) -> Result<Self, ParseError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| ParseError::Language {
                message: e.to_string(),
            })?;
        Ok(Self { parser, options })
    }

    /// The options this parser was created with.
    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Parse `input` as a path if it ends in `.py`, as code otherwise.
    pub fn parse(&mut self, input: &str) -> Result<Tree, ParseError> {
        if input.ends_with(".py") {
            self.parse_file(input)
        } else {
            self.parse_code(input)
        }
    }

    /// Read and parse a source file.
    pub fn parse_file(&mut self, path: impl AsRef<Path>) -> Result<Tree, ParseError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "reading source file");
        let code = std::fs::read_to_string(path).map_err(|e| ParseError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        self.parse_code(&code)
    }

    /// Parse a string of Python code.
    pub fn parse_code(&mut self, code: &str) -> Result<Tree, ParseError> {
        let node = self.parse_node(code)?;
        let mut tree = Tree::from_node(&node);
        if self.options.attach_metadata {
            attach_metadata(&mut tree);
        }
        debug!(nodes = tree.node_count(), "parsed");
        Ok(tree)
    }

    /// Parse a string of Python code into an owned node tree.
    pub fn parse_node(&mut self, code: &str) -> Result<Node, ParseError> {
        let syntax = self.parser.parse(code, None).ok_or(ParseError::NoTree)?;
        let root = syntax.root_node();
        if root.has_error() {
            debug!("source contains syntax errors, using the recovered tree");
        }
        // The module is structural even when empty, so blank files compare
        // equal regardless of their whitespace.
        let canonicalizer = Canonicalizer {
            source: code.as_bytes(),
            kind: self.options.kind,
        };
        let mut children = Vec::with_capacity(root.child_count());
        canonicalizer.push_children(root, &mut children, &mut String::new());
        Ok(Node::new(root.kind(), "", children).with_position(position(root)))
    }
}

fn text<'a>(node: tree_sitter::Node<'_>, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or_default()
}

fn position(node: tree_sitter::Node<'_>) -> NodePosition {
    let start = node.start_position();
    let end = node.end_position();
    NodePosition {
        start_line: start.row + 1,
        start_col: start.column,
        end_line: end.row + 1,
        end_col: end.column,
    }
}

struct Canonicalizer<'a> {
    source: &'a [u8],
    kind: ParserKind,
}

impl Canonicalizer<'_> {
    /// Convert a node that is known to be kept.
    fn canonicalize(&self, node: tree_sitter::Node<'_>) -> Node {
        let kind = node.kind();

        if !node.is_named() {
            let token = text(node, self.source);
            let label = if is_keyword(token) {
                "keyword"
            } else {
                "operator"
            };
            return Node::leaf(label, token).with_position(position(node));
        }

        if kind == "string" || node.child_count() == 0 {
            return Node::leaf(kind, text(node, self.source)).with_position(position(node));
        }

        let mut children = Vec::with_capacity(node.child_count());
        let mut value = String::new();
        self.push_children(node, &mut children, &mut value);
        Node::new(kind, value, children).with_position(position(node))
    }

    /// Append the canonical children of `node`, skipping noise and flattening
    /// parentheses. In abstract mode, tokens that are kept go to `value`.
    fn push_children(
        &self,
        node: tree_sitter::Node<'_>,
        out: &mut Vec<Node>,
        value: &mut String,
    ) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if skipped(child, self.source) {
                trace!(kind = child.kind(), "skipping");
                continue;
            }
            if child.kind() == "parenthesized_expression" {
                self.push_children(child, out, value);
                continue;
            }
            if self.kind == ParserKind::Abstract && !child.is_named() {
                let token = text(child, self.source);
                if !is_keyword(token) || node.kind().ends_with("operator") {
                    if !value.is_empty() {
                        value.push(' ');
                    }
                    value.push_str(token);
                }
                continue;
            }

            let converted = self.canonicalize(child);
            if WRAPPER_KINDS.contains(&child.kind())
                && converted.children.len() == 1
                && converted.value.is_empty()
            {
                out.extend(converted.children);
            } else {
                out.push(converted);
            }
        }
    }
}

fn is_keyword(token: &str) -> bool {
    token.chars().all(|c| c.is_alphabetic() || c == '_')
}

fn skipped(node: tree_sitter::Node<'_>, source: &[u8]) -> bool {
    if SKIPPED_KINDS.contains(&node.kind()) || node.is_missing() {
        return true;
    }
    if node.is_named() {
        return false;
    }
    let token = text(node, source);
    token.trim().is_empty() || PUNCTUATION.contains(&token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;

    fn parse(code: &str) -> Node {
        PythonParser::new().unwrap().parse_node(code).unwrap()
    }

    #[test]
    fn test_assignment_shape() {
        let expected = Node::new(
            "module",
            "",
            vec![Node::new(
                "expression_statement",
                "",
                vec![Node::new(
                    "assignment",
                    "",
                    vec![
                        Node::leaf("identifier", "x"),
                        Node::leaf("operator", "="),
                        Node::leaf("integer", "1"),
                    ],
                )],
            )],
        );
        assert_eq!(parse("x = 1"), expected);
    }

    #[test]
    fn test_positions_are_recorded() {
        let module = parse("x = 1\ny = 2\n");
        let second = &module.children[1];
        let position = second.position.unwrap();
        assert_eq!(position.start_line, 2);
        assert_eq!(position.start_col, 0);
        assert_eq!(position.end_line, 2);
        assert_eq!(position.end_col, 5);
    }

    #[test]
    fn test_strings_are_leaves() {
        let module = parse("print('123')");
        let call = &module.children[0].children[0];
        assert_eq!(call.label, "call");
        let arguments = &call.children[1];
        assert_eq!(arguments.label, "argument_list");
        assert_eq!(arguments.children, vec![Node::leaf("string", "'123'")]);
    }

    #[test]
    fn test_keywords_and_operators() {
        let module = parse("if a == b: pass");
        let statement = &module.children[0];
        assert_eq!(statement.label, "if_statement");
        assert_eq!(statement.children[0], Node::leaf("keyword", "if"));

        let comparison = &statement.children[1];
        assert_eq!(comparison.label, "comparison_operator");
        assert_eq!(comparison.children[1], Node::leaf("operator", "=="));
    }

    #[test]
    fn test_metadata_is_optional() {
        let mut parser = PythonParser::with_options(ParseOptions {
            attach_metadata: false,
            ..ParseOptions::default()
        })
        .unwrap();
        let tree = parser.parse_code("x = 1").unwrap();
        assert!(tree.try_metadata(tree.root).is_none());

        let mut parser = PythonParser::new().unwrap();
        let tree = parser.parse_code("x = 1").unwrap();
        assert_eq!(tree.metadata(tree.root).size, 6);
    }

    #[test]
    fn test_blank_modules_are_empty() {
        assert_eq!(parse(""), Node::new("module", "", vec![]));
        assert_eq!(parse("\n   \n"), Node::new("module", "", vec![]));
        assert_eq!(parse("# only a comment\n"), Node::new("module", "", vec![]));
    }

    #[test]
    fn test_parentheses_are_inlined() {
        assert_eq!(parse("a = (((((((1)))))))"), parse("a = 1"));
        assert_eq!(parse("print(        'foo')"), parse("print('foo')"));
    }

    #[test]
    fn test_hash_ignores_layout() {
        let mut parser = PythonParser::new().unwrap();
        let hash = |parser: &mut PythonParser, code: &str| {
            let tree = parser.parse_code(code).unwrap();
            tree.metadata(tree.root).hashcode
        };
        let spaced = hash(&mut parser, "print('foo');print('bar')");
        let tight = hash(&mut parser, "print( 'foo' )  ;  print('bar')");
        let shorter = hash(&mut parser, "print('bar')");
        assert_eq!(spaced, tight);
        assert_ne!(spaced, shorter);
    }

    #[test]
    fn test_single_name_wrappers_are_inlined() {
        let module = parse("import os");
        assert_eq!(
            module.children[0],
            Node::new(
                "import_statement",
                "",
                vec![Node::leaf("keyword", "import"), Node::leaf("identifier", "os")],
            )
        );

        // A dotted path is more than a wrapper.
        let module = parse("import os.path");
        let path = &module.children[0].children[1];
        assert_eq!(path.label, "dotted_name");
        assert_eq!(path.children.len(), 2);

        // Statements stay distinct from the expressions they hold.
        assert_eq!(parse("f()").children[0].label, "expression_statement");
    }

    fn parse_abstract(code: &str) -> Node {
        let options = ParseOptions::default();
        build_parser(ParserKind::Abstract, options)
            .unwrap()
            .parse_node(code)
            .unwrap()
    }

    fn labels(node: &Node, out: &mut Vec<String>) {
        out.push(node.label.clone());
        for child in &node.children {
            labels(child, out);
        }
    }

    #[test]
    fn test_abstract_mode_drops_keywords() {
        let module = parse_abstract("if a == b:\n    pass\nelse:\n    return x + 1\n");
        let mut seen = Vec::new();
        labels(&module, &mut seen);
        assert!(!seen.iter().any(|l| l == "keyword" || l == "operator"), "{seen:?}");

        let statement = &module.children[0];
        assert_eq!(statement.label, "if_statement");
        assert_eq!(statement.value, "");
        let comparison = &statement.children[0];
        assert_eq!(comparison.label, "comparison_operator");
        assert_eq!(comparison.value, "==");
    }

    #[test]
    fn test_abstract_mode_keeps_operators_apart() {
        let sum = parse_abstract("x + 1");
        let difference = parse_abstract("x - 1");
        assert_ne!(sum, difference);

        let both = parse_abstract("a and b");
        let either = parse_abstract("a or b");
        assert_ne!(both, either);
        assert_eq!(both.children[0].children[0].value, "and");
    }

    #[test]
    fn test_abstract_assignment_shape() {
        let expected = Node::new(
            "module",
            "",
            vec![Node::new(
                "expression_statement",
                "",
                vec![Node::new(
                    "assignment",
                    "=",
                    vec![Node::leaf("identifier", "x"), Node::leaf("integer", "1")],
                )],
            )],
        );
        assert_eq!(parse_abstract("x = (1)"), expected);
    }

    #[test]
    fn test_missing_file() {
        let mut parser = PythonParser::new().unwrap();
        let err = parser.parse("does/not/exist.py").unwrap_err();
        assert!(matches!(err, ParseError::Io { ref path, .. } if path == "does/not/exist.py"));
    }
}
