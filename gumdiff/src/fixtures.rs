//! Shared test trees.

use indextree::NodeId;

use crate::tree::{Node, Tree};

/// Follow child indices from the root.
pub(crate) fn at(tree: &Tree, path: &[usize]) -> NodeId {
    path.iter().fold(tree.root, |node, &index| {
        tree.children(node)
            .nth(index)
            .unwrap_or_else(|| panic!("no child {index} on path {path:?}"))
    })
}

fn leaf(label: &str, value: &str) -> Node {
    Node::leaf(label, value)
}

fn node(label: &str, children: Vec<Node>) -> Node {
    Node::new(label, "", children)
}

fn method(modifier: &str, body: Node) -> Node {
    node(
        "MethodDeclaration",
        vec![
            leaf("Modifier", modifier),
            Node::new("SimpleType", "String", vec![leaf("SimpleName", "String")]),
            leaf("SimpleName", "foo"),
            node(
                "SingleVariableDeclaration",
                vec![leaf("PrimitiveType", "int"), leaf("SimpleName", "i")],
            ),
            body,
        ],
    )
}

fn compilation_unit(method: Node) -> Node {
    node(
        "CompilationUnit",
        vec![node(
            "TypeDeclaration",
            vec![leaf("Modifier", "public"), leaf("SimpleName", "Test"), method],
        )],
    )
}

fn returns(text: &str) -> Node {
    node("ReturnStatement", vec![leaf("StringLiteral", text)])
}

/// Figure 1 of the GumTree paper, before the change.
///
/// ```text
/// public class Test {
///     public String foo(int i) {
///         if (i == 0) return "Foo!";
///     }
/// }
/// ```
pub(crate) fn paper_source() -> Node {
    let body = node(
        "Block",
        vec![node(
            "IfStatement",
            vec![
                Node::new(
                    "InfixExpression",
                    "==",
                    vec![leaf("SimpleName", "i"), leaf("NumberLiteral", "0")],
                ),
                returns("Foo!"),
            ],
        )],
    );
    compilation_unit(method("public", body))
}

/// Figure 1 of the GumTree paper, after the change.
///
/// ```text
/// public class Test {
///     private String foo(int i) {
///         if (i == 0) return "Bar";
///         else if (i == -1) return "Foo!";
///     }
/// }
/// ```
pub(crate) fn paper_target() -> Node {
    let else_if = node(
        "IfStatement",
        vec![
            Node::new(
                "InfixExpression",
                "==",
                vec![
                    leaf("SimpleName", "i"),
                    Node::new("PrefixExpression", "-", vec![leaf("NumberLiteral", "1")]),
                ],
            ),
            returns("Foo!"),
        ],
    );
    let body = node(
        "Block",
        vec![node(
            "IfStatement",
            vec![
                Node::new(
                    "InfixExpression",
                    "==",
                    vec![leaf("SimpleName", "i"), leaf("NumberLiteral", "0")],
                ),
                returns("Bar"),
                else_if,
            ],
        )],
    );
    compilation_unit(method("private", body))
}
