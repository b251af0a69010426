//
//  helpers.rs
//  restscan
//

use tree_sitter::Node;

/// Get the full text of a node.
pub fn node_text<'s>(node: &Node, source: &'s [u8]) -> &'s str {
    node.utf8_text(source).unwrap_or("")
}

/// Named children of a node, skipping comments and other extras.
pub fn named_children<'t>(node: &Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| !child.is_extra())
        .collect()
}

/// First named child of the given kind.
pub fn child_of_kind<'t>(node: &Node<'t>, kinds: &[&str]) -> Option<Node<'t>> {
    named_children(node)
        .into_iter()
        .find(|child| kinds.contains(&child.kind()))
}

/// The first anonymous token between a node's children, e.g. the operator
/// of a binary expression.
pub fn operator_token<'t>(node: &Node<'t>) -> Option<&'static str> {
    let mut cursor = node.walk();
    let token = node
        .children(&mut cursor)
        .find(|child| !child.is_named())
        .map(|child| child.kind());
    token
}
