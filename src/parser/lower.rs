//
//  lower.rs
//  restscan
//
//  Lowers the tree-sitter-php concrete tree into the closed `ast` union.
//

use std::cell::Cell;

use tree_sitter::Node;

use super::helpers::{child_of_kind, named_children, node_text, operator_token};
use crate::ast::{ArrayItem, ClassDecl, ClassRef, Expr, FunctionDecl, Member, MethodDecl, Stmt};

/// Node kinds that never contribute anything to route discovery.
const SKIPPED: &[&str] = &[
    "php_tag",
    "text",
    "text_interpolation",
    "comment",
    "empty_statement",
    "namespace_use_declaration",
    "interface_declaration",
];

/// Kinds whose string contents are plain text.
const LITERAL_PARTS: &[&str] = &["string_content", "string_value", "escape_sequence"];

/// Statement and expression nesting past this depth is dropped. Generated
/// or obfuscated files can nest thousands of levels deep.
pub(super) const MAX_NESTING: usize = 128;

pub(super) struct Lowerer<'s> {
    source: &'s [u8],
    depth: Cell<usize>,
    truncated: Cell<bool>,
}

impl<'s> Lowerer<'s> {
    pub(super) fn new(source: &'s [u8]) -> Self {
        Self {
            source,
            depth: Cell::new(0),
            truncated: Cell::new(false),
        }
    }

    /// Whether any subtree was cut off at `MAX_NESTING`.
    pub(super) fn truncated(&self) -> bool {
        self.truncated.get()
    }

    fn nested<T>(&self, fallback: T, lower: impl FnOnce() -> T) -> T {
        let depth = self.depth.get();
        if depth >= MAX_NESTING {
            self.truncated.set(true);
            return fallback;
        }
        self.depth.set(depth + 1);
        let lowered = lower();
        self.depth.set(depth);
        lowered
    }

    fn text(&self, node: &Node) -> &'s str {
        node_text(node, self.source)
    }

    pub(super) fn program(&self, root: &Node) -> Vec<Stmt> {
        self.stmts(root)
    }

    fn stmts(&self, node: &Node) -> Vec<Stmt> {
        named_children(node)
            .iter()
            .filter_map(|child| self.stmt(child))
            .collect()
    }

    fn stmt(&self, node: &Node) -> Option<Stmt> {
        self.nested(None, || self.lower_stmt(node))
    }

    fn lower_stmt(&self, node: &Node) -> Option<Stmt> {
        let kind = node.kind();
        if SKIPPED.contains(&kind) {
            return None;
        }

        let stmt = match kind {
            "expression_statement" => {
                let inner = named_children(node).into_iter().next()?;
                Stmt::Expr(self.expr(&inner))
            }
            "return_statement" => Stmt::Return(
                named_children(node)
                    .first()
                    .map(|value| self.expr(value)),
            ),
            "function_definition" => Stmt::Function(self.function(node)?),
            "class_declaration" | "trait_declaration" | "enum_declaration" => {
                Stmt::Class(self.class(node))
            }
            "namespace_definition" => Stmt::Namespace {
                name: node
                    .child_by_field_name("name")
                    .map(|name| self.text(&name).to_string()),
                body: node
                    .child_by_field_name("body")
                    .map(|body| self.stmts(&body))
                    .unwrap_or_default(),
            },
            _ if is_statement_like(kind) => Stmt::Block(self.stmts(node)),
            // Bare expressions appearing in statement position, e.g. an
            // `if` condition or an `echo` operand.
            _ => Stmt::Expr(self.expr(node)),
        };
        Some(stmt)
    }

    fn function(&self, node: &Node) -> Option<FunctionDecl> {
        let name = node.child_by_field_name("name")?;
        Some(FunctionDecl {
            name: self.text(&name).to_string(),
            body: self.body(node),
        })
    }

    fn body(&self, node: &Node) -> Vec<Stmt> {
        node.child_by_field_name("body")
            .or_else(|| child_of_kind(node, &["compound_statement"]))
            .map(|body| self.stmts(&body))
            .unwrap_or_default()
    }

    /// Works for named declarations as well as `new class (...) { ... }`,
    /// which carries the same children without a name field.
    fn class(&self, node: &Node) -> ClassDecl {
        let mut decl = ClassDecl {
            name: node
                .child_by_field_name("name")
                .map(|name| self.text(&name).to_string()),
            ..Default::default()
        };

        for child in named_children(node) {
            match child.kind() {
                "base_clause" => {
                    decl.parent = named_children(&child)
                        .first()
                        .map(|parent| self.text(parent).to_string());
                }
                "declaration_list" | "enum_declaration_list" => self.members(&child, &mut decl),
                _ => {}
            }
        }
        decl
    }

    fn members(&self, list: &Node, decl: &mut ClassDecl) {
        for member in named_children(list) {
            match member.kind() {
                "method_declaration" => {
                    let Some(name) = member.child_by_field_name("name") else {
                        continue;
                    };
                    let body = member
                        .child_by_field_name("body")
                        .map(|body| self.stmts(&body));
                    decl.members.push(Member::Method(MethodDecl {
                        name: self.text(&name).to_string(),
                        body,
                    }));
                }
                "const_declaration" => {
                    for element in named_children(&member) {
                        if element.kind() != "const_element" {
                            continue;
                        }
                        let parts = named_children(&element);
                        if let (Some(name), Some(value)) = (parts.first(), parts.last()) {
                            if parts.len() >= 2 {
                                decl.members.push(Member::Constant {
                                    name: self.text(name).to_string(),
                                    value: self.expr(value),
                                });
                            }
                        }
                    }
                }
                "property_declaration" => {
                    for element in named_children(&member) {
                        if element.kind() != "property_element" {
                            continue;
                        }
                        if let Some(property) = self.property(&element) {
                            decl.members.push(property);
                        }
                    }
                }
                "use_declaration" => {
                    for used in named_children(&member) {
                        if matches!(used.kind(), "name" | "qualified_name") {
                            decl.traits.push(self.text(&used).to_string());
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn property(&self, element: &Node) -> Option<Member> {
        let parts = named_children(element);
        let name = parts.iter().find(|part| part.kind() == "variable_name")?;

        // Grammar versions differ: a `default_value` field, a wrapping
        // `property_initializer`, or a bare second child.
        let default = element
            .child_by_field_name("default_value")
            .or_else(|| {
                parts
                    .iter()
                    .find(|part| part.kind() == "property_initializer")
                    .and_then(|init| named_children(init).into_iter().next())
            })
            .or_else(|| {
                parts
                    .iter()
                    .skip_while(|part| part.id() != name.id())
                    .nth(1)
                    .copied()
            })
            .map(|value| self.expr(&value));

        Some(Member::Property {
            name: self.text(name).trim_start_matches('$').to_string(),
            default,
        })
    }

    fn expr(&self, node: &Node) -> Expr {
        self.nested(Expr::Other(Vec::new()), || self.lower_expr(node))
    }

    fn lower_expr(&self, node: &Node) -> Expr {
        match node.kind() {
            "parenthesized_expression" => named_children(node)
                .first()
                .map(|inner| self.expr(inner))
                .unwrap_or(Expr::Other(Vec::new())),
            "string" | "encapsed_string" => self.string(node),
            "heredoc" | "nowdoc" => Expr::Interpolated(Vec::new()),
            "integer" => self
                .text(node)
                .replace('_', "")
                .parse()
                .map(Expr::Int)
                .unwrap_or(Expr::Other(Vec::new())),
            "boolean" => Expr::Bool(self.text(node).eq_ignore_ascii_case("true")),
            "null" => Expr::Null,
            "variable_name" => Expr::Variable(self.text(node).trim_start_matches('$').to_string()),
            "name" | "qualified_name" => constant(self.text(node)),
            "class_constant_access_expression" => self.class_constant(node),
            "member_access_expression" | "nullsafe_member_access_expression" => {
                self.property_access(node)
            }
            "member_call_expression" | "nullsafe_member_call_expression" => self.method_call(node),
            "scoped_call_expression" => self.static_call(node),
            "function_call_expression" => self.call(node),
            "object_creation_expression" => self.new_expr(node),
            "assignment_expression" | "reference_assignment_expression" => {
                match (
                    node.child_by_field_name("left"),
                    node.child_by_field_name("right"),
                ) {
                    (Some(left), Some(right)) => Expr::Assign {
                        target: Box::new(self.expr(&left)),
                        value: Box::new(self.expr(&right)),
                    },
                    _ => self.other(node),
                }
            }
            "binary_expression" => self.binary(node),
            "array_creation_expression" => self.array(node),
            "anonymous_function" | "anonymous_function_creation_expression" => Expr::Closure {
                body: self.body(node),
            },
            "arrow_function" => {
                let body = node
                    .child_by_field_name("body")
                    .map(|body| self.expr(&body));
                Expr::Closure {
                    body: vec![Stmt::Return(body)],
                }
            }
            _ => self.other(node),
        }
    }

    fn other(&self, node: &Node) -> Expr {
        Expr::Other(
            named_children(node)
                .iter()
                .map(|child| self.expr(child))
                .collect(),
        )
    }

    fn string(&self, node: &Node) -> Expr {
        let parts = named_children(node);
        let literal = parts
            .iter()
            .all(|part| LITERAL_PARTS.contains(&part.kind()));
        let raw = self.text(node);

        if !literal {
            return Expr::Interpolated(
                parts
                    .iter()
                    .filter(|part| !LITERAL_PARTS.contains(&part.kind()))
                    .map(|part| self.expr(part))
                    .collect(),
            );
        }

        // Binary string prefix: b'...' / b"..."
        let raw = raw
            .strip_prefix('b')
            .or_else(|| raw.strip_prefix('B'))
            .unwrap_or(raw);
        if let Some(inner) = raw.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')) {
            Expr::String(unescape_single(inner))
        } else if let Some(inner) = raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
            Expr::String(unescape_double(inner))
        } else {
            Expr::Interpolated(Vec::new())
        }
    }

    fn class_constant(&self, node: &Node) -> Expr {
        match self.text(node).rsplit_once("::") {
            Some((class, name)) => Expr::ClassConst {
                class: class.trim().to_string(),
                name: name.trim().to_string(),
            },
            None => self.other(node),
        }
    }

    fn property_access(&self, node: &Node) -> Expr {
        match (
            node.child_by_field_name("object"),
            node.child_by_field_name("name"),
        ) {
            (Some(object), Some(name)) if name.kind() == "name" => Expr::Property {
                object: Box::new(self.expr(&object)),
                name: self.text(&name).to_string(),
            },
            _ => self.other(node),
        }
    }

    fn method_call(&self, node: &Node) -> Expr {
        match (
            node.child_by_field_name("object"),
            node.child_by_field_name("name"),
        ) {
            (Some(object), Some(name)) if name.kind() == "name" => Expr::MethodCall {
                object: Box::new(self.expr(&object)),
                method: self.text(&name).to_string(),
                args: self.args(node),
            },
            _ => self.other(node),
        }
    }

    fn static_call(&self, node: &Node) -> Expr {
        match (
            node.child_by_field_name("scope"),
            node.child_by_field_name("name"),
        ) {
            (Some(scope), Some(name)) if name.kind() == "name" => Expr::StaticCall {
                class: self.text(&scope).to_string(),
                method: self.text(&name).to_string(),
                args: self.args(node),
            },
            _ => self.other(node),
        }
    }

    fn call(&self, node: &Node) -> Expr {
        match node.child_by_field_name("function") {
            Some(function) if matches!(function.kind(), "name" | "qualified_name") => Expr::Call {
                name: self.text(&function).to_string(),
                args: self.args(node),
            },
            _ => self.other(node),
        }
    }

    fn args(&self, node: &Node) -> Vec<Expr> {
        let Some(arguments) = node
            .child_by_field_name("arguments")
            .or_else(|| child_of_kind(node, &["arguments"]))
        else {
            return Vec::new();
        };

        named_children(&arguments)
            .iter()
            .map(|argument| match argument.kind() {
                // Named arguments carry the label first; the value is last.
                "argument" => named_children(argument)
                    .last()
                    .map(|value| self.expr(value))
                    .unwrap_or(Expr::Other(Vec::new())),
                _ => self.expr(argument),
            })
            .collect()
    }

    fn new_expr(&self, node: &Node) -> Expr {
        let mut class = None;
        let mut args = Vec::new();

        for child in named_children(node) {
            match child.kind() {
                "arguments" => args = self.args(node),
                "name" | "qualified_name" if class.is_none() => {
                    class = Some(ClassRef::Named(self.text(&child).to_string()));
                }
                "anonymous_class" => {
                    class = Some(ClassRef::Anonymous(Box::new(self.class(&child))));
                    args = self.args(&child);
                }
                "declaration_list" => {
                    class = Some(ClassRef::Anonymous(Box::new(self.class(node))));
                }
                "attribute_list" | "base_clause" | "class_interface_clause" => {}
                _ if class.is_none() => {
                    class = Some(ClassRef::Dynamic(Box::new(self.expr(&child))));
                }
                _ => {}
            }
        }

        Expr::New {
            class: class.unwrap_or_else(|| ClassRef::Dynamic(Box::new(Expr::Other(Vec::new())))),
            args,
        }
    }

    fn binary(&self, node: &Node) -> Expr {
        if let Some(operands) = concat_operands(node) {
            return self.concat(operands);
        }
        match (
            node.child_by_field_name("left"),
            node.child_by_field_name("right"),
        ) {
            (Some(left), Some(right)) => Expr::Other(vec![self.expr(&left), self.expr(&right)]),
            _ => self.other(node),
        }
    }

    /// Walks the left spine of a `.` chain in a loop, so a chain of any
    /// length lowers to one flat `Concat`.
    fn concat<'t>(&self, (mut left, right): (Node<'t>, Node<'t>)) -> Expr {
        let mut operands = vec![right];
        while let Some((inner_left, inner_right)) = concat_operands(&left) {
            operands.push(inner_right);
            left = inner_left;
        }
        operands.push(left);

        let mut parts = Vec::with_capacity(operands.len());
        for operand in operands.iter().rev() {
            match self.expr(operand) {
                Expr::Concat(inner) => parts.extend(inner),
                part => parts.push(part),
            }
        }
        Expr::Concat(parts)
    }

    fn array(&self, node: &Node) -> Expr {
        let items = named_children(node)
            .iter()
            .filter(|child| child.kind() == "array_element_initializer")
            .filter_map(|element| {
                let parts: Vec<Node> = named_children(element)
                    .into_iter()
                    .filter(|part| part.kind() != "by_ref")
                    .collect();
                match parts.as_slice() {
                    [value] => Some(ArrayItem {
                        key: None,
                        value: self.expr(value),
                    }),
                    [key, value] => Some(ArrayItem {
                        key: Some(self.expr(key)),
                        value: self.expr(value),
                    }),
                    _ => None,
                }
            })
            .collect();
        Expr::Array(items)
    }
}

/// `(left, right)` of a `.` binary expression.
fn concat_operands<'t>(node: &Node<'t>) -> Option<(Node<'t>, Node<'t>)> {
    if node.kind() != "binary_expression" || operator_token(node) != Some(".") {
        return None;
    }
    Some((
        node.child_by_field_name("left")?,
        node.child_by_field_name("right")?,
    ))
}

/// Statement kinds lowered as plain blocks of their children.
fn is_statement_like(kind: &str) -> bool {
    kind.ends_with("_statement")
        || kind.ends_with("_clause")
        || kind.ends_with("_block")
        || matches!(kind, "program" | "ERROR" | "declaration_list")
}

/// A bare name in expression position is a constant fetch, except for the
/// keyword-like literals some grammar versions surface as names.
fn constant(text: &str) -> Expr {
    if text.eq_ignore_ascii_case("true") {
        Expr::Bool(true)
    } else if text.eq_ignore_ascii_case("false") {
        Expr::Bool(false)
    } else if text.eq_ignore_ascii_case("null") {
        Expr::Null
    } else {
        Expr::Const(text.to_string())
    }
}

/// Single-quoted strings only recognise `\\` and `\'`.
fn unescape_single(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if next == '\\' || next == '\'' {
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

/// Double-quoted escapes. Unknown sequences such as `\d` are kept verbatim,
/// which is what PHP does and what route regexes rely on.
fn unescape_double(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let replacement = match chars.peek() {
            Some('n') => Some('\n'),
            Some('t') => Some('\t'),
            Some('r') => Some('\r'),
            Some('\\') => Some('\\'),
            Some('"') => Some('"'),
            Some('$') => Some('$'),
            _ => None,
        };
        match replacement {
            Some(r) => {
                out.push(r);
                chars.next();
            }
            None => out.push('\\'),
        }
    }
    out
}
