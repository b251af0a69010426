//! Closed syntax tree for analyzed PHP sources.
//!
//! The tree-sitter grammar produces an open-ended concrete tree with hundreds
//! of node kinds. The analysis passes only care about a handful of them, so
//! the parser lowers every file into this small tagged union. Anything the
//! passes don't model becomes `Stmt::Block` or `Expr::Other`, which keep
//! their children so nested calls are still reachable by a walk.

pub mod walk;

use std::path::PathBuf;

pub use walk::{walk_expr, walk_stmts, Scope, Visitor};

/// One input file's lowered syntax tree.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub path: PathBuf,
    pub stmts: Vec<Stmt>,
}

/// All successfully parsed source units merged into one statement list.
///
/// Read-only once built; every analysis pass borrows from it.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    stmts: Vec<Stmt>,
    units: usize,
}

impl Corpus {
    /// Concatenate the top-level statements of each unit, in the given order.
    pub fn from_units<I>(units: I) -> Self
    where
        I: IntoIterator<Item = SourceUnit>,
    {
        let mut stmts = Vec::new();
        let mut count = 0;
        for unit in units {
            stmts.extend(unit.stmts);
            count += 1;
        }
        Self {
            stmts,
            units: count,
        }
    }

    pub fn stmts(&self) -> &[Stmt] {
        &self.stmts
    }

    /// Number of source units merged into this corpus.
    pub fn unit_count(&self) -> usize {
        self.units
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expr(Expr),
    Return(Option<Expr>),
    Function(FunctionDecl),
    Class(ClassDecl),
    Namespace { name: Option<String>, body: Vec<Stmt> },
    /// Any statement that only matters for what it contains
    /// (`if`, loops, `try`, `switch`, compound blocks).
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub body: Vec<Stmt>,
}

/// A class, trait or enum declaration. Anonymous classes have no name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassDecl {
    pub name: Option<String>,
    pub parent: Option<String>,
    pub traits: Vec<String>,
    pub members: Vec<Member>,
}

impl ClassDecl {
    pub fn methods(&self) -> impl Iterator<Item = &MethodDecl> {
        self.members.iter().filter_map(|member| match member {
            Member::Method(method) => Some(method),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Method(MethodDecl),
    Constant { name: String, value: Expr },
    Property { name: String, default: Option<Expr> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub name: String,
    /// `None` for abstract and interface-style declarations.
    pub body: Option<Vec<Stmt>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A string literal with no interpolation, already unescaped.
    String(String),
    /// A double-quoted or heredoc string with embedded expressions.
    Interpolated(Vec<Expr>),
    Int(i64),
    Bool(bool),
    Null,
    /// `$name`, stored without the sigil.
    Variable(String),
    /// A bare constant such as `ABSPATH` or `__CLASS__`.
    Const(String),
    /// `Class::NAME`, including `Class::class`.
    ClassConst { class: String, name: String },
    /// `$object->name`.
    Property { object: Box<Expr>, name: String },
    Array(Vec<ArrayItem>),
    /// `a . b . c`, flattened into its operands in source order.
    Concat(Vec<Expr>),
    Assign { target: Box<Expr>, value: Box<Expr> },
    /// `name(args)` where the callee is a plain or qualified name.
    Call { name: String, args: Vec<Expr> },
    /// `$object->method(args)` with a literal method name.
    MethodCall {
        object: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },
    /// `Class::method(args)`.
    StaticCall {
        class: String,
        method: String,
        args: Vec<Expr>,
    },
    New { class: ClassRef, args: Vec<Expr> },
    /// Closures and arrow functions. Arrow bodies become a single `return`.
    Closure { body: Vec<Stmt> },
    /// Anything else, kept for its sub-expressions.
    Other(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassRef {
    Named(String),
    Anonymous(Box<ClassDecl>),
    Dynamic(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayItem {
    pub key: Option<Expr>,
    pub value: Expr,
}

impl Expr {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Expr::String(value) => Some(value),
            _ => None,
        }
    }

    /// Split a plain function call into its unqualified name and arguments.
    pub fn as_call(&self) -> Option<(&str, &[Expr])> {
        match self {
            Expr::Call { name, args } => Some((short_name(name), args)),
            _ => None,
        }
    }

    /// Look up a string-keyed entry of an array literal. PHP keeps the last
    /// duplicate key, so the search runs from the end.
    pub fn array_value(&self, key: &str) -> Option<&Expr> {
        let Expr::Array(items) = self else {
            return None;
        };
        items
            .iter()
            .rev()
            .find(|item| item.key.as_ref().and_then(Expr::as_str) == Some(key))
            .map(|item| &item.value)
    }

    pub fn is_this(&self) -> bool {
        matches!(self, Expr::Variable(name) if name == "this")
    }
}

/// Strip the namespace from a possibly qualified PHP name:
/// `\Foo\Bar` and `Foo\Bar` both become `Bar`.
pub fn short_name(raw: &str) -> &str {
    let trimmed = raw.trim().trim_start_matches('\\');
    trimmed.rsplit('\\').next().unwrap_or(trimmed)
}

/// `self` and `static` refer to the enclosing class.
pub fn is_self_reference(name: &str) -> bool {
    name.eq_ignore_ascii_case("self") || name.eq_ignore_ascii_case("static")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("WP_REST_Server"), "WP_REST_Server");
        assert_eq!(short_name("\\WP_REST_Server"), "WP_REST_Server");
        assert_eq!(short_name("Drupal\\Core\\Routing\\Route"), "Route");
        assert_eq!(short_name("\\Symfony\\Component\\Routing\\Route"), "Route");
    }

    #[test]
    fn test_array_value_last_key_wins() {
        let array = Expr::Array(vec![
            ArrayItem {
                key: Some(Expr::String("methods".into())),
                value: Expr::String("GET".into()),
            },
            ArrayItem {
                key: None,
                value: Expr::String("ignored".into()),
            },
            ArrayItem {
                key: Some(Expr::String("methods".into())),
                value: Expr::String("POST".into()),
            },
        ]);

        assert_eq!(
            array.array_value("methods"),
            Some(&Expr::String("POST".into()))
        );
        assert_eq!(array.array_value("callback"), None);
        assert_eq!(Expr::Null.array_value("methods"), None);
    }

    #[test]
    fn test_corpus_preserves_unit_order() {
        let first = SourceUnit {
            path: PathBuf::from("a.php"),
            stmts: vec![Stmt::Expr(Expr::Const("A".into()))],
        };
        let second = SourceUnit {
            path: PathBuf::from("b.php"),
            stmts: vec![Stmt::Expr(Expr::Const("B".into()))],
        };

        let corpus = Corpus::from_units([first, second]);

        assert_eq!(corpus.unit_count(), 2);
        assert_eq!(
            corpus.stmts(),
            &[
                Stmt::Expr(Expr::Const("A".into())),
                Stmt::Expr(Expr::Const("B".into())),
            ]
        );
    }
}
