//! Depth-first traversal over the lowered tree.
//!
//! Every pass is a small `Visitor` that records what it finds and hands the
//! result back to its caller; the walk itself owns no state.

use super::{ClassDecl, ClassRef, Expr, Member, Stmt};

/// Lexical position of a node during a walk.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    /// Name of the class whose `$this` is in effect, if any.
    pub class: Option<&'a str>,
    /// Innermost statement list containing the node.
    pub block: &'a [Stmt],
}

pub trait Visitor<'a> {
    fn visit_stmt(&mut self, _stmt: &'a Stmt, _scope: Scope<'a>) {}
    fn visit_expr(&mut self, _expr: &'a Expr, _scope: Scope<'a>) {}
}

pub fn walk_stmts<'a, V>(visitor: &mut V, stmts: &'a [Stmt], class: Option<&'a str>)
where
    V: Visitor<'a> + ?Sized,
{
    let scope = Scope {
        class,
        block: stmts,
    };
    for stmt in stmts {
        visitor.visit_stmt(stmt, scope);
        walk_stmt(visitor, stmt, scope);
    }
}

fn walk_stmt<'a, V>(visitor: &mut V, stmt: &'a Stmt, scope: Scope<'a>)
where
    V: Visitor<'a> + ?Sized,
{
    match stmt {
        Stmt::Expr(expr) | Stmt::Return(Some(expr)) => walk_expr(visitor, expr, scope),
        Stmt::Return(None) => {}
        // Functions never bind `$this`, even when declared inside a method.
        Stmt::Function(function) => walk_stmts(visitor, &function.body, None),
        Stmt::Class(class) => walk_class(visitor, class),
        Stmt::Namespace { body, .. } | Stmt::Block(body) => walk_stmts(visitor, body, scope.class),
    }
}

fn walk_class<'a, V>(visitor: &mut V, class: &'a ClassDecl)
where
    V: Visitor<'a> + ?Sized,
{
    let name = class.name.as_deref();
    let scope = Scope {
        class: name,
        block: &[],
    };
    for member in &class.members {
        match member {
            Member::Method(method) => {
                if let Some(body) = &method.body {
                    walk_stmts(visitor, body, name);
                }
            }
            Member::Constant { value, .. } => walk_expr(visitor, value, scope),
            Member::Property {
                default: Some(value),
                ..
            } => walk_expr(visitor, value, scope),
            Member::Property { default: None, .. } => {}
        }
    }
}

pub fn walk_expr<'a, V>(visitor: &mut V, expr: &'a Expr, scope: Scope<'a>)
where
    V: Visitor<'a> + ?Sized,
{
    visitor.visit_expr(expr, scope);

    match expr {
        Expr::String(_)
        | Expr::Int(_)
        | Expr::Bool(_)
        | Expr::Null
        | Expr::Variable(_)
        | Expr::Const(_)
        | Expr::ClassConst { .. } => {}
        Expr::Interpolated(parts) | Expr::Concat(parts) | Expr::Other(parts) => {
            for part in parts {
                walk_expr(visitor, part, scope);
            }
        }
        Expr::Property { object, .. } => walk_expr(visitor, object, scope),
        Expr::Array(items) => {
            for item in items {
                if let Some(key) = &item.key {
                    walk_expr(visitor, key, scope);
                }
                walk_expr(visitor, &item.value, scope);
            }
        }
        Expr::Assign { target, value } => {
            walk_expr(visitor, target, scope);
            walk_expr(visitor, value, scope);
        }
        Expr::Call { args, .. } | Expr::StaticCall { args, .. } => {
            for arg in args {
                walk_expr(visitor, arg, scope);
            }
        }
        Expr::MethodCall { object, args, .. } => {
            walk_expr(visitor, object, scope);
            for arg in args {
                walk_expr(visitor, arg, scope);
            }
        }
        Expr::New { class, args } => {
            match class {
                ClassRef::Named(_) => {}
                ClassRef::Anonymous(decl) => walk_class(visitor, decl),
                ClassRef::Dynamic(inner) => walk_expr(visitor, inner, scope),
            }
            for arg in args {
                walk_expr(visitor, arg, scope);
            }
        }
        // Closures inherit `$this` from where they are written.
        Expr::Closure { body } => walk_stmts(visitor, body, scope.class),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::MethodDecl;

    #[derive(Default)]
    struct CallNames {
        seen: Vec<(String, Option<String>)>,
    }

    impl<'a> Visitor<'a> for CallNames {
        fn visit_expr(&mut self, expr: &'a Expr, scope: Scope<'a>) {
            if let Expr::Call { name, .. } = expr {
                self.seen
                    .push((name.clone(), scope.class.map(str::to_string)));
            }
        }
    }

    fn call(name: &str) -> Stmt {
        Stmt::Expr(Expr::Call {
            name: name.into(),
            args: Vec::new(),
        })
    }

    #[test]
    fn test_walk_tracks_class_scope() {
        let stmts = vec![
            call("top"),
            Stmt::Class(ClassDecl {
                name: Some("Plugin".into()),
                members: vec![Member::Method(MethodDecl {
                    name: "boot".into(),
                    body: Some(vec![
                        call("in_method"),
                        Stmt::Expr(Expr::Closure {
                            body: vec![call("in_closure")],
                        }),
                        Stmt::Function(crate::ast::FunctionDecl {
                            name: "nested".into(),
                            body: vec![call("in_function")],
                        }),
                    ]),
                })],
                ..Default::default()
            }),
        ];

        let mut visitor = CallNames::default();
        walk_stmts(&mut visitor, &stmts, None);

        assert_eq!(
            visitor.seen,
            vec![
                ("top".to_string(), None),
                ("in_method".to_string(), Some("Plugin".to_string())),
                ("in_closure".to_string(), Some("Plugin".to_string())),
                ("in_function".to_string(), None),
            ]
        );
    }
}
