//
//  assignments.rs
//  restscan
//

use std::collections::HashMap;

use crate::ast::{ClassRef, Expr, Stmt};

/// `$var = new ClassName(...)` bindings among the top-level statements of
/// one statement list.
///
/// Flow-insensitive: branches, loops and nested closures are not looked at,
/// and a later instantiation simply replaces an earlier one.
#[derive(Debug, Default)]
pub struct TrackedVariables<'a> {
    bindings: HashMap<&'a str, &'a str>,
}

impl<'a> TrackedVariables<'a> {
    pub fn scan(stmts: &'a [Stmt]) -> Self {
        let mut tracked = Self::default();
        for stmt in stmts {
            if let Some((var, class)) = instantiation(stmt) {
                tracked.bindings.insert(var, class);
            }
        }
        tracked
    }

    /// Class the variable (without `$`) was last bound to.
    pub fn class_of(&self, var: &str) -> Option<&'a str> {
        self.bindings.get(var).copied()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Match `$var = new Named(...);` and return `(var, class)`.
pub fn instantiation(stmt: &Stmt) -> Option<(&str, &str)> {
    let Stmt::Expr(Expr::Assign { target, value }) = stmt else {
        return None;
    };
    match (target.as_ref(), value.as_ref()) {
        (
            Expr::Variable(var),
            Expr::New {
                class: ClassRef::Named(class),
                ..
            },
        ) => Some((var.as_str(), class.as_str())),
        _ => None,
    }
}
