//! Static evaluation of the few expression shapes route registrations use
//! for namespaces, paths and HTTP methods.

use std::collections::BTreeSet;

use super::symbols::SymbolIndex;
use crate::ast::{is_self_reference, short_name, Expr};

/// Nesting limit for constants and property defaults defined in terms of
/// other constants. Concatenation is not charged against it.
const MAX_DEPTH: usize = 8;

/// A class constant standing in for one or more HTTP verbs.
#[derive(Debug, Clone, Copy)]
pub struct MethodConstant {
    pub class: &'static str,
    pub name: &'static str,
    pub verbs: &'static [&'static str],
}

/// Evaluation context for one statement block.
#[derive(Debug, Clone, Copy)]
pub struct ValueContext<'c> {
    pub index: &'c SymbolIndex<'c>,
    /// Class whose `$this`, `self` and `static` are in effect.
    pub class: Option<&'c str>,
    constants: &'static [MethodConstant],
}

impl<'c> ValueContext<'c> {
    pub fn new(
        index: &'c SymbolIndex<'c>,
        class: Option<&'c str>,
        constants: &'static [MethodConstant],
    ) -> Self {
        Self {
            index,
            class,
            constants,
        }
    }

    /// Evaluate `expr` to a string, or `None` when it depends on runtime data.
    pub fn resolve_string(&self, expr: &Expr) -> Option<String> {
        self.string_at(expr, self.class, 0)
    }

    fn string_at(&self, expr: &Expr, class: Option<&'c str>, depth: usize) -> Option<String> {
        if depth > MAX_DEPTH {
            return None;
        }
        match expr {
            Expr::String(value) => Some(value.clone()),
            Expr::Int(value) => Some(value.to_string()),
            Expr::Concat(parts) => parts
                .iter()
                .map(|part| self.string_at(part, class, depth))
                .collect(),
            Expr::Const(name) if name == "__CLASS__" => class.map(str::to_string),
            Expr::ClassConst { class: target, name } => {
                let owner = self.class_name(target, class)?;
                if name.eq_ignore_ascii_case("class") {
                    return Some(owner.to_string());
                }
                let value = self.index.constant(owner, name)?;
                let owner = self.index.class(owner).map(|entry| entry.name);
                self.string_at(value, owner, depth + 1)
            }
            Expr::Property { object, name } if object.is_this() => {
                let value = self.index.property_default(class?, name)?;
                self.string_at(value, class, depth + 1)
            }
            _ => None,
        }
    }

    /// `self`/`static`/`parent` relative to `class`, or the literal name.
    fn class_name<'n>(&self, target: &'n str, class: Option<&'c str>) -> Option<&'n str>
    where
        'c: 'n,
    {
        if is_self_reference(target) {
            class
        } else if target.eq_ignore_ascii_case("parent") {
            self.index.class(class?)?.parent()
        } else {
            Some(target.trim_start_matches('\\'))
        }
    }

    /// Evaluate an HTTP methods option: a verb string (`'GET'`,
    /// `'GET,POST'`, `'GET|POST'`), a list of those, or a symbolic constant.
    /// `None` means the value could not be determined statically.
    pub fn resolve_methods(&self, expr: &Expr) -> Option<BTreeSet<String>> {
        match expr {
            Expr::Array(items) => {
                let verbs: BTreeSet<String> = items
                    .iter()
                    .filter_map(|item| self.resolve_methods(&item.value))
                    .flatten()
                    .collect();
                (!verbs.is_empty()).then_some(verbs)
            }
            Expr::ClassConst { class, name } => self
                .method_constant(class, name)
                .map(|verbs| verbs.iter().map(|verb| verb.to_string()).collect())
                .or_else(|| parse_verbs(&self.resolve_string(expr)?)),
            _ => parse_verbs(&self.resolve_string(expr)?),
        }
    }

    fn method_constant(&self, class: &str, name: &str) -> Option<&'static [&'static str]> {
        let class = short_name(class);
        self.constants
            .iter()
            .find(|constant| constant.class.eq_ignore_ascii_case(class) && constant.name == name)
            .map(|constant| constant.verbs)
    }
}

/// Split a verb list on `,` and `|`, upper-casing each verb.
pub fn parse_verbs(raw: &str) -> Option<BTreeSet<String>> {
    let verbs: BTreeSet<String> = raw
        .split([',', '|'])
        .map(str::trim)
        .filter(|verb| !verb.is_empty())
        .map(str::to_ascii_uppercase)
        .collect();
    (!verbs.is_empty()).then_some(verbs)
}
