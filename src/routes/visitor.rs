//
//  visitor.rs
//  restscan
//
//  One generic walker + one pattern table per dialect.
//

use super::drupal::Drupal;
use super::joomla::Joomla;
use super::wordpress::WordPress;
use super::{method_constants, Dialect, Pass, RouteRecord};
use crate::analysis::{HookSpec, SymbolIndex, ValueContext};
use crate::ast::{walk_stmts, Expr, Scope, Stmt, Visitor};

/// Call shapes through which one CMS registers routes.
pub trait RoutePatterns: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Functions that attach a callback to a hook (`add_action`).
    fn hook_registrars(&self) -> &'static [&'static str] {
        &[]
    }

    /// Hooks whose callbacks register routes.
    fn hooks(&self) -> &'static [&'static str] {
        &[]
    }

    /// A direct registration call, e.g. `register_rest_route(...)`.
    fn route_call(&self, expr: &Expr, ctx: &ValueContext<'_>) -> Option<RouteRecord>;

    /// Routes a CMS derives from a content-type registration rather than
    /// from an explicit route call.
    fn synthesized_routes(&self, _expr: &Expr, _ctx: &ValueContext<'_>) -> Vec<RouteRecord> {
        Vec::new()
    }

    fn hook_spec(&self) -> HookSpec {
        HookSpec::new(self.hook_registrars(), self.hooks())
    }
}

static WORDPRESS: WordPress = WordPress;
static DRUPAL: Drupal = Drupal;
static JOOMLA: Joomla = Joomla;

/// Patterns for a known dialect; `None` for `Unknown`.
pub fn patterns_for(dialect: Dialect) -> Option<&'static dyn RoutePatterns> {
    match dialect {
        Dialect::WordPress => Some(&WORDPRESS),
        Dialect::Drupal => Some(&DRUPAL),
        Dialect::Joomla => Some(&JOOMLA),
        Dialect::Unknown => None,
    }
}

struct Scanner<'p, 'i, 'a> {
    patterns: &'p dyn RoutePatterns,
    index: &'i SymbolIndex<'a>,
    pass: Pass,
    synthesize: bool,
    routes: Vec<RouteRecord>,
}

impl<'p, 'i, 'a> Scanner<'p, 'i, 'a> {
    fn new(patterns: &'p dyn RoutePatterns, index: &'i SymbolIndex<'a>, pass: Pass) -> Self {
        Self {
            patterns,
            index,
            pass,
            synthesize: pass != Pass::Global,
            routes: Vec::new(),
        }
    }
}

impl<'p, 'i, 'a> Visitor<'a> for Scanner<'p, 'i, 'a> {
    fn visit_expr(&mut self, expr: &'a Expr, scope: Scope<'a>) {
        let ctx = ValueContext::new(
            self.index,
            scope.class,
            method_constants(self.patterns.dialect()),
        );
        if let Some(route) = self.patterns.route_call(expr, &ctx) {
            self.routes.push(route.in_pass(self.pass));
        }
        if self.synthesize {
            let pass = self.pass;
            self.routes.extend(
                self.patterns
                    .synthesized_routes(expr, &ctx)
                    .into_iter()
                    .map(|route| route.in_pass(pass)),
            );
        }
    }
}

/// Recognize route registrations anywhere inside `stmts`, which run with
/// `class` as `$this`. Each record carries its full method set.
pub fn scan_block<'a>(
    stmts: &'a [Stmt],
    class: Option<&'a str>,
    patterns: &dyn RoutePatterns,
    index: &SymbolIndex<'a>,
    pass: Pass,
) -> Vec<RouteRecord> {
    let mut scanner = Scanner::new(patterns, index, pass);
    walk_stmts(&mut scanner, stmts, class);
    scanner.routes
}

/// Direct registration calls across the whole corpus, reachable or not,
/// emitted one record per method.
pub fn scan_global<'a>(
    stmts: &'a [Stmt],
    patterns: &dyn RoutePatterns,
    index: &SymbolIndex<'a>,
) -> Vec<RouteRecord> {
    scan_block(stmts, None, patterns, index, Pass::Global)
        .iter()
        .flat_map(RouteRecord::split_by_method)
        .collect()
}
