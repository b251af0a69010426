//
//  joomla.rs
//  restscan
//

use std::collections::BTreeSet;

use super::visitor::RoutePatterns;
use super::{Dialect, RouteRecord};
use crate::analysis::{parse_verbs, ValueContext};
use crate::ast::{short_name, ClassRef, Expr};

/// Routes `createCRUDRoutes` expands to: item route?, verb, controller task.
const CRUD_ROUTES: &[(bool, &str, &str)] = &[
    (false, "GET", "displayList"),
    (true, "GET", "displayItem"),
    (false, "POST", "add"),
    (true, "PATCH", "edit"),
    (true, "DELETE", "delete"),
];

/// Joomla API router: `register`, `new Route(...)` and `createCRUDRoutes`.
pub struct Joomla;

impl RoutePatterns for Joomla {
    fn dialect(&self) -> Dialect {
        Dialect::Joomla
    }

    fn route_call(&self, expr: &Expr, ctx: &ValueContext<'_>) -> Option<RouteRecord> {
        match expr {
            Expr::MethodCall { method, args, .. } if method.eq_ignore_ascii_case("register") => {
                let [verb, path, handler, ..] = args.as_slice() else {
                    return None;
                };
                let verb = ctx.resolve_string(verb)?;
                let path = ctx.resolve_string(path)?;
                let handler = ctx.resolve_string(handler)?;
                Some(record(&path, parse_verbs(&verb)).with_handler(handler))
            }
            Expr::New {
                class: ClassRef::Named(class),
                args,
            } if short_name(class).eq_ignore_ascii_case("Route") => {
                let [methods, pattern, rest @ ..] = args.as_slice() else {
                    return None;
                };
                let pattern = ctx.resolve_string(pattern)?;
                let route = record(&pattern, ctx.resolve_methods(methods));
                match rest.first().and_then(|handler| ctx.resolve_string(handler)) {
                    Some(handler) => Some(route.with_handler(handler)),
                    None => Some(route),
                }
            }
            _ => None,
        }
    }

    fn synthesized_routes(&self, expr: &Expr, ctx: &ValueContext<'_>) -> Vec<RouteRecord> {
        let Expr::MethodCall { method, args, .. } = expr else {
            return Vec::new();
        };
        if !method.eq_ignore_ascii_case("createCRUDRoutes") {
            return Vec::new();
        }
        let [base, controller, ..] = args.as_slice() else {
            return Vec::new();
        };
        let (Some(base), Some(controller)) =
            (ctx.resolve_string(base), ctx.resolve_string(controller))
        else {
            return Vec::new();
        };

        let base = base.trim_end_matches('/');
        CRUD_ROUTES
            .iter()
            .map(|&(item, verb, task)| {
                let path = if item {
                    format!("{base}/:id")
                } else {
                    base.to_string()
                };
                record(&path, parse_verbs(verb)).with_handler(format!("{controller}.{task}"))
            })
            .collect()
    }
}

fn record(path: &str, methods: Option<BTreeSet<String>>) -> RouteRecord {
    RouteRecord::new(Dialect::Joomla, None, &placeholders(path), methods)
}

/// Rewrite Joomla `:name` segments as `{name}`.
fn placeholders(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) if !name.is_empty() => format!("{{{name}}}"),
            _ => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}
