//
//  wordpress.rs
//  restscan
//

use std::collections::BTreeSet;

use super::visitor::RoutePatterns;
use super::{Dialect, RouteRecord};
use crate::analysis::ValueContext;
use crate::ast::Expr;

/// `register_post_type` routes: path suffix after the base, and verbs.
const POST_TYPE_ROUTES: &[(&str, &[&str])] = &[
    ("", &["GET"]),
    ("/{id}", &["GET", "POST", "PUT", "PATCH", "DELETE"]),
    ("/{id}/revisions", &["GET"]),
    ("/{id}/autosaves", &["GET", "POST"]),
];

const DEFAULT_POST_TYPE_NAMESPACE: &str = "wp/v2";

/// WordPress REST API: `register_rest_route` inside `rest_api_init`.
pub struct WordPress;

impl RoutePatterns for WordPress {
    fn dialect(&self) -> Dialect {
        Dialect::WordPress
    }

    fn hook_registrars(&self) -> &'static [&'static str] {
        &["add_action", "add_filter"]
    }

    fn hooks(&self) -> &'static [&'static str] {
        &["rest_api_init"]
    }

    fn route_call(&self, expr: &Expr, ctx: &ValueContext<'_>) -> Option<RouteRecord> {
        let (name, args) = expr.as_call()?;
        if !name.eq_ignore_ascii_case("register_rest_route") {
            return None;
        }
        let [namespace, route, rest @ ..] = args else {
            return None;
        };

        // WordPress itself trims the namespace and anchors the route.
        let namespace = ctx.resolve_string(namespace)?.trim_matches('/').to_string();
        let route = ctx.resolve_string(route)?;
        if namespace.is_empty() || route.is_empty() {
            return None;
        }
        let path = format!("/{}", route.trim_start_matches('/'));

        let methods = rest.first().and_then(|options| endpoint_methods(options, ctx));
        Some(RouteRecord::new(
            Dialect::WordPress,
            Some(namespace),
            &path,
            methods,
        ))
    }

    fn synthesized_routes(&self, expr: &Expr, ctx: &ValueContext<'_>) -> Vec<RouteRecord> {
        post_type_routes(expr, ctx).unwrap_or_default()
    }
}

/// `methods` of a single endpoint array, or the union over a list of them.
fn endpoint_methods(options: &Expr, ctx: &ValueContext<'_>) -> Option<BTreeSet<String>> {
    let Expr::Array(items) = options else {
        return None;
    };
    if let Some(methods) = options.array_value("methods") {
        return ctx.resolve_methods(methods);
    }

    let verbs: BTreeSet<String> = items
        .iter()
        .filter(|item| item.key.is_none())
        .filter_map(|item| item.value.array_value("methods"))
        .filter_map(|methods| ctx.resolve_methods(methods))
        .flatten()
        .collect();
    (!verbs.is_empty()).then_some(verbs)
}

/// `register_post_type('book', ['show_in_rest' => true, ...])` exposes the
/// standard post controller routes under `rest_namespace`/`rest_base`.
fn post_type_routes(expr: &Expr, ctx: &ValueContext<'_>) -> Option<Vec<RouteRecord>> {
    let (name, args) = expr.as_call()?;
    if !name.eq_ignore_ascii_case("register_post_type") {
        return None;
    }
    let [post_type, options, ..] = args else {
        return None;
    };

    let show_in_rest = options.array_value("show_in_rest")?;
    if !is_truthy(show_in_rest, ctx) {
        return None;
    }

    let post_type = ctx.resolve_string(post_type)?;
    let namespace = options
        .array_value("rest_namespace")
        .and_then(|value| ctx.resolve_string(value))
        .unwrap_or_else(|| DEFAULT_POST_TYPE_NAMESPACE.to_string());
    let base = options
        .array_value("rest_base")
        .and_then(|value| ctx.resolve_string(value))
        .unwrap_or(post_type);
    let base = base.trim_matches('/');

    Some(
        POST_TYPE_ROUTES
            .iter()
            .map(|(suffix, verbs)| {
                RouteRecord::new(
                    Dialect::WordPress,
                    Some(namespace.clone()),
                    &format!("/{base}{suffix}"),
                    Some(verbs.iter().map(|verb| verb.to_string()).collect()),
                )
            })
            .collect(),
    )
}

/// `true`, `1`, `'1'` and `'true'`.
fn is_truthy(expr: &Expr, ctx: &ValueContext<'_>) -> bool {
    match expr {
        Expr::Bool(value) => *value,
        _ => ctx
            .resolve_string(expr)
            .is_some_and(|value| value == "1" || value.eq_ignore_ascii_case("true")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SymbolIndex;
    use crate::routes::{method_constants, scan_block, Pass};
    use crate::parser::corpus_of;

    fn direct(source: &str) -> Vec<RouteRecord> {
        let corpus = corpus_of(&[source]);
        let index = SymbolIndex::build(corpus.stmts());
        scan_block(corpus.stmts(), None, &WordPress, &index, Pass::Direct)
    }

    fn verbs(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|verb| verb.to_string()).collect()
    }

    #[test]
    fn test_literal_route() {
        let routes = direct(
            r"<?php register_rest_route('myplugin/v1', '/items/(?P<id>\d+)', ['methods' => 'GET']);",
        );

        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].namespace.as_deref(), Some("myplugin/v1"));
        assert_eq!(routes[0].path, "/items/{id}");
        assert_eq!(routes[0].methods, verbs(&["GET"]));
    }

    #[test]
    fn test_symbolic_constant() {
        let routes = direct(
            r"<?php register_rest_route('myplugin/v1', '/items', array(
                'methods'  => WP_REST_Server::CREATABLE,
                'callback' => 'create_item',
            ));",
        );
        assert_eq!(routes[0].methods, verbs(&["POST"]));
    }

    #[test]
    fn test_endpoint_list_and_defaults() {
        let routes = direct(
            r"<?php
register_rest_route('/shop/v1/', 'orders', array(
    array('methods' => WP_REST_Server::READABLE),
    array('methods' => \WP_REST_Server::EDITABLE),
));
register_rest_route('shop/v1', '/ping');
register_rest_route('shop/v1', '/dyn', array('methods' => $methods));
register_rest_route($ns, '/skipped');
",
        );

        assert_eq!(routes.len(), 3);
        assert_eq!(routes[0].namespace.as_deref(), Some("shop/v1"));
        assert_eq!(routes[0].path, "/orders");
        assert_eq!(routes[0].methods, verbs(&["GET", "PATCH", "PUT"]));
        assert_eq!(routes[1].methods, verbs(&["GET", "POST", "PUT", "DELETE"]));
        assert_eq!(routes[2].methods, verbs(&["GET", "POST", "PUT", "DELETE"]));
    }

    #[test]
    fn test_class_constant_namespace() {
        let corpus = corpus_of(&[r"<?php
class Api {
    const NS = 'acme/v1';
    protected $rest_base = 'widgets';
    public function routes() {
        register_rest_route(self::NS, '/' . $this->rest_base, ['methods' => 'DELETE']);
    }
}
"]);
        let index = SymbolIndex::build(corpus.stmts());
        let routes = scan_block(corpus.stmts(), None, &WordPress, &index, Pass::Direct);

        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].namespace.as_deref(), Some("acme/v1"));
        assert_eq!(routes[0].path, "/widgets");
    }

    #[test]
    fn test_post_type_routes() {
        let routes = direct("<?php register_post_type('book', ['show_in_rest' => true]);");

        let summary: Vec<(String, BTreeSet<String>)> = routes
            .iter()
            .map(|r| (r.path.clone(), r.methods.clone()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("/book".to_string(), verbs(&["GET"])),
                ("/book/{id}".to_string(), verbs(&["GET", "POST", "PUT", "PATCH", "DELETE"])),
                ("/book/{id}/revisions".to_string(), verbs(&["GET"])),
                ("/book/{id}/autosaves".to_string(), verbs(&["GET", "POST"])),
            ]
        );
        assert!(routes.iter().all(|r| r.namespace.as_deref() == Some("wp/v2")));
    }

    #[test]
    fn test_post_type_overrides_and_truthiness() {
        let routes = direct(
            "<?php
register_post_type('movie', array('show_in_rest' => '1', 'rest_base' => 'films', 'rest_namespace' => 'cinema/v1'));
register_post_type('hidden', array('show_in_rest' => false));
register_post_type('plain', array('public' => true));
",
        );

        assert_eq!(routes.len(), 4);
        assert_eq!(routes[0].path, "/films");
        assert_eq!(routes[0].namespace.as_deref(), Some("cinema/v1"));
    }

    #[test]
    fn test_constants_table() {
        let table = method_constants(Dialect::WordPress);
        assert_eq!(table.len(), 5);
    }
}
