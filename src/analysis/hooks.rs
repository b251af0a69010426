//
//  hooks.rs
//  restscan
//

use crate::ast::{walk_stmts, Expr, Scope, Stmt, Visitor};

/// Registrar functions and hook names that anchor callback discovery.
#[derive(Debug, Clone, Default)]
pub struct HookSpec {
    registrars: Vec<String>,
    hooks: Vec<String>,
}

impl HookSpec {
    pub fn new<R, H>(registrars: R, hooks: H) -> Self
    where
        R: IntoIterator,
        R::Item: AsRef<str>,
        H: IntoIterator,
        H::Item: AsRef<str>,
    {
        Self {
            registrars: registrars.into_iter().map(|r| r.as_ref().to_string()).collect(),
            hooks: hooks.into_iter().map(|h| h.as_ref().to_string()).collect(),
        }
    }

    /// Add hook names on top of the dialect's own.
    pub fn with_extra_hooks(mut self, extra: &[String]) -> Self {
        for hook in extra {
            if !self.matches_hook(hook) {
                self.hooks.push(hook.clone());
            }
        }
        self
    }

    /// No registrar or no hook means the dialect has no callback pass.
    pub fn is_empty(&self) -> bool {
        self.registrars.is_empty() || self.hooks.is_empty()
    }

    fn matches_registrar(&self, name: &str) -> bool {
        self.registrars.iter().any(|r| r.eq_ignore_ascii_case(name))
    }

    fn matches_hook(&self, name: &str) -> bool {
        self.hooks.iter().any(|h| h.eq_ignore_ascii_case(name))
    }
}

/// A callback registered on one of the anchor hooks, not yet resolved.
#[derive(Debug, Clone, Copy)]
pub struct HookCallback<'a> {
    pub hook: &'a str,
    pub callback: &'a Expr,
    /// Where the registration call itself appears.
    pub scope: Scope<'a>,
}

/// Find every `registrar('hook', callback, ...)` call in tree order,
/// including calls nested inside functions, methods and closures.
pub fn collect_hooks<'a>(stmts: &'a [Stmt], spec: &HookSpec) -> Vec<HookCallback<'a>> {
    if spec.is_empty() {
        return Vec::new();
    }
    let mut collector = Collector {
        spec,
        found: Vec::new(),
    };
    walk_stmts(&mut collector, stmts, None);
    collector.found
}

struct Collector<'s, 'a> {
    spec: &'s HookSpec,
    found: Vec<HookCallback<'a>>,
}

impl<'s, 'a> Visitor<'a> for Collector<'s, 'a> {
    fn visit_expr(&mut self, expr: &'a Expr, scope: Scope<'a>) {
        let Some((name, args)) = expr.as_call() else {
            return;
        };
        if !self.spec.matches_registrar(name) {
            return;
        }
        let [hook, callback, ..] = args else {
            return;
        };
        match hook.as_str() {
            Some(hook) if self.spec.matches_hook(hook) => self.found.push(HookCallback {
                hook,
                callback,
                scope,
            }),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::corpus_of;

    fn wordpress() -> HookSpec {
        HookSpec::new(["add_action", "add_filter"], ["rest_api_init"])
    }

    #[test]
    fn test_collects_matching_registrations() {
        let corpus = corpus_of(&[r#"<?php
add_action('rest_api_init', 'my_routes');
add_action('init', 'not_rest');
ADD_FILTER('REST_API_INIT', array($this, 'routes'));
add_action('rest_api_init');
class Plugin {
    public function __construct() {
        add_action('rest_api_init', [$this, 'register']);
    }
}
"#]);
        let found = collect_hooks(corpus.stmts(), &wordpress());

        assert_eq!(found.len(), 3);
        assert_eq!(found[0].callback, &Expr::String("my_routes".into()));
        assert_eq!(found[0].scope.class, None);
        assert!(matches!(found[1].callback, Expr::Array(_)));
        assert_eq!(found[2].scope.class, Some("Plugin"));
    }

    #[test]
    fn test_extra_hooks() {
        let corpus = corpus_of(&["<?php add_action('my_plugin_rest', 'routes');"]);

        assert!(collect_hooks(corpus.stmts(), &wordpress()).is_empty());

        let spec = wordpress().with_extra_hooks(&["my_plugin_rest".to_string()]);
        assert_eq!(collect_hooks(corpus.stmts(), &spec).len(), 1);
    }

    #[test]
    fn test_empty_spec_collects_nothing() {
        let corpus = corpus_of(&["<?php add_action('rest_api_init', 'routes');"]);
        let spec = HookSpec::new(Vec::<String>::new(), ["rest_api_init"]);
        assert!(collect_hooks(corpus.stmts(), &spec).is_empty());
    }
}
