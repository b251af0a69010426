//
//  drupal.rs
//  restscan
//

use super::visitor::RoutePatterns;
use super::{Dialect, RouteRecord};
use crate::analysis::ValueContext;
use crate::ast::{short_name, ClassRef, Expr};

/// Positions of the Symfony `Route` constructor arguments we read.
const REQUIREMENTS_ARG: usize = 2;
const METHODS_ARG: usize = 6;

/// Drupal route subscribers: `$collection->add('name', new Route(...))`.
pub struct Drupal;

impl RoutePatterns for Drupal {
    fn dialect(&self) -> Dialect {
        Dialect::Drupal
    }

    fn route_call(&self, expr: &Expr, ctx: &ValueContext<'_>) -> Option<RouteRecord> {
        let Expr::MethodCall { method, args, .. } = expr else {
            return None;
        };
        if !method.eq_ignore_ascii_case("add") {
            return None;
        }
        let [name, route, ..] = args.as_slice() else {
            return None;
        };
        let Expr::New {
            class: ClassRef::Named(class),
            args: route_args,
        } = route
        else {
            return None;
        };
        if !short_name(class).eq_ignore_ascii_case("Route") {
            return None;
        }

        let name = ctx.resolve_string(name)?;
        let path = ctx.resolve_string(route_args.first()?)?;
        let methods = route_args
            .get(METHODS_ARG)
            .and_then(|methods| ctx.resolve_methods(methods))
            .or_else(|| {
                let requirements = route_args.get(REQUIREMENTS_ARG)?;
                ctx.resolve_methods(requirements.array_value("_method")?)
            });

        Some(RouteRecord::new(Dialect::Drupal, None, &path, methods).with_name(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SymbolIndex;
    use crate::parser::corpus_of;
    use crate::routes::{scan_block, Pass};
    use std::collections::BTreeSet;

    fn verbs(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|verb| verb.to_string()).collect()
    }

    #[test]
    fn test_route_subscriber() {
        let corpus = corpus_of(&[r#"<?php
use Symfony\Component\Routing\Route;
use Symfony\Component\HttpFoundation\Request;

class ExampleRoutes {
    public function routes() {
        $collection = new RouteCollection();
        $collection->add('example.list', new Route('/api/example'));
        $collection->add('example.item', new Route(
            '/api/example/{id}',
            ['_controller' => '\Drupal\example\Controller::item'],
            ['_method' => 'GET|PATCH'],
        ));
        $collection->add('example.create', new \Symfony\Component\Routing\Route(
            '/api/example', [], [], [], '', [], [Request::METHOD_POST]
        ));
        $collection->add($dynamic, new Route('/api/skipped'));
        $items->add('not-a-route');
        return $collection;
    }
}
"#]);
        let index = SymbolIndex::build(corpus.stmts());
        let routes = scan_block(corpus.stmts(), None, &Drupal, &index, Pass::Direct);

        assert_eq!(routes.len(), 3);

        assert_eq!(routes[0].name.as_deref(), Some("example.list"));
        assert_eq!(routes[0].path, "/api/example");
        assert_eq!(routes[0].methods, verbs(&["GET", "POST", "PUT", "DELETE"]));
        assert_eq!(routes[0].namespace, None);

        assert_eq!(routes[1].path, "/api/example/{id}");
        assert_eq!(routes[1].methods, verbs(&["GET", "PATCH"]));

        assert_eq!(routes[2].name.as_deref(), Some("example.create"));
        assert_eq!(routes[2].methods, verbs(&["POST"]));
    }
}
