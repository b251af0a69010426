//
//  resolver.rs
//  restscan
//
//  Turns hook callbacks into the statement blocks that actually run.
//

use std::collections::{HashSet, VecDeque};

use thiserror::Error;
use tracing::debug;

use super::assignments::TrackedVariables;
use super::hooks::HookCallback;
use super::symbols::SymbolIndex;
use crate::ast::{is_self_reference, short_name, ClassRef, Expr, Scope, Stmt};

/// The three callback shapes PHP hook APIs accept.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CallbackExpr<'a> {
    /// `function () { ... }` or `fn () => ...`.
    InlineBody(&'a [Stmt]),
    /// `'function_name'` or `'Class::method'`.
    NamedReference(&'a str),
    /// `[$object, 'method']` / `array('Class', 'method')`.
    ObjectMethodPair { object: &'a Expr, method: &'a str },
}

impl<'a> CallbackExpr<'a> {
    pub fn classify(expr: &'a Expr) -> Option<Self> {
        match expr {
            Expr::Closure { body } => Some(Self::InlineBody(body)),
            Expr::String(name) => Some(Self::NamedReference(name)),
            Expr::Array(items) => match items.as_slice() {
                [object, method, ..] => Some(Self::ObjectMethodPair {
                    object: &object.value,
                    method: method.value.as_str()?,
                }),
                _ => None,
            },
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOrigin {
    Closure,
    Function,
    Method,
}

/// A statement list reached from a hook callback.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedBlock<'a> {
    pub origin: BlockOrigin,
    /// Class whose `$this` the block runs under.
    pub class: Option<&'a str>,
    pub stmts: &'a [Stmt],
}

/// Why a callback produced no blocks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveMiss {
    #[error("callback is not a closure, function name or [object, method] pair")]
    UnsupportedShape,
    #[error("function `{0}` is not declared in the scanned sources")]
    UnknownFunction(String),
    #[error("method `{class}::{method}` is not declared in the scanned sources")]
    UnknownMethod { class: String, method: String },
    #[error("cannot determine the class of the callback object")]
    UnboundObject,
}

#[derive(Debug)]
pub enum Resolution<'a> {
    Blocks(Vec<ResolvedBlock<'a>>),
    Miss(ResolveMiss),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum VisitKey {
    Function(String),
    Method(String, String),
}

impl VisitKey {
    fn method(class: &str, method: &str) -> Self {
        VisitKey::Method(
            short_name(class).to_ascii_lowercase(),
            method.to_ascii_lowercase(),
        )
    }
}

pub struct CallbackResolver<'i, 'a> {
    index: &'i SymbolIndex<'a>,
    max_depth: usize,
}

impl<'i, 'a> CallbackResolver<'i, 'a> {
    pub fn new(index: &'i SymbolIndex<'a>, max_depth: usize) -> Self {
        Self { index, max_depth }
    }

    /// Blocks reachable from the callback; empty when it cannot be resolved.
    pub fn resolve(&self, hook: &HookCallback<'a>) -> Vec<ResolvedBlock<'a>> {
        match self.resolve_outcome(hook) {
            Resolution::Blocks(blocks) => blocks,
            Resolution::Miss(miss) => {
                debug!(hook = hook.hook, reason = %miss, "callback not resolved");
                Vec::new()
            }
        }
    }

    pub fn resolve_outcome(&self, hook: &HookCallback<'a>) -> Resolution<'a> {
        let mut visited = HashSet::new();
        let root = match self.root_block(hook, &mut visited) {
            Ok(root) => root,
            Err(miss) => return Resolution::Miss(miss),
        };

        Resolution::Blocks(self.expand(root, &mut visited))
    }

    fn root_block(
        &self,
        hook: &HookCallback<'a>,
        visited: &mut HashSet<VisitKey>,
    ) -> Result<ResolvedBlock<'a>, ResolveMiss> {
        match CallbackExpr::classify(hook.callback).ok_or(ResolveMiss::UnsupportedShape)? {
            CallbackExpr::InlineBody(stmts) => Ok(ResolvedBlock {
                origin: BlockOrigin::Closure,
                class: hook.scope.class,
                stmts,
            }),
            CallbackExpr::NamedReference(name) => match name.split_once("::") {
                Some((class, method)) => {
                    let class = if is_self_reference(class) {
                        hook.scope.class.ok_or(ResolveMiss::UnboundObject)?
                    } else {
                        class
                    };
                    visited.insert(VisitKey::method(class, method));
                    self.method_block(class, method)
                }
                None => {
                    let function = self
                        .index
                        .function(name)
                        .ok_or_else(|| ResolveMiss::UnknownFunction(name.to_string()))?;
                    visited.insert(VisitKey::Function(short_name(name).to_ascii_lowercase()));
                    Ok(ResolvedBlock {
                        origin: BlockOrigin::Function,
                        class: None,
                        stmts: &function.body,
                    })
                }
            },
            CallbackExpr::ObjectMethodPair { object, method } => {
                let class = object_class(object, hook.scope).ok_or(ResolveMiss::UnboundObject)?;
                visited.insert(VisitKey::method(class, method));
                self.method_block(class, method)
            }
        }
    }

    fn method_block(&self, class: &'a str, method: &str) -> Result<ResolvedBlock<'a>, ResolveMiss> {
        let found = self
            .index
            .method(class, method)
            .ok_or_else(|| ResolveMiss::UnknownMethod {
                class: class.to_string(),
                method: method.to_string(),
            })?;
        // `$this` inside an inherited method still refers to the receiver.
        let receiver = self
            .index
            .class(class)
            .map(|entry| entry.name)
            .unwrap_or(found.class);
        Ok(ResolvedBlock {
            origin: BlockOrigin::Method,
            class: Some(receiver),
            stmts: found.body,
        })
    }

    /// Follow "construct an object, then call a method on it" delegation
    /// out of `root`, returning it followed by every method body reached.
    ///
    /// Breadth-first, so each method is first seen at its shortest distance
    /// from the root and marking it visited never hides an in-range call.
    fn expand(
        &self,
        root: ResolvedBlock<'a>,
        visited: &mut HashSet<VisitKey>,
    ) -> Vec<ResolvedBlock<'a>> {
        let mut out = vec![root];
        let mut queue = VecDeque::from([(root, 1)]);

        while let Some((block, depth)) = queue.pop_front() {
            let calls = self.delegated_calls(block);
            if depth > self.max_depth {
                if !calls.is_empty() {
                    debug!(depth, skipped = calls.len(), "resolution depth limit reached");
                }
                continue;
            }
            for (class, method) in calls {
                if !visited.insert(VisitKey::method(class, method)) {
                    continue;
                }
                match self.method_block(class, method) {
                    Ok(inner) => {
                        out.push(inner);
                        queue.push_back((inner, depth + 1));
                    }
                    Err(miss) => debug!(reason = %miss, "delegated call not resolved"),
                }
            }
        }
        out
    }

    /// `(class, method)` targets of top-level calls in `block`:
    /// `$tracked->m()`, `(new C)->m()`, `$this->m()` and `C::m()`.
    /// Arrow functions contribute their single returned expression.
    fn delegated_calls(&self, block: ResolvedBlock<'a>) -> Vec<(&'a str, &'a str)> {
        let tracked = TrackedVariables::scan(block.stmts);
        block
            .stmts
            .iter()
            .filter_map(|stmt| match stmt {
                Stmt::Expr(expr) | Stmt::Return(Some(expr)) => Some(expr),
                _ => None,
            })
            .filter_map(|expr| match expr {
                Expr::MethodCall { object, method, .. } => {
                    let class = match object.as_ref() {
                        object if object.is_this() => block.class,
                        Expr::Variable(var) => tracked.class_of(var),
                        Expr::New {
                            class: ClassRef::Named(class),
                            ..
                        } => Some(class.as_str()),
                        _ => None,
                    }?;
                    Some((class, method.as_str()))
                }
                Expr::StaticCall { class, method, .. } => {
                    let class = if is_self_reference(class) {
                        block.class?
                    } else if class.eq_ignore_ascii_case("parent") {
                        self.index.class(block.class?)?.parent()?
                    } else {
                        class.as_str()
                    };
                    Some((class, method.as_str()))
                }
                _ => None,
            })
            .collect()
    }
}

/// Class of the object half of an `[object, 'method']` callback.
fn object_class<'a>(object: &'a Expr, scope: Scope<'a>) -> Option<&'a str> {
    match object {
        _ if object.is_this() => scope.class,
        Expr::Const(name) if name == "__CLASS__" => scope.class,
        Expr::Variable(var) => TrackedVariables::scan(scope.block).class_of(var),
        Expr::String(class) if is_self_reference(class) => scope.class,
        Expr::String(class) => Some(class.as_str()),
        Expr::ClassConst { class, name } if name.eq_ignore_ascii_case("class") => {
            if is_self_reference(class) {
                scope.class
            } else {
                Some(class.as_str())
            }
        }
        Expr::New {
            class: ClassRef::Named(class),
            ..
        } => Some(class.as_str()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::hooks::{collect_hooks, HookSpec};
    use crate::ast::Corpus;
    use crate::parser::corpus_of;

    fn spec() -> HookSpec {
        HookSpec::new(["add_action"], ["rest_api_init"])
    }

    fn resolve_all(corpus: &Corpus) -> Vec<Resolution<'_>> {
        let index = SymbolIndex::build(corpus.stmts());
        let resolver = CallbackResolver::new(&index, 8);
        collect_hooks(corpus.stmts(), &spec())
            .iter()
            .map(|hook| resolver.resolve_outcome(hook))
            .collect()
    }

    fn origins(resolution: &Resolution<'_>) -> Vec<(BlockOrigin, Option<String>)> {
        match resolution {
            Resolution::Blocks(blocks) => blocks
                .iter()
                .map(|block| (block.origin, block.class.map(str::to_string)))
                .collect(),
            Resolution::Miss(miss) => panic!("unexpected miss: {miss}"),
        }
    }

    #[test]
    fn test_classify() {
        let closure = Expr::Closure { body: Vec::new() };
        assert!(matches!(
            CallbackExpr::classify(&closure),
            Some(CallbackExpr::InlineBody(_))
        ));
        assert_eq!(
            CallbackExpr::classify(&Expr::String("routes".into())),
            Some(CallbackExpr::NamedReference("routes"))
        );
        assert_eq!(CallbackExpr::classify(&Expr::Variable("cb".into())), None);
    }

    #[test]
    fn test_resolves_each_callback_shape() {
        let corpus = corpus_of(&[r#"<?php
function my_routes() {}
class Api {
    public function routes() {}
    public static function boot() {}
    public function __construct() {
        add_action('rest_api_init', array($this, 'routes'));
    }
}
add_action('rest_api_init', function () {});
add_action('rest_api_init', 'my_routes');
add_action('rest_api_init', 'Api::boot');
add_action('rest_api_init', [Api::class, 'routes']);
$api = new Api();
add_action('rest_api_init', [$api, 'routes']);
add_action('rest_api_init', [new Api(), 'routes']);
"#]);
        let resolutions = resolve_all(&corpus);
        assert_eq!(resolutions.len(), 7);

        let api = Some("Api".to_string());
        assert_eq!(origins(&resolutions[0]), vec![(BlockOrigin::Method, api.clone())]);
        assert_eq!(origins(&resolutions[1]), vec![(BlockOrigin::Closure, None)]);
        assert_eq!(origins(&resolutions[2]), vec![(BlockOrigin::Function, None)]);
        for resolution in &resolutions[3..] {
            assert_eq!(origins(resolution), vec![(BlockOrigin::Method, api.clone())]);
        }
    }

    #[test]
    fn test_misses_are_reported() {
        let corpus = corpus_of(&[r#"<?php
add_action('rest_api_init', 'missing_function');
add_action('rest_api_init', [$unknown, 'routes']);
add_action('rest_api_init', ['Api', 'missing']);
add_action('rest_api_init', $callback);
"#]);
        let misses: Vec<ResolveMiss> = resolve_all(&corpus)
            .into_iter()
            .map(|resolution| match resolution {
                Resolution::Miss(miss) => miss,
                Resolution::Blocks(_) => panic!("expected a miss"),
            })
            .collect();

        assert_eq!(
            misses,
            vec![
                ResolveMiss::UnknownFunction("missing_function".into()),
                ResolveMiss::UnboundObject,
                ResolveMiss::UnknownMethod {
                    class: "Api".into(),
                    method: "missing".into()
                },
                ResolveMiss::UnsupportedShape,
            ]
        );
    }

    #[test]
    fn test_follows_delegation() {
        let corpus = corpus_of(&[r#"<?php
class Controller {
    public function register_routes() {
        $this->more_routes();
    }
    public function more_routes() {}
}
add_action('rest_api_init', function () {
    $controller = new Controller();
    $controller->register_routes();
});
"#]);
        let resolutions = resolve_all(&corpus);
        let controller = Some("Controller".to_string());
        assert_eq!(
            origins(&resolutions[0]),
            vec![
                (BlockOrigin::Closure, None),
                (BlockOrigin::Method, controller.clone()),
                (BlockOrigin::Method, controller),
            ]
        );
    }

    #[test]
    fn test_mutual_delegation_terminates() {
        let corpus = corpus_of(&[r#"<?php
class Ping {
    public function run() { (new Pong())->run(); }
}
class Pong {
    public function run() { (new Ping())->run(); }
}
add_action('rest_api_init', [new Ping(), 'run']);
"#]);
        let resolutions = resolve_all(&corpus);
        assert_eq!(origins(&resolutions[0]).len(), 2);
    }

    #[test]
    fn test_depth_limit() {
        let corpus = corpus_of(&[r#"<?php
class A { public function go() { (new B())->go(); } }
class B { public function go() { (new C())->go(); } }
class C { public function go() {} }
add_action('rest_api_init', [new A(), 'go']);
"#]);
        let index = SymbolIndex::build(corpus.stmts());
        let hooks = collect_hooks(corpus.stmts(), &spec());

        let shallow = CallbackResolver::new(&index, 1).resolve(&hooks[0]);
        assert_eq!(shallow.len(), 2);

        let deep = CallbackResolver::new(&index, 8).resolve(&hooks[0]);
        assert_eq!(deep.len(), 3);
    }

    #[test]
    fn test_depth_limit_does_not_hide_nearer_calls() {
        let corpus = corpus_of(&[r#"<?php
class A { public function go() { (new X())->go(); } }
class X { public function go() { (new B())->go(); } }
class B { public function go() {} }
add_action('rest_api_init', function () {
    (new A())->go();
    (new B())->go();
});
"#]);
        let index = SymbolIndex::build(corpus.stmts());
        let hooks = collect_hooks(corpus.stmts(), &spec());

        let classes: Vec<Option<&str>> = CallbackResolver::new(&index, 2)
            .resolve(&hooks[0])
            .iter()
            .map(|block| block.class)
            .collect();
        assert_eq!(classes, vec![None, Some("A"), Some("B"), Some("X")]);
    }

    #[test]
    fn test_arrow_function_delegation() {
        let corpus = corpus_of(&[r#"<?php
class Controller {
    public function register_routes() {}
}
add_action('rest_api_init', fn () => (new Controller())->register_routes());
"#]);
        let resolutions = resolve_all(&corpus);
        assert_eq!(
            origins(&resolutions[0]),
            vec![
                (BlockOrigin::Closure, None),
                (BlockOrigin::Method, Some("Controller".to_string())),
            ]
        );
    }
}
