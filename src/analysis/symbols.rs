//
//  symbols.rs
//  restscan
//

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::ast::{short_name, walk_stmts, ClassDecl, Expr, FunctionDecl, Member, MethodDecl, Scope, Stmt, Visitor};

/// Index key for PHP class, function and method names: unqualified and
/// case-folded, since PHP resolves all three case-insensitively.
fn key(name: &str) -> String {
    short_name(name).to_ascii_lowercase()
}

/// Everything the analysis needs to know about one declared class.
#[derive(Debug)]
pub struct ClassEntry<'a> {
    /// Declared name, original casing.
    pub name: &'a str,
    pub decl: &'a ClassDecl,
    methods: HashMap<String, &'a MethodDecl>,
    constants: HashMap<&'a str, &'a Expr>,
    properties: HashMap<&'a str, &'a Expr>,
}

impl<'a> ClassEntry<'a> {
    fn new(name: &'a str, decl: &'a ClassDecl) -> Self {
        let mut entry = Self {
            name,
            decl,
            methods: HashMap::new(),
            constants: HashMap::new(),
            properties: HashMap::new(),
        };
        for member in &decl.members {
            match member {
                Member::Method(method) => {
                    entry.methods.insert(key(&method.name), method);
                }
                Member::Constant { name, value } => {
                    entry.constants.insert(name.as_str(), value);
                }
                Member::Property {
                    name,
                    default: Some(value),
                } => {
                    entry.properties.insert(name.as_str(), value);
                }
                Member::Property { default: None, .. } => {}
            }
        }
        entry
    }

    pub fn parent(&self) -> Option<&'a str> {
        self.decl.parent.as_deref()
    }
}

/// A method found through `SymbolIndex::method`, possibly inherited.
#[derive(Debug, Clone, Copy)]
pub struct MethodRef<'a> {
    /// The class that actually declares the method.
    pub class: &'a str,
    pub method: &'a MethodDecl,
    pub body: &'a [Stmt],
}

/// class → methods/constants/properties, plus global functions.
///
/// Built in one walk over the corpus. Redeclarations overwrite, so the last
/// declaration in corpus order wins.
#[derive(Debug, Default)]
pub struct SymbolIndex<'a> {
    classes: HashMap<String, ClassEntry<'a>>,
    functions: HashMap<String, &'a FunctionDecl>,
}

impl<'a> SymbolIndex<'a> {
    pub fn build(stmts: &'a [Stmt]) -> Self {
        let mut index = SymbolIndex::default();
        walk_stmts(&mut index, stmts, None);
        debug!(
            classes = index.classes.len(),
            functions = index.functions.len(),
            "symbol index built"
        );
        index
    }

    pub fn function(&self, name: &str) -> Option<&'a FunctionDecl> {
        self.functions.get(&key(name)).copied()
    }

    pub fn class(&self, name: &str) -> Option<&ClassEntry<'a>> {
        self.classes.get(&key(name))
    }

    /// Look a method up on `class`, then its traits, then its parent chain.
    /// Abstract declarations are skipped so an implementation further up
    /// the chain can still be found.
    pub fn method(&self, class: &str, method: &str) -> Option<MethodRef<'a>> {
        let wanted = key(method);
        let mut visited = HashSet::new();
        self.find_method(class, &wanted, &mut visited)
    }

    fn find_method(
        &self,
        class: &str,
        method: &str,
        visited: &mut HashSet<String>,
    ) -> Option<MethodRef<'a>> {
        if !visited.insert(key(class)) {
            return None;
        }
        let entry = self.class(class)?;

        if let Some(decl) = entry.methods.get(method).copied() {
            if let Some(body) = decl.body.as_deref() {
                return Some(MethodRef {
                    class: entry.name,
                    method: decl,
                    body,
                });
            }
        }

        let (traits, parent) = (&entry.decl.traits, entry.parent());
        traits
            .iter()
            .find_map(|used| self.find_method(used, method, visited))
            .or_else(|| parent.and_then(|parent| self.find_method(parent, method, visited)))
    }

    /// Class constant expression, searched through traits and parents.
    pub fn constant(&self, class: &str, name: &str) -> Option<&'a Expr> {
        self.lineage(class)
            .find_map(|entry| entry.constants.get(name).copied())
    }

    /// Declared default of a property, searched through traits and parents.
    pub fn property_default(&self, class: &str, name: &str) -> Option<&'a Expr> {
        self.lineage(class)
            .find_map(|entry| entry.properties.get(name).copied())
    }

    /// `class` followed by its traits and ancestors, each at most once.
    fn lineage<'s>(&'s self, class: &str) -> impl Iterator<Item = &'s ClassEntry<'a>> + 's {
        let mut pending = vec![key(class)];
        let mut visited = HashSet::new();
        std::iter::from_fn(move || {
            while let Some(next) = pending.pop() {
                if !visited.insert(next.clone()) {
                    continue;
                }
                let Some(entry) = self.classes.get(&next) else {
                    continue;
                };
                // Pushed in reverse so traits are visited before the parent.
                if let Some(parent) = entry.parent() {
                    pending.push(key(parent));
                }
                pending.extend(entry.decl.traits.iter().rev().map(|used| key(used)));
                return Some(entry);
            }
            None
        })
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }
}

impl<'a> Visitor<'a> for SymbolIndex<'a> {
    fn visit_stmt(&mut self, stmt: &'a Stmt, _scope: Scope<'a>) {
        match stmt {
            Stmt::Function(function) => {
                self.functions.insert(key(&function.name), function);
            }
            Stmt::Class(class) => {
                if let Some(name) = class.name.as_deref() {
                    self.classes.insert(key(name), ClassEntry::new(name, class));
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::corpus_of;

    #[test]
    fn test_index_functions_and_methods() {
        let corpus = corpus_of(&[r#"<?php
function my_routes() { register_rest_route('a/v1', '/x'); }

class My_Controller {
    public function register_routes() {}
}
"#]);
        let index = SymbolIndex::build(corpus.stmts());

        assert_eq!(index.function_count(), 1);
        assert_eq!(index.class_count(), 1);
        assert!(index.function("my_routes").is_some());
        assert!(index.function("\\MY_ROUTES").is_some());

        let method = index.method("my_controller", "REGISTER_ROUTES").unwrap();
        assert_eq!(method.class, "My_Controller");
        assert!(index.method("My_Controller", "missing").is_none());
        assert!(index.method("Missing", "register_routes").is_none());
    }

    #[test]
    fn test_lookup_returns_same_body_every_time() {
        let corpus = corpus_of(&["<?php function routes() { foo(); }"]);
        let index = SymbolIndex::build(corpus.stmts());

        let first = index.function("routes").unwrap();
        let second = index.function("routes").unwrap();
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn test_last_declaration_wins() {
        let corpus = corpus_of(&[
            "<?php function routes() { first(); }",
            "<?php function routes() { second(); second(); }",
        ]);
        let index = SymbolIndex::build(corpus.stmts());

        assert_eq!(index.function("routes").unwrap().body.len(), 2);
    }

    #[test]
    fn test_inherited_and_trait_lookup() {
        let corpus = corpus_of(&[r#"<?php
trait Registers {
    public function register_routes() { trait_body(); }
}
abstract class Base {
    const NS = 'base/v1';
    protected $rest_base = 'things';
    abstract public function register_routes();
    public function boot() {}
}
class Child extends Base {
    use Registers;
}
class Loop extends Loop {}
"#]);
        let index = SymbolIndex::build(corpus.stmts());

        assert_eq!(index.method("Child", "register_routes").unwrap().class, "Registers");
        assert_eq!(index.method("Child", "boot").unwrap().class, "Base");
        assert_eq!(
            index.constant("Child", "NS"),
            Some(&Expr::String("base/v1".into()))
        );
        assert_eq!(
            index.property_default("Child", "rest_base"),
            Some(&Expr::String("things".into()))
        );
        assert!(index.method("Loop", "anything").is_none());
        assert!(index.constant("Loop", "ANY").is_none());
    }

    #[test]
    fn test_functions_nested_in_methods_are_global() {
        let corpus = corpus_of(&[r#"<?php
class Plugin {
    public function init() {
        function plugin_routes() {}
    }
}
"#]);
        let index = SymbolIndex::build(corpus.stmts());
        assert!(index.function("plugin_routes").is_some());
    }
}
