//! Corpus-wide analysis passes.
//!
//! Each pass borrows the corpus and returns what it found; none of them
//! mutate the tree or each other's output.

pub mod assignments;
pub mod hooks;
pub mod resolver;
pub mod symbols;
pub mod values;

pub use assignments::TrackedVariables;
pub use hooks::{collect_hooks, HookCallback, HookSpec};
pub use resolver::{BlockOrigin, CallbackExpr, CallbackResolver, Resolution, ResolveMiss, ResolvedBlock};
pub use symbols::{ClassEntry, MethodRef, SymbolIndex};
pub use values::{parse_verbs, MethodConstant, ValueContext};
