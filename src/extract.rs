//
//  extract.rs
//  restscan
//
//  Runs the three route passes over a corpus and unions their output.
//

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::analysis::{collect_hooks, CallbackResolver, SymbolIndex};
use crate::ast::Corpus;
use crate::config::AnalysisConfig;
use crate::routes::{patterns_for, scan_block, scan_global, Dialect, Pass, RoutePatterns, RouteRecord};

/// Whether a run analyzed anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Complete,
    /// No dialect could be determined; nothing was analyzed.
    UnknownDialect,
}

/// The document written at the end of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub dialect: Dialect,
    pub status: Status,
    pub files_parsed: usize,
    pub files_skipped: usize,
    pub routes: Vec<RouteRecord>,
}

impl ExtractionReport {
    pub fn unknown_dialect() -> Self {
        Self {
            dialect: Dialect::Unknown,
            status: Status::UnknownDialect,
            files_parsed: 0,
            files_skipped: 0,
            routes: Vec::new(),
        }
    }
}

/// Output of each pass, kept apart until the final union.
#[derive(Debug, Default)]
pub struct Passes {
    pub direct: Vec<RouteRecord>,
    pub callback: Vec<RouteRecord>,
    pub global: Vec<RouteRecord>,
}

impl Passes {
    /// Direct, then callback, then global. Duplicates are kept.
    pub fn into_routes(self) -> Vec<RouteRecord> {
        let mut routes = self.direct;
        routes.extend(self.callback);
        routes.extend(self.global);
        routes
    }
}

/// Run every pass for one dialect's patterns.
pub fn run_passes(corpus: &Corpus, patterns: &dyn RoutePatterns, config: &AnalysisConfig) -> Passes {
    let stmts = corpus.stmts();
    let index = SymbolIndex::build(stmts);

    let direct = scan_block(stmts, None, patterns, &index, Pass::Direct);

    let spec = patterns.hook_spec().with_extra_hooks(&config.extra_hooks);
    let hooks = collect_hooks(stmts, &spec);
    let resolver = CallbackResolver::new(&index, config.max_resolution_depth);
    let mut callback = Vec::new();
    for hook in &hooks {
        for block in resolver.resolve(hook) {
            callback.extend(scan_block(block.stmts, block.class, patterns, &index, Pass::Callback));
        }
    }

    let global = scan_global(stmts, patterns, &index);

    debug!(
        hooks = hooks.len(),
        direct = direct.len(),
        callback = callback.len(),
        global = global.len(),
        "passes complete"
    );
    Passes {
        direct,
        callback,
        global,
    }
}

/// All routes a corpus registers under `dialect`; empty for `Unknown`.
pub fn extract_from_corpus(
    corpus: &Corpus,
    dialect: Dialect,
    config: &AnalysisConfig,
) -> Vec<RouteRecord> {
    let Some(patterns) = patterns_for(dialect) else {
        return Vec::new();
    };
    let routes = run_passes(corpus, patterns, config).into_routes();
    info!(%dialect, routes = routes.len(), "extraction finished");
    routes
}
