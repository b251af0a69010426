//
//  ingest.rs
//  restscan
//

use ignore::WalkBuilder;
use rayon::prelude::*;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

use crate::ast::{Corpus, SourceUnit};
use crate::config::ScanConfig;
use crate::parser::parse_file;

/// The merged corpus plus per-file bookkeeping.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub corpus: Corpus,
    pub files_parsed: usize,
    pub files_skipped: usize,
}

/// Check if a path passes through any excluded directory name.
fn is_excluded(path: &Path, exclude_dirs: &[String]) -> bool {
    path.components().any(|c| {
        if let Component::Normal(name) = c {
            exclude_dirs
                .iter()
                .any(|dir| name.to_str().is_some_and(|name| name == dir))
        } else {
            false
        }
    })
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|wanted| wanted.eq_ignore_ascii_case(ext)))
}

/// Candidate source files under `roots`, sorted and de-duplicated so the
/// corpus order never depends on directory iteration order.
pub fn discover(roots: &[PathBuf], config: &ScanConfig) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = roots
        .iter()
        .flat_map(|root| {
            if !root.exists() {
                warn!(root = %root.display(), "scan root does not exist");
            }
            WalkBuilder::new(root)
                .hidden(true)
                .git_ignore(config.respect_gitignore)
                .git_global(config.respect_gitignore)
                .git_exclude(config.respect_gitignore)
                .ignore(config.respect_gitignore)
                .parents(config.respect_gitignore)
                .build()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
                .filter(move |entry| {
                    let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
                    !is_excluded(relative, &config.exclude_dirs)
                })
                .filter(move |entry| has_extension(entry.path(), &config.extensions))
                .map(|entry| entry.into_path())
        })
        .collect();

    files.sort();
    files.dedup();
    files
}

/// Discover, parse in parallel, and merge into one corpus.
///
/// Unreadable, oversized or unparseable files are logged and counted as
/// skipped. `collect` keeps the discovery order, so the merge is
/// deterministic however the parses finish.
pub fn load_corpus(roots: &[PathBuf], config: &ScanConfig) -> IngestReport {
    let files = discover(roots, config);
    debug!(files = files.len(), "discovered source files");

    let results: Vec<Option<SourceUnit>> = files
        .par_iter()
        .map(|path| match parse_file(path, config.max_file_size) {
            Ok(unit) => Some(unit),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping file");
                None
            }
        })
        .collect();

    let files_skipped = results.iter().filter(|unit| unit.is_none()).count();
    let corpus = Corpus::from_units(results.into_iter().flatten());
    let files_parsed = corpus.unit_count();
    info!(files_parsed, files_skipped, "corpus loaded");

    IngestReport {
        corpus,
        files_parsed,
        files_skipped,
    }
}
