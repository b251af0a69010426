//
//  mod.rs
//  restscan
//

mod helpers;
mod lower;

use std::fs;
use std::path::Path;

use tracing::debug;
use tree_sitter::{Language, Parser};

use crate::ast::SourceUnit;
use crate::error::{Result, ScanError};
use lower::Lowerer;

/// Parse PHP source text and lower it into a `SourceUnit`.
///
/// tree-sitter recovers from syntax errors, so a file with broken regions
/// still yields every construct it could make sense of.
pub fn parse_source(path: &Path, source: &str) -> Result<SourceUnit> {
    let mut parser = Parser::new();
    let language: Language = tree_sitter_php::LANGUAGE_PHP.into();
    parser
        .set_language(&language)
        .map_err(|e| ScanError::ParserInit(path.to_path_buf(), e.to_string()))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| ScanError::ParseFailed(path.to_path_buf()))?;

    let root = tree.root_node();
    if root.has_error() {
        debug!(path = %path.display(), "syntax errors, lowering recovered tree");
    }

    let lowerer = Lowerer::new(source.as_bytes());
    let stmts = lowerer.program(&root);
    if lowerer.truncated() {
        debug!(
            path = %path.display(),
            limit = lower::MAX_NESTING,
            "nesting limit reached, deeper constructs dropped"
        );
    }

    Ok(SourceUnit {
        path: path.to_path_buf(),
        stmts,
    })
}

/// Read and parse a file, refusing anything above `max_size` bytes.
/// Bytes that are not valid UTF-8 are replaced rather than rejected.
pub fn parse_file(path: &Path, max_size: u64) -> Result<SourceUnit> {
    let size = fs::metadata(path)?.len();
    if size > max_size {
        return Err(ScanError::FileTooLarge {
            path: path.to_path_buf(),
            size,
            limit: max_size,
        });
    }

    let bytes = fs::read(path)?;
    let source = String::from_utf8_lossy(&bytes);
    parse_source(path, &source)
}

/// Build a single-unit corpus from inline PHP for tests.
#[cfg(test)]
pub(crate) fn corpus_of(sources: &[&str]) -> crate::ast::Corpus {
    crate::ast::Corpus::from_units(sources.iter().enumerate().map(|(i, source)| {
        parse_source(Path::new(&format!("fixture{i}.php")), source)
            .expect("fixture should parse")
    }))
}
