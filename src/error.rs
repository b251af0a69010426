//
//  error.rs
//  restscan
//

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the scanner.
///
/// Only `OutputUnwritable` is fatal for a run. Everything else is contained
/// at the file that produced it and reported as a skipped file.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("failed to initialise PHP parser for {}: {}", .0.display(), .1)]
    ParserInit(PathBuf, String),

    #[error("tree-sitter could not parse {}", .0.display())]
    ParseFailed(PathBuf),

    #[error("{} is {} bytes, above the {} byte limit", .path.display(), .size, .limit)]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("cannot write output to {}: {}", .path.display(), .source)]
    OutputUnwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ScanError>;
