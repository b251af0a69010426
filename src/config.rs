//
//  config.rs
//  restscan
//

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::Result;
use crate::routes::Dialect;

/// Top-level restscan configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Which files are read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// File extensions parsed as PHP, without the dot.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Directory names never descended into.
    #[serde(default = "default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,
    /// Honour .gitignore / .ignore files under the roots.
    #[serde(default)]
    pub respect_gitignore: bool,
    /// Files larger than this many bytes are skipped.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

/// How the corpus is analyzed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Skip detection and use this dialect.
    #[serde(default)]
    pub dialect: Option<Dialect>,
    /// Additional hook names whose callbacks may register routes.
    #[serde(default)]
    pub extra_hooks: Vec<String>,
    /// How many levels of object delegation callback resolution follows.
    #[serde(default = "default_max_resolution_depth")]
    pub max_resolution_depth: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default report destination when none is given on the command line.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_extensions() -> Vec<String> {
    vec![
        "php".to_string(),
        "inc".to_string(),
        "module".to_string(),
        "theme".to_string(),
    ]
}

fn default_exclude_dirs() -> Vec<String> {
    vec![
        ".git".to_string(),
        "node_modules".to_string(),
        ".svn".to_string(),
    ]
}

fn default_max_file_size() -> u64 {
    4 * 1024 * 1024
}

fn default_max_resolution_depth() -> usize {
    8
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            exclude_dirs: default_exclude_dirs(),
            respect_gitignore: false,
            max_file_size: default_max_file_size(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            dialect: None,
            extra_hooks: Vec::new(),
            max_resolution_depth: default_max_resolution_depth(),
        }
    }
}

impl Config {
    /// Load config from a TOML file, falling back to defaults.
    ///
    /// A missing file is silently the default; a malformed one is reported
    /// and then ignored.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "ignoring malformed config");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}
