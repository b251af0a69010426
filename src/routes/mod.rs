//
//  mod.rs
//  restscan
//
//  Route records and the per-dialect call-shape recognizers.
//

pub mod drupal;
pub mod joomla;
pub mod visitor;
pub mod wordpress;

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::analysis::MethodConstant;

pub use visitor::{patterns_for, scan_block, scan_global, RoutePatterns};

/// Verbs assumed when a registration does not say which methods it accepts.
pub const DEFAULT_METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE"];

// ── Dialect ──────────────────────────────────────────────────────────────────

/// The CMS whose route-registration vocabulary is being recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    WordPress,
    Drupal,
    Joomla,
    Unknown,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::WordPress => "wordpress",
            Dialect::Drupal => "drupal",
            Dialect::Joomla => "joomla",
            Dialect::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wordpress" | "wp" => Ok(Dialect::WordPress),
            "drupal" => Ok(Dialect::Drupal),
            "joomla" => Ok(Dialect::Joomla),
            "unknown" => Ok(Dialect::Unknown),
            other => Err(format!(
                "unknown dialect `{other}` (expected wordpress, drupal or joomla)"
            )),
        }
    }
}

// ── Method constants ─────────────────────────────────────────────────────────

const WORDPRESS_CONSTANTS: &[MethodConstant] = &[
    MethodConstant {
        class: "WP_REST_Server",
        name: "READABLE",
        verbs: &["GET"],
    },
    MethodConstant {
        class: "WP_REST_Server",
        name: "CREATABLE",
        verbs: &["POST"],
    },
    MethodConstant {
        class: "WP_REST_Server",
        name: "EDITABLE",
        verbs: &["PUT", "PATCH"],
    },
    MethodConstant {
        class: "WP_REST_Server",
        name: "DELETABLE",
        verbs: &["DELETE"],
    },
    MethodConstant {
        class: "WP_REST_Server",
        name: "ALLMETHODS",
        verbs: &["GET", "POST", "PUT", "PATCH", "DELETE"],
    },
];

const fn request_method(name: &'static str, verbs: &'static [&'static str]) -> MethodConstant {
    MethodConstant {
        class: "Request",
        name,
        verbs,
    }
}

/// Symfony `Request::METHOD_*`, used by Drupal route definitions.
const DRUPAL_CONSTANTS: &[MethodConstant] = &[
    request_method("METHOD_HEAD", &["HEAD"]),
    request_method("METHOD_GET", &["GET"]),
    request_method("METHOD_POST", &["POST"]),
    request_method("METHOD_PUT", &["PUT"]),
    request_method("METHOD_PATCH", &["PATCH"]),
    request_method("METHOD_DELETE", &["DELETE"]),
    request_method("METHOD_OPTIONS", &["OPTIONS"]),
    request_method("METHOD_PURGE", &["PURGE"]),
    request_method("METHOD_TRACE", &["TRACE"]),
    request_method("METHOD_CONNECT", &["CONNECT"]),
];

/// Symbolic HTTP method constants understood for a dialect.
pub fn method_constants(dialect: Dialect) -> &'static [MethodConstant] {
    match dialect {
        Dialect::WordPress => WORDPRESS_CONSTANTS,
        Dialect::Drupal => DRUPAL_CONSTANTS,
        Dialect::Joomla | Dialect::Unknown => &[],
    }
}

// ── Records ──────────────────────────────────────────────────────────────────

/// Which extraction pass produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pass {
    /// In-block scan of the whole corpus.
    Direct,
    /// Scan of a block reached through a hook callback.
    Callback,
    /// Corpus-wide scan, one record per method.
    Global,
}

/// One discovered HTTP route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub path: String,
    pub methods: BTreeSet<String>,
    pub dialect: Dialect,
    /// Drupal route name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Joomla `controller.task` handler.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
    pub pass: Pass,
}

impl RouteRecord {
    /// Build a record with a normalized path. Missing or empty methods fall
    /// back to `DEFAULT_METHODS`.
    pub fn new(
        dialect: Dialect,
        namespace: Option<String>,
        path: &str,
        methods: Option<BTreeSet<String>>,
    ) -> Self {
        let methods = methods
            .filter(|methods| !methods.is_empty())
            .unwrap_or_else(default_methods);
        Self {
            namespace,
            path: normalize_path(path),
            methods,
            dialect,
            name: None,
            handler: None,
            pass: Pass::Direct,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_handler(mut self, handler: impl Into<String>) -> Self {
        self.handler = Some(handler.into());
        self
    }

    pub fn in_pass(mut self, pass: Pass) -> Self {
        self.pass = pass;
        self
    }

    /// One record per method, everything else cloned.
    pub fn split_by_method(&self) -> Vec<RouteRecord> {
        self.methods
            .iter()
            .map(|method| RouteRecord {
                methods: BTreeSet::from([method.clone()]),
                ..self.clone()
            })
            .collect()
    }
}

pub fn default_methods() -> BTreeSet<String> {
    DEFAULT_METHODS.iter().map(|verb| verb.to_string()).collect()
}

/// Collapse named regex groups to placeholders:
/// `/items/(?P<id>\d+)` becomes `/items/{id}`.
///
/// Parentheses nested inside the group pattern are consumed with it.
/// Already-normalized input comes back unchanged.
pub fn normalize_path(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;
    while i < chars.len() {
        match named_group(&chars, i) {
            Some((name, end)) => {
                out.push('{');
                out.push_str(&name);
                out.push('}');
                i = end;
            }
            None => {
                out.push(chars[i]);
                i += 1;
            }
        }
    }
    out
}

/// A `(?P<name>...)` or `(?<name>...)` group starting at `start`: its name
/// and the index just past its closing parenthesis.
fn named_group(chars: &[char], start: usize) -> Option<(String, usize)> {
    let rest = &chars[start..];
    let prefix = if rest.starts_with(&['(', '?', 'P', '<']) {
        4
    } else if rest.starts_with(&['(', '?', '<']) {
        3
    } else {
        return None;
    };

    let mut i = start + prefix;
    let mut name = String::new();
    loop {
        match chars.get(i) {
            Some('>') => break,
            // Lookbehinds `(?<=` and `(?<!` land here.
            Some(&c) if c.is_alphanumeric() || c == '_' => name.push(c),
            _ => return None,
        }
        i += 1;
    }
    if name.is_empty() {
        return None;
    }
    i += 1;

    let mut depth = 1;
    let mut in_class = false;
    while let Some(&c) = chars.get(i) {
        i += 1;
        match c {
            '\\' => i += 1,
            '[' if !in_class => in_class = true,
            ']' if in_class => in_class = false,
            '(' if !in_class => depth += 1,
            ')' if !in_class => {
                depth -= 1;
                if depth == 0 {
                    return Some((name, i));
                }
            }
            _ => {}
        }
    }
    None
}
