//! # restscan
//!
//! Static discovery of REST routes in CMS PHP source trees.
//!
//! restscan never runs the code it reads. It parses every PHP file under the
//! given roots, merges them into one corpus, and then:
//!
//! - finds route registrations written directly in the source,
//! - follows hook callbacks (closures, function names, `[object, 'method']`
//!   pairs, and the objects they construct) to the code that actually
//!   registers routes,
//! - sweeps the whole corpus once more for registration calls regardless of
//!   reachability.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use restscan::{extract_routes, Config};
//! use std::path::PathBuf;
//!
//! let report = extract_routes(&[PathBuf::from("wp-content/plugins")], &Config::default());
//! for route in &report.routes {
//!     println!("{:?} {} {:?}", route.namespace, route.path, route.methods);
//! }
//! ```

pub mod analysis;
pub mod ast;
pub mod config;
pub mod detect;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod output;
pub mod parser;
pub mod routes;

// Re-exports for convenience
pub use config::Config;
pub use detect::detect;
pub use error::{Result, ScanError};
pub use extract::{extract_from_corpus, ExtractionReport, Status};
pub use routes::{Dialect, Pass, RouteRecord};

use std::path::PathBuf;
use tracing::{info, warn};

/// Scan `roots` and extract every route they register.
///
/// The dialect comes from `config.analysis.dialect` or, failing that, from
/// `detect`. An unknown dialect is not an error: the report is empty and
/// its status says why.
pub fn extract_routes(roots: &[PathBuf], config: &Config) -> ExtractionReport {
    let dialect = config.analysis.dialect.unwrap_or_else(|| detect(roots));
    if dialect == Dialect::Unknown {
        warn!("could not determine the CMS dialect, nothing extracted");
        return ExtractionReport::unknown_dialect();
    }
    info!(%dialect, roots = roots.len(), "extracting routes");

    let ingest = ingest::load_corpus(roots, &config.scan);
    let routes = extract_from_corpus(&ingest.corpus, dialect, &config.analysis);

    ExtractionReport {
        dialect,
        status: Status::Complete,
        files_parsed: ingest.files_parsed,
        files_skipped: ingest.files_skipped,
        routes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_extract_plugin_tree() {
        let dir = tempdir().unwrap();
        let plugin = dir.path().join("wp-content/plugins/shop");
        fs::create_dir_all(&plugin).unwrap();
        fs::write(
            plugin.join("shop.php"),
            r#"<?php
add_action('rest_api_init', array('Shop_Api', 'routes'));
class Shop_Api {
    public static function routes() {
        register_rest_route('shop/v1', '/orders/(?P<id>\d+)', array(
            'methods' => WP_REST_Server::READABLE,
        ));
    }
}
"#,
        )
        .unwrap();
        fs::write(plugin.join("broken.php"), "<?php function (").unwrap();

        let report = extract_routes(&[plugin], &Config::default());

        assert_eq!(report.dialect, Dialect::WordPress);
        assert_eq!(report.status, Status::Complete);
        assert_eq!(report.files_parsed, 2);
        assert_eq!(report.files_skipped, 0);

        let passes: Vec<Pass> = report.routes.iter().map(|r| r.pass).collect();
        assert_eq!(passes, vec![Pass::Direct, Pass::Callback, Pass::Global]);
        assert!(report.routes.iter().all(|r| r.path == "/orders/{id}"));
    }

    #[test]
    fn test_unknown_dialect_report() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("index.php"), "<?php register_rest_route('a/v1', '/x');").unwrap();

        let report = extract_routes(&[dir.path().join("plain")], &Config::default());
        assert_eq!(report.status, Status::UnknownDialect);
        assert!(report.routes.is_empty());
    }

    #[test]
    fn test_configured_dialect_overrides_detection() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("routes.php"),
            "<?php $router->register('GET', 'v1/ping', 'ping.display');",
        )
        .unwrap();

        let mut config = Config::default();
        config.analysis.dialect = Some(Dialect::Joomla);
        let report = extract_routes(&[dir.path().to_path_buf()], &config);

        assert_eq!(report.dialect, Dialect::Joomla);
        assert_eq!(report.routes.len(), 2);
        assert_eq!(report.routes[0].handler.as_deref(), Some("ping.display"));
    }
}
