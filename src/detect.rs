//
//  detect.rs
//  restscan
//
//  Coarse CMS classification from marker files and path substrings.
//

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::routes::Dialect;

/// Marker file, then path substrings, per dialect, in priority order.
const MARKERS: &[(Dialect, &str, &[&str])] = &[
    (Dialect::WordPress, "wp-settings.php", &["wp-content", "wp-includes"]),
    (Dialect::Drupal, "core/includes/bootstrap.inc", &["modules"]),
    (Dialect::Joomla, "configuration.php", &["components"]),
];

/// Classify the first directory that matches any dialect.
pub fn detect(directories: &[PathBuf]) -> Dialect {
    directories
        .iter()
        .map(|dir| detect_dir(dir))
        .find(|dialect| *dialect != Dialect::Unknown)
        .unwrap_or(Dialect::Unknown)
}

fn detect_dir(dir: &Path) -> Dialect {
    let text = dir.to_string_lossy().replace('\\', "/");
    for (dialect, marker, substrings) in MARKERS {
        if dir.join(marker).is_file() || substrings.iter().any(|s| text.contains(s)) {
            debug!(dir = %dir.display(), %dialect, "dialect detected");
            return *dialect;
        }
    }
    Dialect::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_marker_files() {
        let dir = tempfile::tempdir().unwrap();

        let wp = dir.path().join("site");
        fs::create_dir_all(&wp).unwrap();
        fs::write(wp.join("wp-settings.php"), "<?php").unwrap();
        assert_eq!(detect(&[wp]), Dialect::WordPress);

        let drupal = dir.path().join("d10");
        fs::create_dir_all(drupal.join("core/includes")).unwrap();
        fs::write(drupal.join("core/includes/bootstrap.inc"), "<?php").unwrap();
        assert_eq!(detect(&[drupal]), Dialect::Drupal);

        let joomla = dir.path().join("j5");
        fs::create_dir_all(&joomla).unwrap();
        fs::write(joomla.join("configuration.php"), "<?php").unwrap();
        assert_eq!(detect(&[joomla]), Dialect::Joomla);
    }

    #[test]
    fn test_path_substrings_and_priority() {
        assert_eq!(
            detect(&[PathBuf::from("/srv/site/wp-content/plugins/shop")]),
            Dialect::WordPress
        );
        assert_eq!(
            detect(&[PathBuf::from("/srv/drupal/modules/custom")]),
            Dialect::Drupal
        );
        assert_eq!(
            detect(&[PathBuf::from("/srv/joomla/components/com_api")]),
            Dialect::Joomla
        );
        // WordPress outranks Drupal within one directory.
        assert_eq!(
            detect(&[PathBuf::from("/srv/wp-content/modules")]),
            Dialect::WordPress
        );
        // The first matching directory decides.
        assert_eq!(
            detect(&[
                PathBuf::from("/srv/plain"),
                PathBuf::from("/srv/components"),
                PathBuf::from("/srv/wp-includes"),
            ]),
            Dialect::Joomla
        );
    }

    #[test]
    fn test_unknown() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(detect(&[dir.path().join("plain")]), Dialect::Unknown);
        assert_eq!(detect(&[]), Dialect::Unknown);
    }
}
