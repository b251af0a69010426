//! JSON report rendering and writing.

use std::fs;
use std::path::Path;

use crate::error::{Result, ScanError};
use crate::extract::ExtractionReport;

/// Pretty-printed JSON. `serde_json` never escapes `/`, so paths read as
/// written.
pub fn render_report(report: &ExtractionReport) -> Result<String> {
    let mut json = serde_json::to_string_pretty(report)?;
    json.push('\n');
    Ok(json)
}

/// Write the report to `path`, creating parent directories as needed.
///
/// Written to a sibling temp file first and renamed into place, so readers
/// never see a half-written report.
pub fn write_report(path: &Path, report: &ExtractionReport) -> Result<()> {
    let unwritable = |source| ScanError::OutputUnwritable {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(unwritable)?;
    }

    let json = render_report(report)?;
    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    fs::write(&temp, json).map_err(unwritable)?;
    fs::rename(&temp, path).map_err(unwritable)?;
    Ok(())
}
