// src/cli/export.rs — Controller report export
//
// Writes the final report to JSON (default) or YAML.

use std::path::Path;

use crate::core::types::ControllerReport;
use crate::infra::errors::FlowingError;

/// Render a report in the given format.
pub fn render_report(report: &ControllerReport, format: &str) -> Result<String, FlowingError> {
    match format {
        "json" => Ok(serde_json::to_string_pretty(report)?),
        "yaml" | "yml" => {
            serde_yml::to_string(report).map_err(|e| FlowingError::Report(e.to_string()))
        }
        other => Err(FlowingError::Report(format!(
            "Unsupported format '{}'. Options: json, yaml",
            other
        ))),
    }
}

/// Write a report to `path`. Any serialization or IO failure is returned.
pub fn write_report(
    report: &ControllerReport,
    path: &Path,
    format: &str,
) -> Result<(), FlowingError> {
    let output = render_report(report, format)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, output)?;
    tracing::info!("Report written to {}", path.display());
    Ok(())
}
