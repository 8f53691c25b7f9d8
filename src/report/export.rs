//! JSON export of the pipeline report

use std::path::Path;

use anyhow::{Context, Result};

use super::summary::PipelineReport;

/// Export the full pipeline report to a JSON file
pub fn export_report(report: &PipelineReport, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .context("Failed to serialize pipeline report to JSON")?;

    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write pipeline report to {}", output_path.display()))?;

    Ok(())
}
