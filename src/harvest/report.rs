//! Run report persistence and the final summary log.

use std::path::Path;
use tracing::info;

use crate::model::RunReport;

#[derive(thiserror::Error, Debug)]
pub enum ReportError {
    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Writes the report as pretty-printed JSON, creating the parent directory.
pub async fn write_report(report: &RunReport, path: &Path) -> Result<(), ReportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_vec_pretty(report)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}

pub fn log_summary(report: &RunReport) {
    let summary = &report.summary;
    info!(
        total = summary.total,
        succeeded = summary.succeeded,
        no_image = summary.no_image,
        failed = summary.failed,
        resolved = summary.resolved,
        download_enabled = report.download_enabled,
        "Run summary"
    );
    info!("Total items: {}", summary.total);
    if report.download_enabled {
        info!("Downloaded: {}", summary.succeeded);
    } else {
        info!("Image URLs resolved: {}", summary.resolved);
    }
    info!("Without image: {}", summary.no_image);
    info!("Failed: {}", summary.failed);
}
