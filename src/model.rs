use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
}

/// One page of the remote category listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogPage {
    pub names: Vec<String>,
    pub continuation: Option<String>, // absent or empty on the last page
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageReference {
    pub entry_name: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DownloadStatus {
    Success,
    NoImage,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResult {
    pub name: String,
    pub sanitized_filename: String,
    pub image_url: Option<String>,
    pub local_path: Option<PathBuf>,
    pub status: DownloadStatus,
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub already_present: bool,
}

impl DownloadResult {
    pub fn success(
        name: String,
        sanitized_filename: String,
        image_url: String,
        local_path: PathBuf,
        already_present: bool,
    ) -> Self {
        Self {
            name,
            sanitized_filename,
            image_url: Some(image_url),
            local_path: Some(local_path),
            status: DownloadStatus::Success,
            error: None,
            already_present,
        }
    }

    /// No file was stored. `image_url` is still recorded when resolution found
    /// one but downloading is disabled.
    pub fn no_image(name: String, sanitized_filename: String, image_url: Option<String>) -> Self {
        Self {
            name,
            sanitized_filename,
            image_url,
            local_path: None,
            status: DownloadStatus::NoImage,
            error: None,
            already_present: false,
        }
    }

    pub fn failed(
        name: String,
        sanitized_filename: String,
        image_url: Option<String>,
        error: impl ToString,
    ) -> Self {
        Self {
            name,
            sanitized_filename,
            image_url,
            local_path: None,
            status: DownloadStatus::Failed,
            error: Some(error.to_string()),
            already_present: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub no_image: usize,
    pub failed: usize,
    /// Entries whose image URL was resolved, downloaded or not.
    pub resolved: usize,
}

impl RunSummary {
    pub fn from_results(results: &[DownloadResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };
        for result in results {
            match result.status {
                DownloadStatus::Success => summary.succeeded += 1,
                DownloadStatus::NoImage => summary.no_image += 1,
                DownloadStatus::Failed => summary.failed += 1,
            }
            if result.image_url.is_some() {
                summary.resolved += 1;
            }
        }
        summary
    }
}

/// Final artifact of a run, written once as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub harvester_version: String,
    /// Unix timestamp (seconds) when the report was assembled
    pub harvest_timestamp: i64,
    pub download_enabled: bool,
    pub summary: RunSummary,
    pub items: Vec<DownloadResult>,
}

impl RunReport {
    pub fn new(items: Vec<DownloadResult>, download_enabled: bool) -> Self {
        Self {
            harvester_version: env!("CARGO_PKG_VERSION").to_string(),
            harvest_timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or_default(),
            download_enabled,
            summary: RunSummary::from_results(&items),
            items,
        }
    }
}
