//! Run configuration, passed explicitly into the pipeline.

use std::path::PathBuf;
use std::time::Duration;

use crate::harvest::download::ExistingFilePolicy;
use crate::harvest::retry::RetryPolicy;

pub const DEFAULT_API_BASE_URL: &str = "https://minecraft.fandom.com/api.php";
pub const DEFAULT_CATEGORY: &str = "Category:Items";
pub const DEFAULT_SAVE_DIR: &str = "scripts/minecraft_items";
pub const DEFAULT_METADATA_FILE: &str = "minecraft_items.json";
pub const DEFAULT_LOG_FILE: &str = "minecraft_items_download.log";

#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// MediaWiki `api.php` endpoint
    pub api_base_url: String,

    /// Category whose member pages form the catalog
    pub category: String,

    /// Directory receiving downloaded images
    pub save_dir: PathBuf,

    /// Location of the JSON run report
    pub metadata_path: PathBuf,

    /// Run log file (appended to)
    pub log_file: PathBuf,

    /// Catalog page size
    pub items_per_request: u32,

    /// Size of the worker pool
    pub max_workers: usize,

    /// Pause between consecutive catalog page requests
    pub delay_between_requests: Duration,

    /// Minimum spacing between request starts across all workers (zero disables)
    pub worker_request_interval: Duration,

    /// Per-request timeout
    pub request_timeout: Duration,

    pub retry: RetryPolicy,

    /// What to do when an image file from an earlier run is already present
    pub existing_files: ExistingFilePolicy,

    /// `false` collects metadata only
    pub download_enabled: bool,

    pub user_agent: String,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        let save_dir = PathBuf::from(DEFAULT_SAVE_DIR);
        let request_timeout = Duration::from_secs(10);
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            category: DEFAULT_CATEGORY.to_string(),
            metadata_path: default_metadata_path(&save_dir),
            save_dir,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            items_per_request: 50,
            max_workers: 10,
            delay_between_requests: Duration::from_secs(1),
            worker_request_interval: Duration::from_millis(100),
            request_timeout,
            retry: RetryPolicy::default().with_timeout(request_timeout),
            existing_files: ExistingFilePolicy::Skip,
            download_enabled: false,
            user_agent: format!("wiki-item-harvester/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// The report sits next to the image directory: `<parent>/minecraft_items.json`.
fn default_metadata_path(save_dir: &std::path::Path) -> PathBuf {
    save_dir
        .parent()
        .map(|parent| parent.join(DEFAULT_METADATA_FILE))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_METADATA_FILE))
}

impl HarvestConfig {
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Sets the image directory and moves the report next to it.
    pub fn with_save_dir(mut self, save_dir: impl Into<PathBuf>) -> Self {
        self.save_dir = save_dir.into();
        self.metadata_path = default_metadata_path(&self.save_dir);
        self
    }

    pub fn with_metadata_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.metadata_path = path.into();
        self
    }

    pub fn with_items_per_request(mut self, items: u32) -> Self {
        self.items_per_request = items.max(1);
        self
    }

    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers.max(1);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay_between_requests = delay;
        self
    }

    pub fn with_worker_request_interval(mut self, interval: Duration) -> Self {
        self.worker_request_interval = interval;
        self
    }

    /// Sets the per-request timeout for both the HTTP client and each retry attempt.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self.retry.attempt_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_existing_files(mut self, policy: ExistingFilePolicy) -> Self {
        self.existing_files = policy;
        self
    }

    pub fn with_download(mut self, enabled: bool) -> Self {
        self.download_enabled = enabled;
        self
    }
}
