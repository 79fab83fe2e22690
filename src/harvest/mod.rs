//! Harvest module - catalog-to-disk image harvesting pipeline.
//!
//! This module provides the stages of a harvest run:
//! - **Catalog**: paginated listing via [`CatalogFetcher`]
//! - **Resolve**: entry → image URL via [`ImageResolver`]
//! - **Download**: image → file via [`DownloadWorker`]
//! - **Pipeline**: orchestration via [`pipeline::HarvestPipeline`]
//!
//! plus the helpers they share: filename sanitization, retry, the MediaWiki
//! client and report output.

pub mod api;
pub mod catalog;
pub mod download;
pub mod pipeline;
pub mod report;
pub mod resolver;
pub mod retry;
pub mod sanitize;

// Re-export commonly used types
pub use api::{build_http_client, MediaWikiClient};
pub use catalog::{CatalogError, CatalogFetcher};
pub use download::{DownloadWorker, ExistingFilePolicy, SavedImage};
pub use pipeline::{HarvestPipeline, PipelineError};
pub use report::{write_report, ReportError};
pub use resolver::ImageResolver;
pub use retry::{with_paced_retry, with_retry, IsRetryable, RetryPolicy};
pub use sanitize::{sanitize_filename, FilenameAllocator};
