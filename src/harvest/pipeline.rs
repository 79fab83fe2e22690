//! Harvest pipeline orchestrator.
//!
//! This module provides the [`HarvestPipeline`] coordinator that drives a run
//! end to end (Catalog → Resolve → Download → Report) with:
//! - A strictly sequential, paginated catalog fetch
//! - One independent work unit per entry on a bounded worker pool
//! - Structured logging via `tracing`
//! - A single JSON report written once all work units are done

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::config::HarvestConfig;
use crate::executor::HarvestExecutor;
use crate::harvest::api::build_http_client;
use crate::harvest::catalog::{CatalogError, CatalogFetcher};
use crate::harvest::download::DownloadWorker;
use crate::harvest::report::{log_summary, write_report};
use crate::harvest::resolver::ImageResolver;
use crate::harvest::sanitize::FilenameAllocator;
use crate::model::{CatalogEntry, DownloadResult, DownloadStatus, RunReport};
use crate::traits::WikiSource;

// ============================================================================
// Pipeline Errors
// ============================================================================

/// Errors that abort a whole run.
///
/// Per-entry failures never surface here; they become
/// [`DownloadStatus::Failed`] records in the report.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// The catalog could not be retrieved after retries
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The download HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

// ============================================================================
// Work Units
// ============================================================================

/// One catalog entry with the file stem allocated to it for this run.
#[derive(Debug, Clone)]
struct WorkUnit {
    entry: CatalogEntry,
    sanitized_filename: String,
}

/// Resolve, then download when enabled. Every outcome becomes a result; no
/// error escapes the unit.
async fn process_entry<S: WikiSource>(
    resolver: &ImageResolver<S>,
    downloader: Option<&DownloadWorker>,
    unit: WorkUnit,
) -> DownloadResult {
    let WorkUnit {
        entry,
        sanitized_filename,
    } = unit;

    let reference = match resolver.resolve(&entry).await {
        Ok(reference) => reference,
        Err(e) => return DownloadResult::failed(entry.name, sanitized_filename, None, e),
    };

    match (reference.image_url, downloader) {
        (None, _) => DownloadResult::no_image(entry.name, sanitized_filename, None),
        (Some(url), None) => DownloadResult::no_image(entry.name, sanitized_filename, Some(url)),
        (Some(url), Some(downloader)) => {
            match downloader.download(&url, &sanitized_filename).await {
                Ok(saved) => DownloadResult::success(
                    entry.name,
                    sanitized_filename,
                    url,
                    saved.path,
                    saved.already_present,
                ),
                Err(e) => DownloadResult::failed(entry.name, sanitized_filename, Some(url), e),
            }
        }
    }
}

fn log_result(result: &DownloadResult, done: usize, total: usize) {
    match result.status {
        DownloadStatus::Success if result.already_present => {
            info!(done, total, item = %result.name, "Image already present")
        }
        DownloadStatus::Success => info!(
            done,
            total,
            item = %result.name,
            path = ?result.local_path,
            "Image downloaded"
        ),
        DownloadStatus::NoImage if result.image_url.is_some() => {
            info!(done, total, item = %result.name, "Image info collected")
        }
        DownloadStatus::NoImage => debug!(done, total, item = %result.name, "No image for item"),
        DownloadStatus::Failed => warn!(
            done,
            total,
            item = %result.name,
            error = result.error.as_deref().unwrap_or_default(),
            "Failed to process item"
        ),
    }
}

// ============================================================================
// Pipeline Executor
// ============================================================================

/// End-to-end harvest run over one [`WikiSource`].
///
/// # Example
///
/// ```ignore
/// use wiki_item_harvester::{HarvestConfig, HarvestPipeline, MediaWikiClient};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = HarvestConfig::default().with_download(true);
///     let source = MediaWikiClient::new(&config)?;
///     let report = HarvestPipeline::new(config, source)?.run().await?;
///     println!("{} items, {} downloaded", report.summary.total, report.summary.succeeded);
///     Ok(())
/// }
/// ```
pub struct HarvestPipeline<S>
where
    S: WikiSource + 'static,
{
    config: HarvestConfig,
    source: Arc<S>,
    executor: HarvestExecutor,

    /// `None` when downloading is disabled
    downloader: Option<Arc<DownloadWorker>>,
}

impl<S> HarvestPipeline<S>
where
    S: WikiSource + 'static,
{
    pub fn new(config: HarvestConfig, source: S) -> Result<Self, PipelineError> {
        let executor = HarvestExecutor::new(config.max_workers, config.worker_request_interval);

        let downloader = if config.download_enabled {
            let client = build_http_client(&config)?;
            Some(Arc::new(DownloadWorker::new(
                client,
                config.save_dir.clone(),
                config.existing_files,
                executor.limiter(),
                config.retry.clone(),
            )))
        } else {
            None
        };

        Ok(Self {
            config,
            source: Arc::new(source),
            executor,
            downloader,
        })
    }

    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// Executes the run:
    /// 1. Fetch the full catalog (fatal on failure)
    /// 2. Allocate a unique file stem per entry, in catalog order
    /// 3. Resolve and download every entry on the worker pool
    /// 4. Assemble the report in catalog order, write it, log the summary
    ///
    /// # Errors
    ///
    /// Only [`PipelineError::Catalog`]; a report that cannot be written is
    /// logged and the report is still returned.
    #[instrument(skip(self), fields(download = self.config.download_enabled))]
    pub async fn run(&self) -> Result<RunReport, PipelineError> {
        let start = Instant::now();

        // ====================================================================
        // Stage 1: Catalog
        // ====================================================================

        info!("Fetching item catalog");
        let fetcher = CatalogFetcher::new(
            Arc::clone(&self.source),
            self.config.items_per_request,
            self.config.delay_between_requests,
            self.config.retry.clone(),
        );
        let entries = fetcher.fetch_all().await.map_err(|e| {
            error!(error = %e, "Catalog unavailable, aborting run");
            e
        })?;
        let total = entries.len();
        info!(
            total,
            duration_ms = start.elapsed().as_millis() as u64,
            "Catalog fetched"
        );

        // ====================================================================
        // Stage 2: Resolve + Download
        // ====================================================================

        let mut allocator = FilenameAllocator::new();
        let units: Vec<WorkUnit> = entries
            .into_iter()
            .map(|entry| WorkUnit {
                sanitized_filename: allocator.allocate(&entry.name),
                entry,
            })
            .collect();
        let placeholders: Vec<(String, String)> = units
            .iter()
            .map(|u| (u.entry.name.clone(), u.sanitized_filename.clone()))
            .collect();

        let processing_start = Instant::now();
        let resolver = Arc::new(ImageResolver::new(
            Arc::clone(&self.source),
            self.executor.limiter(),
            self.config.retry.clone(),
        ));
        let downloader = self.downloader.clone();
        let done = Arc::new(AtomicUsize::new(0));

        let outcomes = self
            .executor
            .run_ordered(units, move |unit| {
                let resolver = Arc::clone(&resolver);
                let downloader = downloader.clone();
                let done = Arc::clone(&done);
                async move {
                    let result = process_entry(&resolver, downloader.as_deref(), unit).await;
                    log_result(&result, done.fetch_add(1, Ordering::SeqCst) + 1, total);
                    result
                }
            })
            .await;

        let items: Vec<DownloadResult> = outcomes
            .into_iter()
            .zip(placeholders)
            .map(|(outcome, (name, filename))| {
                outcome.unwrap_or_else(|| {
                    DownloadResult::failed(name, filename, None, "work unit aborted")
                })
            })
            .collect();
        info!(
            duration_ms = processing_start.elapsed().as_millis() as u64,
            "All items processed"
        );

        // ====================================================================
        // Stage 3: Report
        // ====================================================================

        let report = RunReport::new(items, self.config.download_enabled);
        match write_report(&report, &self.config.metadata_path).await {
            Ok(()) => info!(path = %self.config.metadata_path.display(), "Item metadata saved"),
            Err(e) => error!(
                path = %self.config.metadata_path.display(),
                error = %e,
                "Failed to save item metadata"
            ),
        }
        log_summary(&report);
        info!(
            duration_ms = start.elapsed().as_millis() as u64,
            "Run completed"
        );

        Ok(report)
    }
}

// ============================================================================
// Tests
// ============================================================================
