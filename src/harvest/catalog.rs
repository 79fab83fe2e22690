//! Sequential, paginated catalog retrieval.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::harvest::retry::{with_retry, RetryPolicy};
use crate::model::CatalogEntry;
use crate::traits::{FetchError, WikiSource};

/// The catalog could not be retrieved. Fatal for the run.
#[derive(thiserror::Error, Debug)]
#[error("Catalog page {page} could not be fetched: {source}")]
pub struct CatalogError {
    /// 1-based index of the page that failed
    pub page: usize,
    #[source]
    pub source: FetchError,
}

pub struct CatalogFetcher<S: WikiSource> {
    source: Arc<S>,
    page_size: u32,
    delay: Duration,
    retry: RetryPolicy,
}

impl<S: WikiSource> CatalogFetcher<S> {
    pub fn new(source: Arc<S>, page_size: u32, delay: Duration, retry: RetryPolicy) -> Self {
        Self {
            source,
            page_size: page_size.max(1),
            delay,
            retry,
        }
    }

    /// Follows continuation tokens until the listing is exhausted and returns
    /// every entry once, in the order the API first listed it.
    pub async fn fetch_all(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        let mut entries = Vec::new();
        let mut seen = HashSet::new();
        let mut token: Option<String> = None;
        let mut used_tokens = HashSet::new();
        let mut page_no = 0;

        loop {
            page_no += 1;
            let current = token.as_deref();
            let page = with_retry(&self.retry, "catalog page", || async move {
                self.source.fetch_catalog_page(current, self.page_size).await
            })
            .await
            .map_err(|source| CatalogError {
                page: page_no,
                source,
            })?;

            let listed = page.names.len();
            for name in page.names {
                if seen.insert(name.clone()) {
                    entries.push(CatalogEntry { name });
                }
            }
            info!(
                page = page_no,
                listed,
                total = entries.len(),
                "Catalog page fetched"
            );

            match page.continuation.filter(|t| !t.is_empty()) {
                Some(next) if !used_tokens.insert(next.clone()) => {
                    warn!(token = %next, "Continuation token already used, stopping");
                    break;
                }
                Some(next) => {
                    token = Some(next);
                    tokio::time::sleep(self.delay).await;
                }
                None => break,
            }
        }

        Ok(entries)
    }
}
