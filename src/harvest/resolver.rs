//! Resolves a catalog entry to its representative image URL.

use std::sync::Arc;

use crate::executor::RateLimiter;
use crate::harvest::retry::{with_paced_retry, RetryPolicy};
use crate::model::{CatalogEntry, ImageReference};
use crate::traits::{FetchError, WikiSource};

/// File extensions accepted as an entry's representative image.
pub const PREFERRED_IMAGE_EXTENSIONS: &[&str] = &["png", "gif"];

/// Picks the first file title with a preferred image extension.
pub fn select_image(file_titles: &[String]) -> Option<&str> {
    file_titles
        .iter()
        .map(String::as_str)
        .find(|title| {
            title
                .rsplit_once('.')
                .map(|(_, ext)| {
                    PREFERRED_IMAGE_EXTENSIONS
                        .iter()
                        .any(|preferred| ext.eq_ignore_ascii_case(preferred))
                })
                .unwrap_or(false)
        })
}

pub struct ImageResolver<S: WikiSource> {
    source: Arc<S>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
}

impl<S: WikiSource> ImageResolver<S> {
    pub fn new(source: Arc<S>, limiter: Arc<RateLimiter>, retry: RetryPolicy) -> Self {
        Self {
            source,
            limiter,
            retry,
        }
    }

    /// Looks up the page's file list, then the direct URL of the chosen file.
    ///
    /// A page without a suitable image yields `image_url: None`; only failed
    /// calls (after retries) are errors.
    pub async fn resolve(&self, entry: &CatalogEntry) -> Result<ImageReference, FetchError> {
        let title = entry.name.as_str();
        let files = with_paced_retry(&self.retry, &self.limiter, "page images", || async move {
            self.source.fetch_page_images(title).await
        })
        .await?;

        let image_url = match select_image(&files) {
            Some(file_title) => {
                with_paced_retry(&self.retry, &self.limiter, "image url", || async move {
                    self.source.fetch_image_url(file_title).await
                })
                .await?
            }
            None => None,
        };

        Ok(ImageReference {
            entry_name: entry.name.clone(),
            image_url,
        })
    }
}
