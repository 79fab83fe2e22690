use crate::model::CatalogPage;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single remote call.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },
    #[error("API error '{code}': {info}")]
    Api { code: String, info: String },
    #[error("Malformed API response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Empty response body from {url}")]
    EmptyBody { url: String },
    #[error("Request timed out after {after:?}")]
    Timeout { after: Duration },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait WikiSource: Send + Sync {
    /// Fetches one page of the catalog listing, starting at `continuation`.
    async fn fetch_catalog_page(
        &self,
        continuation: Option<&str>,
        limit: u32,
    ) -> Result<CatalogPage, FetchError>;

    /// Lists the file titles used on the page named `title`.
    async fn fetch_page_images(&self, title: &str) -> Result<Vec<String>, FetchError>;

    /// Looks up the direct URL of a file. `None` when the wiki has no info for it.
    async fn fetch_image_url(&self, file_title: &str) -> Result<Option<String>, FetchError>;
}
