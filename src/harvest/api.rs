//! MediaWiki action API client.
//!
//! Implements [`WikiSource`] against `api.php`:
//! - catalog pages via `list=categorymembers`
//! - file titles on a page via `prop=images`
//! - direct file URLs via `prop=imageinfo&iiprop=url`

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::HarvestConfig;
use crate::model::CatalogPage;
use crate::traits::{FetchError, WikiSource};

/// Builds the HTTP client shared by API and download requests.
pub fn build_http_client(config: &HarvestConfig) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(config.request_timeout)
        .user_agent(config.user_agent.clone())
        .build()
}

#[derive(Debug, Deserialize)]
struct ApiResponse<Q> {
    query: Option<Q>,
    #[serde(rename = "continue")]
    continuation: Option<Continuation>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Continuation {
    cmcontinue: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: String,
    #[serde(default)]
    info: String,
}

#[derive(Debug, Deserialize)]
struct CategoryMembers {
    #[serde(default)]
    categorymembers: Vec<Titled>,
}

#[derive(Debug, Deserialize)]
struct Titled {
    title: String,
}

#[derive(Debug, Deserialize)]
struct Pages {
    #[serde(default)]
    pages: BTreeMap<String, Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    images: Vec<Titled>,
    #[serde(default)]
    imageinfo: Vec<ImageInfo>,
}

#[derive(Debug, Deserialize)]
struct ImageInfo {
    url: Option<String>,
}

pub struct MediaWikiClient {
    client: reqwest::Client,
    base_url: String,
    category: String,
}

impl MediaWikiClient {
    pub fn new(config: &HarvestConfig) -> Result<Self, FetchError> {
        Ok(Self::with_client(build_http_client(config)?, config))
    }

    pub fn with_client(client: reqwest::Client, config: &HarvestConfig) -> Self {
        Self {
            client,
            base_url: config.api_base_url.clone(),
            category: config.category.clone(),
        }
    }

    async fn query<Q: DeserializeOwned>(
        &self,
        params: &[(&str, &str)],
    ) -> Result<ApiResponse<Q>, FetchError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("action", "query"), ("format", "json")])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: response.url().to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let parsed: ApiResponse<Q> = serde_json::from_str(&body)?;
        if let Some(err) = parsed.error {
            return Err(FetchError::Api {
                code: err.code,
                info: err.info,
            });
        }
        Ok(parsed)
    }
}

#[async_trait]
impl WikiSource for MediaWikiClient {
    async fn fetch_catalog_page(
        &self,
        continuation: Option<&str>,
        limit: u32,
    ) -> Result<CatalogPage, FetchError> {
        let limit = limit.to_string();
        let mut params = vec![
            ("list", "categorymembers"),
            ("cmtitle", self.category.as_str()),
            ("cmlimit", limit.as_str()),
            ("cmtype", "page"),
        ];
        if let Some(token) = continuation {
            params.push(("cmcontinue", token));
        }

        let response: ApiResponse<CategoryMembers> = self.query(&params).await?;
        let names: Vec<String> = response
            .query
            .map(|q| q.categorymembers.into_iter().map(|m| m.title).collect())
            .unwrap_or_default();
        debug!(count = names.len(), "Fetched catalog page");

        Ok(CatalogPage {
            names,
            continuation: response.continuation.and_then(|c| c.cmcontinue),
        })
    }

    async fn fetch_page_images(&self, title: &str) -> Result<Vec<String>, FetchError> {
        let response: ApiResponse<Pages> = self
            .query(&[("prop", "images"), ("titles", title), ("imlimit", "max")])
            .await?;

        Ok(response
            .query
            .map(|q| {
                q.pages
                    .into_values()
                    .flat_map(|page| page.images)
                    .map(|image| image.title)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn fetch_image_url(&self, file_title: &str) -> Result<Option<String>, FetchError> {
        let response: ApiResponse<Pages> = self
            .query(&[("prop", "imageinfo"), ("iiprop", "url"), ("titles", file_title)])
            .await?;

        Ok(response.query.and_then(|q| {
            q.pages
                .into_values()
                .find_map(|page| page.imageinfo.into_iter().next().and_then(|info| info.url))
        }))
    }
}
