//! In-memory [`WikiSource`] for tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::model::CatalogPage;
use crate::traits::{FetchError, WikiSource};

fn unavailable(what: &str) -> FetchError {
    FetchError::Status {
        url: format!("fake://{}", what),
        status: 503,
    }
}

#[derive(Default)]
pub(crate) struct FakeWiki {
    pages: Vec<Vec<String>>,
    empty_final_token: bool,
    final_token_back_to: Option<usize>,
    page_images: HashMap<String, Vec<String>>,
    image_urls: HashMap<String, String>,
    catalog_failures: AtomicUsize,
    resolve_failures: Mutex<HashMap<String, usize>>,
    catalog_calls: AtomicUsize,
    resolve_calls: AtomicUsize,
}

impl FakeWiki {
    pub fn with_pages(pages: Vec<Vec<String>>) -> Self {
        Self {
            pages,
            ..Self::default()
        }
    }

    pub fn with_catalog(names: &[String], page_size: usize) -> Self {
        Self::with_pages(names.chunks(page_size).map(<[String]>::to_vec).collect())
    }

    /// Last page carries `""` instead of omitting the token.
    pub fn with_empty_final_token(mut self) -> Self {
        self.empty_final_token = true;
        self
    }

    /// Last page points back at page `index`, forming a token cycle.
    pub fn with_final_token_back_to(mut self, index: usize) -> Self {
        self.final_token_back_to = Some(index);
        self
    }

    /// The first `count` catalog calls fail with HTTP 503.
    pub fn with_catalog_failures(self, count: usize) -> Self {
        self.catalog_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Registers the file titles listed on `entry`'s page.
    pub fn with_page_images(mut self, entry: &str, files: &[&str]) -> Self {
        self.page_images
            .insert(entry.to_string(), files.iter().map(|f| f.to_string()).collect());
        self
    }

    pub fn with_file_url(mut self, file_title: &str, url: &str) -> Self {
        self.image_urls
            .insert(file_title.to_string(), url.to_string());
        self
    }

    /// Shorthand: `entry` shows `File:<entry>.png`, served at `url`.
    pub fn with_image(self, entry: &str, url: &str) -> Self {
        let file = format!("File:{}.png", entry);
        self.with_page_images(entry, &[file.as_str()])
            .with_file_url(&file, url)
    }

    /// The first `count` image lookups for `entry` fail with HTTP 503.
    pub fn with_resolve_failures(self, entry: &str, count: usize) -> Self {
        if let Ok(mut failures) = self.resolve_failures.lock() {
            failures.insert(entry.to_string(), count);
        }
        self
    }

    pub fn catalog_calls(&self) -> usize {
        self.catalog_calls.load(Ordering::SeqCst)
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WikiSource for FakeWiki {
    async fn fetch_catalog_page(
        &self,
        continuation: Option<&str>,
        _limit: u32,
    ) -> Result<CatalogPage, FetchError> {
        self.catalog_calls.fetch_add(1, Ordering::SeqCst);
        if self
            .catalog_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(unavailable("catalog"));
        }

        let index = continuation
            .and_then(|t| t.strip_prefix("page-"))
            .and_then(|n| n.parse::<usize>().ok())
            .unwrap_or(0);
        let names = self.pages.get(index).cloned().unwrap_or_default();
        let continuation = if index + 1 < self.pages.len() {
            Some(format!("page-{}", index + 1))
        } else if let Some(back) = self.final_token_back_to {
            Some(format!("page-{}", back))
        } else if self.empty_final_token {
            Some(String::new())
        } else {
            None
        };

        Ok(CatalogPage {
            names,
            continuation,
        })
    }

    async fn fetch_page_images(&self, title: &str) -> Result<Vec<String>, FetchError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        let should_fail = match self.resolve_failures.lock() {
            Ok(mut failures) => match failures.get_mut(title) {
                Some(left) if *left > 0 => {
                    *left -= 1;
                    true
                }
                _ => false,
            },
            Err(_) => false,
        };
        if should_fail {
            return Err(unavailable(title));
        }

        Ok(self.page_images.get(title).cloned().unwrap_or_default())
    }

    async fn fetch_image_url(&self, file_title: &str) -> Result<Option<String>, FetchError> {
        Ok(self.image_urls.get(file_title).cloned())
    }
}
