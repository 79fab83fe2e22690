//! Image download to `SAVE_DIR/<stem>.<ext>`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::executor::RateLimiter;
use crate::harvest::retry::{with_paced_retry, RetryPolicy};
use crate::traits::FetchError;

/// Extension used when neither the URL nor the content type names one.
pub const FALLBACK_EXTENSION: &str = "bin";

/// Handling of a target file that already exists, e.g. from an earlier run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExistingFilePolicy {
    /// Keep the existing file and report it as already present
    #[default]
    Skip,
    /// Replace the existing file
    Overwrite,
}

/// A file written (or kept) by [`DownloadWorker::download`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedImage {
    pub path: PathBuf,
    pub bytes: u64,
    /// The file existed and [`ExistingFilePolicy::Skip`] kept it
    pub already_present: bool,
}

/// Extension from the last URL path segment, if it has a plausible one.
pub fn extension_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.last()?;
    let decoded = urlencoding::decode(segment).ok()?;
    let ext = Path::new(decoded.as_ref()).extension()?.to_str()?;
    if ext.is_empty() || ext.len() > 5 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Extension for an image `Content-Type` header value.
pub fn extension_from_content_type(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next()?.trim().to_ascii_lowercase();
    match essence.as_str() {
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/webp" => Some("webp"),
        "image/svg+xml" => Some("svg"),
        "image/bmp" => Some("bmp"),
        "image/x-icon" | "image/vnd.microsoft.icon" => Some("ico"),
        _ => None,
    }
}

struct FetchedBody {
    bytes: Vec<u8>,
    content_type: Option<String>,
}

pub struct DownloadWorker {
    client: reqwest::Client,
    save_dir: PathBuf,
    existing: ExistingFilePolicy,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    dir_ready: OnceCell<()>,
}

impl DownloadWorker {
    pub fn new(
        client: reqwest::Client,
        save_dir: PathBuf,
        existing: ExistingFilePolicy,
        limiter: Arc<RateLimiter>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            save_dir,
            existing,
            limiter,
            retry,
            dir_ready: OnceCell::new(),
        }
    }

    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    /// Creates the save directory once; concurrent first callers all wait on
    /// the same creation and an existing directory is not an error.
    async fn ensure_save_dir(&self) -> Result<(), FetchError> {
        let save_dir = &self.save_dir;
        self.dir_ready
            .get_or_try_init(|| async move {
                tokio::fs::create_dir_all(save_dir).await?;
                Ok::<(), FetchError>(())
            })
            .await?;
        Ok(())
    }

    fn target_path(&self, stem: &str, extension: &str) -> PathBuf {
        self.save_dir.join(format!("{}.{}", stem, extension))
    }

    /// Downloads `url` into `SAVE_DIR/<stem>.<ext>`.
    ///
    /// Fails on a non-success status or an empty body, in which case no file
    /// is left behind.
    pub async fn download(&self, url: &str, stem: &str) -> Result<SavedImage, FetchError> {
        self.ensure_save_dir().await?;

        let url_extension = extension_from_url(url);
        if self.existing == ExistingFilePolicy::Skip {
            if let Some(ext) = &url_extension {
                let path = self.target_path(stem, ext);
                if let Some(saved) = existing_file(&path).await {
                    debug!(path = %path.display(), "Image already present, skipping download");
                    return Ok(saved);
                }
            }
        }

        let body = with_paced_retry(&self.retry, &self.limiter, "image download", || async move {
            self.fetch(url).await
        })
        .await?;

        let extension = url_extension
            .or_else(|| {
                body.content_type
                    .as_deref()
                    .and_then(extension_from_content_type)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| FALLBACK_EXTENSION.to_string());
        let path = self.target_path(stem, &extension);

        self.write(path, &body.bytes).await
    }

    async fn fetch(&self, url: &str) -> Result<FetchedBody, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(FetchError::EmptyBody {
                url: url.to_string(),
            });
        }

        Ok(FetchedBody {
            bytes: bytes.to_vec(),
            content_type,
        })
    }

    async fn write(&self, path: PathBuf, bytes: &[u8]) -> Result<SavedImage, FetchError> {
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true);
        match self.existing {
            ExistingFilePolicy::Skip => options.create_new(true),
            ExistingFilePolicy::Overwrite => options.create(true).truncate(true),
        };

        let mut file = match options.open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(path = %path.display(), "Image already present, keeping it");
                return existing_file(&path).await.ok_or(FetchError::Io(e));
            }
            Err(e) => return Err(e.into()),
        };

        let written = async {
            file.write_all(bytes).await?;
            file.flush().await
        }
        .await;
        if let Err(e) = written {
            drop(file);
            if let Err(cleanup) = tokio::fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %cleanup, "Failed to remove partial file");
            }
            return Err(e.into());
        }

        Ok(SavedImage {
            path,
            bytes: bytes.len() as u64,
            already_present: false,
        })
    }
}

async fn existing_file(path: &Path) -> Option<SavedImage> {
    let metadata = tokio::fs::metadata(path).await.ok()?;
    metadata.is_file().then(|| SavedImage {
        path: path.to_path_buf(),
        bytes: metadata.len(),
        already_present: true,
    })
}
