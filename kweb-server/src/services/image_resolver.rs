//! Topic image resolution
//!
//! **Resolution order:**
//! 1. `<images_dir>/<safe topic>.jpg` exists → return it (never re-validated)
//! 2. Search for the topic; on a non-success status or no hits, search once
//!    more with the topic's first word
//! 3. Download the first hit, persist it, return its path
//!
//! Downloads are written to a hidden partial file in the image directory and
//! renamed into place, so the cache path only ever holds a complete image.
//!
//! Every failure is logged and reported as `None`.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Image search and download errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageSearchError {
    #[error("Image search API key not configured")]
    NotConfigured,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Image request timed out")]
    Timeout,

    #[error("Image service returned status {0}")]
    Status(u16),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No images found for: {0}")]
    NoResults(String),

    #[error("IO error: {0}")]
    Io(String),
}

/// One search result
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImageHit {
    #[serde(rename = "largeImageURL")]
    pub large_image_url: String,
}

/// External image-search service
#[async_trait]
pub trait ImageSearch: Send + Sync {
    /// Search hits for `query`, best first
    async fn search(&self, query: &str) -> Result<Vec<ImageHit>, ImageSearchError>;

    /// Raw bytes of the image at `url`
    async fn download(&self, url: &str) -> Result<Vec<u8>, ImageSearchError>;
}

/// Resolves topics to cached image files
pub struct ImageResolver {
    images_dir: PathBuf,
    search: Arc<dyn ImageSearch>,
}

impl ImageResolver {
    pub fn new(images_dir: impl Into<PathBuf>, search: Arc<dyn ImageSearch>) -> Self {
        Self {
            images_dir: images_dir.into(),
            search,
        }
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    /// Cache path for `topic`
    pub fn image_path(&self, topic: &str) -> PathBuf {
        self.images_dir.join(format!("{}.jpg", safe_file_stem(topic)))
    }

    /// Path of a usable image for `topic`, fetching it if necessary
    pub async fn resolve(&self, topic: &str) -> Option<PathBuf> {
        let path = self.image_path(topic);

        let cached = tokio::fs::metadata(&path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false);
        if cached {
            tracing::debug!(topic = %topic, path = %path.display(), "Using cached image");
            return Some(path);
        }

        match self.fetch(topic, &path).await {
            Ok(()) => {
                tracing::info!(topic = %topic, path = %path.display(), "Saved image");
                Some(path)
            }
            Err(e) => {
                tracing::warn!(topic = %topic, error = %e, "Image resolution failed");
                None
            }
        }
    }

    async fn fetch(&self, topic: &str, path: &Path) -> Result<(), ImageSearchError> {
        let hits = self.search_with_fallback(topic).await?;
        let hit = hits
            .first()
            .ok_or_else(|| ImageSearchError::NoResults(topic.to_string()))?;

        tracing::debug!(topic = %topic, url = %hit.large_image_url, "Downloading image");
        let bytes = self.search.download(&hit.large_image_url).await?;

        tokio::fs::create_dir_all(&self.images_dir)
            .await
            .map_err(|e| ImageSearchError::Io(e.to_string()))?;

        let partial = partial_path(path);
        if let Err(e) = write_then_rename(&partial, path, &bytes).await {
            if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
                tracing::debug!(path = %partial.display(), error = %cleanup, "Partial image not removed");
            }
            return Err(ImageSearchError::Io(e.to_string()));
        }

        Ok(())
    }

    async fn search_with_fallback(&self, topic: &str) -> Result<Vec<ImageHit>, ImageSearchError> {
        let reason = match self.search.search(topic).await {
            Ok(hits) if !hits.is_empty() => return Ok(hits),
            Ok(_) => ImageSearchError::NoResults(topic.to_string()),
            Err(e @ ImageSearchError::Status(_)) => e,
            Err(e) => return Err(e),
        };

        match broadened_query(topic) {
            Some(general) => {
                tracing::debug!(topic = %topic, query = %general, reason = %reason, "Trying broader image search");
                self.search.search(general).await
            }
            None => Err(reason),
        }
    }
}

/// Sequence number keeping concurrent partial files apart
static PARTIAL_SEQ: AtomicU64 = AtomicU64::new(0);

/// Hidden sibling of `path` for an in-progress download
///
/// The leading dot keeps it out of the `safe_file_stem` namespace.
fn partial_path(path: &Path) -> PathBuf {
    let seq = PARTIAL_SEQ.fetch_add(1, Ordering::Relaxed);
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}-{}.part", name, std::process::id(), seq))
}

async fn write_then_rename(partial: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    tokio::fs::write(partial, bytes).await?;
    tokio::fs::rename(partial, path).await
}

/// First word of `topic`, when it differs from the full topic
pub fn broadened_query(topic: &str) -> Option<&str> {
    let first = topic.split_whitespace().next()?;
    if first == topic {
        None
    } else {
        Some(first)
    }
}

/// File-name-safe rendering of a topic
///
/// Path separators, characters invalid in file names and control characters
/// become `_`. Leading dots are replaced so a topic cannot name a hidden or
/// parent-directory entry.
pub fn safe_file_stem(topic: &str) -> String {
    let mut stem: String = topic
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if stem.starts_with('.') {
        stem = stem.replacen('.', "_", 1);
    }

    if stem.is_empty() {
        "_".to_string()
    } else {
        stem
    }
}
