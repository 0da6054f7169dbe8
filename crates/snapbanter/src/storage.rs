//! Local image store and the `banters.json` record file.
//!
//! Every failure-tolerant operation here backs a durability layer only: the
//! in-memory cache is the source of truth for the running process, so errors
//! are logged and degraded instead of propagated.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::cache::BanterSink;
use crate::types::{Banter, BanterError, BanterResult};

/// File name of the record store inside the data directory.
pub const DATA_FILE: &str = "banters.json";

/// Directory holding persisted captures inside the data directory.
pub const IMAGES_DIR: &str = "images";

/// Extension given to every persisted capture.
pub const IMAGE_EXTENSION: &str = "jpg";

/// Durable local storage for captured images and the banter list.
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    root: PathBuf,
}

impl LocalImageStore {
    /// Create a store rooted at `root`. Nothing is touched on disk until used.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.join(IMAGES_DIR)
    }

    pub fn data_file(&self) -> PathBuf {
        self.root.join(DATA_FILE)
    }

    /// Path a capture with the given id is persisted to.
    pub fn image_path(&self, id: &str) -> PathBuf {
        self.images_dir().join(format!("{id}.{IMAGE_EXTENSION}"))
    }

    /// Give a capture a stable local reference.
    ///
    /// Returns the existing copy when one is already present for `id`. If the
    /// copy cannot be made, the original `source_ref` is returned instead so the
    /// submission can continue with a transient reference.
    pub async fn ensure_image_persisted(&self, source_ref: &str, id: &str) -> String {
        match self.persist_image(source_ref, id).await {
            Ok(path) => path.display().to_string(),
            Err(e) => {
                tracing::warn!(
                    id,
                    source = source_ref,
                    "Failed to persist image locally, falling back to original reference: {e}"
                );
                source_ref.to_string()
            }
        }
    }

    /// Strict form of [`ensure_image_persisted`](Self::ensure_image_persisted).
    pub async fn persist_image(&self, source_ref: &str, id: &str) -> BanterResult<PathBuf> {
        validate_id(id)?;

        let target = self.image_path(id);
        if tokio::fs::try_exists(&target).await? {
            tracing::debug!(id, "Capture already persisted: {}", target.display());
            return Ok(target);
        }

        tokio::fs::create_dir_all(self.images_dir()).await?;

        let source = local_path(source_ref);
        tokio::fs::copy(&source, &target).await?;
        tracing::debug!(id, "Persisted capture {} -> {}", source.display(), target.display());
        Ok(target)
    }

    /// Load the saved banter list. A missing or unreadable store yields an empty list.
    pub async fn load_banters(&self) -> Vec<Banter> {
        match self.read_banters().await {
            Ok(banters) => banters,
            Err(e) => {
                tracing::warn!("Failed to load banters from {}: {e}", self.data_file().display());
                Vec::new()
            }
        }
    }

    /// Strict read of the record file. A missing file is an empty list, not an error.
    pub async fn read_banters(&self) -> BanterResult<Vec<Banter>> {
        let path = self.data_file();
        if !tokio::fs::try_exists(&path).await? {
            return Ok(Vec::new());
        }

        let raw = tokio::fs::read_to_string(&path).await?;
        let banters: Vec<Banter> = serde_json::from_str(&raw)
            .map_err(|e| BanterError::Storage(format!("Deserialization failed: {e}")))?;
        Ok(banters)
    }

    /// Overwrite the record file with `banters`, logging instead of failing.
    pub async fn save_banters(&self, banters: &[Banter]) {
        if let Err(e) = self.write_banters(banters).await {
            tracing::warn!("Failed to save banters to {}: {e}", self.data_file().display());
        }
    }

    /// Strict write of the record file.
    ///
    /// The payload goes to a sibling temp file first and is renamed over the
    /// store, so readers never see a partially written list.
    pub async fn write_banters(&self, banters: &[Banter]) -> BanterResult<()> {
        let path = self.data_file();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let payload = serde_json::to_vec(banters)
            .map_err(|e| BanterError::Storage(format!("Serialization failed: {e}")))?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &payload).await?;
        tokio::fs::rename(&tmp, &path).await?;

        tracing::debug!(count = banters.len(), "Saved banters: {}", path.display());
        Ok(())
    }
}

#[async_trait]
impl BanterSink for LocalImageStore {
    async fn save(&self, banters: &[Banter]) {
        self.save_banters(banters).await;
    }
}

/// Ids become file names, so anything that could escape the images directory is refused.
fn validate_id(id: &str) -> BanterResult<()> {
    let ok = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(BanterError::InvalidInput(format!("Unusable banter id: {id:?}")))
    }
}

/// Accept both plain paths and `file://` URIs as capture references.
fn local_path(source_ref: &str) -> PathBuf {
    PathBuf::from(source_ref.strip_prefix("file://").unwrap_or(source_ref))
}
