//! Uploaded-document store access
//!
//! The dashboard suite keeps uploaded schedule documents in a file store
//! addressed by storage path. The import pipeline only needs full-file
//! download; the trait keeps the store swappable (local disk in
//! deployments today, object storage behind the same seam).

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

/// Read access to the uploaded-document store
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Fetch the full contents of a stored document
    async fn fetch(&self, storage_path: &str) -> std::io::Result<Vec<u8>>;
}

/// File store rooted at a local directory
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a storage path beneath the root, rejecting traversal
    fn resolve(&self, storage_path: &str) -> std::io::Result<PathBuf> {
        let relative = Path::new(storage_path);
        if relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("storage path escapes store root: {}", storage_path),
            ));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn fetch(&self, storage_path: &str) -> std::io::Result<Vec<u8>> {
        let path = self.resolve(storage_path)?;
        tracing::debug!(path = %path.display(), "Fetching stored document");
        tokio::fs::read(&path).await
    }
}
