//! Blob storage for source documents.

use async_trait::async_trait;
use ragline_core::config::StorageBackend;
use ragline_core::{AppConfig, AppError, AppResult};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Named blob storage.
///
/// Names are relative, slash-separated keys such as `reports/q3.pdf`.
#[async_trait]
pub trait BlobStore: Send + Sync {
    fn backend_name(&self) -> &str;

    /// Store a local file under `name` and return its location.
    async fn upload(&self, local_path: &Path, name: &str) -> AppResult<String>;

    /// Copy blob `name` to `destination` and return the written path.
    async fn download(&self, name: &str, destination: &Path) -> AppResult<PathBuf>;

    /// Read blob `name` into memory.
    async fn read(&self, name: &str) -> AppResult<Vec<u8>>;
}

/// Blob store backed by a local directory.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a blob name to a path under the root, rejecting names that would
    /// leave it.
    fn resolve(&self, name: &str) -> AppResult<PathBuf> {
        let relative = Path::new(name);
        let valid = !name.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));

        if !valid {
            return Err(AppError::Storage(format!("Invalid blob name: '{}'", name)));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    fn backend_name(&self) -> &str {
        "local"
    }

    async fn upload(&self, local_path: &Path, name: &str) -> AppResult<String> {
        let target = self.resolve(name)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppError::Storage(format!("Failed to create {:?}: {}", parent, e))
            })?;
        }

        tokio::fs::copy(local_path, &target).await.map_err(|e| {
            AppError::Storage(format!("Upload of {:?} as '{}' failed: {}", local_path, name, e))
        })?;

        tracing::info!("Uploaded {:?} to blob '{}'", local_path, name);
        Ok(target.display().to_string())
    }

    async fn download(&self, name: &str, destination: &Path) -> AppResult<PathBuf> {
        let source = self.resolve(name)?;
        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppError::Storage(format!("Failed to create {:?}: {}", parent, e))
            })?;
        }

        tokio::fs::copy(&source, destination).await.map_err(|e| {
            AppError::Storage(format!("Download of '{}' failed: {}", name, e))
        })?;

        tracing::info!("Downloaded blob '{}' to {:?}", name, destination);
        Ok(destination.to_path_buf())
    }

    async fn read(&self, name: &str) -> AppResult<Vec<u8>> {
        let source = self.resolve(name)?;
        tokio::fs::read(&source)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to read blob '{}': {}", name, e)))
    }
}

/// Open the configured blob store.
pub fn open_blob_store(config: &AppConfig) -> AppResult<Arc<dyn BlobStore>> {
    match config.storage.backend {
        StorageBackend::Local => {
            let store = LocalBlobStore::new(config.storage_root());
            tracing::debug!("Using local blob store at {:?}", store.root());
            Ok(Arc::new(store))
        }
    }
}
