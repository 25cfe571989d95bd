//! Blob storage command handlers.

use clap::Args;
use ragline_core::{config::AppConfig, AppResult};
use ragline_knowledge::open_blob_store;
use std::path::PathBuf;

/// Store a local file as a named document
#[derive(Args, Debug)]
pub struct UploadCommand {
    /// Local file to upload
    pub local: PathBuf,

    /// Name to store the document under (default: the file name)
    pub name: Option<String>,
}

impl UploadCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing upload command");

        let name = match &self.name {
            Some(name) => name.clone(),
            None => self
                .local
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .ok_or_else(|| {
                    ragline_core::AppError::Storage(format!(
                        "Cannot derive a document name from {:?}",
                        self.local
                    ))
                })?,
        };

        let store = open_blob_store(config)?;
        let location = store.upload(&self.local, &name).await?;
        println!("{}", location);

        Ok(())
    }
}

/// Copy a stored document to a local path
#[derive(Args, Debug)]
pub struct DownloadCommand {
    /// Name of the stored document
    pub name: String,

    /// Destination path
    pub destination: PathBuf,
}

impl DownloadCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing download command");

        let store = open_blob_store(config)?;
        let path = store.download(&self.name, &self.destination).await?;
        println!("{}", path.display());

        Ok(())
    }
}
