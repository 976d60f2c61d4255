//! Download destinations.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::info;

use sonicshift_core::Blob;

use crate::errors::ExportError;

/// Where an exported file ends up.
#[async_trait]
pub trait DownloadSink: Send + Sync {
    /// Deliver `blob` under `file_name`.
    async fn deliver(&self, file_name: &str, blob: &Blob) -> Result<(), ExportError>;
}

/// Writes downloads into a directory.
#[derive(Clone, Debug)]
pub struct FsDownloadSink {
    dir: PathBuf,
}

impl FsDownloadSink {
    /// Deliver into `dir` (created on first delivery if missing).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The target directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a download named `file_name` is written to.
    ///
    /// Only the final path component of `file_name` is used.
    pub fn path_for(&self, file_name: &str) -> PathBuf {
        let leaf = Path::new(file_name)
            .file_name()
            .map_or_else(|| PathBuf::from("download"), PathBuf::from);
        self.dir.join(leaf)
    }
}

#[async_trait]
impl DownloadSink for FsDownloadSink {
    async fn deliver(&self, file_name: &str, blob: &Blob) -> Result<(), ExportError> {
        let path = self.path_for(file_name);
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ExportError::Delivery(format!("{}: {e}", self.dir.display())))?;
        tokio::fs::write(&path, blob.data())
            .await
            .map_err(|e| ExportError::Delivery(format!("{}: {e}", path.display())))?;
        info!(path = %path.display(), bytes = blob.len(), "download written");
        Ok(())
    }
}

/// A delivered download, as recorded by [`MemoryDownloadSink`].
#[derive(Clone, Debug)]
pub struct Download {
    /// Name the download was offered under.
    pub file_name: String,
    /// Delivered payload.
    pub blob: Blob,
}

/// Keeps downloads in memory.
#[derive(Debug, Default)]
pub struct MemoryDownloadSink {
    downloads: Mutex<Vec<Download>>,
}

impl MemoryDownloadSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything delivered so far, in order.
    pub fn downloads(&self) -> Vec<Download> {
        self.downloads.lock().clone()
    }
}

#[async_trait]
impl DownloadSink for MemoryDownloadSink {
    async fn deliver(&self, file_name: &str, blob: &Blob) -> Result<(), ExportError> {
        self.downloads.lock().push(Download {
            file_name: file_name.to_string(),
            blob: blob.clone(),
        });
        Ok(())
    }
}
