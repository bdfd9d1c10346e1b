//! Storage abstraction trait
//!
//! This module defines the `FileStore` trait that all storage backends implement.

use async_trait::async_trait;
use thiserror::Error;
use vidpreview_core::{FileInfo, StorageBackend};

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid file id: {0}")]
    InvalidId(String),

    #[error("Corrupt file metadata: {0}")]
    CorruptMetadata(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// File storage used by the interceptors and the preview job.
///
/// Implementations must be safe for concurrent access by independent ids;
/// callers add no locking of their own.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Metadata of a stored file.
    async fn get_file_info(&self, file_id: &str) -> StorageResult<FileInfo>;

    /// Raw bytes of a stored file.
    async fn get_file(&self, file_id: &str) -> StorageResult<Vec<u8>>;

    /// Store `data` as a new file and return its metadata.
    ///
    /// `display_name` is what users see; `internal_name` is how the backend
    /// names the blob. A fresh id is generated on every call.
    async fn upload_file(
        &self,
        data: Vec<u8>,
        display_name: &str,
        internal_name: &str,
        content_type: &str,
    ) -> StorageResult<FileInfo>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
