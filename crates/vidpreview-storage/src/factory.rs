#[cfg(feature = "storage-local")]
use crate::LocalFileStore;
use crate::{FileStore, MemoryFileStore, StorageBackend, StorageResult};
#[cfg(not(feature = "storage-local"))]
use crate::StorageError;
use std::sync::Arc;
use vidpreview_core::ServerConfig;

/// Create a storage backend based on configuration
pub async fn create_store(config: &ServerConfig) -> StorageResult<Arc<dyn FileStore>> {
    match config.storage_backend {
        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let store = LocalFileStore::new(config.local_storage_path.clone()).await?;
            tracing::info!(
                path = %config.local_storage_path.display(),
                "Using local file storage"
            );
            Ok(Arc::new(store))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),

        StorageBackend::Memory => {
            tracing::warn!("Using in-memory file storage; files are lost on restart");
            Ok(Arc::new(MemoryFileStore::new()))
        }
    }
}
