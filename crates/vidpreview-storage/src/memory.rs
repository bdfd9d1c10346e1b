//! In-memory storage backend.
//!
//! Used for development servers (`STORAGE_BACKEND=memory`) and as the store
//! behind unit and integration tests.

use crate::traits::{FileStore, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;
use vidpreview_core::FileInfo;

#[derive(Clone)]
struct StoredFile {
    info: FileInfo,
    internal_name: String,
    data: Vec<u8>,
}

/// Storage that keeps every file in a process-local map
#[derive(Clone, Default)]
pub struct MemoryFileStore {
    files: Arc<Mutex<HashMap<String, StoredFile>>>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn files(&self) -> MutexGuard<'_, HashMap<String, StoredFile>> {
        match self.files.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Insert a file as if the host had uploaded it, returning its metadata.
    pub fn insert(&self, name: &str, data: Vec<u8>, mime_type: &str) -> FileInfo {
        let id = Uuid::new_v4().simple().to_string();
        let info = FileInfo::new(&id, name, data.len() as u64, mime_type);
        self.files().insert(
            id,
            StoredFile {
                info: info.clone(),
                internal_name: name.to_string(),
                data,
            },
        );
        info
    }

    /// Number of stored files.
    pub fn len(&self) -> usize {
        self.files().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files().is_empty()
    }

    /// Internal name a file was stored under, if it exists.
    pub fn internal_name(&self, file_id: &str) -> Option<String> {
        self.files().get(file_id).map(|f| f.internal_name.clone())
    }

    /// Metadata of every stored file matching `predicate`.
    pub fn find(&self, predicate: impl Fn(&FileInfo) -> bool) -> Vec<FileInfo> {
        self.files()
            .values()
            .filter(|f| predicate(&f.info))
            .map(|f| f.info.clone())
            .collect()
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn get_file_info(&self, file_id: &str) -> StorageResult<FileInfo> {
        self.files()
            .get(file_id)
            .map(|f| f.info.clone())
            .ok_or_else(|| StorageError::NotFound(file_id.to_string()))
    }

    async fn get_file(&self, file_id: &str) -> StorageResult<Vec<u8>> {
        self.files()
            .get(file_id)
            .map(|f| f.data.clone())
            .ok_or_else(|| StorageError::NotFound(file_id.to_string()))
    }

    async fn upload_file(
        &self,
        data: Vec<u8>,
        display_name: &str,
        internal_name: &str,
        content_type: &str,
    ) -> StorageResult<FileInfo> {
        let id = Uuid::new_v4().simple().to_string();
        let info = FileInfo::new(&id, display_name, data.len() as u64, content_type);
        self.files().insert(
            id,
            StoredFile {
                info: info.clone(),
                internal_name: internal_name.to_string(),
                data,
            },
        );
        Ok(info)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}
