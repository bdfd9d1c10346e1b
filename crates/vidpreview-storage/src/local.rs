use crate::traits::{FileStore, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use serde_json::json;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;
use vidpreview_core::FileInfo;

const INFO_FILE: &str = "info.json";

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalFileStore {
    base_path: PathBuf,
}

impl LocalFileStore {
    /// Create a new LocalFileStore rooted at `base_path` (e.g. "/var/lib/vidpreview/files").
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalFileStore { base_path })
    }

    /// Directory for a file id.
    ///
    /// Ids are generated by this store as hex UUIDs; anything else is refused
    /// so an id taken from a request can never address a path outside the base.
    fn id_to_dir(&self, file_id: &str) -> StorageResult<PathBuf> {
        if file_id.is_empty() || !file_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(StorageError::InvalidId(file_id.to_string()));
        }
        Ok(self.base_path.join(file_id))
    }

    fn validate_internal_name(name: &str) -> StorageResult<()> {
        if name.is_empty()
            || name == INFO_FILE
            || name.contains("..")
            || name.contains('/')
            || name.contains('\\')
        {
            return Err(StorageError::UploadFailed(format!(
                "Invalid internal name: {}",
                name
            )));
        }
        Ok(())
    }

    async fn read_record(&self, file_id: &str) -> StorageResult<(FileInfo, String)> {
        let dir = self.id_to_dir(file_id)?;
        let info_path = dir.join(INFO_FILE);

        if !fs::try_exists(&info_path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(file_id.to_string()));
        }

        let raw = fs::read(&info_path).await.map_err(|e| {
            StorageError::DownloadFailed(format!(
                "Failed to read {}: {}",
                info_path.display(),
                e
            ))
        })?;
        let mut record: serde_json::Value = serde_json::from_slice(&raw)
            .map_err(|e| StorageError::CorruptMetadata(format!("{}: {}", file_id, e)))?;

        let internal_name = record["internal_name"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| {
                StorageError::CorruptMetadata(format!("{}: missing internal_name", file_id))
            })?;
        let info: FileInfo = serde_json::from_value(record["info"].take())
            .map_err(|e| StorageError::CorruptMetadata(format!("{}: {}", file_id, e)))?;

        Ok((info, internal_name))
    }

    async fn write_file(path: &Path, data: &[u8]) -> StorageResult<()> {
        let mut file = fs::File::create(path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        Ok(())
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn get_file_info(&self, file_id: &str) -> StorageResult<FileInfo> {
        let (info, _) = self.read_record(file_id).await?;
        Ok(info)
    }

    async fn get_file(&self, file_id: &str) -> StorageResult<Vec<u8>> {
        let start = std::time::Instant::now();
        let (_, internal_name) = self.read_record(file_id).await?;
        let path = self.id_to_dir(file_id)?.join(&internal_name);

        let data = fs::read(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        tracing::debug!(
            file_id = %file_id,
            path = %path.display(),
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage read successful"
        );

        Ok(data)
    }

    async fn upload_file(
        &self,
        data: Vec<u8>,
        display_name: &str,
        internal_name: &str,
        content_type: &str,
    ) -> StorageResult<FileInfo> {
        Self::validate_internal_name(internal_name)?;

        let start = std::time::Instant::now();
        let file_id = Uuid::new_v4().simple().to_string();
        let dir = self.id_to_dir(&file_id)?;
        fs::create_dir_all(&dir).await?;

        let info = FileInfo::new(&file_id, display_name, data.len() as u64, content_type);

        Self::write_file(&dir.join(internal_name), &data).await?;

        let record = json!({
            "internal_name": internal_name,
            "info": info,
        });
        let record_bytes = serde_json::to_vec_pretty(&record)
            .map_err(|e| StorageError::UploadFailed(format!("Failed to encode metadata: {}", e)))?;
        // Metadata goes last so a half-written upload is never visible.
        Self::write_file(&dir.join(INFO_FILE), &record_bytes).await?;

        tracing::info!(
            file_id = %file_id,
            name = %display_name,
            size_bytes = info.size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(info)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
