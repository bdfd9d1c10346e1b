//! Domain models shared across crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Post property set when a message carries at least one eligible video.
pub const HAS_VIDEO_PROP: &str = "has_video";

/// Metadata of a stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    /// Lowercase extension without the leading dot; empty when the name has none.
    pub extension: String,
    pub created_at: DateTime<Utc>,
}

impl FileInfo {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        size: u64,
        mime_type: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let extension = file_extension(&name)
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        Self {
            id: id.into(),
            name,
            size,
            mime_type: mime_type.into(),
            extension,
            created_at: Utc::now(),
        }
    }
}

/// Extension of the last path segment of `name`, without the dot.
///
/// Returns `None` when the segment has no dot or ends with one.
pub fn file_extension(name: &str) -> Option<&str> {
    let segment = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let (_, ext) = segment.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}

/// A message being submitted to a channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagePost {
    pub id: String,
    pub channel_id: String,
    pub user_id: String,
    pub message: String,
    pub file_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub props: Option<serde_json::Map<String, serde_json::Value>>,
}

impl MessagePost {
    pub fn has_video(&self) -> bool {
        self.props
            .as_ref()
            .and_then(|p| p.get(HAS_VIDEO_PROP))
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}

/// One unit of preview work for a single video attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewRequest {
    /// Unique per submission; two requests for the same file never share it.
    pub job_id: Uuid,
    pub file: FileInfo,
    /// Seek offset captured from the configuration snapshot at post time.
    pub offset_secs: u64,
}

impl PreviewRequest {
    pub fn new(file: FileInfo, offset_secs: u64) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            file,
            offset_secs,
        }
    }
}
