//! Metadata query endpoints for video files.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use vidpreview_core::AppError;
use vidpreview_processing::{is_eligible, PreviewStatus};

use crate::error::HttpAppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FileQuery {
    #[serde(default)]
    pub file_id: Option<String>,
}

impl FileQuery {
    fn required_file_id(self) -> Result<String, HttpAppError> {
        match self.file_id {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err(AppError::BadRequest("file_id parameter is required".to_string()).into()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VideoInfoResponse {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    pub extension: String,
}

#[derive(Debug, Serialize)]
pub struct PreviewStatusResponse {
    pub file_id: String,
    pub status: PreviewStatus,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_file_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[tracing::instrument(skip(state, query), fields(operation = "video_info"))]
pub async fn video_info(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FileQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let file_id = query.required_file_id()?;

    let info = state.store.get_file_info(&file_id).await.map_err(|e| {
        tracing::debug!(file_id = %file_id, error = %e, "Video info lookup failed");
        HttpAppError::from(e)
    })?;

    if !is_eligible(&info.name, &state.settings()) {
        return Err(AppError::BadRequest("Not a supported video format".to_string()).into());
    }

    Ok(Json(VideoInfoResponse {
        id: info.id,
        name: info.name,
        mime_type: info.mime_type,
        size: info.size,
        extension: info.extension,
    }))
}

#[tracing::instrument(skip(state, query), fields(operation = "video_preview"))]
pub async fn video_preview(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FileQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let file_id = query.required_file_id()?;

    let record = state.registry.get(&file_id).ok_or_else(|| {
        HttpAppError::from(AppError::NotFound(
            "No preview has been requested for this file".to_string(),
        ))
    })?;

    Ok(Json(PreviewStatusResponse {
        file_id,
        status: record.status,
        message: record.status.message(),
        preview_file_id: record.preview_file_id,
        error: record.error,
    }))
}
