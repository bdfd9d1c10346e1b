//! Host hook endpoints.
//!
//! The host calls these while a file is being uploaded and before a message
//! is persisted.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use vidpreview_core::{AppError, FileInfo, MessagePost};
use vidpreview_processing::{intercept_upload, UploadDecision};

use crate::error::HttpAppError;
use crate::state::AppState;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    #[serde(default)]
    pub name: Option<String>,
}

/// Internal name for an uploaded file. The display name is kept in metadata only.
fn internal_name(info: &FileInfo) -> String {
    if info.extension.is_empty() {
        "original".to_string()
    } else {
        format!("original.{}", info.extension)
    }
}

#[tracing::instrument(skip(state, query, headers, body), fields(size_bytes = body.len()))]
pub async fn upload_hook(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, HttpAppError> {
    let name = match query.name {
        Some(name) if !name.trim().is_empty() => name,
        _ => return Err(AppError::BadRequest("name parameter is required".to_string()).into()),
    };

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(DEFAULT_CONTENT_TYPE);

    let info = FileInfo::new("", name, body.len() as u64, content_type);
    let settings = state.settings();

    let mut copied = Vec::new();
    let (info, data) = match intercept_upload(&settings, info, &mut body.as_ref(), &mut copied) {
        UploadDecision::PassThrough(info) => (info, body.to_vec()),
        UploadDecision::Accepted(info) => (info, copied),
        UploadDecision::Rejected { reason, .. } => {
            return Err(AppError::UploadRejected(reason).into());
        }
    };

    let stored = state
        .store
        .upload_file(data, &info.name, &internal_name(&info), &info.mime_type)
        .await?;

    tracing::info!(
        file_id = %stored.id,
        name = %stored.name,
        mime_type = %stored.mime_type,
        "Upload stored"
    );

    Ok(Json(stored))
}

#[tracing::instrument(skip(state, post), fields(post_id = %post.id))]
pub async fn message_hook(
    State(state): State<Arc<AppState>>,
    Json(post): Json<MessagePost>,
) -> Result<impl IntoResponse, HttpAppError> {
    let settings = state.settings();
    let post = state
        .post_interceptor
        .message_will_be_posted(&settings, post)
        .await;
    Ok(Json(post))
}
