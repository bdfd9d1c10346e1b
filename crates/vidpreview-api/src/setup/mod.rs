//! Application wiring: storage, preview pipeline, router.

pub mod routes;
pub mod server;

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use vidpreview_core::ServerConfig;
use vidpreview_processing::{FfmpegFrameExtractor, PreviewJobRunner, PreviewRegistry};
use vidpreview_storage::create_store;
use vidpreview_worker::{PreviewJobQueue, PreviewQueueConfig};

use crate::state::AppState;

/// Build the application state and router from server configuration.
pub async fn initialize_app(config: &ServerConfig) -> anyhow::Result<(Arc<AppState>, Router)> {
    let store = create_store(config)
        .await
        .context("Failed to initialize file storage")?;

    let provider = config
        .config_provider()
        .context("Failed to initialize plugin configuration")?;

    tokio::fs::create_dir_all(&config.preview_temp_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create preview temp directory {}",
                config.preview_temp_dir.display()
            )
        })?;

    let extractor = FfmpegFrameExtractor::new(config.ffmpeg_path.clone())?;
    let registry = PreviewRegistry::with_max_records(config.registry_max_records);
    let runner = Arc::new(PreviewJobRunner::new(
        store.clone(),
        Arc::new(extractor),
        registry.clone(),
        config.preview_temp_dir.clone(),
    ));
    let queue = Arc::new(PreviewJobQueue::new(
        runner,
        registry.clone(),
        PreviewQueueConfig::from(config),
    ));

    let settings = provider.load();
    tracing::info!(
        environment = %config.environment,
        storage_backend = %config.storage_backend,
        preview_enabled = settings.enable_video_preview,
        supported_formats = %settings.supported_formats,
        max_file_size_mb = settings.max_file_size,
        preview_offset_secs = settings.preview_duration,
        ffmpeg_path = %config.ffmpeg_path,
        registry_max_records = config.registry_max_records,
        "Preview pipeline initialized"
    );

    let state = Arc::new(AppState::new(
        store,
        provider,
        registry,
        queue,
        config.upload_body_limit_bytes,
    ));
    let router = routes::build_router(state.clone());

    Ok((state, router))
}
