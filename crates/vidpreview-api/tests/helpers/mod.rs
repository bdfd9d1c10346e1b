//! Test helpers: build an in-memory AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p vidpreview-api`.

#![allow(dead_code)]

pub mod extractors;

use std::sync::Arc;
use std::time::Duration;

use axum_test::TestServer;
use tempfile::TempDir;
use vidpreview_api::setup::routes;
use vidpreview_api::state::AppState;
use vidpreview_core::{PreviewSettings, SharedConfigProvider};
use vidpreview_processing::{FrameExtractor, PreviewJobRunner, PreviewRegistry, PreviewStatus};
use vidpreview_storage::MemoryFileStore;
use vidpreview_worker::{PreviewJobQueue, PreviewQueueConfig};

/// Test application: server plus handles on everything behind it.
pub struct TestApp {
    pub server: TestServer,
    pub store: MemoryFileStore,
    pub registry: PreviewRegistry,
    pub config: Arc<SharedConfigProvider>,
    pub state: Arc<AppState>,
    pub temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Poll the registry until the file's latest job reaches a terminal state.
    pub async fn wait_for_preview(&self, file_id: &str) -> PreviewStatus {
        tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                if let Some(record) = self.registry.get(file_id) {
                    if record.status.is_terminal() {
                        return record.status;
                    }
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("preview job did not finish in time")
    }

    pub fn transient_files(&self) -> usize {
        std::fs::read_dir(self.temp_dir.path())
            .expect("Failed to read temp dir")
            .count()
    }
}

pub fn default_settings() -> PreviewSettings {
    PreviewSettings {
        enable_video_preview: true,
        supported_formats: "mp4,mov,avi,webm".to_string(),
        max_file_size: 1,
        preview_duration: 1,
    }
}

/// Setup a test app backed by memory storage and the given frame extractor.
pub async fn setup_test_app(extractor: Arc<dyn FrameExtractor>) -> TestApp {
    let store = MemoryFileStore::new();
    let registry = PreviewRegistry::new();
    let config = Arc::new(SharedConfigProvider::new(default_settings()));
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");

    let runner = Arc::new(PreviewJobRunner::new(
        Arc::new(store.clone()),
        extractor,
        registry.clone(),
        temp_dir.path(),
    ));
    let queue = Arc::new(PreviewJobQueue::new(
        runner,
        registry.clone(),
        PreviewQueueConfig {
            max_concurrent_jobs: 2,
            queue_size: 16,
        },
    ));

    let state = Arc::new(AppState::new(
        Arc::new(store.clone()),
        config.clone(),
        registry.clone(),
        queue,
        4 * 1024 * 1024,
    ));
    let app = routes::build_router(state.clone());
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        store,
        registry,
        config,
        state,
        temp_dir,
    }
}
