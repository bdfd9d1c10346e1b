use std::sync::Arc;

use vidpreview_core::{ConfigProvider, PreviewSettings};
use vidpreview_processing::{PostInterceptor, PreviewRegistry};
use vidpreview_storage::FileStore;
use vidpreview_worker::PreviewJobQueue;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn FileStore>,
    pub config: Arc<dyn ConfigProvider>,
    pub registry: PreviewRegistry,
    pub queue: Arc<PreviewJobQueue>,
    pub post_interceptor: PostInterceptor,
    pub upload_body_limit_bytes: usize,
}

impl AppState {
    pub fn new(
        store: Arc<dyn FileStore>,
        config: Arc<dyn ConfigProvider>,
        registry: PreviewRegistry,
        queue: Arc<PreviewJobQueue>,
        upload_body_limit_bytes: usize,
    ) -> Self {
        let post_interceptor = PostInterceptor::new(store.clone(), queue.clone());
        Self {
            store,
            config,
            registry,
            queue,
            post_interceptor,
            upload_body_limit_bytes,
        }
    }

    /// Fresh configuration snapshot for one operation.
    pub fn settings(&self) -> PreviewSettings {
        self.config.load()
    }
}
