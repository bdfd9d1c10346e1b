use std::sync::Arc;

use serde_json::Value;
use vidpreview_core::{MessagePost, PreviewRequest, PreviewSettings, HAS_VIDEO_PROP};
use vidpreview_storage::FileStore;

use crate::scheduler::PreviewScheduler;
use crate::validator::VideoValidator;

/// Flags posts that carry videos and hands each video to the preview scheduler.
#[derive(Clone)]
pub struct PostInterceptor {
    store: Arc<dyn FileStore>,
    scheduler: Arc<dyn PreviewScheduler>,
}

impl PostInterceptor {
    pub fn new(store: Arc<dyn FileStore>, scheduler: Arc<dyn PreviewScheduler>) -> Self {
        Self { store, scheduler }
    }

    /// Annotate a post before it is persisted.
    ///
    /// Never rejects the post and never waits for preview jobs.
    #[tracing::instrument(
        skip(self, settings, post),
        fields(post_id = %post.id, attachments = post.file_ids.len())
    )]
    pub async fn message_will_be_posted(
        &self,
        settings: &PreviewSettings,
        mut post: MessagePost,
    ) -> MessagePost {
        if post.file_ids.is_empty() || !settings.enable_video_preview {
            return post;
        }

        let validator = VideoValidator::from_settings(settings);
        let mut has_video = false;

        for file_id in &post.file_ids {
            let info = match self.store.get_file_info(file_id).await {
                Ok(info) => info,
                Err(e) => {
                    tracing::warn!(
                        file_id = %file_id,
                        error = %e,
                        "Failed to look up attachment, skipping"
                    );
                    continue;
                }
            };

            if !validator.is_eligible(&info.name) {
                continue;
            }

            has_video = true;

            let request = PreviewRequest::new(info, settings.preview_duration);
            let job_id = request.job_id;
            match self.scheduler.schedule(request) {
                Ok(()) => tracing::info!(
                    file_id = %file_id,
                    job_id = %job_id,
                    "Preview job scheduled"
                ),
                Err(e) => tracing::error!(
                    file_id = %file_id,
                    job_id = %job_id,
                    error = %e,
                    "Failed to schedule preview job"
                ),
            }
        }

        if has_video {
            post.props
                .get_or_insert_with(Default::default)
                .insert(HAS_VIDEO_PROP.to_string(), Value::Bool(true));
        }

        post
    }
}
