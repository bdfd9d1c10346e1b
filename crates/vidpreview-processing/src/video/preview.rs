use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tempfile::{Builder, NamedTempFile};
use vidpreview_core::{FileInfo, PreviewRequest};
use vidpreview_storage::{FileStore, StorageError};

use super::transformer::{FrameExtractor, TranscodeError};
use crate::registry::PreviewRegistry;

const PREVIEW_CONTENT_TYPE: &str = "image/jpeg";
const MAX_NAME_LEN: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum PreviewJobError {
    #[error("Failed to fetch source video: {0}")]
    Fetch(#[source] StorageError),

    #[error("Transient file error: {0}")]
    TransientIo(#[source] std::io::Error),

    #[error("Frame extraction failed: {0}")]
    Transcoder(#[from] TranscodeError),

    #[error("Failed to read extracted frame: {0}")]
    ReadOutput(#[source] std::io::Error),

    #[error("Frame extraction produced an empty file")]
    EmptyOutput,

    #[error("Failed to store preview: {0}")]
    Store(#[source] StorageError),
}

/// Runs one preview job: fetch, extract a frame, store the JPEG.
pub struct PreviewJobRunner {
    store: Arc<dyn FileStore>,
    extractor: Arc<dyn FrameExtractor>,
    registry: PreviewRegistry,
    transient_dir: PathBuf,
}

impl PreviewJobRunner {
    pub fn new(
        store: Arc<dyn FileStore>,
        extractor: Arc<dyn FrameExtractor>,
        registry: PreviewRegistry,
        transient_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            extractor,
            registry,
            transient_dir: transient_dir.into(),
        }
    }

    /// Run the job and record its outcome. Failures end here.
    #[tracing::instrument(
        skip(self, request),
        fields(job_id = %request.job_id, video_file_id = %request.file.id)
    )]
    pub async fn execute(&self, request: &PreviewRequest) {
        let start = Instant::now();
        self.registry.mark_processing(&request.file.id, request.job_id);

        match self.run(request).await {
            Ok(preview) => {
                tracing::info!(
                    video_file_id = %request.file.id,
                    preview_file_id = %preview.id,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Video preview generated"
                );
                self.registry
                    .mark_ready(&request.file.id, request.job_id, &preview.id);
            }
            Err(e) => {
                tracing::error!(
                    video_file_id = %request.file.id,
                    file_name = %request.file.name,
                    error = %e,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Video preview generation failed"
                );
                self.registry
                    .mark_failed(&request.file.id, request.job_id, e.to_string());
            }
        }
    }

    /// Produce and store the preview for `request.file`.
    ///
    /// Transient files live only inside this call; their guards remove them on
    /// every exit, including when the future is dropped.
    pub async fn run(&self, request: &PreviewRequest) -> Result<FileInfo, PreviewJobError> {
        let file = &request.file;

        let data = self
            .store
            .get_file(&file.id)
            .await
            .map_err(PreviewJobError::Fetch)?;

        let input = self.transient_file(
            &format!("video_{}_{}_", sanitize_name(&file.id), request.job_id.simple()),
            &format!("_{}", sanitize_name(&file.name)),
        )?;
        tokio::fs::write(input.path(), &data)
            .await
            .map_err(PreviewJobError::TransientIo)?;
        drop(data);

        let output = self.transient_file(
            &format!("preview_{}_{}_", sanitize_name(&file.id), request.job_id.simple()),
            ".jpg",
        )?;

        self.extractor
            .extract_frame(input.path(), output.path(), request.offset_secs)
            .await?;

        let frame = tokio::fs::read(output.path())
            .await
            .map_err(PreviewJobError::ReadOutput)?;
        if frame.is_empty() {
            return Err(PreviewJobError::EmptyOutput);
        }

        self.store
            .upload_file(
                frame,
                &format!("preview_{}.jpg", file.name),
                &format!("preview_{}.jpg", file.id),
                PREVIEW_CONTENT_TYPE,
            )
            .await
            .map_err(PreviewJobError::Store)
    }

    fn transient_file(&self, prefix: &str, suffix: &str) -> Result<NamedTempFile, PreviewJobError> {
        Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .rand_bytes(8)
            .tempfile_in(&self.transient_dir)
            .map_err(PreviewJobError::TransientIo)
    }
}

/// Restrict a name to `[A-Za-z0-9._-]` so it is safe as a path component.
fn sanitize_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_NAME_LEN)
        .collect();
    // A name made only of dots would still walk the tree.
    if sanitized.chars().all(|c| c == '.') {
        sanitized.replace('.', "_")
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::PreviewStatus;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vidpreview_storage::MemoryFileStore;

    const FRAME: &[u8] = b"\xFF\xD8\xFFfake-jpeg\xFF\xD9";

    /// Writes `FRAME` to the output and records that it saw the input.
    #[derive(Default)]
    struct FakeExtractor {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FrameExtractor for FakeExtractor {
        async fn extract_frame(
            &self,
            input: &Path,
            output: &Path,
            _offset_secs: u64,
        ) -> Result<(), TranscodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(input.exists());
            tokio::fs::write(output, FRAME).await.unwrap();
            Ok(())
        }
    }

    struct FailingExtractor;

    #[async_trait]
    impl FrameExtractor for FailingExtractor {
        async fn extract_frame(
            &self,
            input: &Path,
            _output: &Path,
            _offset_secs: u64,
        ) -> Result<(), TranscodeError> {
            assert!(input.exists());
            Err(TranscodeError::Failed {
                status: "exit status: 1".to_string(),
                stderr: "moov atom not found".to_string(),
            })
        }
    }

    /// Succeeds without writing anything.
    struct SilentExtractor;

    #[async_trait]
    impl FrameExtractor for SilentExtractor {
        async fn extract_frame(
            &self,
            _input: &Path,
            _output: &Path,
            _offset_secs: u64,
        ) -> Result<(), TranscodeError> {
            Ok(())
        }
    }

    struct Fixture {
        store: MemoryFileStore,
        registry: PreviewRegistry,
        dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: MemoryFileStore::new(),
                registry: PreviewRegistry::new(),
                dir: tempfile::tempdir().unwrap(),
            }
        }

        fn runner(&self, extractor: Arc<dyn FrameExtractor>) -> PreviewJobRunner {
            PreviewJobRunner::new(
                Arc::new(self.store.clone()),
                extractor,
                self.registry.clone(),
                self.dir.path(),
            )
        }

        fn transient_files(&self) -> usize {
            std::fs::read_dir(self.dir.path()).unwrap().count()
        }
    }

    #[tokio::test]
    async fn test_success_stores_one_preview_and_cleans_up() {
        let fx = Fixture::new();
        let video = fx.store.insert("holiday clip.mp4", vec![7; 64], "video/mp4");
        let extractor = Arc::new(FakeExtractor::default());
        let runner = fx.runner(extractor.clone());

        let preview = runner.run(&PreviewRequest::new(video.clone(), 1)).await.unwrap();

        assert_eq!(extractor.calls.load(Ordering::SeqCst), 1);
        assert_eq!(preview.name, "preview_holiday clip.mp4.jpg");
        assert_eq!(preview.mime_type, "image/jpeg");
        assert_eq!(
            fx.store.internal_name(&preview.id),
            Some(format!("preview_{}.jpg", video.id))
        );
        assert_eq!(fx.store.get_file(&preview.id).await.unwrap(), FRAME.to_vec());
        assert_eq!(fx.store.len(), 2);
        assert_eq!(fx.transient_files(), 0);
    }

    #[tokio::test]
    async fn test_fetch_error_creates_no_files_and_stores_nothing() {
        let fx = Fixture::new();
        let extractor = Arc::new(FakeExtractor::default());
        let runner = fx.runner(extractor.clone());
        let ghost = FileInfo::new("ghost", "ghost.mp4", 10, "video/mp4");

        let result = runner.run(&PreviewRequest::new(ghost, 1)).await;

        assert!(matches!(result, Err(PreviewJobError::Fetch(_))));
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
        assert_eq!(fx.transient_files(), 0);
        assert!(fx.store.is_empty());
    }

    #[tokio::test]
    async fn test_transcoder_failure_removes_input_and_stores_nothing() {
        let fx = Fixture::new();
        let video = fx.store.insert("clip.mp4", vec![1; 32], "video/mp4");
        let runner = fx.runner(Arc::new(FailingExtractor));

        let result = runner.run(&PreviewRequest::new(video, 1)).await;

        match result {
            Err(PreviewJobError::Transcoder(e)) => assert!(e.to_string().contains("moov atom")),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(fx.store.len(), 1);
        assert_eq!(fx.transient_files(), 0);
    }

    #[tokio::test]
    async fn test_empty_output_is_an_error() {
        let fx = Fixture::new();
        let video = fx.store.insert("clip.mp4", vec![1; 32], "video/mp4");
        let runner = fx.runner(Arc::new(SilentExtractor));

        let result = runner.run(&PreviewRequest::new(video, 1)).await;

        assert!(matches!(result, Err(PreviewJobError::EmptyOutput)));
        assert_eq!(fx.store.len(), 1);
        assert_eq!(fx.transient_files(), 0);
    }

    #[tokio::test]
    async fn test_execute_records_outcome() {
        let fx = Fixture::new();
        let video = fx.store.insert("clip.mp4", vec![1; 32], "video/mp4");

        let request = PreviewRequest::new(video.clone(), 1);
        fx.registry.mark_queued(&video.id, request.job_id);
        fx.runner(Arc::new(FakeExtractor::default()))
            .execute(&request)
            .await;

        let record = fx.registry.get(&video.id).unwrap();
        assert_eq!(record.status, PreviewStatus::Ready);
        assert!(record.preview_file_id.is_some());

        let retry = PreviewRequest::new(video.clone(), 1);
        fx.registry.mark_queued(&video.id, retry.job_id);
        fx.runner(Arc::new(FailingExtractor)).execute(&retry).await;

        let record = fx.registry.get(&video.id).unwrap();
        assert_eq!(record.status, PreviewStatus::Failed);
        assert!(record.error.unwrap().contains("Frame extraction failed"));
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("my clip (1).MP4"), "my_clip__1_.MP4");
        assert_eq!(sanitize_name("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_name(".."), "__");
        assert_eq!(sanitize_name(&"a".repeat(300)).len(), MAX_NAME_LEN);
    }
}
