use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use vidpreview_core::{PreviewRequest, ServerConfig};
use vidpreview_processing::{PreviewJobRunner, PreviewRegistry, PreviewScheduler, ScheduleError};

/// Sizing of the preview worker pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewQueueConfig {
    /// Upper bound on jobs (and therefore ffmpeg processes) running at once.
    pub max_concurrent_jobs: usize,
    /// Jobs that may wait for a free worker before `schedule` reports `QueueFull`.
    pub queue_size: usize,
}

impl Default for PreviewQueueConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            queue_size: 1000,
        }
    }
}

impl From<&ServerConfig> for PreviewQueueConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            max_concurrent_jobs: config.max_concurrent_jobs,
            queue_size: config.job_queue_size,
        }
    }
}

/// Bounded queue feeding a fixed-size pool of preview workers.
pub struct PreviewJobQueue {
    tx: mpsc::Sender<PreviewRequest>,
    registry: PreviewRegistry,
    shutdown: CancellationToken,
    active: Arc<AtomicUsize>,
    pool: Mutex<Option<JoinHandle<()>>>,
}

impl PreviewJobQueue {
    /// Create the queue and spawn its worker pool. Must be called inside a tokio runtime.
    pub fn new(
        runner: Arc<PreviewJobRunner>,
        registry: PreviewRegistry,
        config: PreviewQueueConfig,
    ) -> Self {
        let queue_size = config.queue_size.max(1);
        let max_concurrent = config.max_concurrent_jobs.max(1);

        let (tx, rx) = mpsc::channel(queue_size);
        let shutdown = CancellationToken::new();
        let active = Arc::new(AtomicUsize::new(0));

        let pool = tokio::spawn(Self::worker_pool(
            rx,
            runner,
            registry.clone(),
            max_concurrent,
            shutdown.clone(),
            active.clone(),
        ));

        tracing::info!(
            queue_size = queue_size,
            max_concurrent = max_concurrent,
            "Preview job queue initialized"
        );

        Self {
            tx,
            registry,
            shutdown,
            active,
            pool: Mutex::new(Some(pool)),
        }
    }

    /// Jobs currently holding a worker slot.
    pub fn active_jobs(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Stop the pool. Running jobs are dropped (killing their ffmpeg child and
    /// removing transient files) and, like queued ones, recorded as cancelled.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();

        let pool = match self.pool.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        if let Some(pool) = pool {
            if let Err(e) = pool.await {
                tracing::error!(error = %e, "Preview worker pool terminated abnormally");
            }
            tracing::info!("Preview job queue shut down");
        }
    }

    async fn worker_pool(
        mut rx: mpsc::Receiver<PreviewRequest>,
        runner: Arc<PreviewJobRunner>,
        registry: PreviewRegistry,
        max_concurrent: usize,
        shutdown: CancellationToken,
        active: Arc<AtomicUsize>,
    ) {
        let semaphore = Arc::new(Semaphore::new(max_concurrent));
        let mut jobs = JoinSet::new();

        loop {
            let request = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                request = rx.recv() => match request {
                    Some(request) => request,
                    None => break,
                },
            };

            let permit = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    Self::cancel_pending(&registry, &request);
                    break;
                }
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let runner = runner.clone();
            let registry = registry.clone();
            let shutdown = shutdown.clone();
            let active = active.clone();

            jobs.spawn(async move {
                let _permit = permit;
                active.fetch_add(1, Ordering::SeqCst);

                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::warn!(
                            job_id = %request.job_id,
                            video_file_id = %request.file.id,
                            "Preview job cancelled"
                        );
                        registry.mark_cancelled(&request.file.id, request.job_id);
                    }
                    _ = runner.execute(&request) => {}
                }

                active.fetch_sub(1, Ordering::SeqCst);
            });

            // Reap finished jobs so the set does not grow with uptime.
            while jobs.try_join_next().is_some() {}
        }

        rx.close();
        while let Ok(request) = rx.try_recv() {
            Self::cancel_pending(&registry, &request);
        }

        while let Some(result) = jobs.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Preview job task panicked");
            }
        }
    }

    fn cancel_pending(registry: &PreviewRegistry, request: &PreviewRequest) {
        tracing::debug!(
            job_id = %request.job_id,
            video_file_id = %request.file.id,
            "Dropping queued preview job"
        );
        registry.mark_cancelled(&request.file.id, request.job_id);
    }
}

impl PreviewScheduler for PreviewJobQueue {
    #[tracing::instrument(
        skip(self, request),
        fields(job_id = %request.job_id, video_file_id = %request.file.id)
    )]
    fn schedule(&self, request: PreviewRequest) -> Result<(), ScheduleError> {
        if self.shutdown.is_cancelled() {
            return Err(ScheduleError::Closed);
        }

        let video_file_id = request.file.id.clone();
        let job_id = request.job_id;
        // Recorded before sending so a fast worker cannot be overtaken by this write.
        self.registry.mark_queued(&video_file_id, job_id);

        let error = match self.tx.try_send(request) {
            Ok(()) => {
                tracing::debug!("Preview job enqueued");
                return Ok(());
            }
            Err(TrySendError::Full(_)) => {
                tracing::warn!("Preview job queue is full, rejecting job");
                ScheduleError::QueueFull
            }
            Err(TrySendError::Closed(_)) => ScheduleError::Closed,
        };

        // A rejected submission must not displace a job that is still running.
        self.registry.withdraw(&video_file_id, job_id, error.to_string());
        Err(error)
    }
}

impl Drop for PreviewJobQueue {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::Path;
    use std::time::Duration;
    use tokio::sync::Notify;
    use vidpreview_processing::{FrameExtractor, PreviewStatus, TranscodeError};
    use vidpreview_storage::MemoryFileStore;

    /// Writes a frame after a short delay, tracking peak concurrency.
    #[derive(Default)]
    struct SlowExtractor {
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl FrameExtractor for SlowExtractor {
        async fn extract_frame(
            &self,
            _input: &Path,
            output: &Path,
            _offset_secs: u64,
        ) -> Result<(), TranscodeError> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            tokio::fs::write(output, b"jpeg").await.unwrap();
            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Signals once started, then never finishes.
    #[derive(Default)]
    struct HangingExtractor {
        started: Notify,
    }

    #[async_trait]
    impl FrameExtractor for HangingExtractor {
        async fn extract_frame(
            &self,
            input: &Path,
            _output: &Path,
            _offset_secs: u64,
        ) -> Result<(), TranscodeError> {
            assert!(input.exists());
            self.started.notify_one();
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    /// Signals when started, then waits to be released before writing a frame.
    #[derive(Default)]
    struct GatedExtractor {
        started: Notify,
        release: Notify,
    }

    #[async_trait]
    impl FrameExtractor for GatedExtractor {
        async fn extract_frame(
            &self,
            _input: &Path,
            output: &Path,
            _offset_secs: u64,
        ) -> Result<(), TranscodeError> {
            self.started.notify_one();
            self.release.notified().await;
            tokio::fs::write(output, b"jpeg").await.unwrap();
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

        fn queue(
            &self,
            extractor: Arc<dyn FrameExtractor>,
            config: PreviewQueueConfig,
        ) -> PreviewJobQueue {
            let runner = PreviewJobRunner::new(
                Arc::new(self.store.clone()),
                extractor,
                self.registry.clone(),
                self.dir.path(),
            );
            PreviewJobQueue::new(Arc::new(runner), self.registry.clone(), config)
        }

        fn video(&self, name: &str) -> PreviewRequest {
            PreviewRequest::new(self.store.insert(name, vec![0; 32], "video/mp4"), 1)
        }

        async fn wait_until_terminal(&self, ids: &[String]) {
            tokio::time::timeout(Duration::from_secs(10), async {
                loop {
                    let done = ids.iter().all(|id| {
                        self.registry
                            .get(id)
                            .is_some_and(|r| r.status.is_terminal())
                    });
                    if done {
                        break;
                    }
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            })
            .await
            .expect("jobs did not finish in time");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_never_exceeds_limit() {
        let fx = Fixture::new();
        let extractor = Arc::new(SlowExtractor::default());
        let queue = fx.queue(
            extractor.clone(),
            PreviewQueueConfig {
                max_concurrent_jobs: 2,
                queue_size: 16,
            },
        );

        let mut ids = Vec::new();
        for i in 0..6 {
            let request = fx.video(&format!("clip{}.mp4", i));
            ids.push(request.file.id.clone());
            queue.schedule(request).unwrap();
        }

        fx.wait_until_terminal(&ids).await;

        assert!(extractor.peak.load(Ordering::SeqCst) <= 2);
        for id in &ids {
            assert_eq!(fx.registry.get(id).unwrap().status, PreviewStatus::Ready);
        }
        // Six videos plus six previews.
        assert_eq!(fx.store.len(), 12);
        assert_eq!(queue.active_jobs(), 0);
    }

    #[tokio::test]
    async fn test_full_queue_is_reported() {
        let fx = Fixture::new();
        let queue = fx.queue(
            Arc::new(HangingExtractor::default()),
            PreviewQueueConfig {
                max_concurrent_jobs: 1,
                queue_size: 1,
            },
        );

        // The single-threaded test runtime does not run the pool until we yield,
        // so the second request finds the one-slot channel occupied.
        let first = fx.video("a.mp4");
        let second = fx.video("b.mp4");
        let second_id = second.file.id.clone();

        assert_eq!(queue.schedule(first), Ok(()));
        assert_eq!(queue.schedule(second), Err(ScheduleError::QueueFull));
        assert_eq!(
            fx.registry.get(&second_id).unwrap().status,
            PreviewStatus::Failed
        );

        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_cancels_running_job_and_cleans_up() {
        let fx = Fixture::new();
        let extractor = Arc::new(HangingExtractor::default());
        let queue = fx.queue(
            extractor.clone(),
            PreviewQueueConfig {
                max_concurrent_jobs: 1,
                queue_size: 4,
            },
        );

        let running = fx.video("running.mp4");
        let waiting = fx.video("waiting.mp4");
        let running_id = running.file.id.clone();
        let waiting_id = waiting.file.id.clone();

        queue.schedule(running).unwrap();
        queue.schedule(waiting).unwrap();

        tokio::time::timeout(Duration::from_secs(5), extractor.started.notified())
            .await
            .expect("job never started");
        assert_eq!(queue.active_jobs(), 1);
        assert!(std::fs::read_dir(fx.dir.path()).unwrap().count() > 0);

        queue.shutdown().await;

        assert_eq!(
            fx.registry.get(&running_id).unwrap().status,
            PreviewStatus::Cancelled
        );
        assert_eq!(
            fx.registry.get(&waiting_id).unwrap().status,
            PreviewStatus::Cancelled
        );
        assert_eq!(std::fs::read_dir(fx.dir.path()).unwrap().count(), 0);
        assert_eq!(queue.active_jobs(), 0);
        assert_eq!(queue.schedule(fx.video("late.mp4")), Err(ScheduleError::Closed));
    }

    #[tokio::test]
    async fn test_rejected_resubmission_keeps_running_job_record() {
        let fx = Fixture::new();
        let extractor = Arc::new(GatedExtractor::default());
        let queue = fx.queue(
            extractor.clone(),
            PreviewQueueConfig {
                max_concurrent_jobs: 1,
                queue_size: 1,
            },
        );

        let video = fx.store.insert("v.mp4", vec![0; 32], "video/mp4");
        queue
            .schedule(PreviewRequest::new(video.clone(), 1))
            .unwrap();
        tokio::time::timeout(Duration::from_secs(5), extractor.started.notified())
            .await
            .expect("job never started");

        // Fill the queue with other videos; nothing drains it until we yield.
        let mut filled = false;
        for i in 0..4 {
            let filler = fx.video(&format!("other{}.mp4", i));
            if queue.schedule(filler) == Err(ScheduleError::QueueFull) {
                filled = true;
                break;
            }
        }
        assert!(filled);

        assert_eq!(
            queue.schedule(PreviewRequest::new(video.clone(), 1)),
            Err(ScheduleError::QueueFull)
        );
        assert_eq!(
            fx.registry.get(&video.id).unwrap().status,
            PreviewStatus::Processing
        );

        extractor.release.notify_one();
        fx.wait_until_terminal(std::slice::from_ref(&video.id)).await;

        let record = fx.registry.get(&video.id).unwrap();
        assert_eq!(record.status, PreviewStatus::Ready);
        let preview_id = record.preview_file_id.expect("preview should be recorded");
        let previews = fx.store.find(|f| f.name == "preview_v.mp4.jpg");
        assert_eq!(previews.len(), 1);
        assert_eq!(previews[0].id, preview_id);

        queue.shutdown().await;
    }
}
