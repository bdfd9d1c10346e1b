use vidpreview_core::PreviewRequest;

/// Errors returned when a preview job cannot be enqueued
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("Preview queue is full")]
    QueueFull,

    #[error("Preview queue is shut down")]
    Closed,
}

/// Accepts preview jobs without waiting for them to run.
///
/// `schedule` must return promptly; callers sit on the message submission path.
pub trait PreviewScheduler: Send + Sync {
    fn schedule(&self, request: PreviewRequest) -> Result<(), ScheduleError>;
}
