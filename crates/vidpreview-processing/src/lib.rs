//! vidpreview processing library
//!
//! This crate holds the preview pipeline: upload-time validation, the post
//! interceptor that schedules preview jobs, the job itself (ffmpeg frame
//! extraction around transient files) and the registry that links a video
//! to its preview.

pub mod post;
pub mod registry;
pub mod scheduler;
pub mod upload;
pub mod validator;
pub mod video;

// Re-export commonly used types
pub use post::PostInterceptor;
pub use registry::{PreviewRecord, PreviewRegistry, PreviewStatus, DEFAULT_MAX_RECORDS};
pub use scheduler::{PreviewScheduler, ScheduleError};
pub use upload::{intercept_upload, UploadDecision};
pub use validator::{exceeds_limit, is_eligible, ValidationError, VideoValidator};
pub use video::{
    FfmpegFrameExtractor, FrameExtractor, PreviewJobError, PreviewJobRunner, TranscodeError,
};
