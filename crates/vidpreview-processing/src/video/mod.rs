//! Preview generation: frame extraction and the job that wraps it.

mod preview;
mod transformer;

pub use preview::{PreviewJobError, PreviewJobRunner};
pub use transformer::{frame_extraction_args, FfmpegFrameExtractor, FrameExtractor, TranscodeError};
