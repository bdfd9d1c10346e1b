//! Single-frame extraction through ffmpeg

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Longest stderr excerpt kept in a transcoder error.
const MAX_STDERR_LEN: usize = 2048;

#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("Invalid ffmpeg path: {0}")]
    InvalidBinary(String),

    #[error("Failed to start ffmpeg: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("ffmpeg exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
}

/// Writes one frame of a video to an image file.
#[async_trait]
pub trait FrameExtractor: Send + Sync {
    /// Extract the frame at `offset_secs` from `input` into `output`.
    ///
    /// Dropping the returned future must stop any work it started.
    async fn extract_frame(
        &self,
        input: &Path,
        output: &Path,
        offset_secs: u64,
    ) -> Result<(), TranscodeError>;
}

/// Arguments for `ffmpeg -i <in> -ss <offset> -vframes 1 -q:v 2 -y <out>`.
///
/// Paths are passed through as-is, so non-UTF-8 names reach ffmpeg unchanged.
pub fn frame_extraction_args(input: &Path, output: &Path, offset_secs: u64) -> Vec<OsString> {
    vec![
        "-i".into(),
        input.as_os_str().to_owned(),
        "-ss".into(),
        offset_secs.to_string().into(),
        "-vframes".into(),
        "1".into(),
        "-q:v".into(),
        "2".into(),
        "-y".into(),
        output.as_os_str().to_owned(),
    ]
}

#[derive(Debug, Clone)]
pub struct FfmpegFrameExtractor {
    ffmpeg_path: String,
}

impl FfmpegFrameExtractor {
    pub fn new(ffmpeg_path: impl Into<String>) -> Result<Self, TranscodeError> {
        let ffmpeg_path = ffmpeg_path.into();
        let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
        let has_dangerous = ffmpeg_path.chars().any(|c| dangerous_chars.contains(&c));
        if ffmpeg_path.trim().is_empty() || has_dangerous {
            return Err(TranscodeError::InvalidBinary(ffmpeg_path));
        }

        Ok(Self { ffmpeg_path })
    }

    pub fn ffmpeg_path(&self) -> &str {
        &self.ffmpeg_path
    }
}

#[async_trait]
impl FrameExtractor for FfmpegFrameExtractor {
    async fn extract_frame(
        &self,
        input: &Path,
        output: &Path,
        offset_secs: u64,
    ) -> Result<(), TranscodeError> {
        let args = frame_extraction_args(input, output, offset_secs);
        tracing::debug!(
            ffmpeg = %self.ffmpeg_path,
            input = %input.display(),
            output = %output.display(),
            offset_secs = offset_secs,
            "Running ffmpeg"
        );

        let result = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(TranscodeError::Spawn)?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(TranscodeError::Failed {
                status: result.status.to_string(),
                stderr: stderr_tail(&stderr).to_string(),
            });
        }

        Ok(())
    }
}

/// Last `MAX_STDERR_LEN` bytes of `stderr`, cut on a char boundary.
fn stderr_tail(stderr: &str) -> &str {
    let trimmed = stderr.trim();
    if trimmed.len() <= MAX_STDERR_LEN {
        return trimmed;
    }
    let mut start = trimmed.len() - MAX_STDERR_LEN;
    while !trimmed.is_char_boundary(start) {
        start += 1;
    }
    &trimmed[start..]
}
