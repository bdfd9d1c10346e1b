//! Frame extractors that stand in for ffmpeg.

use std::path::Path;

use async_trait::async_trait;
use vidpreview_processing::{FrameExtractor, TranscodeError};

pub const FAKE_JPEG: &[u8] = b"\xFF\xD8\xFFtest-frame\xFF\xD9";

/// Writes `FAKE_JPEG` as the extracted frame.
pub struct StubExtractor;

#[async_trait]
impl FrameExtractor for StubExtractor {
    async fn extract_frame(
        &self,
        _input: &Path,
        output: &Path,
        _offset_secs: u64,
    ) -> Result<(), TranscodeError> {
        tokio::fs::write(output, FAKE_JPEG)
            .await
            .expect("Failed to write fake frame");
        Ok(())
    }
}

/// Fails like ffmpeg does on a corrupt container.
pub struct BrokenExtractor;

#[async_trait]
impl FrameExtractor for BrokenExtractor {
    async fn extract_frame(
        &self,
        _input: &Path,
        _output: &Path,
        _offset_secs: u64,
    ) -> Result<(), TranscodeError> {
        Err(TranscodeError::Failed {
            status: "exit status: 1".to_string(),
            stderr: "Invalid data found when processing input".to_string(),
        })
    }
}
