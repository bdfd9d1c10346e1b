use std::io::{Read, Write};

use vidpreview_core::{FileInfo, PreviewSettings};

use super::types::UploadDecision;
use crate::validator::VideoValidator;

/// Run an upload through the video checks.
///
/// Synchronous; the host blocks upload completion on the result.
pub fn intercept_upload<R, W>(
    settings: &PreviewSettings,
    mut info: FileInfo,
    input: &mut R,
    output: &mut W,
) -> UploadDecision
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let validator = VideoValidator::from_settings(settings);

    if !validator.is_eligible(&info.name) {
        return UploadDecision::PassThrough(info);
    }

    if let Err(e) = validator.validate_size(info.size) {
        tracing::warn!(
            file_name = %info.name,
            size_bytes = info.size,
            error = %e,
            "Rejecting oversized video upload"
        );
        return UploadDecision::Rejected {
            info,
            reason: e.to_string(),
        };
    }

    let copied = match std::io::copy(input, output) {
        Ok(copied) => copied,
        Err(e) => {
            tracing::error!(
                file_name = %info.name,
                error = %e,
                "Failed to copy video upload"
            );
            return UploadDecision::Rejected {
                info,
                reason: format!("Failed to copy uploaded video: {}", e),
            };
        }
    };

    info.mime_type = video_mime_type(&info.extension);

    tracing::debug!(
        file_name = %info.name,
        mime_type = %info.mime_type,
        bytes_copied = copied,
        "Video upload accepted"
    );

    UploadDecision::Accepted(info)
}

/// MIME type for a video extension, synthesizing `video/<ext>` for unknown ones.
fn video_mime_type(extension: &str) -> String {
    let ext = extension.to_lowercase();
    mime_guess::from_ext(&ext)
        .first_raw()
        .map(String::from)
        .unwrap_or_else(|| format!("video/{}", ext))
}
