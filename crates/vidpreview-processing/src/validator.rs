use vidpreview_core::models::file_extension;
use vidpreview_core::PreviewSettings;

/// Validation errors for video uploads
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Video file is too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },
}

/// Lowercased extension of `filename` with a single leading dot stripped.
fn normalized_extension(filename: &str) -> Option<String> {
    let ext = file_extension(filename)?.to_lowercase();
    let ext = ext.strip_prefix('.').map(String::from).unwrap_or(ext);
    if ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}

/// Whether `filename` is a video this deployment accepts.
pub fn is_eligible(filename: &str, settings: &PreviewSettings) -> bool {
    VideoValidator::from_settings(settings).is_eligible(filename)
}

/// Whether `size_bytes` is strictly above the configured ceiling.
pub fn exceeds_limit(size_bytes: u64, settings: &PreviewSettings) -> bool {
    VideoValidator::from_settings(settings).exceeds_limit(size_bytes)
}

/// Video eligibility and size checks bound to one configuration snapshot.
#[derive(Debug, Clone)]
pub struct VideoValidator {
    accepted_extensions: Vec<String>,
    max_file_size: Option<u64>,
}

impl VideoValidator {
    pub fn new(accepted_extensions: Vec<String>, max_file_size: Option<u64>) -> Self {
        Self {
            accepted_extensions,
            max_file_size,
        }
    }

    pub fn from_settings(settings: &PreviewSettings) -> Self {
        Self::new(
            settings.accepted_extensions(),
            settings.max_file_size_bytes(),
        )
    }

    pub fn is_eligible(&self, filename: &str) -> bool {
        match normalized_extension(filename) {
            Some(ext) => self.accepted_extensions.iter().any(|a| a == &ext),
            None => false,
        }
    }

    /// No ceiling configured means nothing exceeds it.
    pub fn exceeds_limit(&self, size_bytes: u64) -> bool {
        self.max_file_size.is_some_and(|max| size_bytes > max)
    }

    pub fn validate_size(&self, size_bytes: u64) -> Result<(), ValidationError> {
        match self.max_file_size {
            Some(max) if size_bytes > max => Err(ValidationError::FileTooLarge {
                size: size_bytes,
                max,
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(formats: &str, max_mb: u64) -> PreviewSettings {
        PreviewSettings {
            enable_video_preview: true,
            supported_formats: formats.to_string(),
            max_file_size: max_mb,
            preview_duration: 1,
        }
    }

    #[test]
    fn test_eligibility_is_case_insensitive() {
        let s = settings("mp4,mov", 10);
        assert!(is_eligible("clip.mp4", &s));
        assert!(is_eligible("clip.MP4", &s));
        assert_eq!(is_eligible("clip.MP4", &s), is_eligible("clip.mp4", &s));
        assert!(is_eligible("Clip.Mov", &s));
    }

    #[test]
    fn test_eligibility_trims_configured_formats() {
        let s = settings(" MP4 , webm ,", 10);
        assert!(is_eligible("a.mp4", &s));
        assert!(is_eligible("a.webm", &s));
        assert!(!is_eligible("a.mkv", &s));
    }

    #[test]
    fn test_eligibility_requires_extension() {
        let s = settings("mp4", 10);
        assert!(!is_eligible("mp4", &s));
        assert!(!is_eligible("clip.", &s));
        assert!(!is_eligible("", &s));
        assert!(!is_eligible("videos.mp4/clip", &s));
    }

    #[test]
    fn test_eligibility_uses_last_extension() {
        let s = settings("mp4", 10);
        assert!(is_eligible("archive.tar.mp4", &s));
        assert!(!is_eligible("clip.mp4.zip", &s));
    }

    #[test]
    fn test_empty_configuration_accepts_nothing() {
        let s = PreviewSettings::default();
        assert!(!is_eligible("clip.mp4", &s));
        assert!(!exceeds_limit(u64::MAX, &s));
    }

    #[test]
    fn test_limit_boundary_is_strictly_greater() {
        let s = settings("mp4", 1);
        let limit = 1024 * 1024;
        assert!(!exceeds_limit(limit - 1, &s));
        assert!(!exceeds_limit(limit, &s));
        assert!(exceeds_limit(limit + 1, &s));
    }

    #[test]
    fn test_validate_size_reports_limit() {
        let validator = VideoValidator::new(vec!["mp4".to_string()], Some(100));
        assert!(validator.validate_size(100).is_ok());
        match validator.validate_size(101) {
            Err(ValidationError::FileTooLarge { size, max }) => {
                assert_eq!(size, 101);
                assert_eq!(max, 100);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
