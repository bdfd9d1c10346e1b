use vidpreview_core::FileInfo;

/// Outcome of running an upload through the interceptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadDecision {
    /// Not an eligible video. The input was not read; the host keeps the original bytes.
    PassThrough(FileInfo),
    /// Eligible video within the limit. The bytes were copied verbatim to the output.
    Accepted(FileInfo),
    /// Upload refused. `reason` is shown to the uploader.
    Rejected { info: FileInfo, reason: String },
}

impl UploadDecision {
    pub fn info(&self) -> &FileInfo {
        match self {
            UploadDecision::PassThrough(info)
            | UploadDecision::Accepted(info)
            | UploadDecision::Rejected { info, .. } => info,
        }
    }

    pub fn rejection(&self) -> Option<&str> {
        match self {
            UploadDecision::Rejected { reason, .. } => Some(reason),
            _ => None,
        }
    }
}
