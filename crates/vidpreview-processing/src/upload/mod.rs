//! Upload interception: size ceiling and MIME assignment for video uploads.

mod interceptor;
mod types;

pub use interceptor::intercept_upload;
pub use types::UploadDecision;
