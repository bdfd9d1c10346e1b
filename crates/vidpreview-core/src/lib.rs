//! vidpreview core library
//!
//! This crate provides the domain models, error types and configuration
//! shared by every vidpreview component.

pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{
    ConfigError, ConfigProvider, FileConfigProvider, PreviewSettings, ServerConfig,
    SharedConfigProvider, StaticConfigProvider,
};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{FileInfo, MessagePost, PreviewRequest, HAS_VIDEO_PROP};
pub use storage_types::StorageBackend;
