//! Configuration module
//!
//! Two kinds of configuration live here:
//!
//! - [`PreviewSettings`]: the plugin configuration (accepted formats, size
//!   ceiling, preview offset). It is re-read through a [`ConfigProvider`] for
//!   every operation and passed around as an immutable snapshot.
//! - [`ServerConfig`]: process-level settings for the standalone server
//!   (port, storage backend, ffmpeg path, worker pool sizing), loaded once
//!   from the environment.

use std::env;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::storage_types::StorageBackend;

// Common constants
const SERVER_PORT: u16 = 4000;
const MAX_CONCURRENT_JOBS: usize = 2;
const JOB_QUEUE_SIZE: usize = 1000;
const UPLOAD_BODY_LIMIT_MB: usize = 1024;
const REGISTRY_MAX_RECORDS: usize = 10_000;
const LOCAL_STORAGE_PATH: &str = "./data/files";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Plugin configuration snapshot.
///
/// Field names follow the host's JSON schema. Missing fields take their zero
/// value, so an empty or unreadable configuration accepts no formats and
/// therefore passes every file through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewSettings {
    #[serde(rename = "EnableVideoPreview")]
    pub enable_video_preview: bool,
    /// Comma-separated extensions without a leading dot, e.g. `"mp4,mov,webm"`.
    #[serde(rename = "SupportedFormats")]
    pub supported_formats: String,
    /// Upload ceiling in megabytes. `0` means unset.
    #[serde(rename = "MaxFileSize")]
    pub max_file_size: u64,
    /// Offset in seconds at which the preview frame is captured.
    #[serde(rename = "PreviewDuration")]
    pub preview_duration: u64,
}

impl PreviewSettings {
    /// Accepted extensions, lowercased and trimmed. Blank entries are dropped.
    pub fn accepted_extensions(&self) -> Vec<String> {
        self.supported_formats
            .to_lowercase()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Size ceiling in bytes, or `None` when no ceiling is configured.
    pub fn max_file_size_bytes(&self) -> Option<u64> {
        if self.max_file_size == 0 {
            return None;
        }
        Some(self.max_file_size.saturating_mul(1024 * 1024))
    }

    /// Build a snapshot from `VIDEO_*` environment variables.
    ///
    /// Used to seed the server when no plugin configuration file is given.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            enable_video_preview: parse_env("VIDEO_PREVIEW_ENABLED", true)?,
            supported_formats: env::var("VIDEO_SUPPORTED_FORMATS")
                .unwrap_or_else(|_| "mp4,mov,avi,webm,mkv".to_string()),
            max_file_size: parse_env("VIDEO_MAX_FILE_SIZE_MB", 500)?,
            preview_duration: parse_env("VIDEO_PREVIEW_OFFSET_SECS", 1)?,
        })
    }
}

/// Source of plugin configuration snapshots.
///
/// `load` is best-effort: implementations log failures and fall back to
/// [`PreviewSettings::default`] instead of returning an error.
pub trait ConfigProvider: Send + Sync {
    fn load(&self) -> PreviewSettings;
}

/// Always returns the same snapshot.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigProvider {
    settings: PreviewSettings,
}

impl StaticConfigProvider {
    pub fn new(settings: PreviewSettings) -> Self {
        Self { settings }
    }
}

impl ConfigProvider for StaticConfigProvider {
    fn load(&self) -> PreviewSettings {
        self.settings.clone()
    }
}

/// Snapshot that can be replaced at runtime.
///
/// Readers always see a complete snapshot; an update between two `load` calls
/// in the same request is visible to the second call only.
#[derive(Debug, Clone, Default)]
pub struct SharedConfigProvider {
    settings: Arc<RwLock<PreviewSettings>>,
}

impl SharedConfigProvider {
    pub fn new(settings: PreviewSettings) -> Self {
        Self {
            settings: Arc::new(RwLock::new(settings)),
        }
    }

    pub fn update(&self, settings: PreviewSettings) {
        match self.settings.write() {
            Ok(mut guard) => *guard = settings,
            Err(poisoned) => *poisoned.into_inner() = settings,
        }
    }
}

impl ConfigProvider for SharedConfigProvider {
    fn load(&self) -> PreviewSettings {
        match self.settings.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// Reads the host's JSON configuration file on every call.
#[derive(Debug, Clone)]
pub struct FileConfigProvider {
    path: PathBuf,
}

impl FileConfigProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Strict variant of [`ConfigProvider::load`] that surfaces the failure.
    pub fn try_load(&self) -> Result<PreviewSettings, ConfigError> {
        let raw = std::fs::read_to_string(&self.path).map_err(|source| ConfigError::Read {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })
    }
}

impl ConfigProvider for FileConfigProvider {
    fn load(&self) -> PreviewSettings {
        match self.try_load() {
            Ok(settings) => settings,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    path = %self.path.display(),
                    "Failed to load plugin configuration, using defaults"
                );
                PreviewSettings::default()
            }
        }
    }
}

/// Process-level configuration for the standalone server.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub server_port: u16,
    pub environment: String,
    pub storage_backend: StorageBackend,
    pub local_storage_path: PathBuf,
    /// When set, plugin settings are re-read from this JSON file on every use.
    pub plugin_config_path: Option<PathBuf>,
    pub ffmpeg_path: String,
    /// Directory that holds transient job files.
    pub preview_temp_dir: PathBuf,
    pub max_concurrent_jobs: usize,
    pub job_queue_size: usize,
    pub upload_body_limit_bytes: usize,
    /// Preview statuses kept in memory; the oldest finished ones are evicted past this.
    pub registry_max_records: usize,
    /// Emit JSON logs. Always on in production.
    pub log_json: bool,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse::<StorageBackend>()?,
            Err(_) => StorageBackend::Local,
        };

        let config = ServerConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            environment,
            storage_backend,
            local_storage_path: env::var("LOCAL_STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(LOCAL_STORAGE_PATH)),
            plugin_config_path: env::var("PLUGIN_CONFIG_PATH").ok().map(PathBuf::from),
            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
            preview_temp_dir: env::var("PREVIEW_TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| env::temp_dir()),
            max_concurrent_jobs: parse_env("PREVIEW_MAX_CONCURRENT_JOBS", MAX_CONCURRENT_JOBS)?,
            job_queue_size: parse_env("PREVIEW_JOB_QUEUE_SIZE", JOB_QUEUE_SIZE)?,
            upload_body_limit_bytes: parse_env("UPLOAD_BODY_LIMIT_MB", UPLOAD_BODY_LIMIT_MB)?
                * 1024
                * 1024,
            registry_max_records: parse_env(
                "PREVIEW_REGISTRY_MAX_RECORDS",
                REGISTRY_MAX_RECORDS,
            )?,
            log_json: env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_concurrent_jobs == 0 {
            return Err(anyhow::anyhow!(
                "PREVIEW_MAX_CONCURRENT_JOBS must be at least 1"
            ));
        }
        if self.job_queue_size == 0 {
            return Err(anyhow::anyhow!("PREVIEW_JOB_QUEUE_SIZE must be at least 1"));
        }
        if self.registry_max_records == 0 {
            return Err(anyhow::anyhow!(
                "PREVIEW_REGISTRY_MAX_RECORDS must be at least 1"
            ));
        }
        if self.ffmpeg_path.trim().is_empty() {
            return Err(anyhow::anyhow!("FFMPEG_PATH must not be empty"));
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    /// Build the configuration provider selected by `PLUGIN_CONFIG_PATH`.
    pub fn config_provider(&self) -> Result<Arc<dyn ConfigProvider>, ConfigError> {
        match &self.plugin_config_path {
            Some(path) => Ok(Arc::new(FileConfigProvider::new(path.clone()))),
            None => Ok(Arc::new(SharedConfigProvider::new(
                PreviewSettings::from_env()?,
            ))),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        Err(_) => Ok(default),
    }
}
