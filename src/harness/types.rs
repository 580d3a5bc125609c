use std::path::PathBuf;

use crate::config;
use crate::upload::UploadConfig;

/// Configuration for the harness execution
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Directory holding the images to upload
    pub image_dir: PathBuf,

    /// Whether to descend into subdirectories of `image_dir`
    pub recursive: bool,

    /// Upload client settings
    pub upload: UploadConfig,

    /// Uploads in flight at once (at least 1)
    pub concurrency: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        let cfg = config::get();
        Self {
            image_dir: PathBuf::from(&cfg.input.image_dir),
            recursive: false,
            upload: UploadConfig::default(),
            concurrency: cfg.upload.concurrency,
        }
    }
}

/// Result type for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Error types for harness operations
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Input directory missing or not a directory
    #[error("Image directory not found: {}", .0.display())]
    InvalidInput(PathBuf),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client construction error
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// CSV serialization error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Thumbnail decoding or encoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Result snapshot (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
