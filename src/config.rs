//! Configuration management with environment variable support.
//!
//! This module provides centralized configuration for the CatEye harness, supporting:
//! - Environment variables for all configurable values
//! - Defaults matching the endpoint and folder layout the harness was written for
//! - Builder-style overrides through the CLI
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `CATEYE_API_URL` | Classification endpoint URL | `http://127.0.0.1:8080/ai/eye?PetType=cat` |
//! | `CATEYE_COOKIE` | Cookie header sent with every upload | unset |
//! | `CATEYE_UPLOAD_FIELD` | Multipart field carrying the image | `AnimalImage` |
//! | `CATEYE_TIMEOUT_MS` | Per-request timeout (ms) | `8000` |
//! | `CATEYE_REQUEST_DELAY_MS` | Pause before each upload (ms) | `500` |
//! | `CATEYE_CONCURRENCY` | Uploads in flight at once | `1` |
//! | `CATEYE_IMAGE_DIR` | Directory holding the test images | `./unit_test_catEye` |
//! | `CATEYE_CSV_REPORT` | CSV output path | `test_results.csv` |
//! | `CATEYE_HTML_REPORT` | HTML output path | `image_test_report.html` |
//! | `CATEYE_REPORT_TITLE` | Title of the HTML report | `CatEye Unit Test Report` |
//!
//! # Example
//!
//! ```bash
//! export CATEYE_API_URL="https://staging.example.com/ai/eye?PetType=cat"
//! export CATEYE_COOKIE="JSESSIONID=abc123"
//! export CATEYE_CONCURRENCY=4
//! ```

use std::env;
use std::sync::OnceLock;

// ============================================================================
// Default Values
// ============================================================================

/// Default classification endpoint
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8080/ai/eye?PetType=cat";

/// Default multipart field name for the uploaded image
pub const DEFAULT_UPLOAD_FIELD: &str = "AnimalImage";

/// Default per-request timeout (milliseconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 8000;

/// Default pause before each upload (milliseconds)
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 500;

/// Default number of uploads in flight
pub const DEFAULT_CONCURRENCY: usize = 1;

/// Default input directory
pub const DEFAULT_IMAGE_DIR: &str = "./unit_test_catEye";

/// Default CSV report path
pub const DEFAULT_CSV_REPORT: &str = "test_results.csv";

/// Default HTML report path
pub const DEFAULT_HTML_REPORT: &str = "image_test_report.html";

/// Default HTML report title
pub const DEFAULT_REPORT_TITLE: &str = "CatEye Unit Test Report";

// ============================================================================
// Environment Variable Names
// ============================================================================

/// Environment variable for the classification endpoint
pub const ENV_API_URL: &str = "CATEYE_API_URL";

/// Environment variable for the cookie header
pub const ENV_COOKIE: &str = "CATEYE_COOKIE";

/// Environment variable for the multipart field name
pub const ENV_UPLOAD_FIELD: &str = "CATEYE_UPLOAD_FIELD";

/// Environment variable for the request timeout
pub const ENV_TIMEOUT_MS: &str = "CATEYE_TIMEOUT_MS";

/// Environment variable for the pre-request delay
pub const ENV_REQUEST_DELAY_MS: &str = "CATEYE_REQUEST_DELAY_MS";

/// Environment variable for upload concurrency
pub const ENV_CONCURRENCY: &str = "CATEYE_CONCURRENCY";

/// Environment variable for the input directory
pub const ENV_IMAGE_DIR: &str = "CATEYE_IMAGE_DIR";

/// Environment variable for the CSV report path
pub const ENV_CSV_REPORT: &str = "CATEYE_CSV_REPORT";

/// Environment variable for the HTML report path
pub const ENV_HTML_REPORT: &str = "CATEYE_HTML_REPORT";

/// Environment variable for the HTML report title
pub const ENV_REPORT_TITLE: &str = "CATEYE_REPORT_TITLE";

// ============================================================================
// Configuration Getters (with caching)
// ============================================================================

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration (initialized from environment on first access)
pub fn get() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Centralized configuration for the harness
#[derive(Debug, Clone)]
pub struct Config {
    /// Upload client settings
    pub upload: UploadSettings,
    /// Input discovery settings
    pub input: InputSettings,
    /// Report output settings
    pub report: ReportSettings,
}

/// Upload-related settings
#[derive(Debug, Clone)]
pub struct UploadSettings {
    /// Classification endpoint URL
    pub endpoint: String,
    /// Optional cookie header value
    pub cookie: Option<String>,
    /// Multipart field name
    pub field_name: String,
    /// Request timeout (milliseconds)
    pub timeout_ms: u64,
    /// Pause before each request (milliseconds)
    pub request_delay_ms: u64,
    /// Uploads in flight at once
    pub concurrency: usize,
}

/// Input-related settings
#[derive(Debug, Clone)]
pub struct InputSettings {
    /// Directory holding the test images
    pub image_dir: String,
}

/// Report-related settings
#[derive(Debug, Clone)]
pub struct ReportSettings {
    pub csv_path: String,
    pub html_path: String,
    pub title: String,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            upload: UploadSettings::from_env(),
            input: InputSettings::from_env(),
            report: ReportSettings::from_env(),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            upload: UploadSettings::defaults(),
            input: InputSettings::defaults(),
            report: ReportSettings::defaults(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl UploadSettings {
    /// Create upload settings from environment variables
    pub fn from_env() -> Self {
        Self {
            endpoint: env::var(ENV_API_URL).unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            cookie: env::var(ENV_COOKIE).ok().filter(|c| !c.trim().is_empty()),
            field_name: env::var(ENV_UPLOAD_FIELD)
                .unwrap_or_else(|_| DEFAULT_UPLOAD_FIELD.to_string()),
            timeout_ms: parse_env(ENV_TIMEOUT_MS).unwrap_or(DEFAULT_TIMEOUT_MS),
            request_delay_ms: parse_env(ENV_REQUEST_DELAY_MS).unwrap_or(DEFAULT_REQUEST_DELAY_MS),
            concurrency: parse_env::<usize>(ENV_CONCURRENCY)
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_CONCURRENCY),
        }
    }

    /// Create upload settings with defaults
    pub fn defaults() -> Self {
        Self {
            endpoint: DEFAULT_API_URL.to_string(),
            cookie: None,
            field_name: DEFAULT_UPLOAD_FIELD.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            request_delay_ms: DEFAULT_REQUEST_DELAY_MS,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl InputSettings {
    pub fn from_env() -> Self {
        Self {
            image_dir: env::var(ENV_IMAGE_DIR).unwrap_or_else(|_| DEFAULT_IMAGE_DIR.to_string()),
        }
    }

    pub fn defaults() -> Self {
        Self {
            image_dir: DEFAULT_IMAGE_DIR.to_string(),
        }
    }
}

impl ReportSettings {
    /// Create report settings from environment variables
    pub fn from_env() -> Self {
        Self {
            csv_path: env::var(ENV_CSV_REPORT).unwrap_or_else(|_| DEFAULT_CSV_REPORT.to_string()),
            html_path: env::var(ENV_HTML_REPORT)
                .unwrap_or_else(|_| DEFAULT_HTML_REPORT.to_string()),
            title: env::var(ENV_REPORT_TITLE).unwrap_or_else(|_| DEFAULT_REPORT_TITLE.to_string()),
        }
    }

    /// Create report settings with defaults
    pub fn defaults() -> Self {
        Self {
            csv_path: DEFAULT_CSV_REPORT.to_string(),
            html_path: DEFAULT_HTML_REPORT.to_string(),
            title: DEFAULT_REPORT_TITLE.to_string(),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Read and parse a numeric environment variable, ignoring unparsable values
fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse().ok())
}
