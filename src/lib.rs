//! CatEye Harness - integration tests for an image classification endpoint.
//!
//! This crate provides:
//! - Discovery of test images in a directory
//! - Multipart uploads with bounded concurrency, each settling into one result record
//! - Best-effort parsing of classifier error messages
//! - CSV and HTML reports of every run
//!
//! # Example
//!
//! ```rust,no_run
//! use cateye_harness::{HarnessConfig, ReportConfig, run_harness, write_reports};
//!
//! # async fn demo() -> Result<(), cateye_harness::HarnessError> {
//! let run = run_harness(&HarnessConfig::default()).await?;
//! write_reports(&run.results, &run.timing, &ReportConfig::default())?;
//! println!("{} of {} images accepted", run.results.successes().len(), run.results.total());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error_message;
pub mod harness;
pub mod report;
pub mod runner;
pub mod scan;
pub mod upload;

// Re-export runner types
pub use runner::{Attempt, CompletedRun, Confidence, ErrorCode, Outcome, ResultRecord, RunResults, RunTiming};

// Re-export harness types
pub use harness::{HarnessConfig, HarnessError, HarnessResult, run_harness};

// Re-export reporting
pub use report::{ReportConfig, ReportPaths, RunSummary, render_csv, render_html, write_reports};

// Re-export parsing, discovery and upload
pub use error_message::{ParsedError, parse_error_message};
pub use scan::{ImageFile, scan_images};
pub use upload::{UploadConfig, Uploader, check_health};
