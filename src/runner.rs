//! Types for test run results.
//!
//! Every upload attempt settles into exactly one [`ResultRecord`]. Records are
//! collected by [`RunResults`], which keeps successes and failures in two
//! append-only sequences owned by whoever drives the run.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::harness::HarnessResult;
use crate::report::RunSummary;

/// Code attached to a failed upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<u16>", into = "Option<u16>")]
pub enum ErrorCode {
    /// HTTP status, or a domain code found in the error message
    Status(u16),
    /// The request never produced a response (network error, timeout)
    Unknown,
}

impl From<Option<u16>> for ErrorCode {
    fn from(code: Option<u16>) -> Self {
        code.map_or(ErrorCode::Unknown, ErrorCode::Status)
    }
}

impl From<ErrorCode> for Option<u16> {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::Status(status) => Some(status),
            ErrorCode::Unknown => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::Status(status) => write!(f, "{}", status),
            ErrorCode::Unknown => write!(f, "Unknown"),
        }
    }
}

/// One label of a classification response with its confidence percentage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Confidence {
    pub label: String,
    pub percent: f64,
}

impl Confidence {
    pub fn new(label: impl Into<String>, percent: f64) -> Self {
        Self {
            label: label.into(),
            percent,
        }
    }
}

/// How an upload attempt settled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Accepted response with label confidences, in response order
    Success { response_data: Vec<Confidence> },
    /// Rejected or failed request
    Failure {
        error_code: ErrorCode,
        error_message: String,
    },
}

/// Facts about an upload attempt known before its outcome
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    /// Location of the uploaded file
    pub file_path: PathBuf,
    /// File name including extension
    pub image_name: String,
    /// Lower-cased extension without the dot
    pub extension: String,
    /// Human-readable size, e.g. "12.34 KB"
    pub size: String,
    /// Elapsed request time, e.g. "312 ms"
    pub response_time: String,
}

impl Attempt {
    pub fn new(image_name: impl Into<String>, extension: impl Into<String>, size_bytes: u64, elapsed: Duration) -> Self {
        let image_name = image_name.into();
        Self {
            file_path: PathBuf::from(&image_name),
            image_name,
            extension: extension.into().to_lowercase(),
            size: format_size(size_bytes),
            response_time: format_response_time(elapsed),
        }
    }

    /// Set where the file lives (defaults to the bare image name)
    pub fn with_path(mut self, file_path: impl Into<PathBuf>) -> Self {
        self.file_path = file_path.into();
        self
    }

    /// Settle this attempt as accepted
    pub fn succeeded(self, response_data: Vec<Confidence>) -> ResultRecord {
        ResultRecord::settle(self, Outcome::Success { response_data })
    }

    /// Settle this attempt as failed
    pub fn failed(self, error_code: ErrorCode, error_message: impl Into<String>) -> ResultRecord {
        ResultRecord::settle(
            self,
            Outcome::Failure {
                error_code,
                error_message: error_message.into(),
            },
        )
    }
}

/// Outcome of one image upload, with everything the reports need
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub file_path: PathBuf,
    pub image_name: String,
    pub extension: String,
    pub size: String,
    pub response_time: String,
    pub outcome: Outcome,
}

impl ResultRecord {
    fn settle(attempt: Attempt, outcome: Outcome) -> Self {
        Self {
            file_path: attempt.file_path,
            image_name: attempt.image_name,
            extension: attempt.extension,
            size: attempt.size,
            response_time: attempt.response_time,
            outcome,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success { .. })
    }

    /// Error code of a failed record
    pub fn error_code(&self) -> Option<ErrorCode> {
        match &self.outcome {
            Outcome::Failure { error_code, .. } => Some(*error_code),
            Outcome::Success { .. } => None,
        }
    }

    /// Image name with the last dot-delimited suffix removed
    pub fn name_without_extension(&self) -> &str {
        match self.image_name.rfind('.') {
            Some(idx) if idx > 0 => &self.image_name[..idx],
            _ => &self.image_name,
        }
    }

    /// "Success" or "Error (<code>)"
    pub fn status_label(&self) -> String {
        match &self.outcome {
            Outcome::Success { .. } => "Success".to_string(),
            Outcome::Failure { error_code, .. } => format!("Error ({})", error_code),
        }
    }

    /// The error message, or "No message" when there is none
    pub fn message_label(&self) -> &str {
        match &self.outcome {
            Outcome::Failure { error_message, .. } if !error_message.is_empty() => error_message,
            _ => "No message",
        }
    }
}

/// Collector for the records of one run.
///
/// Successes and failures are kept apart in settle order. Reports iterate
/// successes first, then failures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResults {
    successes: Vec<ResultRecord>,
    failures: Vec<ResultRecord>,
}

impl RunResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an accepted attempt
    pub fn record_success(&mut self, attempt: Attempt, response_data: Vec<Confidence>) {
        self.successes.push(attempt.succeeded(response_data));
    }

    /// Append a failed attempt
    pub fn record_failure(&mut self, attempt: Attempt, error_code: ErrorCode, error_message: impl Into<String>) {
        self.failures.push(attempt.failed(error_code, error_message));
    }

    /// Append a settled record to the sequence matching its outcome
    pub fn record(&mut self, record: ResultRecord) {
        if record.is_success() {
            self.successes.push(record);
        } else {
            self.failures.push(record);
        }
    }

    pub fn successes(&self) -> &[ResultRecord] {
        &self.successes
    }

    pub fn failures(&self) -> &[ResultRecord] {
        &self.failures
    }

    /// All records in report order: successes, then failures
    pub fn iter(&self) -> impl Iterator<Item = &ResultRecord> {
        self.successes.iter().chain(self.failures.iter())
    }

    pub fn total(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Wall-clock bounds of a run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunTiming {
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

impl RunTiming {
    pub fn new(started_at: DateTime<Local>, finished_at: DateTime<Local>) -> Self {
        Self {
            started_at,
            finished_at,
        }
    }

    /// Run duration in seconds (millisecond resolution)
    pub fn elapsed_seconds(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

/// A finished run: everything needed to (re)render the reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedRun {
    pub results: RunResults,
    pub timing: RunTiming,
    /// Directory the images were scanned from, for linking them in reports
    #[serde(default)]
    pub image_dir: PathBuf,
}

impl CompletedRun {
    pub fn summary(&self) -> RunSummary {
        RunSummary::new(&self.results, &self.timing)
    }

    /// Save the run as JSON so the reports can be rendered again later
    pub fn save_json(&self, path: impl AsRef<Path>) -> HarnessResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a run previously written by [`CompletedRun::save_json`]
    pub fn load_json(path: impl AsRef<Path>) -> HarnessResult<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

/// Format a byte count as kilobytes with two decimals
pub fn format_size(bytes: u64) -> String {
    format!("{:.2} KB", bytes as f64 / 1024.0)
}

/// Format an elapsed duration as whole milliseconds
pub fn format_response_time(elapsed: Duration) -> String {
    format!("{} ms", elapsed.as_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn attempt(name: &str) -> Attempt {
        let ext = name.rsplit('.').next().unwrap_or_default();
        Attempt::new(name, ext, 1024, Duration::from_millis(100))
    }

    #[test]
    fn test_attempt_formats_size_and_time() {
        let a = Attempt::new("Cat.JPG", "JPG", 12636, Duration::from_millis(312));
        assert_eq!(a.extension, "jpg");
        assert_eq!(a.size, "12.34 KB");
        assert_eq!(a.response_time, "312 ms");
    }

    #[test]
    fn test_collector_routes_by_outcome() {
        let mut results = RunResults::new();
        results.record_success(attempt("a.jpg"), vec![Confidence::new("cat", 99.5)]);
        results.record_failure(attempt("b.png"), ErrorCode::Status(500), "boom");
        results.record(attempt("c.webp").failed(ErrorCode::Unknown, "timeout"));
        results.record(attempt("d.jpg").succeeded(vec![]));

        assert_eq!(results.total(), 4);
        assert_eq!(results.successes().len(), 2);
        assert_eq!(results.failures().len(), 2);
        assert!(results.successes().iter().all(ResultRecord::is_success));
        assert!(results.failures().iter().all(|r| !r.is_success()));
    }

    #[test]
    fn test_iter_puts_successes_first_in_append_order() {
        let mut results = RunResults::new();
        results.record(attempt("f1.jpg").failed(ErrorCode::Status(400), "400"));
        results.record(attempt("s1.jpg").succeeded(vec![]));
        results.record(attempt("f2.jpg").failed(ErrorCode::Unknown, ""));
        results.record(attempt("s2.jpg").succeeded(vec![]));

        let names: Vec<&str> = results.iter().map(|r| r.image_name.as_str()).collect();
        assert_eq!(names, ["s1.jpg", "s2.jpg", "f1.jpg", "f2.jpg"]);
    }

    #[test]
    fn test_empty_results() {
        let results = RunResults::new();
        assert!(results.is_empty());
        assert_eq!(results.iter().count(), 0);
    }

    #[test]
    fn test_name_without_extension() {
        assert_eq!(attempt("cat.eye.jpg").succeeded(vec![]).name_without_extension(), "cat.eye");
        assert_eq!(attempt("noext").succeeded(vec![]).name_without_extension(), "noext");
        assert_eq!(attempt(".hidden").succeeded(vec![]).name_without_extension(), ".hidden");
    }

    #[test]
    fn test_status_and_message_labels() {
        let ok = attempt("a.jpg").succeeded(vec![]);
        assert_eq!(ok.status_label(), "Success");
        assert_eq!(ok.message_label(), "No message");

        let bad = attempt("b.jpg").failed(ErrorCode::Status(400), "dog_prob: 0.9");
        assert_eq!(bad.status_label(), "Error (400)");
        assert_eq!(bad.message_label(), "dog_prob: 0.9");

        let lost = attempt("c.jpg").failed(ErrorCode::Unknown, "");
        assert_eq!(lost.status_label(), "Error (Unknown)");
        assert_eq!(lost.message_label(), "No message");
    }

    #[test]
    fn test_error_code_serializes_as_number_or_null() {
        assert_eq!(serde_json::to_string(&ErrorCode::Status(503)).unwrap(), "503");
        assert_eq!(serde_json::to_string(&ErrorCode::Unknown).unwrap(), "null");
        let back: ErrorCode = serde_json::from_str("null").unwrap();
        assert_eq!(back, ErrorCode::Unknown);
    }

    #[test]
    fn test_elapsed_seconds() {
        let start = Local.with_ymd_and_hms(2024, 11, 5, 10, 0, 0).unwrap();
        let end = start + chrono::Duration::milliseconds(12_345);
        assert_eq!(RunTiming::new(start, end).elapsed_seconds(), 12.345);
    }

    #[test]
    fn test_completed_run_json_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        let start = Local.with_ymd_and_hms(2024, 11, 5, 10, 0, 0).unwrap();

        let mut results = RunResults::new();
        results.record_success(attempt("a.jpg"), vec![Confidence::new("cat", 97.25)]);
        results.record_failure(attempt("b.jpg"), ErrorCode::Unknown, "timeout");
        let run = CompletedRun {
            results,
            timing: RunTiming::new(start, start + chrono::Duration::seconds(3)),
            image_dir: PathBuf::from("./unit_test_catEye"),
        };

        run.save_json(&path).unwrap();
        let loaded = CompletedRun::load_json(&path).unwrap();
        assert_eq!(loaded, run);
    }
}
