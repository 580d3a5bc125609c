//! CSV and HTML reports of a finished run.
//!
//! Rendering is pure; [`write_reports`] only borrows the results, so a failed
//! write can be retried without uploading again.

pub mod csv_log;
pub mod html;
pub mod markup;
pub mod summary;
pub mod thumbnail;

pub use csv_log::render_csv;
pub use html::{HtmlOptions, render_html, tooltip};
pub use summary::RunSummary;
pub use thumbnail::embed_thumbnails;

use chrono::Local;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use crate::config;
use crate::harness::HarnessResult;
use crate::runner::{CompletedRun, RunResults, RunTiming};

/// Where and how the reports are written
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub csv_path: PathBuf,
    pub html_path: PathBuf,
    pub title: String,
    /// Directory the images were scanned from
    pub image_dir: PathBuf,
    /// Link prefix for images; derived from `image_dir` and the HTML path when unset
    pub image_base: Option<String>,
    /// Inline thumbnails as data URIs instead of linking the image files
    pub embed_thumbnails: bool,
    /// Footer label, e.g. host and harness version
    pub environment: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        let cfg = config::get();
        Self {
            csv_path: PathBuf::from(&cfg.report.csv_path),
            html_path: PathBuf::from(&cfg.report.html_path),
            title: cfg.report.title.clone(),
            image_dir: PathBuf::from(&cfg.input.image_dir),
            image_base: None,
            embed_thumbnails: false,
            environment: environment_label(),
        }
    }
}

impl ReportConfig {
    /// Prefix the HTML report puts in front of each image name
    pub fn image_link_base(&self) -> String {
        if let Some(base) = &self.image_base {
            return base.clone();
        }
        let report_dir = match self.html_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        relative_link(&self.image_dir, report_dir)
    }
}

/// `target` as a `/`-separated link relative to `from_dir`
fn relative_link(target: &Path, from_dir: &Path) -> String {
    let target = std::path::absolute(target).unwrap_or_else(|_| target.to_path_buf());
    let from_dir = std::path::absolute(from_dir).unwrap_or_else(|_| from_dir.to_path_buf());
    let target: Vec<Component> = target.components().filter(|c| *c != Component::CurDir).collect();
    let from_dir: Vec<Component> = from_dir.components().filter(|c| *c != Component::CurDir).collect();

    let shared = target.iter().zip(&from_dir).take_while(|(a, b)| a == b).count();
    let mut parts: Vec<String> = vec!["..".to_string(); from_dir.len() - shared];
    parts.extend(
        target[shared..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );

    if parts.first().is_some_and(|p| p == "..") {
        parts.join("/")
    } else {
        std::iter::once(".".to_string()).chain(parts).collect::<Vec<_>>().join("/")
    }
}

/// Paths of the written reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub csv: PathBuf,
    pub html: PathBuf,
}

/// Render both reports and write them, overwriting earlier ones
pub fn write_reports(
    results: &RunResults,
    timing: &RunTiming,
    config: &ReportConfig,
) -> HarnessResult<ReportPaths> {
    let csv = render_csv(results)?;
    std::fs::write(&config.csv_path, csv)?;
    tracing::info!("CSV log saved: {}", config.csv_path.display());

    let thumbnails = if config.embed_thumbnails {
        embed_thumbnails(results)
    } else {
        HashMap::new()
    };
    let options = HtmlOptions {
        title: config.title.clone(),
        generated_at: Local::now(),
        environment: config.environment.clone(),
        image_base: config.image_link_base(),
        thumbnails,
    };
    let html = render_html(results, timing, &options);
    std::fs::write(&config.html_path, html)?;
    tracing::info!("HTML report generated: {}", config.html_path.display());

    Ok(ReportPaths {
        csv: config.csv_path.clone(),
        html: config.html_path.clone(),
    })
}

/// Write the reports; if that fails, save the run as a JSON snapshot in
/// `snapshot_dir` so only the write step has to be repeated. The write error
/// is returned either way.
pub fn write_reports_or_snapshot(
    run: &CompletedRun,
    config: &ReportConfig,
    snapshot_dir: &Path,
) -> HarnessResult<ReportPaths> {
    let err = match write_reports(&run.results, &run.timing, config) {
        Ok(paths) => return Ok(paths),
        Err(err) => err,
    };

    let snapshot = snapshot_dir.join(format!(
        "cateye-results-{}.json",
        run.timing.finished_at.format("%Y%m%d-%H%M%S")
    ));
    match run.save_json(&snapshot) {
        Ok(()) => tracing::error!(
            "Report writing failed; results kept in {}, retry with: cateye-harness render --results {}",
            snapshot.display(),
            snapshot.display()
        ),
        Err(save_err) => tracing::warn!("could not save results snapshot: {}", save_err),
    }
    Err(err)
}

/// "<host> | cateye-harness <version>"
pub fn environment_label() -> String {
    let host = hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown host".to_string());
    format!("{} | {} {}", host, env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}
