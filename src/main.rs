use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use cateye_harness::config;
use cateye_harness::harness::{HarnessConfig, run_harness};
use cateye_harness::report::{ReportConfig, ReportPaths, RunSummary, write_reports, write_reports_or_snapshot};
use cateye_harness::runner::CompletedRun;
use cateye_harness::upload::check_health;

/// Seconds allowed for the endpoint reachability probe
const HEALTH_CHECK_TIMEOUT_SECS: u64 = 5;

/// CatEye Harness - upload test images to a classification endpoint and report the outcomes
#[derive(Parser, Debug)]
#[command(
    name = "cateye-harness",
    version,
    about = "Upload test images to a classification endpoint and report the outcomes as CSV and HTML",
    after_help = "ENVIRONMENT VARIABLES:\n\
        CATEYE_API_URL            Classification endpoint URL\n\
        CATEYE_COOKIE             Cookie header sent with every upload\n\
        CATEYE_UPLOAD_FIELD       Multipart field carrying the image\n\
        CATEYE_TIMEOUT_MS         Request timeout (ms)\n\
        CATEYE_REQUEST_DELAY_MS   Pause before each upload (ms)\n\
        CATEYE_CONCURRENCY        Uploads in flight at once\n\
        CATEYE_IMAGE_DIR          Directory holding the test images\n\
        CATEYE_CSV_REPORT         CSV output path\n\
        CATEYE_HTML_REPORT        HTML output path\n\
        CATEYE_REPORT_TITLE       HTML report title\n\
        RUST_LOG                  Log filter (default: info)"
)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload every image in a directory and write the reports
    Run {
        /// Directory holding the test images
        #[arg(short, long)]
        images: Option<PathBuf>,

        /// Include images in subdirectories
        #[arg(short, long)]
        recursive: bool,

        /// Classification endpoint URL (including query string)
        #[arg(short, long)]
        endpoint: Option<String>,

        /// Cookie header value, e.g. "JSESSIONID=..."
        #[arg(long)]
        cookie: Option<String>,

        /// Multipart field carrying the image
        #[arg(long)]
        field: Option<String>,

        /// Request timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Pause before each upload in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Uploads in flight at once
        #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
        concurrency: Option<u64>,

        #[command(flatten)]
        report: ReportArgs,

        /// Also save the collected results as JSON (re-render later with `render`)
        #[arg(long)]
        save_results: Option<PathBuf>,

        /// Skip probing the endpoint before uploading
        #[arg(long)]
        skip_health_check: bool,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Re-render the reports from results saved by `run --save-results`
    Render {
        /// Results JSON file
        #[arg(long)]
        results: PathBuf,

        #[command(flatten)]
        report: ReportArgs,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args, Debug)]
struct ReportArgs {
    /// CSV output path
    #[arg(long)]
    csv: Option<PathBuf>,

    /// HTML output path
    #[arg(long)]
    html: Option<PathBuf>,

    /// HTML report title
    #[arg(long)]
    title: Option<String>,

    /// Prefix of image links in the HTML report
    /// [default: the image directory relative to the HTML file]
    #[arg(long)]
    image_base: Option<String>,

    /// Embed downscaled images in the HTML report instead of linking the files
    #[arg(long)]
    embed_thumbnails: bool,
}

impl ReportArgs {
    fn into_config(self, image_dir: &Path) -> ReportConfig {
        let defaults = ReportConfig::default();
        ReportConfig {
            csv_path: self.csv.unwrap_or(defaults.csv_path),
            html_path: self.html.unwrap_or(defaults.html_path),
            title: self.title.unwrap_or(defaults.title),
            image_dir: image_dir.to_path_buf(),
            image_base: self.image_base,
            embed_thumbnails: self.embed_thumbnails,
            environment: defaults.environment,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Some(Commands::Run {
            images,
            recursive,
            endpoint,
            cookie,
            field,
            timeout_ms,
            delay_ms,
            concurrency,
            report,
            save_results,
            skip_health_check,
            json,
        }) => {
            let mut harness = HarnessConfig::default();
            if let Some(dir) = images {
                harness.image_dir = dir;
            }
            harness.recursive = recursive;
            if let Some(endpoint) = endpoint {
                harness.upload.endpoint = endpoint;
            }
            if let Some(cookie) = cookie {
                harness.upload = harness.upload.cookie(cookie);
            }
            if let Some(field) = field {
                harness.upload = harness.upload.field_name(field);
            }
            if let Some(ms) = timeout_ms {
                harness.upload = harness.upload.timeout_ms(ms);
            }
            if let Some(ms) = delay_ms {
                harness.upload = harness.upload.request_delay_ms(ms);
            }
            if let Some(n) = concurrency {
                harness.concurrency = usize::try_from(n).context("concurrency out of range")?;
            }

            if !skip_health_check
                && !check_health(&harness.upload.endpoint, HEALTH_CHECK_TIMEOUT_SECS).await
            {
                tracing::warn!(
                    "Endpoint not responding at {}; uploads will be recorded as failures",
                    harness.upload.endpoint
                );
            }

            let run = run_harness(&harness)
                .await
                .with_context(|| format!("harness failed for {}", harness.image_dir.display()))?;

            if let Some(path) = save_results {
                run.save_json(&path)
                    .with_context(|| format!("failed to save results to {}", path.display()))?;
                tracing::info!("Results saved: {}", path.display());
            }

            let paths = write_reports_or_snapshot(&run, &report.into_config(&run.image_dir), &std::env::temp_dir())
                .context("failed to write reports")?;
            print_summary(&run.summary(), &paths, json)?;
        }

        Some(Commands::Render {
            results,
            report,
            json,
        }) => {
            let run = CompletedRun::load_json(&results)
                .with_context(|| format!("failed to load results from {}", results.display()))?;
            let paths = write_reports(&run.results, &run.timing, &report.into_config(&run.image_dir))
                .context("failed to write reports")?;
            print_summary(&run.summary(), &paths, json)?;
        }

        None => {
            let cfg = config::get();
            println!("CatEye Harness - image classification endpoint tests");
            println!();
            println!("Usage: cateye-harness <COMMAND>");
            println!();
            println!("Commands:");
            println!("  run     Upload every image in a directory and write the reports");
            println!("  render  Re-render the reports from saved results");
            println!();
            println!("Endpoint: {}", cfg.upload.endpoint);
            println!("Images:   {}", cfg.input.image_dir);
            println!();
            println!("Run with --help for more information.");
        }
    }

    Ok(())
}

fn print_summary(summary: &RunSummary, paths: &ReportPaths, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    println!(
        "Run completed: {} images, {} succeeded, {} failed ({} success) in {} seconds",
        summary.total,
        summary.successes,
        summary.failures,
        summary.success_rate_percent(),
        summary.elapsed_label()
    );
    println!("  CSV:  {}", paths.csv.display());
    println!("  HTML: {}", paths.html.display());
    Ok(())
}
