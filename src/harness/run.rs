use chrono::Local;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};

use crate::harness::types::{HarnessConfig, HarnessResult};
use crate::runner::{Attempt, CompletedRun, ErrorCode, ResultRecord, RunResults, RunTiming};
use crate::scan::{ImageFile, scan_images};
use crate::upload::Uploader;

/// Runs the harness: uploads every image in the configured directory and
/// collects the outcomes. Failed uploads are recorded, never returned as
/// errors; only setup problems (missing directory, bad client config) are.
pub async fn run_harness(config: &HarnessConfig) -> HarnessResult<CompletedRun> {
    let images = scan_images(&config.image_dir, config.recursive)?;
    tracing::info!(
        "Uploading {} images from {} to {}",
        images.len(),
        config.image_dir.display(),
        config.upload.endpoint
    );

    let uploader = Uploader::new(config.upload.clone())?;

    let started_at = Local::now();
    let results = upload_all(uploader, images, config.concurrency).await;
    let finished_at = Local::now();

    Ok(CompletedRun {
        results,
        timing: RunTiming::new(started_at, finished_at),
        image_dir: config.image_dir.clone(),
    })
}

/// Upload `images` with at most `concurrency` requests in flight.
///
/// Records are appended here, by the single owner of the collector, in the
/// order the attempts settle.
pub async fn upload_all(uploader: Uploader, images: Vec<ImageFile>, concurrency: usize) -> RunResults {
    let uploader = Arc::new(uploader);
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();
    let mut pending = HashMap::new();

    // Permits are taken before spawning so attempts start in listing order.
    for image in images {
        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
            break;
        };
        let uploader = Arc::clone(&uploader);
        let task_image = image.clone();
        let handle = tasks.spawn(async move {
            let record = uploader.upload(&task_image).await;
            drop(permit);
            record
        });
        pending.insert(handle.id(), image);
    }

    let results = collect(tasks, pending).await;
    tracing::info!(
        "Uploads settled: {} succeeded, {} failed",
        results.successes().len(),
        results.failures().len()
    );
    results
}

/// Drain the upload tasks. A task that panicked or was cancelled still
/// settles its image, as an `Unknown` failure.
async fn collect(mut tasks: JoinSet<ResultRecord>, mut pending: HashMap<task::Id, ImageFile>) -> RunResults {
    let mut results = RunResults::new();
    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((id, record)) => {
                pending.remove(&id);
                results.record(record);
            }
            Err(err) => match pending.remove(&err.id()) {
                Some(image) => {
                    tracing::error!(image = %image.name, "upload task failed: {}", err);
                    let attempt = Attempt::new(&image.name, &image.extension, image.size_bytes, Duration::ZERO)
                        .with_path(&image.path);
                    results.record(attempt.failed(ErrorCode::Unknown, format!("upload task failed: {}", err)));
                }
                None => tracing::error!("upload task failed: {}", err),
            },
        }
    }
    results
}
