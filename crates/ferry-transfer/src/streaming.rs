//! Tap-to-drain pipelines, one per file, fanned out under a semaphore.

use std::sync::Arc;
use std::time::Instant;

use ferry_endpoint::{Drain, IdMap, Resource, Slice, Stat};
use futures_util::stream::FuturesUnordered;
use futures_util::{FutureExt, StreamExt};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Result, TransferError};
use crate::options::{SliceWritePolicy, TransferOptions};
use crate::report::{FileOutcome, FileStatus};
use crate::telemetry::Meter;

/// Where a file's drain comes from.
enum Target {
    /// The destination resource itself (single-file transfers).
    Itself,
    /// `sink_for(stat)` below the destination root.
    Below(Stat),
}

/// One file to move.
struct FileJob {
    source: Arc<dyn Resource>,
    target: Target,
    path:   String,
    size:   u64,
}

/// Result of planning: the expected total and the file pipelines to run.
pub(crate) struct Plan {
    pub(crate) total: u64,
    jobs:             Vec<FileJob>,
    skipped:          Vec<FileOutcome>,
}

fn skipped(path: String, reason: &ferry_endpoint::Error) -> FileOutcome {
    warn!(path = %path, error = %reason, "skipping file");
    FileOutcome {
        path,
        size: 0,
        bytes: 0,
        duration: Default::default(),
        status: FileStatus::Skipped(reason.to_string()),
        slice_failures: 0,
    }
}

fn job(source: &Arc<dyn Resource>, file: Stat) -> std::result::Result<FileJob, FileOutcome> {
    match source.child(&file.name) {
        Ok(child) => Ok(FileJob {
            source: child,
            path:   file.name.clone(),
            size:   file.size,
            target: Target::Below(file),
        }),
        Err(e) => Err(skipped(file.name, &e)),
    }
}

/// Build the file list from the source root stat, or from an explicit list.
///
/// Files that cannot be resolved or stat'ed are recorded as skipped; the
/// rest of the list still runs.
pub(crate) async fn plan(source: &Arc<dyn Resource>, root: &Stat, files: &[IdMap]) -> Result<Plan> {
    let mut found = Vec::new();
    let mut skipped_files = Vec::new();

    if !files.is_empty() {
        for entry in files {
            let relative = entry.path.trim_start_matches('/').to_string();
            let child = match source.child(&relative) {
                Ok(child) => child,
                Err(e) => {
                    skipped_files.push(skipped(relative, &e));
                    continue;
                }
            };
            match child.stat().await {
                Ok(stat) if !stat.is_dir => found.push(Stat { name: relative, ..stat }),
                Ok(dir) => found.extend(dir.files().into_iter().map(|file| Stat {
                    name: format!("{relative}/{}", file.name),
                    ..file
                })),
                Err(e) => skipped_files.push(skipped(relative, &e)),
            }
        }
    } else if root.is_dir {
        found = root.files();
    } else {
        let jobs = vec![FileJob {
            source: Arc::clone(source),
            path:   source.path().to_string(),
            size:   root.size,
            target: Target::Itself,
        }];
        return Ok(Plan {
            total: root.size,
            jobs,
            skipped: skipped_files,
        });
    }

    let mut jobs = Vec::with_capacity(found.len());
    for file in found {
        match job(source, file) {
            Ok(job) => jobs.push(job),
            Err(outcome) => skipped_files.push(outcome),
        }
    }
    let total = jobs.iter().map(|j| j.size).fold(0u64, u64::saturating_add);
    Ok(Plan {
        total,
        jobs,
        skipped: skipped_files,
    })
}

/// Run every job of `plan`, at most `max_concurrent_files` at a time.
///
/// Returns the per-file outcomes, or `Cancelled` if the token fired.
pub(crate) async fn run(
    plan: Plan,
    destination: Arc<dyn Resource>,
    options: &TransferOptions,
    slice_size: usize,
    meter: Arc<Meter>,
    cancel: CancellationToken,
) -> Result<Vec<FileOutcome>> {
    let Plan { jobs, skipped, .. } = plan;
    let semaphore = Arc::new(Semaphore::new(options.max_concurrent_files));
    let mut tasks = FuturesUnordered::new();
    let mut outcomes = skipped;

    for job in jobs {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            permit = Arc::clone(&semaphore).acquire_owned() => {
                permit.map_err(|e| TransferError::Aborted(e.to_string()))?
            }
        };

        let path = job.path.clone();
        let pipeline = Pipeline {
            destination: Arc::clone(&destination),
            slice_size,
            policy: options.slice_write_policy.clone(),
            meter: Arc::clone(&meter),
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(async move {
            let _permit = permit;
            pipeline.copy(job).await
        });
        tasks.push(task.map(move |joined| (path, joined)));
    }

    while let Some((path, joined)) = tasks.next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                warn!(path = %path, error = %e, "file pipeline panicked");
                outcomes.push(FileOutcome {
                    path,
                    size: 0,
                    bytes: 0,
                    duration: Default::default(),
                    status: FileStatus::Failed(e.to_string()),
                    slice_failures: 0,
                });
            }
        }
    }

    if cancel.is_cancelled() {
        return Err(TransferError::Cancelled);
    }
    Ok(outcomes)
}

struct Pipeline {
    destination: Arc<dyn Resource>,
    slice_size:  usize,
    policy:      SliceWritePolicy,
    meter:       Arc<Meter>,
    cancel:      CancellationToken,
}

impl Pipeline {
    async fn copy(self, job: FileJob) -> FileOutcome {
        let started = Instant::now();
        let mut outcome = FileOutcome {
            path:           job.path,
            size:           job.size,
            bytes:          0,
            duration:       Default::default(),
            status:         FileStatus::Completed,
            slice_failures: 0,
        };
        outcome.status = self.stream(&job.source, &job.target, &mut outcome).await;
        outcome.duration = started.elapsed();

        match &outcome.status {
            FileStatus::Completed => info!(
                path = %outcome.path,
                bytes = outcome.bytes,
                slice_failures = outcome.slice_failures,
                elapsed_ms = outcome.duration.as_millis() as u64,
                "file transferred"
            ),
            FileStatus::Cancelled => debug!(path = %outcome.path, "file cancelled"),
            FileStatus::Skipped(reason) | FileStatus::Failed(reason) => {
                warn!(path = %outcome.path, reason = %reason, "file not transferred")
            }
        }
        outcome
    }

    async fn stream(&self, source: &Arc<dyn Resource>, target: &Target, outcome: &mut FileOutcome) -> FileStatus {
        let tap = match source.tap().await {
            Ok(tap) => tap,
            Err(e) => return setup_failed(e),
        };
        let drain = match target {
            Target::Itself => self.destination.sink().await,
            Target::Below(stat) => self.destination.sink_for(stat).await,
        };
        let mut drain = match drain {
            Ok(drain) => drain,
            Err(e) => return setup_failed(e),
        };

        let mut slices = tap.open(self.slice_size);
        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return FileStatus::Cancelled,
                next = slices.next() => next,
            };
            let slice = match next {
                None => break,
                Some(Ok(slice)) => slice,
                Some(Err(e)) => return FileStatus::Failed(format!("read failed: {e}")),
            };

            let len = slice.len() as u64;
            match self.write(drain.as_mut(), slice).await {
                Ok(()) => outcome.bytes += len,
                Err(e) if self.policy == SliceWritePolicy::CountAndContinue => {
                    warn!(path = %outcome.path, error = %e, "dropped slice");
                    outcome.slice_failures += 1;
                }
                Err(e) => return FileStatus::Failed(e.to_string()),
            }
            self.meter.record(len);
        }

        match drain.finish().await {
            Ok(()) => FileStatus::Completed,
            Err(e) => FileStatus::Failed(format!("commit failed: {e}")),
        }
    }

    async fn write(&self, drain: &mut dyn Drain, slice: Slice) -> ferry_endpoint::Result<()> {
        let mut retry = 0;
        loop {
            match drain.drain(slice.clone()).await {
                Ok(()) => return Ok(()),
                Err(e) if retry < self.policy.retries() => {
                    let delay = self.policy.delay(retry);
                    debug!(offset = slice.offset(), retry, error = %e, "retrying slice");
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// A tap or drain that could not be built skips the file; anything else fails it.
fn setup_failed(e: ferry_endpoint::Error) -> FileStatus {
    if e.is_construction() {
        FileStatus::Skipped(e.to_string())
    } else {
        FileStatus::Failed(format!("setup failed: {e}"))
    }
}
