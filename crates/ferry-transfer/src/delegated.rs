//! Remote-task transfers: submit once, then poll on a timer until the task
//! reaches a terminal status, the poll budget or deadline runs out, or the
//! caller cancels.
//!
//! A failed status poll uses up one poll of the budget and polling goes on.

use std::sync::Arc;

use ferry_endpoint::{ControlPlane, Delegation, RemoteLocation, TaskId, TaskStatus};
use tokio::time::{Instant, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Result, TransferError};
use crate::options::TransferOptions;
use crate::telemetry::Meter;

pub(crate) async fn run(
    source: Delegation,
    destination: RemoteLocation,
    options: &TransferOptions,
    meter: Arc<Meter>,
    cancel: CancellationToken,
) -> Result<TaskId> {
    if cancel.is_cancelled() {
        return Err(TransferError::Cancelled);
    }
    let plane = source.plane;
    let task = plane.submit(&source.location, &destination).await?;
    info!(
        task = %task,
        source = %source.location.path,
        destination = %destination.path,
        "submitted delegated transfer"
    );
    meter.start();

    let deadline = options.deadline.map(|d| Instant::now() + d);
    let mut ticker = interval(options.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut polls = 0;
    while polls < options.max_polls {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                abandon(plane.as_ref(), &task).await;
                return Err(TransferError::Cancelled);
            }
            _ = ticker.tick() => {}
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }

        polls += 1;
        let detail = match plane.task_detail(&task).await {
            Ok(detail) => detail,
            Err(e) => {
                warn!(task = %task, poll = polls, error = %e, "task status poll failed");
                continue;
            }
        };
        meter.advance_to(detail.bytes_transferred);
        debug!(task = %task, poll = polls, status = ?detail.status, bytes = detail.bytes_transferred, "polled task");

        if !detail.status.is_terminal() {
            continue;
        }
        if detail.status == TaskStatus::Failed {
            return Err(TransferError::RemoteTransferFailure { task_id: task });
        }
        meter.set_total(detail.bytes_transferred);
        meter.emit();
        return Ok(task);
    }

    warn!(task = %task, polls, "delegated transfer timed out");
    abandon(plane.as_ref(), &task).await;
    Err(TransferError::Timeout { task_id: task, polls })
}

/// Best-effort remote cancel; failures are only logged.
async fn abandon(plane: &dyn ControlPlane, task: &TaskId) {
    if let Err(e) = plane.cancel(task).await {
        warn!(task = %task, error = %e, "failed to cancel remote task");
    }
}
