use std::fmt;
use std::time::Duration;

use ferry_endpoint::TaskId;
use ferry_telemetry::TransferInfo;
use serde::Serialize;

use crate::strategy::Strategy;

/// How one file of a streaming transfer ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum FileStatus {
    Completed,
    /// Tap or drain could not be built; nothing was written.
    Skipped(String),
    /// Streaming started but the file was abandoned. The destination may hold
    /// partial content.
    Failed(String),
    Cancelled,
}

/// Per-file result, kept by the transfer that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    /// Path relative to the source root, or the source path for single files.
    pub path:           String,
    /// Size according to the source stat.
    pub size:           u64,
    /// Bytes the drain accepted.
    pub bytes:          u64,
    pub duration:       Duration,
    pub status:         FileStatus,
    /// Slices dropped under `SliceWritePolicy::CountAndContinue`.
    pub slice_failures: u32,
}

impl FileOutcome {
    pub fn is_success(&self) -> bool { self.status == FileStatus::Completed && self.slice_failures == 0 }
}

/// Everything known about a finished transfer.
#[derive(Debug, Clone, Serialize)]
pub struct TransferReport {
    pub strategy: Strategy,
    /// Last snapshot, taken after the clock stopped.
    pub info:     TransferInfo,
    /// Per-file outcomes in completion order. Empty for delegated transfers.
    pub files:    Vec<FileOutcome>,
    /// Remote task of a delegated transfer.
    pub task_id:  Option<TaskId>,
}

impl TransferReport {
    pub fn failed(&self) -> impl Iterator<Item = &FileOutcome> { self.files.iter().filter(|f| !f.is_success()) }

    pub fn failed_count(&self) -> usize { self.failed().count() }

    pub fn is_clean(&self) -> bool { self.failed_count() == 0 }
}

impl fmt::Display for TransferReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.info)?;
        if !self.files.is_empty() {
            write!(
                f,
                ", {} of {} files ok",
                self.files.len() - self.failed_count(),
                self.files.len()
            )?;
        }
        if let Some(task) = &self.task_id {
            write!(f, ", task {task}")?;
        }
        Ok(())
    }
}
