//! Error types for ferry-transfer.

use ferry_endpoint::{Protocol, TaskId};
use thiserror::Error;

use crate::report::TransferReport;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("cannot transfer between {source_protocol} and {destination_protocol}: delegated endpoints only pair with each other")]
    Incompatible {
        source_protocol:      Protocol,
        destination_protocol: Protocol,
    },

    #[error("destination protocol {0} is read-only")]
    ReadOnlyDestination(Protocol),

    #[error("remote task {task_id} failed")]
    RemoteTransferFailure { task_id: TaskId },

    #[error("remote task {task_id} did not finish after {polls} polls")]
    Timeout { task_id: TaskId, polls: u32 },

    #[error("transfer cancelled")]
    Cancelled,

    #[error("{failed} of {total} files failed")]
    FilesFailed {
        failed: usize,
        total:  usize,
        report: Box<TransferReport>,
    },

    #[error("invalid transfer options: {0}")]
    InvalidOptions(String),

    #[error(transparent)]
    Endpoint(#[from] ferry_endpoint::Error),

    #[error("transfer task aborted: {0}")]
    Aborted(String),
}

pub type Result<T> = std::result::Result<T, TransferError>;
