//! Transfer orchestration between ferry endpoints.
//!
//! A [`Transfer`] inspects the capabilities of its two resources and picks a
//! [`Strategy`]:
//! - **Streaming** - one tap-to-drain pipeline per file, run concurrently up
//!   to [`TransferOptions::max_concurrent_files`]. Per-file setup failures skip
//!   the file; slice write failures follow the [`SliceWritePolicy`].
//! - **Delegated** - both ends live on a remote control plane; the transfer
//!   is submitted once and polled until it succeeds, fails, times out or is
//!   cancelled.
//!
//! Either way the caller consumes one stream of
//! [`TransferInfo`](ferry_telemetry::TransferInfo) snapshots and gets a
//! [`TransferReport`] at the end.

mod delegated;
mod error;
mod options;
mod report;
mod strategy;
mod streaming;
mod telemetry;
mod transfer;

pub use error::{Result, TransferError};
pub use options::{
    DEFAULT_MAX_CONCURRENT_FILES, DEFAULT_MAX_POLLS, DEFAULT_POLL_INTERVAL, DEFAULT_SLICE_SIZE,
    SliceWritePolicy, TransferOptions, retry_delay,
};
pub use report::{FileOutcome, FileStatus, TransferReport};
pub use strategy::Strategy;
pub use transfer::{Transfer, TransferHandle, TransferRun};
