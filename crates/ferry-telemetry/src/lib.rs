//! Transfer accounting primitives.
//!
//! Pure bookkeeping with no I/O:
//! - [`Time`] - elapsed wall-clock tracker that never reports a negative duration
//! - [`Progress`] - expected and cumulative byte counters, safe to share across tasks
//! - [`Throughput`] - bytes/second over a sliding window of recent updates
//! - [`TransferInfo`] - the snapshot handed to callers on every progress event

mod info;
mod progress;
mod throughput;
mod time;

pub use info::{TransferInfo, format_rate};
pub use progress::{Progress, UNKNOWN_TOTAL};
pub use throughput::Throughput;
pub use time::Time;
