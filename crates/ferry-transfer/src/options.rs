use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TransferError};

pub const DEFAULT_SLICE_SIZE: usize = 1024 * 1024;
pub const DEFAULT_MAX_CONCURRENT_FILES: usize = 5;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_MAX_POLLS: u32 = 100;

/// What to do when a drain rejects a slice.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SliceWritePolicy {
    /// Stop the file, leave the drain unfinished and report the file failed.
    #[default]
    AbortFile,
    /// Retry the same slice up to `attempts` more times with exponential
    /// backoff, then abort the file.
    Retry {
        attempts: u32,
        #[serde(with = "seconds")]
        backoff:  Duration,
    },
    /// Log the failure, count it against the file and move on to the next slice.
    CountAndContinue,
}

impl SliceWritePolicy {
    /// Additional attempts allowed after the first write failed.
    pub fn retries(&self) -> u32 {
        match self {
            SliceWritePolicy::Retry { attempts, .. } => *attempts,
            _ => 0,
        }
    }

    /// Delay before retry number `retry_count` (0-indexed).
    pub fn delay(&self, retry_count: u32) -> Duration {
        match self {
            SliceWritePolicy::Retry { backoff, .. } => retry_delay(retry_count, *backoff),
            _ => Duration::ZERO,
        }
    }
}

/// Calculate the delay before a retry attempt using exponential backoff.
///
/// The delay formula is: `base * 2^retry_count`
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use ferry_transfer::retry_delay;
///
/// assert_eq!(retry_delay(0, Duration::from_millis(100)), Duration::from_millis(100));
/// assert_eq!(retry_delay(2, Duration::from_millis(100)), Duration::from_millis(400));
/// ```
pub fn retry_delay(retry_count: u32, base: Duration) -> Duration {
    let multiplier = 2_u32.saturating_pow(retry_count);
    base.saturating_mul(multiplier)
}

/// Configuration for one transfer.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use ferry_transfer::{SliceWritePolicy, TransferOptions};
///
/// let options = TransferOptions::default()
///     .max_concurrent_files(8)
///     .slice_write_policy(SliceWritePolicy::CountAndContinue)
///     .deadline(Duration::from_secs(600));
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferOptions {
    /// Upper bound on slice length for streaming transfers.
    pub slice_size: usize,

    /// Files streamed at once within one transfer. `1` copies sequentially.
    pub max_concurrent_files: usize,

    pub slice_write_policy: SliceWritePolicy,

    /// Fail the whole transfer when any file was skipped or failed.
    pub strict: bool,

    /// Delay between delegated status polls.
    #[serde(with = "seconds")]
    pub poll_interval: Duration,

    /// Polls performed before a delegated transfer times out.
    pub max_polls: u32,

    /// Wall-clock bound on delegated polling, on top of `max_polls`.
    #[serde(with = "optional_seconds")]
    pub deadline: Option<Duration>,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            slice_size:           DEFAULT_SLICE_SIZE,
            max_concurrent_files: DEFAULT_MAX_CONCURRENT_FILES,
            slice_write_policy:   SliceWritePolicy::default(),
            strict:               false,
            poll_interval:        DEFAULT_POLL_INTERVAL,
            max_polls:            DEFAULT_MAX_POLLS,
            deadline:             None,
        }
    }
}

impl TransferOptions {
    #[must_use]
    pub fn slice_size(mut self, slice_size: usize) -> Self {
        self.slice_size = slice_size;
        self
    }

    #[must_use]
    pub fn max_concurrent_files(mut self, files: usize) -> Self {
        self.max_concurrent_files = files;
        self
    }

    #[must_use]
    pub fn slice_write_policy(mut self, policy: SliceWritePolicy) -> Self {
        self.slice_write_policy = policy;
        self
    }

    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub fn max_polls(mut self, polls: u32) -> Self {
        self.max_polls = polls;
        self
    }

    #[must_use]
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.slice_size == 0 {
            return Err(TransferError::InvalidOptions("slice_size must be positive".into()));
        }
        if self.max_concurrent_files == 0 {
            return Err(TransferError::InvalidOptions(
                "max_concurrent_files must be positive".into(),
            ));
        }
        if self.max_polls == 0 {
            return Err(TransferError::InvalidOptions("max_polls must be positive".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(TransferError::InvalidOptions("poll_interval must be positive".into()));
        }
        Ok(())
    }
}

/// Durations as fractional seconds, which reads naturally in config files.
mod seconds {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

mod optional_seconds {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&d.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Option::<f64>::deserialize(deserializer)?
            .map(|secs| Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom))
            .transpose()
    }
}
