use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Progress, Throughput, Time, UNKNOWN_TOTAL};

/// Externally observed progress of one transfer.
///
/// This is the shape persisted by job tracking and polled by UIs, so field
/// names are stable in their camelCase serialized form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferInfo {
    /// Expected bytes, or [`UNKNOWN_TOTAL`] while the remote has not reported it.
    pub total: u64,

    /// Cumulative bytes moved so far.
    pub transferred: u64,

    pub elapsed_seconds: f64,

    pub throughput_bytes_per_second: f64,
}

impl Default for TransferInfo {
    fn default() -> Self {
        Self {
            total: UNKNOWN_TOTAL,
            transferred: 0,
            elapsed_seconds: 0.0,
            throughput_bytes_per_second: 0.0,
        }
    }
}

impl TransferInfo {
    pub fn new() -> Self { Self::default() }

    pub fn set_total(&mut self, total: u64) { self.total = total; }

    pub fn is_total_known(&self) -> bool { self.total != UNKNOWN_TOTAL }

    /// Recompose the snapshot from the three accounting primitives.
    ///
    /// `transferred` never moves backwards, even if a stale progress
    /// reference is passed in.
    pub fn update(&mut self, time: &Time, progress: &Progress, throughput: &Throughput) -> &Self {
        self.total = progress.total();
        self.transferred = self.transferred.max(progress.transferred());
        self.elapsed_seconds = time.elapsed_seconds();
        self.throughput_bytes_per_second = throughput.rate().max(0.0);
        self
    }

    /// Percentage of completion, `None` while the total is unknown.
    #[must_use]
    pub fn percentage(&self) -> Option<f64> {
        if !self.is_total_known() {
            return None;
        }
        if self.total == 0 {
            return Some(100.0);
        }
        Some((self.transferred as f64 / self.total as f64) * 100.0)
    }
}

impl fmt::Display for TransferInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_total_known() {
            write!(f, "{}/{} bytes", self.transferred, self.total)?;
        } else {
            write!(f, "{} bytes", self.transferred)?;
        }
        write!(
            f,
            " in {:.1}s ({})",
            self.elapsed_seconds,
            format_rate(self.throughput_bytes_per_second)
        )
    }
}

/// Human-readable transfer rate.
pub fn format_rate(bytes_per_second: f64) -> String {
    if bytes_per_second >= 1_000_000.0 {
        format!("{:.1} MB/s", bytes_per_second / 1_000_000.0)
    } else if bytes_per_second >= 1000.0 {
        format!("{:.1} kB/s", bytes_per_second / 1000.0)
    } else {
        format!("{:.0} B/s", bytes_per_second.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn test_update_composes_primitives() {
        let start = Instant::now();
        let mut time = Time::new();
        time.start_at(start);
        time.stop_at(start + Duration::from_secs(2));
        let progress = Progress::with_total(4000);
        progress.add(2000);
        let mut throughput = Throughput::starting_at(start);
        throughput.update_at(2000, start + Duration::from_secs(2));

        let mut info = TransferInfo::new();
        info.update(&time, &progress, &throughput);

        assert_eq!(info.total, 4000);
        assert_eq!(info.transferred, 2000);
        assert_eq!(info.elapsed_seconds, 2.0);
        assert_eq!(info.throughput_bytes_per_second, 1000.0);
        assert_eq!(info.percentage(), Some(50.0));
    }

    #[test]
    fn test_unknown_total_has_no_percentage() {
        let info = TransferInfo::new();
        assert_eq!(info.percentage(), None);
        assert_eq!(info.to_string(), "0 bytes in 0.0s (0 B/s)");
    }

    #[test]
    fn test_serialized_field_names() {
        let mut info = TransferInfo::new();
        info.set_total(10);
        let json = serde_json::to_value(info).unwrap();
        assert_eq!(json["total"], 10);
        assert!(json.get("elapsedSeconds").is_some());
        assert!(json.get("throughputBytesPerSecond").is_some());
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(512.0), "512 B/s");
        assert_eq!(format_rate(2048.0), "2.0 kB/s");
        assert_eq!(format_rate(2_048_000.0), "2.0 MB/s");
    }
}
