use std::collections::VecDeque;
use std::time::{Duration, Instant};

const MAX_SAMPLES: usize = 100;
const DEFAULT_WINDOW: Duration = Duration::from_secs(5);

/// A cumulative byte count observed at a point in time.
#[derive(Debug, Clone, Copy)]
struct Sample {
    at:    Instant,
    bytes: u64,
}

/// Transfer rate over a sliding window of recent updates.
///
/// The rate is the byte difference between the oldest and newest retained
/// samples divided by the time between them, so bursts are smoothed over the
/// window. The oldest retained sample is the newest one that is at least one
/// window old, which keeps a baseline even when updates are sparse.
#[derive(Debug, Clone)]
pub struct Throughput {
    window:     Duration,
    samples:    VecDeque<Sample>,
    cumulative: u64,
    rate:       f64,
}

impl Default for Throughput {
    fn default() -> Self { Self::starting_at(Instant::now()) }
}

impl Throughput {
    pub fn new() -> Self { Self::default() }

    /// Create a tracker whose baseline is zero bytes at `at`.
    pub fn starting_at(at: Instant) -> Self {
        let mut samples = VecDeque::with_capacity(MAX_SAMPLES);
        samples.push_back(Sample { at, bytes: 0 });
        Self {
            window: DEFAULT_WINDOW,
            samples,
            cumulative: 0,
            rate: 0.0,
        }
    }

    #[must_use]
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Bytes per second as of the last update.
    pub fn rate(&self) -> f64 { self.rate }

    /// Account `delta` new bytes and recompute the rate.
    pub fn update(&mut self, delta: u64) -> f64 { self.update_at(delta, Instant::now()) }

    pub fn update_at(&mut self, delta: u64, now: Instant) -> f64 {
        self.cumulative = self.cumulative.saturating_add(delta);
        self.samples.push_back(Sample {
            at:    now,
            bytes: self.cumulative,
        });

        while self.samples.len() > 2
            && now.saturating_duration_since(self.samples[1].at) >= self.window
        {
            self.samples.pop_front();
        }
        while self.samples.len() > MAX_SAMPLES {
            self.samples.pop_front();
        }

        self.rate = self.calculate_rate();
        self.rate
    }

    fn calculate_rate(&self) -> f64 {
        let (Some(first), Some(last)) = (self.samples.front(), self.samples.back()) else {
            return 0.0;
        };
        let span = last.at.saturating_duration_since(first.at).as_secs_f64();
        if span <= 0.0 {
            return 0.0;
        }
        let bytes = last.bytes.saturating_sub(first.bytes);
        (bytes as f64 / span).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_elapsed_is_zero_rate() {
        let start = Instant::now();
        let mut throughput = Throughput::starting_at(start);
        assert_eq!(throughput.update_at(4096, start), 0.0);
        assert_eq!(throughput.rate(), 0.0);
    }

    #[test]
    fn test_steady_rate() {
        let start = Instant::now();
        let mut throughput = Throughput::starting_at(start);
        throughput.update_at(1000, start + Duration::from_secs(1));
        let rate = throughput.update_at(1000, start + Duration::from_secs(2));
        assert!((rate - 1000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_window_drops_old_samples() {
        let start = Instant::now();
        let mut throughput = Throughput::starting_at(start).with_window(Duration::from_secs(2));
        // A slow first phase followed by a fast one; only the fast phase stays in the window.
        throughput.update_at(10, start + Duration::from_secs(10));
        throughput.update_at(1000, start + Duration::from_secs(11));
        let rate = throughput.update_at(1000, start + Duration::from_secs(12));
        assert!((rate - 1000.0).abs() < 1e-9, "rate was {rate}");
    }

    #[test]
    fn test_zero_delta_never_negative() {
        let start = Instant::now();
        let mut throughput = Throughput::starting_at(start);
        for secs in 1..20 {
            assert!(throughput.update_at(0, start + Duration::from_secs(secs)) >= 0.0);
        }
    }

    #[test]
    fn test_sample_cap() {
        let start = Instant::now();
        let mut throughput = Throughput::starting_at(start).with_window(Duration::from_secs(3600));
        for i in 1..=500u64 {
            throughput.update_at(1, start + Duration::from_millis(i));
        }
        assert!(throughput.samples.len() <= MAX_SAMPLES);
        assert!(throughput.rate() > 0.0);
    }
}
