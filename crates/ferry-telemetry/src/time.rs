use std::time::{Duration, Instant};

/// Elapsed-time tracker for one transfer.
///
/// A tracker that was never started reports zero. A stopped tracker keeps
/// reporting the duration between `start` and `stop`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Time {
    started: Option<Instant>,
    stopped: Option<Instant>,
}

impl Time {
    pub fn new() -> Self { Self::default() }

    pub fn start(&mut self) { self.start_at(Instant::now()); }

    pub fn start_at(&mut self, at: Instant) {
        self.started = Some(at);
        self.stopped = None;
    }

    /// Freeze the elapsed duration. Stopping twice keeps the first stop.
    pub fn stop(&mut self) { self.stop_at(Instant::now()); }

    pub fn stop_at(&mut self, at: Instant) {
        if self.started.is_some() && self.stopped.is_none() {
            self.stopped = Some(at);
        }
    }

    pub fn is_running(&self) -> bool { self.started.is_some() && self.stopped.is_none() }

    pub fn elapsed(&self) -> Duration {
        match (self.started, self.stopped) {
            (Some(start), Some(stop)) => stop.saturating_duration_since(start),
            (Some(start), None) => Instant::now().saturating_duration_since(start),
            _ => Duration::ZERO,
        }
    }

    pub fn elapsed_seconds(&self) -> f64 { self.elapsed().as_secs_f64() }
}
