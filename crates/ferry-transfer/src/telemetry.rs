use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use ferry_telemetry::{Progress, Throughput, Time, TransferInfo};
use tokio::sync::mpsc::UnboundedSender;

struct MeterState {
    time:       Time,
    throughput: Throughput,
    info:       TransferInfo,
}

/// Accounting shared by every pipeline of one transfer.
///
/// Byte counters are atomics; the derived state and the emission happen
/// under one lock so snapshots leave in the order they were computed and
/// `transferred` never decreases between two of them.
pub(crate) struct Meter {
    progress: Progress,
    state:    Mutex<MeterState>,
    events:   UnboundedSender<TransferInfo>,
}

impl Meter {
    pub(crate) fn new(events: UnboundedSender<TransferInfo>) -> Self {
        Self {
            progress: Progress::new(),
            state: Mutex::new(MeterState {
                time:       Time::new(),
                throughput: Throughput::new(),
                info:       TransferInfo::new(),
            }),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, MeterState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn set_total(&self, total: u64) {
        self.progress.set_total(total);
        self.lock().info.set_total(total);
    }

    pub(crate) fn start(&self) {
        let now = Instant::now();
        let mut state = self.lock();
        state.time.start_at(now);
        state.throughput = Throughput::starting_at(now);
    }

    /// Add `delta` freshly moved bytes and emit a snapshot.
    pub(crate) fn record(&self, delta: u64) -> TransferInfo {
        self.progress.add(delta);
        self.publish(Some(delta), true)
    }

    /// Move the cumulative count up to `cumulative` and emit a snapshot.
    /// Reports below the current count add nothing.
    pub(crate) fn advance_to(&self, cumulative: u64) -> TransferInfo {
        let delta = self.progress.advance_to(cumulative);
        self.publish(Some(delta), true)
    }

    /// Emit the current state without adding bytes.
    pub(crate) fn emit(&self) -> TransferInfo { self.publish(None, true) }

    /// Stop the clock and return the final snapshot.
    pub(crate) fn stop(&self) -> TransferInfo {
        self.lock().time.stop();
        self.publish(None, false)
    }

    /// `delta` is `None` for snapshots that are not progress updates, which
    /// leave the rate alone. A zero delta still counts as an update.
    fn publish(&self, delta: Option<u64>, send: bool) -> TransferInfo {
        let mut state = self.lock();
        let MeterState {
            time,
            throughput,
            info,
        } = &mut *state;
        if let Some(delta) = delta {
            throughput.update(delta);
        }
        let snapshot = *info.update(time, &self.progress, throughput);
        if send {
            // A dropped receiver only means nobody is watching.
            let _ = self.events.send(snapshot);
        }
        snapshot
    }
}
