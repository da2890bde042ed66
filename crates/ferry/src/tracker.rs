use ferry_telemetry::TransferInfo;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use once_cell::sync::Lazy;

const PB_STYLE: &str = "{spinner:.blue} {prefix:>10.cyan.bold} [{elapsed_precise}] {wide_bar:.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec}, {eta}) {wide_msg}";

const SPINNER_STYLE: &str = "{spinner:.blue} {prefix:>10.cyan.bold} [{elapsed_precise}] {bytes} ({bytes_per_sec}) {wide_msg}";

const TICK: &str = "⠁⠂⠄⡀⢀⠠⠐⠈ ";

const PB_CHARS: &str = "█▓▒░  ";

static PB_TEMPLATE: Lazy<Option<ProgressStyle>> = Lazy::new(|| {
    let pb_style = match ProgressStyle::with_template(PB_STYLE) {
        Ok(pb_style) => pb_style.tick_chars(TICK).progress_chars(PB_CHARS),
        Err(_) => return None,
    };

    Some(pb_style)
});

static SPINNER_TEMPLATE: Lazy<Option<ProgressStyle>> =
    Lazy::new(|| ProgressStyle::with_template(SPINNER_STYLE).ok().map(|s| s.tick_chars(TICK)));

/// Terminal view of a transfer's snapshot stream.
///
/// Starts as a spinner and becomes a bar once a snapshot carries a known total.
pub struct ProgressTracker {
    pb:     ProgressBar,
    sized:  bool,
    finish: Option<String>,
}

impl ProgressTracker {
    pub fn step(&mut self, info: &TransferInfo) -> &Self {
        if info.is_total_known() {
            if !self.sized {
                if let Some(style) = PB_TEMPLATE.as_ref() {
                    self.pb.set_style(style.clone());
                }
                self.sized = true;
            }
            self.pb.set_length(info.total);
        }
        self.pb.set_position(info.transferred);
        self
    }

    pub fn message(&self, msg: impl Into<String>) { self.pb.set_message(msg.into()); }

    pub fn finish(self) {
        match self.finish {
            Some(msg) => self.pb.finish_with_message(msg),
            None => self.pb.finish(),
        }
    }

    pub fn abandon(self, msg: impl Into<String>) { self.pb.abandon_with_message(msg.into()); }

    pub fn position(&self) -> u64 { self.pb.position() }

    pub fn length(&self) -> Option<u64> { self.pb.length() }
}

#[derive(Debug, Clone, Default)]
pub struct ProgressTrackerBuilder {
    prefix: Option<String>,
    finish: Option<String>,
    hidden: bool,
}

impl ProgressTrackerBuilder {
    #[must_use]
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = Some(prefix.to_string());
        self
    }

    #[must_use]
    pub fn with_finish(mut self, finish: &str) -> Self {
        self.finish = Some(finish.to_string());
        self
    }

    #[must_use]
    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn build(self) -> ProgressTracker {
        let pb = ProgressBar::new_spinner();
        if self.hidden {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        }
        let pb = match SPINNER_TEMPLATE.as_ref() {
            Some(style) => pb.with_style(style.clone()),
            None => pb,
        };

        if let Some(prefix) = self.prefix {
            pb.set_prefix(prefix);
        }
        ProgressTracker {
            pb,
            sized: false,
            finish: self.finish,
        }
    }
}

#[cfg(test)]
mod tests {
    use ferry_telemetry::UNKNOWN_TOTAL;

    use super::*;

    fn info(transferred: u64, total: u64) -> TransferInfo {
        TransferInfo {
            transferred,
            total,
            ..TransferInfo::new()
        }
    }

    #[test]
    fn test_templates_parse() {
        assert!(PB_TEMPLATE.is_some());
        assert!(SPINNER_TEMPLATE.is_some());
    }

    #[test]
    fn test_unknown_total_stays_unsized() {
        let mut tracker = ProgressTrackerBuilder::default().hidden(true).build();
        tracker.step(&info(10, UNKNOWN_TOTAL));
        assert_eq!(tracker.position(), 10);
        assert_eq!(tracker.length(), None);

        tracker.step(&info(20, 100));
        assert_eq!(tracker.length(), Some(100));
        assert_eq!(tracker.position(), 20);
        tracker.finish();
    }
}
