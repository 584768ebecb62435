use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;

use super::Progress;

const TEMPLATE: &str = "{msg} [{elapsed_precise}] {bar:50.cyan/blue} {pos:>10}/{len:10}";

/// Terminal progress bar. Ticks forward by the delta since the last position;
/// a backwards position is set directly.
#[derive(Debug)]
pub struct BarProgress {
    bar: ProgressBar,
    last: Mutex<i64>,
}

impl BarProgress {
    pub fn new(label: &str) -> Self {
        Self::with_bar(ProgressBar::new(0), label)
    }

    /// A bar that never draws, for tests and non-interactive runs
    pub fn hidden(label: &str) -> Self {
        Self::with_bar(ProgressBar::hidden(), label)
    }

    fn with_bar(bar: ProgressBar, label: &str) -> Self {
        if let Ok(style) = ProgressStyle::default_bar().template(TEMPLATE) {
            bar.set_style(style.progress_chars("##-"));
        }
        bar.set_message(label.to_string());
        Self {
            bar,
            last: Mutex::new(0),
        }
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn length(&self) -> Option<u64> {
        self.bar.length()
    }

    pub fn is_finished(&self) -> bool {
        self.bar.is_finished()
    }
}

impl Progress for BarProgress {
    fn set_total(&self, total: i64) {
        self.bar.set_length(total.max(0) as u64);
    }

    fn set_current(&self, current: i64) {
        let current = current.max(0);
        let mut last = self.last.lock();
        let delta = current - *last;
        if delta > 0 {
            self.bar.inc(delta as u64);
        } else if delta < 0 {
            self.bar.set_position(current as u64);
        }
        *last = current;
    }

    fn set_finished(&self) {
        self.bar.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_by_delta_and_tolerates_regressions() {
        let progress = BarProgress::hidden("posts");
        progress.set_total(500);
        assert_eq!(progress.length(), Some(500));

        progress.set_current(100);
        progress.set_current(100);
        progress.set_current(250);
        assert_eq!(progress.position(), 250);

        progress.set_current(50);
        assert_eq!(progress.position(), 50);

        progress.set_finished();
        assert!(progress.is_finished());
    }
}
