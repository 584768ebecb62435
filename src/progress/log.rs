use std::sync::atomic::{AtomicI64, Ordering};

use tracing::info;

use super::Progress;

/// Reports progress as structured log lines, at most once per whole percent
#[derive(Debug)]
pub struct LogProgress {
    label: String,
    total: AtomicI64,
    last_percent: AtomicI64,
}

impl LogProgress {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            total: AtomicI64::new(0),
            last_percent: AtomicI64::new(-1),
        }
    }

    fn percent(&self, current: i64) -> i64 {
        let total = self.total.load(Ordering::Relaxed);
        if total <= 0 {
            return 100;
        }
        ((current.clamp(0, total) as f64 / total as f64) * 100.0) as i64
    }
}

impl Progress for LogProgress {
    fn set_total(&self, total: i64) {
        self.total.store(total, Ordering::Relaxed);
        info!(label = %self.label, total, "Progress started");
    }

    fn set_current(&self, current: i64) {
        let percent = self.percent(current);
        if self.last_percent.swap(percent, Ordering::Relaxed) != percent {
            info!(
                label = %self.label,
                current,
                total = self.total.load(Ordering::Relaxed),
                percent,
                "Progress"
            );
        }
    }

    fn set_finished(&self) {
        info!(label = %self.label, "Progress finished");
    }
}
