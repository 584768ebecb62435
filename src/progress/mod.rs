//! # Progress Reporting
//!
//! The driver reports the upper bound as the total and the watermark as the
//! current position. Reporters must accept repeated or backwards positions.

pub mod bar;
pub mod log;

use std::fmt;

use crate::config::ProgressMode;

pub use bar::BarProgress;
pub use log::LogProgress;

pub trait Progress: Send + Sync + fmt::Debug {
    /// Define the finish line
    fn set_total(&self, total: i64);

    fn set_current(&self, current: i64);

    fn set_finished(&self);
}

/// No-op reporter for headless runs
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl Progress for NullProgress {
    fn set_total(&self, _total: i64) {}

    fn set_current(&self, _current: i64) {}

    fn set_finished(&self) {}
}

/// Build the reporter selected by configuration
pub fn from_mode(mode: ProgressMode, label: &str) -> Box<dyn Progress> {
    match mode {
        ProgressMode::None => Box::new(NullProgress),
        ProgressMode::Log => Box::new(LogProgress::new(label)),
        ProgressMode::Bar => Box::new(BarProgress::new(label)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_mode() {
        assert!(format!("{:?}", from_mode(ProgressMode::None, "x")).contains("NullProgress"));
        assert!(format!("{:?}", from_mode(ProgressMode::Log, "x")).contains("LogProgress"));
    }
}
