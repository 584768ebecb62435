use serde::Serialize;

use super::DriverState;
use crate::constants::exit_codes;

/// Counters for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub task_key: String,
    pub source_type: String,
    /// Watermark read from the cursor when the run started
    pub starting_watermark: i64,
    /// Watermark persisted by the final checkpoint
    pub watermark: i64,
    pub max_id: i64,
    /// Windows fetched, including empty ones
    pub windows: u64,
    /// Records the callback completed
    pub records: u64,
    /// States the driver passed through; window states appear once
    pub path: Vec<DriverState>,
}

/// How a run that did not fail ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The watermark reached the upper bound
    Completed(RunSummary),
    /// The callback asked to stop
    Halted(RunSummary),
}

impl RunOutcome {
    pub fn summary(&self) -> &RunSummary {
        match self {
            Self::Completed(summary) | Self::Halted(summary) => summary,
        }
    }

    pub fn watermark(&self) -> i64 {
        self.summary().watermark
    }

    pub fn is_halted(&self) -> bool {
        matches!(self, Self::Halted(_))
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Completed(_) => exit_codes::COMPLETED,
            Self::Halted(_) => exit_codes::HALTED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> RunSummary {
        RunSummary {
            task_key: "reindex".to_string(),
            source_type: "post".to_string(),
            starting_watermark: 0,
            watermark: 42,
            max_id: 100,
            windows: 1,
            records: 42,
            path: vec![DriverState::Initializing, DriverState::Fetching],
        }
    }

    #[test]
    fn test_exit_codes_and_serialization() {
        let completed = RunOutcome::Completed(summary());
        let halted = RunOutcome::Halted(summary());

        assert_eq!(completed.exit_code(), 0);
        assert_eq!(halted.exit_code(), 2);
        assert!(halted.is_halted());
        assert_eq!(halted.watermark(), 42);

        let value = serde_json::to_value(&halted).unwrap();
        assert_eq!(value["outcome"], "halted");
        assert_eq!(value["path"][0], "initializing");
    }
}
