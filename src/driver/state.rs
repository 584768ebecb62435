use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{BulkTaskError, Result};

/// Phases of one driver invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DriverState {
    /// No run in flight
    #[default]
    Idle,
    /// Resolving the source, reading the watermark and upper bound
    Initializing,
    /// One windowed fetch in flight
    Fetching,
    /// Handing the fetched records to the callback
    Dispatching,
    /// Persisting the watermark and running per-batch collaborators
    Checkpointing,
    /// The callback asked to stop
    Halted,
    /// The watermark reached the upper bound
    Exhausted,
    /// Running teardown hooks
    Finalizing,
}

impl DriverState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Halted | Self::Exhausted)
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle)
    }

    /// States entered once per window
    pub fn is_window(&self) -> bool {
        matches!(self, Self::Fetching | Self::Dispatching | Self::Checkpointing)
    }
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Initializing => write!(f, "initializing"),
            Self::Fetching => write!(f, "fetching"),
            Self::Dispatching => write!(f, "dispatching"),
            Self::Checkpointing => write!(f, "checkpointing"),
            Self::Halted => write!(f, "halted"),
            Self::Exhausted => write!(f, "exhausted"),
            Self::Finalizing => write!(f, "finalizing"),
        }
    }
}

/// Inputs that move the driver between states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverEvent {
    Start,
    Initialized,
    /// A fetch returned this many records
    Fetched(usize),
    Dispatched,
    /// The watermark is still below the upper bound
    Continue,
    Halt,
    Exhaust,
    Finalize,
    Finish,
    /// A fatal error abandoned the run
    Fail,
}

/// Target state for `event` in `current`
pub fn determine_target_state(current: DriverState, event: DriverEvent) -> Result<DriverState> {
    let target = match (current, event) {
        (DriverState::Idle, DriverEvent::Start) => DriverState::Initializing,

        (DriverState::Initializing, DriverEvent::Initialized) => DriverState::Fetching,
        // Watermark already at or past the upper bound
        (DriverState::Initializing, DriverEvent::Exhaust) => DriverState::Exhausted,

        (DriverState::Fetching, DriverEvent::Fetched(0)) => DriverState::Checkpointing,
        (DriverState::Fetching, DriverEvent::Fetched(_)) => DriverState::Dispatching,

        (DriverState::Dispatching, DriverEvent::Dispatched) => DriverState::Checkpointing,

        (DriverState::Checkpointing, DriverEvent::Continue) => DriverState::Fetching,
        (DriverState::Checkpointing, DriverEvent::Halt) => DriverState::Halted,
        (DriverState::Checkpointing, DriverEvent::Exhaust) => DriverState::Exhausted,

        (DriverState::Halted | DriverState::Exhausted, DriverEvent::Finalize) => {
            DriverState::Finalizing
        }
        (DriverState::Finalizing, DriverEvent::Finish) => DriverState::Idle,

        (from, DriverEvent::Fail) if from.is_active() => DriverState::Idle,

        (from, event) => {
            return Err(BulkTaskError::Internal(format!(
                "invalid driver transition from {from} on {event:?}"
            )))
        }
    };

    Ok(target)
}

/// Current state plus the path taken to reach it.
///
/// Window states are recorded the first time they are entered only, so the
/// history stays the same size however many windows a run visits.
#[derive(Debug, Clone, Default)]
pub struct StateTracker {
    current: DriverState,
    history: Vec<DriverState>,
    transitions: u64,
}

impl StateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> DriverState {
        self.current
    }

    /// States entered since the tracker was created, oldest first, with
    /// repeated window states collapsed
    pub fn history(&self) -> &[DriverState] {
        &self.history
    }

    /// Transitions taken, including collapsed ones
    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    pub fn transition(&mut self, event: DriverEvent) -> Result<DriverState> {
        let target = determine_target_state(self.current, event)?;
        tracing::trace!(from = %self.current, to = %target, ?event, "Driver transition");
        self.current = target;
        self.transitions += 1;
        if !(target.is_window() && self.history.contains(&target)) {
            self.history.push(target);
        }
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_cycle() {
        let mut tracker = StateTracker::new();
        for event in [
            DriverEvent::Start,
            DriverEvent::Initialized,
            DriverEvent::Fetched(3),
            DriverEvent::Dispatched,
            DriverEvent::Continue,
            DriverEvent::Fetched(0),
            DriverEvent::Exhaust,
            DriverEvent::Finalize,
            DriverEvent::Finish,
        ] {
            tracker.transition(event).unwrap();
        }

        assert_eq!(tracker.current(), DriverState::Idle);
        assert_eq!(tracker.transitions(), 9);
        assert_eq!(
            tracker.history(),
            &[
                DriverState::Initializing,
                DriverState::Fetching,
                DriverState::Dispatching,
                DriverState::Checkpointing,
                DriverState::Exhausted,
                DriverState::Finalizing,
                DriverState::Idle,
            ]
        );
    }

    #[test]
    fn test_history_is_bounded_across_windows() {
        let mut tracker = StateTracker::new();
        tracker.transition(DriverEvent::Start).unwrap();
        tracker.transition(DriverEvent::Initialized).unwrap();
        for _ in 0..10_000 {
            tracker.transition(DriverEvent::Fetched(0)).unwrap();
            tracker.transition(DriverEvent::Continue).unwrap();
        }
        tracker.transition(DriverEvent::Fetched(0)).unwrap();
        tracker.transition(DriverEvent::Exhaust).unwrap();

        assert_eq!(tracker.transitions(), 20_004);
        assert_eq!(
            tracker.history(),
            &[
                DriverState::Initializing,
                DriverState::Fetching,
                DriverState::Checkpointing,
                DriverState::Exhausted,
            ]
        );
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(determine_target_state(DriverState::Idle, DriverEvent::Dispatched).is_err());
        assert!(determine_target_state(DriverState::Dispatching, DriverEvent::Continue).is_err());
        assert!(determine_target_state(DriverState::Fetching, DriverEvent::Finalize).is_err());
        assert!(determine_target_state(DriverState::Idle, DriverEvent::Fail).is_err());
    }

    #[test]
    fn test_halt_goes_through_checkpointing() {
        assert_eq!(
            determine_target_state(DriverState::Dispatching, DriverEvent::Dispatched).unwrap(),
            DriverState::Checkpointing
        );
        assert_eq!(
            determine_target_state(DriverState::Checkpointing, DriverEvent::Halt).unwrap(),
            DriverState::Halted
        );
        assert!(DriverState::Halted.is_terminal());
    }
}
