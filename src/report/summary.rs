use crate::execution::phase::{TestId, TestPhaseReport};
use crate::runtime::error::LifecycleError;
use crate::runtime::state::{LifecycleState, RunOutcome};
use crate::runtime::telemetry::TelemetrySnapshot;
use std::fmt;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;

/// Why planned tests were reported as skipped instead of run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    GlobalTimeoutDuringSetup,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::GlobalTimeoutDuringSetup => {
                f.write_str("global timeout reached during global setup")
            }
        }
    }
}

/// Final status of a run as seen by the reporter.
#[derive(Debug)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub ran_setup: bool,
    pub setup_error: Option<LifecycleError>,
    /// The global deadline elapsed (during setup or during the test phase).
    pub timed_out: bool,
    pub tests_ran: bool,
    pub tests: Option<TestPhaseReport>,
    pub test_phase_error: Option<LifecycleError>,
    pub teardown_error: Option<LifecycleError>,
    pub skipped: Vec<TestId>,
    pub transitions: Vec<LifecycleState>,
    pub telemetry: TelemetrySnapshot,
}

impl RunSummary {
    /// Every phase that ran succeeded and every test passed.
    pub fn is_success(&self) -> bool {
        self.outcome.setup_succeeded()
            && !self.timed_out
            && self.test_phase_error.is_none()
            && self.teardown_error.is_none()
            && self
                .tests
                .as_ref()
                .map_or(true, TestPhaseReport::is_success)
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            EXIT_SUCCESS
        } else {
            EXIT_FAILURE
        }
    }

    pub fn final_state(&self) -> Option<LifecycleState> {
        self.transitions.last().copied()
    }
}
