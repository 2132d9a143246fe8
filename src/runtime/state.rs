use std::fmt;

/// States of the global lifecycle state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    ResolvingSetup,
    RunningSetup,
    RunningTests,
    RunningTeardown,
    Completed,
    AbortedBeforeTests,
}

impl LifecycleState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            LifecycleState::Completed | LifecycleState::AbortedBeforeTests
        )
    }

    /// Whether the state machine permits moving from `self` to `next`.
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;

        matches!(
            (self, next),
            (Idle, ResolvingSetup)
                | (Idle, RunningTests)
                | (Idle, AbortedBeforeTests)
                | (ResolvingSetup, RunningSetup)
                | (ResolvingSetup, AbortedBeforeTests)
                | (RunningSetup, RunningTests)
                | (RunningSetup, AbortedBeforeTests)
                | (RunningTests, RunningTeardown)
                | (RunningTests, Completed)
                | (RunningTeardown, Completed)
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Idle => "idle",
            LifecycleState::ResolvingSetup => "resolving-setup",
            LifecycleState::RunningSetup => "running-setup",
            LifecycleState::RunningTests => "running-tests",
            LifecycleState::RunningTeardown => "running-teardown",
            LifecycleState::Completed => "completed",
            LifecycleState::AbortedBeforeTests => "aborted-before-tests",
        };
        f.write_str(name)
    }
}

/// How the global lifecycle concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    SetupFailed,
    SetupTimedOut,
    /// Setup succeeded and tests ran; no teardown source existed.
    TestsCompleted,
    TeardownRan,
    TeardownFailed,
}

impl RunOutcome {
    pub fn setup_succeeded(self) -> bool {
        !matches!(self, RunOutcome::SetupFailed | RunOutcome::SetupTimedOut)
    }

    pub fn tests_ran(self) -> bool {
        self.setup_succeeded()
    }
}
