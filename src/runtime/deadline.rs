use std::time::Duration;
use tokio::time::{self, Instant};

/// Process-wide budget measured from the start of the run.
#[derive(Debug, Clone, Copy)]
pub struct GlobalDeadline {
    started: Instant,
    budget: Option<Duration>,
}

impl GlobalDeadline {
    /// Arms the deadline now. `None` (or zero) leaves the run unbounded.
    pub fn start(budget: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            budget: budget.filter(|budget| !budget.is_zero()),
        }
    }

    pub fn budget(&self) -> Option<Duration> {
        self.budget
    }

    pub fn is_bounded(&self) -> bool {
        self.budget.is_some()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn instant(&self) -> Option<Instant> {
        self.budget.map(|budget| self.started + budget)
    }

    /// Remaining budget, `Some(ZERO)` once exhausted, `None` when unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.budget
            .map(|budget| budget.saturating_sub(self.started.elapsed()))
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self.remaining(), Some(remaining) if remaining.is_zero())
    }

    /// Completes when the budget runs out; never completes when unbounded.
    pub async fn expired(&self) {
        match self.instant() {
            Some(at) => time::sleep_until(at).await,
            None => std::future::pending::<()>().await,
        }
    }
}
