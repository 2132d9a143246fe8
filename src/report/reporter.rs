use super::summary::{RunSummary, SkipReason};
use crate::execution::phase::{TestId, TestStatus};
use crate::runtime::state::LifecycleState;

/// Receives lifecycle events and the final run status.
pub trait Reporter: Send + Sync {
    fn on_state_change(&self, _from: LifecycleState, _to: LifecycleState) {}

    /// Tests that will never run because the run was aborted.
    fn on_tests_skipped(&self, tests: &[TestId], reason: SkipReason);

    fn on_run_end(&self, summary: &RunSummary);
}

impl<R: Reporter + ?Sized> Reporter for std::sync::Arc<R> {
    fn on_state_change(&self, from: LifecycleState, to: LifecycleState) {
        (**self).on_state_change(from, to)
    }

    fn on_tests_skipped(&self, tests: &[TestId], reason: SkipReason) {
        (**self).on_tests_skipped(tests, reason)
    }

    fn on_run_end(&self, summary: &RunSummary) {
        (**self).on_run_end(summary)
    }
}

/// Logs the run through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn on_tests_skipped(&self, tests: &[TestId], reason: SkipReason) {
        for test in tests {
            tracing::warn!(target: "suitehooks::report", test = %test, reason = %reason, "test skipped");
        }
    }

    fn on_run_end(&self, summary: &RunSummary) {
        if let Some(report) = &summary.tests {
            for result in &report.results {
                match result.status {
                    TestStatus::Passed => {
                        tracing::info!(target: "suitehooks::report", test = %result.id, "passed")
                    }
                    TestStatus::Skipped => {
                        tracing::info!(target: "suitehooks::report", test = %result.id, "skipped")
                    }
                    TestStatus::Failed | TestStatus::Interrupted => tracing::error!(
                        target: "suitehooks::report",
                        test = %result.id,
                        status = ?result.status,
                        output = %result.output.trim_end(),
                        "test did not pass"
                    ),
                }
            }
        }

        for error in [
            &summary.setup_error,
            &summary.test_phase_error,
            &summary.teardown_error,
        ]
        .into_iter()
        .flatten()
        {
            tracing::error!(target: "suitehooks::report", kind = error.kind(), error = %error, "lifecycle error");
        }

        tracing::info!(
            target: "suitehooks::report",
            outcome = ?summary.outcome,
            timed_out = summary.timed_out,
            skipped = summary.skipped.len(),
            exit_code = summary.exit_code(),
            setup_ms = summary.telemetry.setup_ms,
            tests_ms = summary.telemetry.tests_ms,
            teardown_ms = summary.telemetry.teardown_ms,
            "run finished"
        );
    }
}
