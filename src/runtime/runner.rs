//! Global lifecycle orchestration.
//!
//! `LifecycleRunner` drives one run through the state machine in
//! [`LifecycleState`]:
//! - resolve and validate the configured hook modules,
//! - invoke setup once, raced against the global deadline,
//! - hand the whole run to the test execution phase exactly once,
//! - invoke the chosen teardown once if, and only if, setup succeeded.
//!
//! Every hook runs on its own tokio task. When the deadline wins a race the
//! task's handle is dropped, which detaches it: the orchestrator stops waiting
//! and any late result is discarded.

use crate::execution::phase::{ExecutionRequest, TestExecutor, TestPhaseReport};
use crate::hooks::reference::HookReference;
use crate::hooks::registry::{HookLoader, HookRegistry, HookResolver};
use crate::hooks::teardown::TeardownSource;
use crate::hooks::validator::{validate_export, validate_returned, LoadedHook};
use crate::hooks::value::HookOutput;
use crate::report::reporter::Reporter;
use crate::report::summary::{RunSummary, SkipReason};
use crate::runtime::config::RunConfig;
use crate::runtime::deadline::GlobalDeadline;
use crate::runtime::error::{HookStage, LifecycleError};
use crate::runtime::hooks::HookDecision;
use crate::runtime::state::{LifecycleState, RunOutcome};
use crate::runtime::telemetry::{Phase, Telemetry};
use anyhow::anyhow;
use core::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tokio_util::sync::CancellationToken;

const LOG_TARGET: &str = "suitehooks::lifecycle";

/// How long a cancelled test phase may take to hand back a partial report.
pub const EXECUTOR_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Sequences global setup, the test execution phase, and global teardown.
pub struct LifecycleRunner<E: TestExecutor, R: Reporter> {
    config: Arc<RunConfig>,
    resolver: Arc<dyn HookResolver>,
    loader: Arc<dyn HookLoader>,
    executor: E,
    reporter: R,
    telemetry: Arc<Telemetry>,
    state: LifecycleState,
    transitions: Vec<LifecycleState>,
}

struct SetupSucceeded {
    ran_setup: bool,
    teardown: Option<TeardownSource>,
}

struct SetupAborted {
    outcome: RunOutcome,
    ran_setup: bool,
    error: LifecycleError,
}

impl SetupAborted {
    fn failed(ran_setup: bool, error: LifecycleError) -> Self {
        Self {
            outcome: RunOutcome::SetupFailed,
            ran_setup,
            error,
        }
    }

    fn timed_out(ran_setup: bool, deadline: &GlobalDeadline) -> Self {
        Self {
            outcome: RunOutcome::SetupTimedOut,
            ran_setup,
            error: LifecycleError::SetupTimeout {
                timeout: deadline.budget().unwrap_or_default(),
            },
        }
    }
}

struct TestPhaseOutcome {
    report: Option<TestPhaseReport>,
    error: Option<LifecycleError>,
    timed_out: bool,
}

impl<E: TestExecutor, R: Reporter> LifecycleRunner<E, R> {
    /// Creates a runner that resolves and loads hooks from `registry`.
    pub fn new(config: RunConfig, registry: HookRegistry, executor: E, reporter: R) -> Self {
        let registry = Arc::new(registry);
        Self::with_modules(config, registry.clone(), registry, executor, reporter)
    }

    /// Creates a runner with separate module resolution and loading seams.
    pub fn with_modules(
        config: RunConfig,
        resolver: Arc<dyn HookResolver>,
        loader: Arc<dyn HookLoader>,
        executor: E,
        reporter: R,
    ) -> Self {
        Self {
            config: Arc::new(config),
            resolver,
            loader,
            executor,
            reporter,
            telemetry: Arc::new(Telemetry::default()),
            state: LifecycleState::Idle,
            transitions: vec![LifecycleState::Idle],
        }
    }

    /// Configuration shared with every hook and the test phase.
    pub fn config(&self) -> &Arc<RunConfig> {
        &self.config
    }

    /// Current lifecycle state; `Idle` until [`LifecycleRunner::run`] starts.
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Returns a clone of the telemetry handle for observability.
    pub fn telemetry(&self) -> Arc<Telemetry> {
        self.telemetry.clone()
    }

    /// Executes the run. Consumes the runner so hooks and the test phase can
    /// only ever be driven once.
    pub async fn run(mut self) -> RunSummary {
        let deadline = GlobalDeadline::start(self.config.global_timeout());
        tracing::info!(
            target: LOG_TARGET,
            setup = ?self.config.global_setup().map(ToString::to_string),
            teardown = ?self.config.global_teardown().map(ToString::to_string),
            timeout_ms = ?deadline.budget().map(|budget| budget.as_millis()),
            "starting global lifecycle"
        );

        let setup = match self.setup_phase(&deadline).await {
            Ok(setup) => setup,
            Err(aborted) => return self.abort(aborted),
        };

        self.transition(LifecycleState::RunningTests);
        let tests = self.test_phase(&deadline).await;

        let had_teardown = setup.teardown.is_some();
        let teardown_error = match setup.teardown {
            Some(source) => {
                self.transition(LifecycleState::RunningTeardown);
                self.teardown_phase(source, &deadline).await
            }
            None => None,
        };

        let outcome = match (had_teardown, &teardown_error) {
            (false, _) => RunOutcome::TestsCompleted,
            (true, None) => RunOutcome::TeardownRan,
            (true, Some(_)) => RunOutcome::TeardownFailed,
        };
        self.transition(LifecycleState::Completed);

        let summary = RunSummary {
            outcome,
            ran_setup: setup.ran_setup,
            setup_error: None,
            timed_out: tests.timed_out,
            tests_ran: true,
            tests: tests.report,
            test_phase_error: tests.error,
            teardown_error,
            skipped: Vec::new(),
            transitions: std::mem::take(&mut self.transitions),
            telemetry: self.telemetry.snapshot(),
        };
        self.reporter.on_run_end(&summary);
        summary
    }

    async fn setup_phase(
        &mut self,
        deadline: &GlobalDeadline,
    ) -> Result<SetupSucceeded, SetupAborted> {
        let teardown_reference = self.config.global_teardown().cloned();
        let Some(setup_reference) = self.config.global_setup().cloned() else {
            let configured = match teardown_reference {
                Some(reference) => Some(
                    self.load_hook(HookStage::Teardown, reference)
                        .await
                        .map_err(|err| SetupAborted::failed(false, err))?,
                ),
                None => None,
            };
            return Ok(SetupSucceeded {
                ran_setup: false,
                teardown: configured.map(TeardownSource::Configured),
            });
        };

        self.transition(LifecycleState::ResolvingSetup);
        let resolution = async {
            let setup = self.load_hook(HookStage::Setup, setup_reference).await?;
            let teardown = match teardown_reference {
                Some(reference) => Some(self.load_hook(HookStage::Teardown, reference).await?),
                None => None,
            };
            Ok::<_, LifecycleError>((setup, teardown))
        };
        let (setup, configured) = match race(deadline, resolution).await {
            HookDecision::Finished(Ok(hooks)) => hooks,
            HookDecision::Finished(Err(err)) => return Err(SetupAborted::failed(false, err)),
            HookDecision::Expired => return Err(SetupAborted::timed_out(false, deadline)),
        };

        self.transition(LifecycleState::RunningSetup);
        let setup_location = setup.location().clone();
        tracing::info!(target: LOG_TARGET, module = %setup_location, "running global setup");

        self.telemetry.record_hook_invocation();
        let started = Instant::now();
        let config = self.config.clone();
        // The hook body is called inside the task so a panic before its first
        // await is caught as a `JoinError`.
        let mut task = tokio::spawn(async move { setup.invoke(config).await });
        let decision = race(deadline, &mut task).await;
        self.telemetry.record_phase(Phase::Setup, started.elapsed());

        let output = match decision {
            HookDecision::Finished(Ok(Ok(output))) => output,
            HookDecision::Finished(Ok(Err(err))) => {
                return Err(SetupAborted::failed(
                    true,
                    LifecycleError::SetupExecution { source: err },
                ))
            }
            HookDecision::Finished(Err(join_err)) => {
                return Err(SetupAborted::failed(
                    true,
                    LifecycleError::SetupExecution {
                        source: anyhow!("global setup panicked: {join_err}"),
                    },
                ))
            }
            HookDecision::Expired => {
                drop(task);
                tracing::warn!(
                    target: LOG_TARGET,
                    module = %setup_location,
                    elapsed_ms = deadline.elapsed().as_millis(),
                    "global timeout reached; abandoning pending global setup"
                );
                return Err(SetupAborted::timed_out(true, deadline));
            }
        };

        let returned = match output {
            HookOutput::Teardown(function) if configured.is_none() => Some(
                validate_returned(&setup_location, function)
                    .map_err(|err| SetupAborted::failed(true, err))?,
            ),
            HookOutput::Teardown(function) => Some(function),
            HookOutput::None | HookOutput::Value(_) => None,
        };

        tracing::info!(
            target: LOG_TARGET,
            module = %setup_location,
            elapsed_ms = started.elapsed().as_millis(),
            "global setup finished"
        );

        Ok(SetupSucceeded {
            ran_setup: true,
            teardown: TeardownSource::select(configured, returned),
        })
    }

    async fn load_hook(
        &self,
        stage: HookStage,
        reference: HookReference,
    ) -> Result<LoadedHook, LifecycleError> {
        let location = self
            .resolver
            .resolve(&reference, self.config.config_dir())
            .map_err(|err| LifecycleError::resolution(stage, reference.to_string(), err))?;
        let value = self
            .loader
            .load(&location)
            .await
            .map_err(|err| LifecycleError::resolution(stage, reference.to_string(), err))?;
        validate_export(stage, reference, location, value)
    }

    async fn test_phase(&self, deadline: &GlobalDeadline) -> TestPhaseOutcome {
        let shutdown = CancellationToken::new();
        let request = ExecutionRequest {
            config: self.config.clone(),
            deadline: deadline.instant(),
            shutdown: shutdown.clone(),
        };

        let started = Instant::now();
        let mut execution = self.executor.execute(request);
        let mut timed_out = false;
        let settled = match race(deadline, &mut execution).await {
            HookDecision::Finished(result) => Some(result),
            HookDecision::Expired => {
                timed_out = true;
                tracing::warn!(
                    target: LOG_TARGET,
                    elapsed_ms = deadline.elapsed().as_millis(),
                    "global timeout reached during test execution; cancelling workers"
                );
                shutdown.cancel();
                match timeout(EXECUTOR_SHUTDOWN_GRACE, &mut execution).await {
                    Ok(result) => Some(result),
                    Err(_) => {
                        tracing::warn!(
                            target: LOG_TARGET,
                            grace_ms = EXECUTOR_SHUTDOWN_GRACE.as_millis(),
                            "test execution phase ignored cancellation; abandoning it"
                        );
                        None
                    }
                }
            }
        };
        drop(execution);
        self.telemetry.record_phase(Phase::Tests, started.elapsed());

        match settled {
            Some(Ok(report)) => {
                tracing::info!(
                    target: LOG_TARGET,
                    passed = report.passed(),
                    failed = report.failed(),
                    "test execution phase finished"
                );
                TestPhaseOutcome {
                    report: Some(report),
                    error: None,
                    timed_out,
                }
            }
            Some(Err(err)) => {
                tracing::error!(target: LOG_TARGET, error = %err, "test execution phase crashed");
                TestPhaseOutcome {
                    report: None,
                    error: Some(LifecycleError::TestPhase { source: err }),
                    timed_out,
                }
            }
            None => TestPhaseOutcome {
                report: None,
                error: None,
                timed_out,
            },
        }
    }

    async fn teardown_phase(
        &self,
        source: TeardownSource,
        deadline: &GlobalDeadline,
    ) -> Option<LifecycleError> {
        tracing::info!(target: LOG_TARGET, source = %source, "running global teardown");

        let budget = deadline.remaining().filter(|remaining| !remaining.is_zero());
        self.telemetry.record_hook_invocation();
        let started = Instant::now();
        let config = self.config.clone();
        let mut task = tokio::spawn(async move { source.invoke(config).await });
        let settled = match budget {
            Some(budget) => timeout(budget, &mut task).await.ok(),
            None => Some((&mut task).await),
        };
        self.telemetry.record_phase(Phase::Teardown, started.elapsed());

        let error = match settled {
            Some(Ok(Ok(_))) => None,
            Some(Ok(Err(err))) => Some(LifecycleError::TeardownExecution { source: err }),
            Some(Err(join_err)) => Some(LifecycleError::TeardownExecution {
                source: anyhow!("global teardown panicked: {join_err}"),
            }),
            None => {
                drop(task);
                Some(LifecycleError::TeardownExecution {
                    source: anyhow!(
                        "exceeded the remaining global timeout budget of {}ms",
                        budget.unwrap_or_default().as_millis()
                    ),
                })
            }
        };

        match &error {
            Some(err) => tracing::error!(target: LOG_TARGET, error = %err, "global teardown failed"),
            None => tracing::info!(
                target: LOG_TARGET,
                elapsed_ms = started.elapsed().as_millis(),
                "global teardown finished"
            ),
        }
        error
    }

    fn abort(mut self, aborted: SetupAborted) -> RunSummary {
        let SetupAborted {
            outcome,
            ran_setup,
            error,
        } = aborted;
        self.transition(LifecycleState::AbortedBeforeTests);
        tracing::error!(
            target: LOG_TARGET,
            kind = error.kind(),
            error = %error,
            "global setup did not succeed; tests and teardown will not run"
        );

        let timed_out = outcome == RunOutcome::SetupTimedOut;
        let skipped = if timed_out {
            let planned = self.executor.planned_tests(&self.config);
            self.reporter
                .on_tests_skipped(&planned, SkipReason::GlobalTimeoutDuringSetup);
            planned
        } else {
            Vec::new()
        };

        let summary = RunSummary {
            outcome,
            ran_setup,
            setup_error: Some(error),
            timed_out,
            tests_ran: false,
            tests: None,
            test_phase_error: None,
            teardown_error: None,
            skipped,
            transitions: std::mem::take(&mut self.transitions),
            telemetry: self.telemetry.snapshot(),
        };
        self.reporter.on_run_end(&summary);
        summary
    }

    fn transition(&mut self, next: LifecycleState) {
        let from = self.state;
        debug_assert!(
            from.can_transition_to(next),
            "invalid lifecycle transition {from} -> {next}"
        );
        tracing::info!(target: LOG_TARGET, from = %from, to = %next, "lifecycle transition");
        self.state = next;
        self.transitions.push(next);
        self.reporter.on_state_change(from, next);
    }
}

/// First-wins race between `work` and the global deadline.
async fn race<F: Future>(deadline: &GlobalDeadline, work: F) -> HookDecision<F::Output> {
    tokio::select! {
        biased;
        output = work => HookDecision::Finished(output),
        _ = deadline.expired() => HookDecision::Expired,
    }
}
