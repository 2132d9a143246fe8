use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use crate::support::{
    executor::ScriptedExecutor,
    helpers::{
        base_config, counted_hook, hook_path, init_tracing, logging_hook, CallCounter, EventLog,
        RecordingReporter,
    },
};
use anyhow::Result;
use futures::future::BoxFuture;
use suitehooks::{
    ExportedValue, HookFunction, HookLoader, HookOutput, HookRegistry, LifecycleError,
    LifecycleRunner, LifecycleState, ModuleLocation, RunOutcome, SkipReason, TestId, TestStatus,
    TracingReporter,
};

/// Loader that takes `delay` before handing back the registry's module.
struct SlowLoader {
    registry: Arc<HookRegistry>,
    delay: Duration,
}

impl HookLoader for SlowLoader {
    fn load<'a>(&'a self, location: &'a ModuleLocation) -> BoxFuture<'a, Result<ExportedValue>> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            self.registry.load(location).await
        })
    }
}

fn slow_setup(log: &EventLog, delay: Duration, teardown_calls: &CallCounter) -> HookFunction {
    let log = log.clone();
    let teardown_calls = teardown_calls.clone();
    HookFunction::new(move |_config| {
        let log = log.clone();
        let teardown_calls = teardown_calls.clone();
        async move {
            tokio::time::sleep(delay).await;
            log.push("setup finished");
            Ok(HookOutput::teardown(move |_config| {
                let teardown_calls = teardown_calls.clone();
                async move {
                    teardown_calls.hit();
                    Ok(HookOutput::None)
                }
            }))
        }
    })
}

#[tokio::test(start_paused = true)]
async fn setup_timeout_skips_every_planned_test() {
    init_tracing();
    let log = EventLog::default();
    let returned_calls = CallCounter::default();
    let mut registry = HookRegistry::new();
    registry.register_file(
        "/repo/config/setup",
        slow_setup(&log, Duration::from_secs(60), &returned_calls),
    );

    let config = base_config()
        .global_setup(hook_path("./setup"))
        .global_timeout(Duration::from_millis(100))
        .build()
        .unwrap();
    let executor = ScriptedExecutor::new(&log)
        .passing("a.spec", "test: a")
        .passing("b.spec", "test: b");
    let calls = executor.calls_handle();
    let reporter = Arc::new(RecordingReporter::default());

    let summary = LifecycleRunner::new(config, registry, executor, reporter.clone())
        .run()
        .await;

    assert_eq!(summary.outcome, RunOutcome::SetupTimedOut);
    assert!(summary.timed_out);
    assert!(!summary.tests_ran);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        reporter.skipped(),
        vec![
            (TestId::new("a.spec"), SkipReason::GlobalTimeoutDuringSetup),
            (TestId::new("b.spec"), SkipReason::GlobalTimeoutDuringSetup),
        ]
    );
    assert_eq!(
        summary.skipped,
        vec![TestId::new("a.spec"), TestId::new("b.spec")]
    );
    let error = summary.setup_error.as_ref().unwrap();
    assert_eq!(error.kind(), "SetupTimeoutError");
    assert_eq!(
        error.to_string(),
        "timed out waiting 100ms for the global setup to finish"
    );
    assert_eq!(
        summary.final_state(),
        Some(LifecycleState::AbortedBeforeTests)
    );
    assert_ne!(summary.exit_code(), 0);

    // The abandoned setup settles later; its teardown must stay unused.
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(log.entries(), vec!["setup finished"]);
    assert_eq!(returned_calls.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn setup_timeout_never_runs_configured_teardown() {
    init_tracing();
    let log = EventLog::default();
    let unused = CallCounter::default();
    let teardown_calls = CallCounter::default();
    let mut registry = HookRegistry::new();
    registry
        .register_file(
            "/repo/config/setup",
            slow_setup(&log, Duration::from_secs(30), &unused),
        )
        .register_file(
            "/repo/config/teardown",
            counted_hook(&log, &teardown_calls, "teardown"),
        );

    let config = base_config()
        .global_setup(hook_path("./setup"))
        .global_teardown(hook_path("./teardown"))
        .global_timeout(Duration::from_secs(1))
        .build()
        .unwrap();

    let summary = LifecycleRunner::new(
        config,
        registry,
        ScriptedExecutor::new(&log).passing("a.spec", "test: a"),
        TracingReporter,
    )
    .run()
    .await;

    assert_eq!(summary.outcome, RunOutcome::SetupTimedOut);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(teardown_calls.count(), 0);
    assert_eq!(unused.count(), 0);
    assert!(log.position("teardown").is_none());
    assert!(log.position("test: a").is_none());
}

#[tokio::test(start_paused = true)]
async fn setup_within_the_deadline_runs_normally() {
    init_tracing();
    let log = EventLog::default();
    let returned_calls = CallCounter::default();
    let mut registry = HookRegistry::new();
    registry.register_file(
        "/repo/config/setup",
        slow_setup(&log, Duration::from_millis(50), &returned_calls),
    );

    let config = base_config()
        .global_setup(hook_path("./setup"))
        .global_timeout(Duration::from_secs(1))
        .build()
        .unwrap();

    let summary = LifecycleRunner::new(
        config,
        registry,
        ScriptedExecutor::new(&log).passing("a.spec", "test: a"),
        TracingReporter,
    )
    .run()
    .await;

    assert_eq!(summary.outcome, RunOutcome::TeardownRan);
    assert!(!summary.timed_out);
    assert_eq!(log.entries(), vec!["setup finished", "test: a"]);
    assert_eq!(returned_calls.count(), 1);
    assert_eq!(summary.exit_code(), 0);
}

#[tokio::test(start_paused = true)]
async fn deadline_during_tests_interrupts_them_but_teardown_still_runs() {
    init_tracing();
    let log = EventLog::default();
    let teardown_calls = CallCounter::default();
    let mut registry = HookRegistry::new();
    registry
        .register_file("/repo/config/setup", logging_hook(&log, "setup"))
        .register_file(
            "/repo/config/teardown",
            counted_hook(&log, &teardown_calls, "teardown"),
        );

    let config = base_config()
        .global_setup(hook_path("./setup"))
        .global_teardown(hook_path("./teardown"))
        .global_timeout(Duration::from_secs(2))
        .build()
        .unwrap();
    let executor = ScriptedExecutor::new(&log)
        .passing("a.spec", "test: a")
        .passing("b.spec", "test: b")
        .with_delay(Duration::from_secs(600));

    let summary = LifecycleRunner::new(config, registry, executor, TracingReporter)
        .run()
        .await;

    assert!(summary.timed_out);
    assert!(summary.tests_ran);
    let report = summary.tests.as_ref().unwrap();
    assert_eq!(report.results.len(), 2);
    assert_eq!(report.count(TestStatus::Interrupted), 2);
    assert_eq!(teardown_calls.count(), 1);
    assert_eq!(log.entries(), vec!["setup", "teardown"]);
    assert_eq!(summary.outcome, RunOutcome::TeardownRan);
    assert_ne!(summary.exit_code(), 0);
}

#[tokio::test(start_paused = true)]
async fn teardown_is_bounded_by_the_remaining_budget() {
    init_tracing();
    let log = EventLog::default();
    let mut registry = HookRegistry::new();
    registry.register_file(
        "/repo/config/teardown",
        HookFunction::new(|_config| async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(HookOutput::None)
        }),
    );

    let config = base_config()
        .global_teardown(hook_path("./teardown"))
        .global_timeout(Duration::from_secs(10))
        .build()
        .unwrap();

    let summary = LifecycleRunner::new(
        config,
        registry,
        ScriptedExecutor::new(&log).passing("a.spec", "test: a"),
        TracingReporter,
    )
    .run()
    .await;

    assert_eq!(summary.outcome, RunOutcome::TeardownFailed);
    assert!(!summary.timed_out);
    assert!(summary.tests.as_ref().unwrap().is_success());
    match summary.teardown_error.as_ref() {
        Some(LifecycleError::TeardownExecution { source }) => {
            assert!(
                source
                    .to_string()
                    .contains("remaining global timeout budget"),
                "unexpected error {source}"
            );
        }
        other => panic!("expected a teardown execution error, got {other:?}"),
    }
    assert_ne!(summary.exit_code(), 0);
}

#[tokio::test(start_paused = true)]
async fn deadline_covers_module_loading() {
    init_tracing();
    let log = EventLog::default();
    let setup_calls = CallCounter::default();
    let mut registry = HookRegistry::new();
    registry.register_file(
        "/repo/config/setup",
        counted_hook(&log, &setup_calls, "setup"),
    );
    let registry = Arc::new(registry);
    let loader = Arc::new(SlowLoader {
        registry: registry.clone(),
        delay: Duration::from_secs(60),
    });

    let config = base_config()
        .global_setup(hook_path("./setup"))
        .global_timeout(Duration::from_millis(100))
        .build()
        .unwrap();
    let executor = ScriptedExecutor::new(&log).passing("a.spec", "test: a");
    let calls = executor.calls_handle();
    let reporter = Arc::new(RecordingReporter::default());

    let summary =
        LifecycleRunner::with_modules(config, registry, loader, executor, reporter.clone())
            .run()
            .await;

    assert_eq!(summary.outcome, RunOutcome::SetupTimedOut);
    assert!(!summary.ran_setup);
    assert!(summary.timed_out);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(summary.skipped, vec![TestId::new("a.spec")]);
    assert_eq!(
        reporter.skipped(),
        vec![(TestId::new("a.spec"), SkipReason::GlobalTimeoutDuringSetup)]
    );
    assert_eq!(
        summary.transitions,
        vec![
            LifecycleState::Idle,
            LifecycleState::ResolvingSetup,
            LifecycleState::AbortedBeforeTests,
        ]
    );
    assert_eq!(setup_calls.count(), 0);
    assert!(log.entries().is_empty());
}
