#![cfg(unix)]

use std::path::PathBuf;
use std::time::Duration;

use crate::support::helpers::{
    base_config, hook_path, init_tracing, lock_process_env, logging_hook, EventLog,
};
use suitehooks::{
    CommandExecutor, HookFunction, HookOutput, HookRegistry, LifecycleRunner, RunOutcome,
    TestCommand, TestId, TestStatus, TracingReporter,
};

fn scratch_file(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("suitehooks-{}-{name}", std::process::id()));
    let _ = std::fs::remove_file(&path);
    path
}

#[tokio::test]
async fn setup_environment_reaches_test_processes() {
    init_tracing();
    let _env = lock_process_env().await;
    let log = EventLog::default();
    let mut registry = HookRegistry::new();
    registry
        .register_file(
            "/repo/config/global-setup",
            HookFunction::new(|_config| async {
                std::env::set_var("SUITEHOOKS_IT_SERVER_URL", "http://127.0.0.1:4100");
                Ok(HookOutput::None)
            }),
        )
        .register_file("/repo/config/global-teardown", logging_hook(&log, "teardown"));

    let commands = vec![
        TestCommand::shell(
            TestId::in_project("api", "server.spec"),
            r#"test "$SUITEHOOKS_IT_SERVER_URL" = "http://127.0.0.1:4100" && echo "url ok""#,
        ),
        TestCommand::shell(TestId::in_project("api", "health.spec"), "echo healthy"),
    ];
    let config = base_config()
        .global_setup(hook_path("./global-setup"))
        .global_teardown(hook_path("./global-teardown"))
        .workers(2)
        .build()
        .unwrap();

    let summary = LifecycleRunner::new(
        config,
        registry,
        CommandExecutor::new(commands),
        TracingReporter,
    )
    .run()
    .await;

    assert_eq!(summary.outcome, RunOutcome::TeardownRan);
    let report = summary.tests.as_ref().unwrap();
    assert_eq!(report.passed(), 2);
    assert_eq!(report.results[0].output.trim(), "url ok");
    assert_eq!(report.results[1].output.trim(), "healthy");
    assert_eq!(log.entries(), vec!["teardown"]);
    assert_eq!(summary.exit_code(), 0);
}

#[tokio::test]
async fn failing_test_process_fails_the_run_but_not_teardown() {
    init_tracing();
    let _env = lock_process_env().await;
    let log = EventLog::default();
    let mut registry = HookRegistry::new();
    registry.register_file("/repo/config/global-teardown", logging_hook(&log, "teardown"));

    let config = base_config()
        .global_teardown(hook_path("./global-teardown"))
        .build()
        .unwrap();
    let commands = vec![TestCommand::shell(
        TestId::new("broken.spec"),
        "echo boom >&2; exit 3",
    )];

    let summary = LifecycleRunner::new(
        config,
        registry,
        CommandExecutor::new(commands),
        TracingReporter,
    )
    .run()
    .await;

    let report = summary.tests.as_ref().unwrap();
    assert_eq!(report.results[0].status, TestStatus::Failed);
    assert_eq!(report.results[0].output.trim(), "boom");
    assert_eq!(log.entries(), vec!["teardown"]);
    assert_eq!(summary.outcome, RunOutcome::TeardownRan);
    assert_ne!(summary.exit_code(), 0);
}

#[tokio::test]
async fn setup_timeout_prevents_test_processes_from_starting() {
    init_tracing();
    let _env = lock_process_env().await;
    let marker = scratch_file("setup-timeout-marker");
    let mut registry = HookRegistry::new();
    registry.register_file(
        "/repo/config/global-setup",
        HookFunction::new(|_config| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(HookOutput::None)
        }),
    );

    let ids = vec![TestId::new("first.spec"), TestId::new("second.spec")];
    let commands = ids
        .iter()
        .cloned()
        .map(|id| TestCommand::new(id, "touch").arg(marker.display().to_string()))
        .collect();
    let config = base_config()
        .global_setup(hook_path("./global-setup"))
        .global_timeout(Duration::from_millis(200))
        .build()
        .unwrap();

    let summary = LifecycleRunner::new(
        config,
        registry,
        CommandExecutor::new(commands),
        TracingReporter,
    )
    .run()
    .await;

    assert_eq!(summary.outcome, RunOutcome::SetupTimedOut);
    assert_eq!(summary.skipped, ids);
    assert!(!marker.exists(), "no test command may run after a setup timeout");
    assert_ne!(summary.exit_code(), 0);
}
