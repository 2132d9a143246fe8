//! Process-per-test-file adapter for the execution phase.
//!
//! Every test file runs as a child process that inherits the orchestrator's
//! environment, so variables exported by the global setup reach the tests.

use super::phase::{ExecutionRequest, TestExecutor, TestId, TestPhaseReport, TestResult, TestStatus};
use crate::runtime::config::RunConfig;
use anyhow::Result;
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// One test file and the command that runs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCommand {
    pub id: TestId,
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
}

impl TestCommand {
    pub fn new(id: TestId, program: impl Into<String>) -> Self {
        Self {
            id,
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Runs `script` through `sh -c`.
    pub fn shell(id: TestId, script: impl Into<String>) -> Self {
        Self::new(id, "sh").arg("-c").arg(script)
    }
}

/// Runs test commands as child processes, at most `workers` at a time.
#[derive(Debug, Clone, Default)]
pub struct CommandExecutor {
    commands: Vec<TestCommand>,
    workers: Option<usize>,
}

impl CommandExecutor {
    pub fn new(commands: Vec<TestCommand>) -> Self {
        Self {
            commands,
            workers: None,
        }
    }

    /// Overrides the worker count taken from [`RunConfig::workers`].
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers.max(1));
        self
    }

    pub fn commands(&self) -> &[TestCommand] {
        &self.commands
    }
}

impl TestExecutor for CommandExecutor {
    fn planned_tests(&self, _config: &RunConfig) -> Vec<TestId> {
        self.commands.iter().map(|command| command.id.clone()).collect()
    }

    fn execute(&self, request: ExecutionRequest) -> BoxFuture<'_, Result<TestPhaseReport>> {
        Box::pin(async move {
            let workers = self.workers.unwrap_or_else(|| request.config.workers()).max(1);
            tracing::info!(
                tests = self.commands.len(),
                workers,
                "running test commands"
            );

            let results = stream::iter(self.commands.iter().cloned())
                .map(|command| run_command(command, request.shutdown.clone()))
                .buffered(workers)
                .collect::<Vec<_>>()
                .await;

            Ok(TestPhaseReport::new(results))
        })
    }
}

async fn run_command(command: TestCommand, shutdown: CancellationToken) -> TestResult {
    let TestCommand {
        id,
        program,
        args,
        current_dir,
    } = command;

    if shutdown.is_cancelled() {
        return TestResult::new(id, TestStatus::Interrupted);
    }

    let mut process = Command::new(&program);
    process
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = current_dir {
        process.current_dir(dir);
    }

    let child = match process.spawn() {
        Ok(child) => child,
        Err(err) => {
            tracing::warn!(test = %id, program = %program, error = %err, "failed to spawn test command");
            return TestResult::new(id, TestStatus::Failed)
                .with_output(format!("failed to spawn {program}: {err}"));
        }
    };

    tokio::select! {
        output = child.wait_with_output() => match output {
            Ok(output) => {
                let status = if output.status.success() {
                    TestStatus::Passed
                } else {
                    TestStatus::Failed
                };
                let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
                text.push_str(&String::from_utf8_lossy(&output.stderr));
                tracing::debug!(test = %id, ?status, "test command finished");
                TestResult::new(id, status).with_output(text)
            }
            Err(err) => TestResult::new(id, TestStatus::Failed)
                .with_output(format!("failed to collect output: {err}")),
        },
        _ = shutdown.cancelled() => {
            tracing::info!(test = %id, "test command interrupted");
            TestResult::new(id, TestStatus::Interrupted)
        }
    }
}
