//! Boundary to the test execution phase: the worker pool that runs every test
//! file of every project. The lifecycle calls it at most once per run.

use crate::runtime::config::RunConfig;
use anyhow::Result;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Identifies one test file (optionally scoped to a project).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TestId {
    pub project: Option<String>,
    pub file: String,
}

impl TestId {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            project: None,
            file: file.into(),
        }
    }

    pub fn in_project(project: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            project: Some(project.into()),
            file: file.into(),
        }
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.project {
            Some(project) => write!(f, "[{project}] {}", self.file),
            None => f.write_str(&self.file),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
    /// Stopped because the global deadline cancelled the phase.
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    pub id: TestId,
    pub status: TestStatus,
    pub output: String,
}

impl TestResult {
    pub fn new(id: TestId, status: TestStatus) -> Self {
        Self {
            id,
            status,
            output: String::new(),
        }
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }
}

/// Results produced by one execution of the test phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestPhaseReport {
    pub results: Vec<TestResult>,
}

impl TestPhaseReport {
    pub fn new(results: Vec<TestResult>) -> Self {
        Self { results }
    }

    pub fn count(&self, status: TestStatus) -> usize {
        self.results
            .iter()
            .filter(|result| result.status == status)
            .count()
    }

    pub fn passed(&self) -> usize {
        self.count(TestStatus::Passed)
    }

    pub fn failed(&self) -> usize {
        self.count(TestStatus::Failed)
    }

    /// No test failed or was interrupted.
    pub fn is_success(&self) -> bool {
        self.results.iter().all(|result| {
            matches!(result.status, TestStatus::Passed | TestStatus::Skipped)
        })
    }
}

/// Everything the test phase receives from the lifecycle.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub config: Arc<RunConfig>,
    /// Absolute end of the global budget, if any.
    pub deadline: Option<Instant>,
    /// Cancelled when the global deadline elapses mid-phase.
    pub shutdown: CancellationToken,
}

/// The externally provided test-worker engine.
pub trait TestExecutor: Send + Sync {
    /// Test files the phase would run; reported as skipped when setup times out.
    fn planned_tests(&self, config: &RunConfig) -> Vec<TestId>;

    /// Runs all tests across all projects. An `Err` means the phase itself
    /// crashed; individual test failures belong in the report.
    fn execute(&self, request: ExecutionRequest) -> BoxFuture<'_, Result<TestPhaseReport>>;
}
