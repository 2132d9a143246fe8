//! Test execution phase seam and the command-based adapter.

pub mod command;
pub mod phase;

pub use command::{CommandExecutor, TestCommand};
pub use phase::{ExecutionRequest, TestExecutor, TestId, TestPhaseReport, TestResult, TestStatus};
