pub mod execution;
pub mod hooks;
pub mod report;
pub mod runtime;

pub use execution::{
    CommandExecutor, ExecutionRequest, TestCommand, TestExecutor, TestId, TestPhaseReport,
    TestResult, TestStatus,
};
pub use hooks::{
    ExportedValue, HookFunction, HookFuture, HookLoader, HookOutput, HookReference, HookRegistry,
    HookResolver, LoadedHook, ModuleLocation, TeardownSource,
};
pub use report::{Reporter, RunSummary, SkipReason, TracingReporter, EXIT_FAILURE, EXIT_SUCCESS};
pub use runtime::config::{RawRunConfig, RunConfig, RunConfigBuilder, RunConfigParams};
pub use runtime::deadline::GlobalDeadline;
pub use runtime::error::{HookStage, LifecycleError};
pub use runtime::runner::LifecycleRunner;
pub use runtime::state::{LifecycleState, RunOutcome};
pub use runtime::telemetry::{init_tracing, Telemetry, TelemetrySnapshot};
