use anyhow::Error as AnyError;
use std::fmt;
use std::time::Duration;

/// Identifies which global hook an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStage {
    Setup,
    Teardown,
}

impl HookStage {
    pub fn as_str(self) -> &'static str {
        match self {
            HookStage::Setup => "global setup",
            HookStage::Teardown => "global teardown",
        }
    }
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures surfaced by the global lifecycle.
///
/// Export, resolution, setup-execution, and setup-timeout errors abort the run
/// before any test executes. Teardown and test-phase errors are recorded after
/// tests ran and only affect the overall exit code.
#[derive(Debug)]
pub enum LifecycleError {
    /// The loaded module value is not a function callable without arguments.
    HookExport { stage: HookStage, module: String },
    /// The configured reference could not be resolved or loaded.
    HookResolution {
        stage: HookStage,
        reference: String,
        source: AnyError,
    },
    /// The setup hook returned an error or panicked.
    SetupExecution { source: AnyError },
    /// The global deadline elapsed before setup settled.
    SetupTimeout { timeout: Duration },
    /// The teardown hook returned an error, panicked, or overran the remaining budget.
    TeardownExecution { source: AnyError },
    /// The test execution phase itself crashed.
    TestPhase { source: AnyError },
}

impl LifecycleError {
    pub fn export(stage: HookStage, module: impl Into<String>) -> Self {
        LifecycleError::HookExport {
            stage,
            module: module.into(),
        }
    }

    pub fn resolution(stage: HookStage, reference: impl Into<String>, source: AnyError) -> Self {
        LifecycleError::HookResolution {
            stage,
            reference: reference.into(),
            source,
        }
    }

    /// Whether the error prevents the test execution phase from starting.
    pub fn is_fatal_before_tests(&self) -> bool {
        matches!(
            self,
            LifecycleError::HookExport { .. }
                | LifecycleError::HookResolution { .. }
                | LifecycleError::SetupExecution { .. }
                | LifecycleError::SetupTimeout { .. }
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LifecycleError::HookExport { .. } => "HookExportError",
            LifecycleError::HookResolution { .. } => "HookResolutionError",
            LifecycleError::SetupExecution { .. } => "SetupExecutionError",
            LifecycleError::SetupTimeout { .. } => "SetupTimeoutError",
            LifecycleError::TeardownExecution { .. } => "TeardownExecutionError",
            LifecycleError::TestPhase { .. } => "TestPhaseError",
        }
    }
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleError::HookExport { stage, module } => {
                write!(f, "{stage} file must export a single function: {module}")
            }
            LifecycleError::HookResolution {
                stage,
                reference,
                source,
            } => write!(f, "cannot resolve {stage} module {reference}: {source}"),
            LifecycleError::SetupExecution { source } => fmt::Display::fmt(source, f),
            LifecycleError::SetupTimeout { timeout } => write!(
                f,
                "timed out waiting {}ms for the global setup to finish",
                timeout.as_millis()
            ),
            LifecycleError::TeardownExecution { source } => {
                write!(f, "global teardown failed: {source}")
            }
            LifecycleError::TestPhase { source } => {
                write!(f, "test execution phase crashed: {source}")
            }
        }
    }
}

impl std::error::Error for LifecycleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LifecycleError::HookResolution { source, .. }
            | LifecycleError::SetupExecution { source }
            | LifecycleError::TeardownExecution { source }
            | LifecycleError::TestPhase { source } => Some(source.as_ref()),
            LifecycleError::HookExport { .. } | LifecycleError::SetupTimeout { .. } => None,
        }
    }
}
