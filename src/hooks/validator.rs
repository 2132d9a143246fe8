use super::reference::{HookReference, ModuleLocation};
use super::value::{ExportedValue, HookFunction, HookFuture};
use crate::runtime::config::RunConfig;
use crate::runtime::error::{HookStage, LifecycleError};
use std::sync::Arc;

/// A validated hook ready to be invoked once.
#[derive(Debug)]
pub struct LoadedHook {
    stage: HookStage,
    reference: HookReference,
    location: ModuleLocation,
    function: HookFunction,
}

impl LoadedHook {
    pub fn stage(&self) -> HookStage {
        self.stage
    }

    pub fn reference(&self) -> &HookReference {
        &self.reference
    }

    pub fn location(&self) -> &ModuleLocation {
        &self.location
    }

    /// Consumes the hook so it cannot be invoked twice in a run.
    pub(crate) fn invoke(self, config: Arc<RunConfig>) -> HookFuture {
        self.function.call(config)
    }
}

/// Accepts `value` only if it is a function with no required parameters.
pub fn validate_export(
    stage: HookStage,
    reference: HookReference,
    location: ModuleLocation,
    value: ExportedValue,
) -> Result<LoadedHook, LifecycleError> {
    match value {
        ExportedValue::Function(function) if function.required_params() == 0 => Ok(LoadedHook {
            stage,
            reference,
            location,
            function,
        }),
        other => {
            tracing::debug!(
                stage = %stage,
                module = %location,
                exported = other.describe(),
                "rejecting hook export"
            );
            Err(LifecycleError::export(stage, location.to_string()))
        }
    }
}

/// Applies the same arity rule to a teardown function handed back by setup.
pub fn validate_returned(
    setup_location: &ModuleLocation,
    function: HookFunction,
) -> Result<HookFunction, LifecycleError> {
    if function.required_params() == 0 {
        Ok(function)
    } else {
        Err(LifecycleError::export(
            HookStage::Setup,
            setup_location.to_string(),
        ))
    }
}
