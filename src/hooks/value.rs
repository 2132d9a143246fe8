//! Values produced by loading a hook module.

use crate::runtime::config::RunConfig;
use anyhow::Result;
use core::future::Future;
use core::pin::Pin;
use std::fmt;
use std::sync::Arc;

pub type HookFuture = Pin<Box<dyn Future<Output = Result<HookOutput>> + Send + 'static>>;

type HookCallable = dyn Fn(Arc<RunConfig>) -> HookFuture + Send + Sync;

/// What a hook invocation settles with.
pub enum HookOutput {
    None,
    Value(serde_json::Value),
    /// Only meaningful for setup: the function is kept as the run's teardown.
    Teardown(HookFunction),
}

impl HookOutput {
    pub fn teardown<F, Fut>(f: F) -> Self
    where
        F: Fn(Arc<RunConfig>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HookOutput>> + Send + 'static,
    {
        HookOutput::Teardown(HookFunction::new(f))
    }
}

impl fmt::Debug for HookOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookOutput::None => f.write_str("None"),
            HookOutput::Value(value) => f.debug_tuple("Value").field(value).finish(),
            HookOutput::Teardown(function) => f.debug_tuple("Teardown").field(function).finish(),
        }
    }
}

/// An invocable hook body.
///
/// The run configuration is always supplied as the single argument, so a
/// function is a valid hook only when it declares no further required
/// parameters.
#[derive(Clone)]
pub struct HookFunction {
    call: Arc<HookCallable>,
    required_params: usize,
}

impl HookFunction {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Arc<RunConfig>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HookOutput>> + Send + 'static,
    {
        let call: Arc<HookCallable> =
            Arc::new(move |config: Arc<RunConfig>| -> HookFuture { Box::pin(f(config)) });
        Self {
            call,
            required_params: 0,
        }
    }

    /// Declares parameters the function needs beyond the configuration.
    pub fn with_required_params(mut self, count: usize) -> Self {
        self.required_params = count;
        self
    }

    pub fn required_params(&self) -> usize {
        self.required_params
    }

    pub(crate) fn call(&self, config: Arc<RunConfig>) -> HookFuture {
        (self.call)(config)
    }
}

impl fmt::Debug for HookFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookFunction")
            .field("required_params", &self.required_params)
            .finish_non_exhaustive()
    }
}

/// The exported value of a loaded module (its default export, or the module
/// value itself when there is no default).
#[derive(Debug, Clone)]
pub enum ExportedValue {
    Function(HookFunction),
    Value(serde_json::Value),
}

impl ExportedValue {
    pub fn describe(&self) -> &'static str {
        match self {
            ExportedValue::Function(_) => "function",
            ExportedValue::Value(serde_json::Value::Null) => "null",
            ExportedValue::Value(serde_json::Value::Bool(_)) => "boolean",
            ExportedValue::Value(serde_json::Value::Number(_)) => "number",
            ExportedValue::Value(serde_json::Value::String(_)) => "string",
            ExportedValue::Value(serde_json::Value::Array(_)) => "array",
            ExportedValue::Value(serde_json::Value::Object(_)) => "object",
        }
    }
}

impl From<HookFunction> for ExportedValue {
    fn from(function: HookFunction) -> Self {
        ExportedValue::Function(function)
    }
}

impl From<serde_json::Value> for ExportedValue {
    fn from(value: serde_json::Value) -> Self {
        ExportedValue::Value(value)
    }
}
