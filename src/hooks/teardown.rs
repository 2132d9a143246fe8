use super::validator::LoadedHook;
use super::value::{HookFunction, HookFuture};
use crate::runtime::config::RunConfig;
use std::fmt;
use std::sync::Arc;

/// The single teardown chosen for a run.
pub enum TeardownSource {
    /// A separate `globalTeardown` module.
    Configured(LoadedHook),
    /// A function returned by the setup hook.
    Returned(HookFunction),
}

impl TeardownSource {
    /// Picks the run's teardown once setup has settled.
    ///
    /// A configured module always wins; a function returned by setup is only
    /// used when no module was configured.
    pub fn select(configured: Option<LoadedHook>, returned: Option<HookFunction>) -> Option<Self> {
        match (configured, returned) {
            (Some(hook), Some(_)) => {
                tracing::debug!(
                    module = %hook.location(),
                    "setup returned a teardown function; configured teardown takes precedence"
                );
                Some(TeardownSource::Configured(hook))
            }
            (Some(hook), None) => Some(TeardownSource::Configured(hook)),
            (None, Some(function)) => Some(TeardownSource::Returned(function)),
            (None, None) => None,
        }
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, TeardownSource::Configured(_))
    }

    pub(crate) fn invoke(self, config: Arc<RunConfig>) -> HookFuture {
        match self {
            TeardownSource::Configured(hook) => hook.invoke(config),
            TeardownSource::Returned(function) => function.call(config),
        }
    }
}

impl fmt::Display for TeardownSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeardownSource::Configured(hook) => write!(f, "configured {}", hook.location()),
            TeardownSource::Returned(_) => f.write_str("returned by setup"),
        }
    }
}
