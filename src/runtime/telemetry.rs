use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Installs a basic tracing subscriber (if one is not already active).
///
/// The subscriber honours `RUST_LOG` if it is present, otherwise it falls back to `info`.
/// Calling this function multiple times is harmless.
pub fn init_tracing() {
    if TRACING_INIT.get().is_some() {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init();

    let _ = TRACING_INIT.set(());
}

/// Phases whose wall-clock time is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Setup,
    Tests,
    Teardown,
}

/// Counters collected while the lifecycle runs.
#[derive(Default, Debug)]
pub struct Telemetry {
    hooks_invoked: AtomicU64,
    setup_ms: AtomicU64,
    tests_ms: AtomicU64,
    teardown_ms: AtomicU64,
}

impl Telemetry {
    pub fn record_hook_invocation(&self) {
        self.hooks_invoked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_phase(&self, phase: Phase, elapsed: Duration) {
        let millis = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        let slot = match phase {
            Phase::Setup => &self.setup_ms,
            Phase::Tests => &self.tests_ms,
            Phase::Teardown => &self.teardown_ms,
        };
        slot.store(millis, Ordering::Relaxed);
    }

    pub fn hooks_invoked(&self) -> u64 {
        self.hooks_invoked.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            hooks_invoked: self.hooks_invoked.load(Ordering::Relaxed),
            setup_ms: self.setup_ms.load(Ordering::Relaxed),
            tests_ms: self.tests_ms.load(Ordering::Relaxed),
            teardown_ms: self.teardown_ms.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub hooks_invoked: u64,
    pub setup_ms: u64,
    pub tests_ms: u64,
    pub teardown_ms: u64,
}
