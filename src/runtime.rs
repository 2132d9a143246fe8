//! Runtime glue that wires configuration, the global deadline, lifecycle
//! state, telemetry, and runner orchestration.

pub mod config;
pub mod deadline;
pub mod error;
pub(crate) mod hooks;
pub mod runner;
pub mod state;
pub mod telemetry;
