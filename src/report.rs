//! Reporter seam and the run summary it consumes.

pub mod reporter;
pub mod summary;

pub use reporter::{Reporter, TracingReporter};
pub use summary::{RunSummary, SkipReason, EXIT_FAILURE, EXIT_SUCCESS};
