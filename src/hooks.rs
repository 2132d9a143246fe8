//! Hook modules: references, resolution/loading seams, export validation,
//! and the teardown source chosen after setup.

pub mod reference;
pub mod registry;
pub mod teardown;
pub mod validator;
pub mod value;

pub use reference::{HookReference, ModuleLocation};
pub use registry::{HookLoader, HookRegistry, HookResolver};
pub use teardown::TeardownSource;
pub use validator::{validate_export, validate_returned, LoadedHook};
pub use value::{ExportedValue, HookFunction, HookFuture, HookOutput};
