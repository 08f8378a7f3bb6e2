//! Hook system
//!
//! Hooks are scripts (or references to embedded modules) registered for an
//! action under `<root>/<action>/`. They are discovered on every call,
//! executed one at a time, and return an exit code plus a JSON mapping.
//!
//! ## Module Organization
//!
//! - `registry`: discovery in the system and custom roots
//! - `module`: table of embedded modules referenced by `.module` hooks
//! - `executor`: execution of a single hook
//! - `callback`: execution of every hook of an action, by priority

pub mod callback;
pub mod executor;
pub mod module;
pub mod registry;

pub use callback::{CallbackResults, HookCallback, HookCallbackBuilder, HookResult, HookState};
pub use executor::{ExecOptions, HookExecutor, ReturnFormat, parse_return};
pub use module::{ModuleFn, ModuleTable};
pub use registry::{
    DEFAULT_PRIORITY, FolderListing, HookInfo, HookOrigin, HookRegistry, Priority, split_filename,
};
