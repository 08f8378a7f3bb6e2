//! Embedded hook modules
//!
//! A hook file with the `.module` extension does not run a script: its
//! first meaningful line names an entry of the [`ModuleTable`], a function
//! registered by the binary at startup. Modules follow the same contract as
//! shell hooks and return an exit code with a JSON object.

use hostward_core::{Error, Result};
use indexmap::IndexMap;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Extension marking a hook file as a module reference
pub const MODULE_EXTENSION: &str = "module";

/// A registered module entry point
pub type ModuleFn<'a> =
    Box<dyn Fn(&[String], &IndexMap<String, String>) -> Result<(i32, Value)> + 'a>;

/// Whether a hook file refers to an embedded module
#[must_use]
pub fn is_module(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(MODULE_EXTENSION)
}

/// Read the module key out of a `.module` hook file
///
/// Blank lines and `#` comments are skipped.
///
/// # Errors
///
/// Returns error if the file cannot be read or names no module
pub fn read_module_key(path: &Path) -> Result<String> {
    let content = fs::read_to_string(path)?;

    content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ToString::to_string)
        .ok_or_else(|| {
            Error::HookConfig(format!("Module hook {} names no module", path.display()))
        })
}

/// Table of embedded modules keyed by `<action>/<name>`
#[derive(Default)]
pub struct ModuleTable<'a> {
    entries: IndexMap<String, ModuleFn<'a>>,
}

impl<'a> ModuleTable<'a> {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module under `key`, replacing any previous entry
    pub fn register<F>(&mut self, key: impl Into<String>, module: F)
    where
        F: Fn(&[String], &IndexMap<String, String>) -> Result<(i32, Value)> + 'a,
    {
        self.entries.insert(key.into(), Box::new(module));
    }

    /// Whether a module is registered under `key`
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Registered keys, in registration order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Call a module and enforce its contract
    ///
    /// # Errors
    ///
    /// Returns `Error::HookExecution` if nothing is registered under `key`,
    /// the module's own error, or `Error::ModuleContract` if the returned
    /// value is not a JSON object
    pub fn call(
        &self,
        key: &str,
        args: &[String],
        env: &IndexMap<String, String>,
    ) -> Result<(i32, Value)> {
        let module = self
            .entries
            .get(key)
            .ok_or_else(|| Error::HookExecution(format!("No module registered as '{key}'")))?;

        let (code, value) = module(args, env)?;

        if !value.is_object() {
            return Err(Error::ModuleContract {
                module: key.to_string(),
                message: format!("expected a mapping, got {value}"),
            });
        }

        Ok((code, value))
    }
}

impl std::fmt::Debug for ModuleTable<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}
