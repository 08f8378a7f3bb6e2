//! Running every hook of an action
//!
//! Hooks run sequentially in ascending priority. Within a priority, names
//! keep their discovery order. A failing hook is logged and recorded; the
//! remaining hooks still run.

use super::executor::{ExecOptions, HookExecutor};
use super::registry::{HookInfo, HookRegistry, Priority};
use hostward_core::{Error, Result};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Outcome of one hook in a callback run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HookState {
    /// The hook exited with code 0
    Succeed,
    /// The hook failed or could not be run
    Failed,
}

/// Result of one hook in a callback run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HookResult {
    /// Success or failure
    pub state: HookState,
    /// Structured return; empty on failure
    pub stdreturn: Value,
}

/// Results keyed by hook name, then by path
pub type CallbackResults = IndexMap<String, IndexMap<PathBuf, HookResult>>;

type PreCallback<'c> = Box<dyn Fn(&HookInfo, &[String]) -> Vec<String> + 'c>;
type PostCallback<'c> = Box<dyn Fn(&HookInfo, bool) + 'c>;

/// Runs the hooks of an action
pub struct HookCallback<'c, 'm> {
    registry: &'c HookRegistry,
    executor: &'c HookExecutor<'m>,
    hooks: Vec<String>,
    args: Vec<String>,
    options: ExecOptions,
    pre_callback: Option<PreCallback<'c>>,
    post_callback: Option<PostCallback<'c>>,
}

/// Builder for [`HookCallback`]
pub struct HookCallbackBuilder<'c, 'm> {
    inner: HookCallback<'c, 'm>,
}

impl<'c, 'm> HookCallback<'c, 'm> {
    /// Create a builder
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let results = HookCallback::builder(&registry, &executor)
    ///     .hooks(["nginx"])
    ///     .args(["example.org"])
    ///     .post_callback(|hook, ok| println!("{} {}", hook.name, ok))
    ///     .build()
    ///     .run("post_domain_add")?;
    /// ```
    #[must_use]
    pub fn builder(
        registry: &'c HookRegistry,
        executor: &'c HookExecutor<'m>,
    ) -> HookCallbackBuilder<'c, 'm> {
        HookCallbackBuilder {
            inner: Self {
                registry,
                executor,
                hooks: Vec::new(),
                args: Vec::new(),
                options: ExecOptions::new(),
                pre_callback: None,
                post_callback: None,
            },
        }
    }

    /// Select the hooks to run, grouped by priority
    ///
    /// Requesting `name` also selects every `name_<suffix>` hook.
    fn select(&self, action: &str) -> Result<BTreeMap<Priority, IndexMap<String, HookInfo>>> {
        if self.hooks.is_empty() {
            return Ok(self.registry.list_by_priority(action));
        }

        let by_name = self.registry.list_by_name(action);
        let mut selected: BTreeMap<Priority, IndexMap<String, HookInfo>> = BTreeMap::new();

        for requested in &self.hooks {
            let prefix = format!("{requested}_");
            let mut found = false;

            for (name, hooks) in &by_name {
                if name != requested && !name.starts_with(&prefix) {
                    continue;
                }
                found = true;
                for hook in hooks {
                    selected
                        .entry(hook.priority.clone())
                        .or_default()
                        .insert(name.clone(), hook.clone());
                }
            }

            if !found {
                return Err(Error::HookNameUnknown {
                    name: requested.clone(),
                });
            }
        }

        Ok(selected)
    }

    /// Run the selected hooks of `action`
    ///
    /// # Errors
    ///
    /// Returns `Error::HookNameUnknown` if a requested hook name matches no
    /// hook. Failures of individual hooks are recorded in the results.
    #[tracing::instrument(skip(self))]
    pub fn run(&self, action: &str) -> Result<CallbackResults> {
        let mut results = CallbackResults::new();

        for (priority, hooks) in self.select(action)? {
            for (name, hook) in hooks {
                let args = match &self.pre_callback {
                    Some(pre) => pre(&hook, &self.args),
                    None => self.args.clone(),
                };

                let mut options = self.options.clone();
                options.args = args;
                options.raise_on_error = true;

                tracing::debug!("Running hook {} ({})", name, priority);
                let result = match self.executor.execute(&hook.path, &options) {
                    Ok((_, stdreturn)) => {
                        if let Some(post) = &self.post_callback {
                            post(&hook, true);
                        }
                        HookResult {
                            state: HookState::Succeed,
                            stdreturn,
                        }
                    }
                    Err(e) => {
                        tracing::error!("{}", e);
                        if let Some(post) = &self.post_callback {
                            post(&hook, false);
                        }
                        HookResult {
                            state: HookState::Failed,
                            stdreturn: Value::Object(Map::new()),
                        }
                    }
                };

                results
                    .entry(name)
                    .or_default()
                    .insert(hook.path.clone(), result);
            }
        }

        Ok(results)
    }
}

impl<'c, 'm> HookCallbackBuilder<'c, 'm> {
    /// Restrict the run to these hook names
    #[must_use]
    pub fn hooks<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.hooks = names.into_iter().map(Into::into).collect();
        self
    }

    /// Arguments given to every hook
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Add an environment variable
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner.options = self.inner.options.env(key, value);
        self
    }

    /// Working directory of the hooks
    #[must_use]
    pub fn chdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.inner.options = self.inner.options.chdir(dir);
        self
    }

    /// Disable command tracing
    #[must_use]
    pub fn no_trace(mut self, no_trace: bool) -> Self {
        self.inner.options = self.inner.options.no_trace(no_trace);
        self
    }

    /// Transform the arguments before each hook
    #[must_use]
    pub fn pre_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&HookInfo, &[String]) -> Vec<String> + 'c,
    {
        self.inner.pre_callback = Some(Box::new(callback));
        self
    }

    /// Observe the outcome of each hook
    #[must_use]
    pub fn post_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&HookInfo, bool) + 'c,
    {
        self.inner.post_callback = Some(Box::new(callback));
        self
    }

    /// Finish building
    #[must_use]
    pub fn build(self) -> HookCallback<'c, 'm> {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use crate::hooks::ModuleTable;
    use serde_json::json;
    use std::cell::RefCell;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn module_hook(root: &Path, action: &str, filename: &str, key: &str) -> PathBuf {
        let dir = root.join(action);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(filename);
        fs::write(&path, key).unwrap();
        path
    }

    fn modules() -> ModuleTable<'static> {
        let mut table = ModuleTable::new();
        table.register("test/ok", |args, _| Ok((0, json!({ "args": args }))));
        table.register("test/fail", |_, _| Ok((1, json!({}))));
        table
    }

    #[test]
    fn test_runs_all_in_priority_order() {
        let temp = TempDir::new().unwrap();
        let system = temp.path().join("system");
        module_hook(&system, "act", "20-second.module", "test/ok");
        module_hook(&system, "act", "05-first.module", "test/ok");

        let registry = HookRegistry::new(&system, temp.path().join("custom"));
        let executor = HookExecutor::new(modules());
        let order = RefCell::new(Vec::new());

        let results = HookCallback::builder(&registry, &executor)
            .post_callback(|hook, _| order.borrow_mut().push(hook.name.clone()))
            .build()
            .run("act")
            .unwrap();

        assert_eq!(*order.borrow(), vec!["first", "second"]);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_failure_does_not_stop_batch() {
        let temp = TempDir::new().unwrap();
        let system = temp.path().join("system");
        let bad = module_hook(&system, "act", "10-bad.module", "test/fail");
        let good = module_hook(&system, "act", "20-good.module", "test/ok");

        let registry = HookRegistry::new(&system, temp.path().join("custom"));
        let executor = HookExecutor::new(modules());

        let results = HookCallback::builder(&registry, &executor)
            .build()
            .run("act")
            .unwrap();

        assert_eq!(results["bad"][&bad].state, HookState::Failed);
        assert_eq!(results["bad"][&bad].stdreturn, json!({}));
        assert_eq!(results["good"][&good].state, HookState::Succeed);
    }

    #[test]
    fn test_requested_name_pulls_suffixed_hooks() {
        let temp = TempDir::new().unwrap();
        let system = temp.path().join("system");
        module_hook(&system, "act", "16-postfix.module", "test/ok");
        module_hook(&system, "act", "17-postfix_dkim.module", "test/ok");
        module_hook(&system, "act", "18-dovecot.module", "test/ok");

        let registry = HookRegistry::new(&system, temp.path().join("custom"));
        let executor = HookExecutor::new(modules());

        let results = HookCallback::builder(&registry, &executor)
            .hooks(["postfix"])
            .build()
            .run("act")
            .unwrap();

        let names: Vec<&String> = results.keys().collect();
        assert_eq!(names, vec!["postfix", "postfix_dkim"]);
    }

    #[test]
    fn test_unknown_requested_name() {
        let temp = TempDir::new().unwrap();
        let registry = HookRegistry::new(temp.path().join("s"), temp.path().join("c"));
        let executor = HookExecutor::new(modules());

        let err = HookCallback::builder(&registry, &executor)
            .hooks(["ghost"])
            .build()
            .run("act")
            .unwrap_err();
        assert!(matches!(err, Error::HookNameUnknown { .. }));
    }

    #[test]
    fn test_pre_callback_rewrites_args() {
        let temp = TempDir::new().unwrap();
        let system = temp.path().join("system");
        module_hook(&system, "act", "10-one.module", "test/ok");

        let registry = HookRegistry::new(&system, temp.path().join("custom"));
        let executor = HookExecutor::new(modules());

        let results = HookCallback::builder(&registry, &executor)
            .args(["base"])
            .pre_callback(|hook, args| {
                let mut args = args.to_vec();
                args.push(hook.priority.to_string());
                args
            })
            .build()
            .run("act")
            .unwrap();

        let result = results["one"].values().next().unwrap();
        assert_eq!(result.stdreturn, json!({"args": ["base", "10"]}));
    }
}
