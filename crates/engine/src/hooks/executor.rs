//! Hook execution engine
//!
//! Runs one hook, either as a shell script or as an embedded module, and
//! returns its `(exit code, structured return)` pair.

use super::module::{self, ModuleTable};
use hostward_core::shell;
use hostward_core::{Error, Result};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Stderr line emitted by bash when the trace descriptor is unavailable
const BENIGN_TRACE_WARNING: &str = "invalid value for trace file descriptor";

/// How a shell hook's structured return file is parsed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReturnFormat {
    /// A JSON document; an empty file means an empty mapping
    #[default]
    Json,
    /// `key=value` lines
    PlainDict,
}

impl FromStr for ReturnFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(Self::Json),
            "plain_dict" => Ok(Self::PlainDict),
            other => Err(Error::HookConfig(format!(
                "Expected value for return_format is either 'json' or 'plain_dict', got '{other}'"
            ))),
        }
    }
}

/// Options of a single hook execution
#[derive(Debug, Clone)]
pub struct ExecOptions {
    /// Positional arguments
    pub args: Vec<String>,
    /// Extra environment variables
    pub env: IndexMap<String, String>,
    /// Working directory; defaults to the script's directory
    pub chdir: Option<PathBuf>,
    /// User the script runs as
    pub user: String,
    /// Disable command tracing
    pub no_trace: bool,
    /// Turn a non-zero or missing exit code into an error
    pub raise_on_error: bool,
    /// Format of the structured return
    pub return_format: ReturnFormat,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            env: IndexMap::new(),
            chdir: None,
            user: "root".to_string(),
            no_trace: false,
            raise_on_error: false,
            return_format: ReturnFormat::Json,
        }
    }
}

impl ExecOptions {
    /// Default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the positional arguments
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Add an environment variable
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the working directory
    #[must_use]
    pub fn chdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.chdir = Some(dir.into());
        self
    }

    /// Run as another user
    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Disable command tracing
    #[must_use]
    pub fn no_trace(mut self, no_trace: bool) -> Self {
        self.no_trace = no_trace;
        self
    }

    /// Fail on a non-zero or missing exit code
    #[must_use]
    pub fn raise_on_error(mut self, raise: bool) -> Self {
        self.raise_on_error = raise;
        self
    }

    /// Set the structured return format
    #[must_use]
    pub fn return_format(mut self, format: ReturnFormat) -> Self {
        self.return_format = format;
        self
    }
}

/// Parse the content of a structured return file
///
/// # Errors
///
/// Returns `Error::HookReturn` if a JSON return is malformed or not a mapping
pub fn parse_return(path: &Path, raw: &str, format: ReturnFormat) -> Result<Value> {
    match format {
        ReturnFormat::Json => {
            if raw.trim().is_empty() {
                return Ok(Value::Object(Map::new()));
            }
            let value: Value = serde_json::from_str(raw).map_err(|e| Error::HookReturn {
                path: path.to_path_buf(),
                message: e.to_string(),
                raw_content: raw.to_string(),
            })?;
            if !value.is_object() {
                return Err(Error::HookReturn {
                    path: path.to_path_buf(),
                    message: "expected a JSON object".to_string(),
                    raw_content: raw.to_string(),
                });
            }
            Ok(value)
        }
        ReturnFormat::PlainDict => {
            let mut map = Map::new();
            for line in raw.lines() {
                if let Some((key, value)) = line.trim().split_once('=') {
                    map.insert(key.to_string(), Value::String(value.to_string()));
                }
            }
            Ok(Value::Object(map))
        }
    }
}

/// Executes hooks
#[derive(Debug)]
pub struct HookExecutor<'m> {
    modules: ModuleTable<'m>,
    interface: String,
}

impl<'m> HookExecutor<'m> {
    /// Create an executor resolving `.module` hooks through `modules`
    #[must_use]
    pub fn new(modules: ModuleTable<'m>) -> Self {
        Self {
            modules,
            interface: "cli".to_string(),
        }
    }

    /// Set the interface name exported to shell hooks
    #[must_use]
    pub fn interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = interface.into();
        self
    }

    /// The embedded module table
    #[must_use]
    pub fn modules(&self) -> &ModuleTable<'m> {
        &self.modules
    }

    /// Execute the hook at `path`
    ///
    /// A missing exit code (the process was killed) is reported distinctly
    /// from a non-zero one. Without `raise_on_error` it is logged and the
    /// call returns `(1, {})`.
    ///
    /// # Errors
    ///
    /// - `Error::FileNotFound` if the hook does not exist
    /// - `Error::HookReturn` if the structured return is malformed
    /// - `Error::HookNotTerminated` / `Error::HookFailed` with `raise_on_error`
    /// - the module's error for embedded modules
    #[tracing::instrument(skip(self, options), fields(path = %path.display()))]
    pub fn execute(&self, path: &Path, options: &ExecOptions) -> Result<(i32, Value)> {
        let path = fs::canonicalize(path).map_err(|_| Error::FileNotFound {
            path: path.to_path_buf(),
        })?;
        if !path.is_file() {
            return Err(Error::FileNotFound { path });
        }

        let (code, value) = if module::is_module(&path) {
            let key = module::read_module_key(&path)?;
            tracing::debug!("Calling module {}", key);
            let (code, value) = self.modules.call(&key, &options.args, &options.env)?;
            (Some(code), value)
        } else {
            self.execute_shell(&path, options)?
        };

        match code {
            None if options.raise_on_error => Err(Error::HookNotTerminated { path }),
            None => {
                tracing::error!("Hook {} did not terminate properly", path.display());
                Ok((1, Value::Object(Map::new())))
            }
            Some(code) if options.raise_on_error && code != 0 => {
                Err(Error::HookFailed { path, code })
            }
            Some(code) => Ok((code, value)),
        }
    }

    /// Build the `sh -c` line running a script
    fn command_line(
        script: &str,
        env: &IndexMap<String, String>,
        args: &[String],
        no_trace: bool,
    ) -> String {
        let exports = env
            .iter()
            .map(|(k, v)| format!("{k}={}", shell::quote(v)))
            .collect::<Vec<_>>()
            .join(" ");
        let args = shell::join(args);

        if no_trace {
            format!("{exports} /bin/bash \"{script}\" {args}")
        } else {
            // xtrace goes to fd 7, redirected to stdout
            format!("{exports} BASH_XTRACEFD=7 /bin/bash -x \"{script}\" {args} 7>&1")
        }
    }

    fn execute_shell(&self, path: &Path, options: &ExecOptions) -> Result<(Option<i32>, Value)> {
        let (chdir, script) = match &options.chdir {
            Some(dir) => (dir.clone(), path.to_string_lossy().into_owned()),
            None => {
                let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
                let file = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                (dir, format!("./{file}"))
            }
        };

        // Both channels live in a temporary directory removed on return
        let channels = tempfile::TempDir::new()?;
        let stdinfo = channels.path().join("stdinfo");
        let stdreturn = channels.path().join("stdreturn");
        fs::write(&stdreturn, "")?;

        let mut env = options.env.clone();
        env.insert("HOSTWARD_CWD".into(), chdir.to_string_lossy().into_owned());
        env.insert("HOSTWARD_INTERFACE".into(), self.interface.clone());
        env.insert("HOSTWARD_STDINFO".into(), stdinfo.to_string_lossy().into_owned());
        env.insert(
            "HOSTWARD_STDRETURN".into(),
            stdreturn.to_string_lossy().into_owned(),
        );

        let mut command: Vec<String> = if options.user == "root" {
            vec!["sh".into(), "-c".into()]
        } else {
            ["sudo", "-n", "-u", options.user.as_str(), "-H", "sh", "-c"]
                .iter()
                .map(ToString::to_string)
                .collect()
        };
        command.push(Self::command_line(
            &script,
            &env,
            &options.args,
            options.no_trace,
        ));

        tracing::debug!("Executing command: {:?}", command);

        let output = duct::cmd(&command[0], &command[1..])
            .dir(&chdir)
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run()
            .map_err(|e| {
                Error::HookExecution(format!("Failed to run {}: {e}", path.display()))
            })?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            tracing::debug!("{}", line.trim_end());
        }
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            if line.contains(BENIGN_TRACE_WARNING) {
                tracing::debug!("{}", line.trim_end());
            } else {
                tracing::warn!("{}", line.trim_end());
            }
        }
        if let Ok(info) = fs::read_to_string(&stdinfo) {
            for line in info.lines() {
                tracing::info!("{}", line.trim_end());
            }
        }

        let raw = fs::read_to_string(&stdreturn)?;
        let value = parse_return(path, &raw, options.return_format)?;

        Ok((output.status.code(), value))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_return_format_from_str() {
        assert_eq!("json".parse::<ReturnFormat>().unwrap(), ReturnFormat::Json);
        assert_eq!(
            "plain_dict".parse::<ReturnFormat>().unwrap(),
            ReturnFormat::PlainDict
        );
        assert!("yaml".parse::<ReturnFormat>().is_err());
    }

    #[test]
    fn test_parse_return_empty_is_empty_mapping() {
        let value = parse_return(Path::new("/hook"), "", ReturnFormat::Json).unwrap();
        assert_eq!(value, json!({}));
    }

    #[test]
    fn test_parse_return_malformed_json_names_path_and_content() {
        let err = parse_return(Path::new("/hooks/x/10-bad"), "{oops", ReturnFormat::Json)
            .unwrap_err();

        match err {
            Error::HookReturn {
                path, raw_content, ..
            } => {
                assert_eq!(path, PathBuf::from("/hooks/x/10-bad"));
                assert_eq!(raw_content, "{oops");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_return_plain_dict() {
        let raw = "size=12\n  path=/a=b  \nnoise\n";
        let value = parse_return(Path::new("/hook"), raw, ReturnFormat::PlainDict).unwrap();

        assert_eq!(value, json!({"size": "12", "path": "/a=b"}));
    }

    #[test]
    fn test_command_line_quotes_env_and_args() {
        let mut env = IndexMap::new();
        env.insert("APP".to_string(), "my app".to_string());
        let line = HookExecutor::command_line(
            "./10-test",
            &env,
            &["it's".to_string(), "plain".to_string()],
            false,
        );

        assert_eq!(
            line,
            "APP='my app' BASH_XTRACEFD=7 /bin/bash -x \"./10-test\" 'it'\"'\"'s' plain 7>&1"
        );
    }

    #[test]
    fn test_command_line_no_trace() {
        let line = HookExecutor::command_line("/x/10-test", &IndexMap::new(), &[], true);
        assert_eq!(line, " /bin/bash \"/x/10-test\" ");
    }

    #[test]
    fn test_execute_missing_file() {
        let executor = HookExecutor::new(ModuleTable::new());
        let err = executor
            .execute(Path::new("/nonexistent/10-hook"), &ExecOptions::new())
            .unwrap_err();

        assert!(matches!(err, Error::FileNotFound { .. }));
    }

    #[test]
    fn test_execute_module_hook() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("10-echo.module");
        fs::write(&path, "demo/echo\n").unwrap();

        let mut modules = ModuleTable::new();
        modules.register("demo/echo", |args, _env| Ok((0, json!({"n": args.len()}))));
        let executor = HookExecutor::new(modules);

        let (code, value) = executor
            .execute(&path, &ExecOptions::new().args(["a", "b"]))
            .unwrap();
        assert_eq!(code, 0);
        assert_eq!(value, json!({"n": 2}));
    }

    #[test]
    fn test_execute_module_failure_with_raise() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("10-fail.module");
        fs::write(&path, "demo/fail\n").unwrap();

        let mut modules = ModuleTable::new();
        modules.register("demo/fail", |_, _| Ok((2, json!({}))));
        let executor = HookExecutor::new(modules);

        let (code, _) = executor.execute(&path, &ExecOptions::new()).unwrap();
        assert_eq!(code, 2);

        let err = executor
            .execute(&path, &ExecOptions::new().raise_on_error(true))
            .unwrap_err();
        assert!(matches!(err, Error::HookFailed { code: 2, .. }));
    }
}
