//! Hook commands
//!
//! Listing and installing hooks only touches the filesystem; executing
//! them goes through an executor that also knows the built-in diagnosis
//! modules.

use anyhow::Context;
use clap::{Args, ValueEnum};
use hostward_engine::hooks::{
    ExecOptions, HookCallback, HookInfo, HookOrigin, HookState, ReturnFormat,
};
use owo_colors::OwoColorize;
use std::path::PathBuf;

use super::print_json;
use crate::command::Command;
use crate::common::RuntimeContext;
use crate::error::{CommandError, Result};
use crate::ui::StatusIcon;

/// How `hook list` groups hooks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ListBy {
    /// Hook name to its definitions
    #[default]
    Name,
    /// Priority to the hooks sharing it
    Priority,
    /// System and custom roots
    Folder,
}

/// Parse a `KEY=VALUE` environment assignment
fn parse_env(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))
}

fn origin_label(origin: HookOrigin) -> String {
    match origin {
        HookOrigin::System => "system".dimmed().to_string(),
        HookOrigin::Custom => "custom".cyan().to_string(),
    }
}

fn print_hook(hook: &HookInfo) {
    println!(
        "  {:>4} {} {} {}",
        hook.priority.to_string().yellow(),
        hook.name.bold(),
        origin_label(hook.origin),
        hook.path.display().dimmed()
    );
}

/// List the hooks of an action
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Action whose hooks to list
    pub action: String,

    /// Grouping of the listing
    #[arg(long, value_enum, default_value_t = ListBy::Name)]
    pub by: ListBy,

    /// Print the listing as JSON
    #[arg(long)]
    pub json: bool,
}

impl Command for ListCommand {
    type Output = ();

    fn execute(&self, context: &RuntimeContext) -> Result<()> {
        let registry = &context.registry;

        match self.by {
            ListBy::Name => {
                let hooks = registry.list_by_name(&self.action);
                if self.json {
                    return Ok(print_json(&hooks)?);
                }
                for (name, definitions) in &hooks {
                    println!("{}", name.bold());
                    for hook in definitions {
                        print_hook(hook);
                    }
                }
            }
            ListBy::Priority => {
                let hooks = registry.list_by_priority(&self.action);
                if self.json {
                    return Ok(print_json(&hooks)?);
                }
                for (priority, named) in &hooks {
                    println!("{}", priority.to_string().yellow());
                    for hook in named.values() {
                        print_hook(hook);
                    }
                }
            }
            ListBy::Folder => {
                let listing = registry.list_by_folder(&self.action);
                if self.json {
                    return Ok(print_json(&listing)?);
                }
                for (label, hooks) in [("system", &listing.system), ("custom", &listing.custom)] {
                    println!("{}", label.bold());
                    for hook in hooks {
                        print_hook(hook);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Show where a hook is defined
#[derive(Debug, Args)]
pub struct InfoCommand {
    /// Action the hook belongs to
    pub action: String,

    /// Hook name
    pub name: String,
}

impl Command for InfoCommand {
    type Output = ();

    fn execute(&self, context: &RuntimeContext) -> Result<()> {
        let hooks = context.registry.info(&self.action, &self.name)?;
        print_json(&hooks)?;
        Ok(())
    }
}

/// Execute a single hook script
#[derive(Debug, Args)]
pub struct ExecCommand {
    /// Script to execute
    pub path: PathBuf,

    /// Arguments passed to the script
    #[arg(last = true)]
    pub args: Vec<String>,

    /// Extra environment variable, as KEY=VALUE
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env)]
    pub env: Vec<(String, String)>,

    /// Working directory (defaults to the script's directory)
    #[arg(long)]
    pub chdir: Option<PathBuf>,

    /// User to run the script as
    #[arg(long, default_value = "root")]
    pub user: String,

    /// Do not trace the commands run by the script
    #[arg(long)]
    pub no_trace: bool,

    /// Format of the structured return file
    #[arg(long, default_value = "json", value_parser = ["json", "plain_dict"])]
    pub return_format: String,
}

impl ExecCommand {
    fn options(&self) -> Result<ExecOptions> {
        let return_format: ReturnFormat = self.return_format.parse()?;
        let mut options = ExecOptions::new()
            .args(self.args.iter().cloned())
            .user(&self.user)
            .no_trace(self.no_trace)
            .return_format(return_format);
        for (key, value) in &self.env {
            options = options.env(key, value);
        }
        if let Some(chdir) = &self.chdir {
            options = options.chdir(chdir);
        }
        Ok(options)
    }
}

impl Command for ExecCommand {
    type Output = ();

    fn execute(&self, context: &RuntimeContext) -> Result<()> {
        let options = self.options()?;
        let path = std::fs::canonicalize(&self.path)
            .with_context(|| format!("Hook not found: {}", self.path.display()))?;

        let (code, stdreturn) =
            context.with_executor(|executor, _| Ok(executor.execute(&path, &options)?))?;

        print_json(&stdreturn)?;
        if code == 0 {
            Ok(())
        } else {
            Err(CommandError::HookFailed { path, code })
        }
    }
}

/// Run every hook of an action
#[derive(Debug, Args)]
pub struct CallbackCommand {
    /// Action whose hooks to run
    pub action: String,

    /// Only run these hooks (and their `<name>_<suffix>` variants)
    #[arg(long)]
    pub hooks: Vec<String>,

    /// Arguments passed to every hook
    #[arg(last = true)]
    pub args: Vec<String>,

    /// Extra environment variable, as KEY=VALUE
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env)]
    pub env: Vec<(String, String)>,

    /// Working directory of the hooks
    #[arg(long)]
    pub chdir: Option<PathBuf>,

    /// Do not trace the commands run by the hooks
    #[arg(long)]
    pub no_trace: bool,

    /// Print the results as JSON
    #[arg(long)]
    pub json: bool,
}

impl Command for CallbackCommand {
    type Output = ();

    fn execute(&self, context: &RuntimeContext) -> Result<()> {
        let json = self.json;
        let results = context.with_executor(|executor, _| {
            let mut builder = HookCallback::builder(&context.registry, executor)
                .hooks(self.hooks.iter().cloned())
                .args(self.args.iter().cloned())
                .no_trace(self.no_trace)
                .pre_callback(move |hook, args| {
                    if !json {
                        println!("{} {}", StatusIcon::Running.get(), hook.name.cyan());
                    }
                    args.to_vec()
                })
                .post_callback(move |hook, succeeded| {
                    if !json && !succeeded {
                        println!(
                            "{} {} {}",
                            StatusIcon::Error.get(),
                            hook.name,
                            "failed".red()
                        );
                    }
                });
            for (key, value) in &self.env {
                builder = builder.env(key, value);
            }
            if let Some(chdir) = &self.chdir {
                builder = builder.chdir(chdir);
            }
            Ok(builder.build().run(&self.action)?)
        })?;

        if self.json {
            print_json(&results)?;
        }

        let failed = results
            .values()
            .flat_map(|by_path| by_path.values())
            .filter(|result| result.state == HookState::Failed)
            .count();

        if failed == 0 {
            if !self.json {
                println!(
                    "{} {} hook(s) ran for '{}'",
                    StatusIcon::Success.get(),
                    results.len(),
                    self.action
                );
            }
            Ok(())
        } else {
            Err(CommandError::CallbackFailed {
                action: self.action.clone(),
                failed,
            })
        }
    }
}

/// Install an application's hook into the custom root
///
/// The file name gives the action and priority, e.g. `50-post_domain_add`.
#[derive(Debug, Args)]
pub struct AddCommand {
    /// Application owning the hook
    pub app: String,

    /// Hook script to install
    pub file: PathBuf,
}

impl Command for AddCommand {
    type Output = ();

    fn execute(&self, context: &RuntimeContext) -> Result<()> {
        let installed = context.registry.add(&self.app, &self.file)?;
        println!(
            "{} Installed {}",
            StatusIcon::Success.get(),
            installed.display().cyan()
        );
        Ok(())
    }
}

/// Remove an application's hooks from the custom root
#[derive(Debug, Args)]
pub struct RemoveCommand {
    /// Application whose hooks to remove
    pub app: String,
}

impl Command for RemoveCommand {
    type Output = ();

    fn execute(&self, context: &RuntimeContext) -> Result<()> {
        let removed = context.registry.remove(&self.app)?;
        if removed.is_empty() {
            println!("{} No hooks installed for {}", StatusIcon::Info.get(), self.app);
        }
        for path in removed {
            println!("{} Removed {}", StatusIcon::Success.get(), path.display());
        }
        Ok(())
    }
}
