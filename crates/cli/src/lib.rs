//! Hostward CLI library
//!
//! Argument parsing and command dispatch for the `hostward` binary, kept in
//! a library so the commands can be driven from tests.

pub mod cmd;
pub mod command;
pub mod common;
pub mod error;
pub mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hostward_config::Config;
use std::path::PathBuf;

use command::Command;
use common::RuntimeContext;

/// Hostward - diagnose a self-hosted server and run its hooks
#[derive(Parser)]
#[command(name = "hostward")]
#[command(about = "Diagnose a self-hosted server and run its hooks")]
#[command(version)]
#[command(long_about = "Diagnose a self-hosted server and run its hooks

Diagnosis checks the base system, connectivity, DNS records, exposed ports,
web and mail reachability and services. Results are cached and issues can
be silenced with ignore filters.

Hooks are scripts run for named actions, in priority order, from the system
hook directory and the administrator's custom one.")]
pub struct Cli {
    /// Path to the config file
    #[arg(long, env = "HOSTWARD_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose output (shows DEBUG level logs)
    #[arg(short, long)]
    pub verbose: bool,

    /// Write logs to a file
    #[arg(long, env = "HOSTWARD_LOG_FILE", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for the hostward CLI
#[derive(Subcommand)]
pub enum Commands {
    /// Run and inspect server diagnosis
    #[command(subcommand)]
    Diagnosis(DiagnosisCommands),

    /// List, run and manage hooks
    #[command(subcommand)]
    Hook(HookCommands),
}

/// Diagnosis commands
#[derive(Subcommand)]
pub enum DiagnosisCommands {
    /// List diagnosis categories
    List(cmd::diagnosis::ListCommand),

    /// Print a cached report, or one finding of it
    Get(cmd::diagnosis::GetCommand),

    /// Show cached diagnosis results
    Show(cmd::diagnosis::ShowCommand),

    /// Run diagnosis categories
    Run(cmd::diagnosis::RunCommand),

    /// Manage ignore filters
    Ignore(cmd::diagnosis::IgnoreCommand),
}

/// Hook commands
#[derive(Subcommand)]
pub enum HookCommands {
    /// List the hooks of an action
    List(cmd::hook::ListCommand),

    /// Show where a hook is defined
    Info(cmd::hook::InfoCommand),

    /// Execute a single hook script
    Exec(cmd::hook::ExecCommand),

    /// Run every hook of an action
    Callback(cmd::hook::CallbackCommand),

    /// Install an application's hook into the custom root
    Add(cmd::hook::AddCommand),

    /// Remove an application's hooks from the custom root
    Remove(cmd::hook::RemoveCommand),
}

/// Execute the command based on the command type
fn execute_command(command: Commands, context: &RuntimeContext) -> Result<()> {
    match command {
        Commands::Diagnosis(diagnosis) => match diagnosis {
            DiagnosisCommands::List(cmd) => cmd.execute(context)?,
            DiagnosisCommands::Get(cmd) => cmd.execute(context)?,
            DiagnosisCommands::Show(cmd) => cmd.execute(context)?,
            DiagnosisCommands::Run(cmd) => cmd.execute(context)?,
            DiagnosisCommands::Ignore(cmd) => cmd.execute(context)?,
        },
        Commands::Hook(hook) => match hook {
            HookCommands::List(cmd) => cmd.execute(context)?,
            HookCommands::Info(cmd) => cmd.execute(context)?,
            HookCommands::Exec(cmd) => cmd.execute(context)?,
            HookCommands::Callback(cmd) => cmd.execute(context)?,
            HookCommands::Add(cmd) => cmd.execute(context)?,
            HookCommands::Remove(cmd) => cmd.execute(context)?,
        },
    }

    Ok(())
}

/// Run the CLI
///
/// # Errors
///
/// Returns an error if:
/// - Logging initialization fails
/// - Configuration loading fails
/// - Command execution fails
pub fn run(cli: Cli) -> Result<()> {
    hostward_config::logging::init(cli.verbose, cli.log_file.as_deref())?;

    let config =
        Config::load_or_default(cli.config.as_deref()).context("Failed to load configuration")?;
    let context = RuntimeContext::new(config);

    execute_command(cli.command, &context)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_diagnosis_run() {
        let cli = Cli::try_parse_from([
            "hostward",
            "diagnosis",
            "run",
            "ip",
            "web",
            "--force",
            "--email",
        ])
        .unwrap();

        let Commands::Diagnosis(DiagnosisCommands::Run(run)) = cli.command else {
            panic!("expected diagnosis run");
        };
        assert_eq!(run.categories, vec!["ip", "web"]);
        assert!(run.force);
        assert!(run.email);
        assert!(!run.except_if_never_ran_yet);
    }

    #[test]
    fn test_parse_ignore_filter() {
        let cli = Cli::try_parse_from([
            "hostward",
            "diagnosis",
            "ignore",
            "--add-filter",
            "dnsrecords",
            "domain=example.org",
        ])
        .unwrap();

        let Commands::Diagnosis(DiagnosisCommands::Ignore(ignore)) = cli.command else {
            panic!("expected diagnosis ignore");
        };
        assert_eq!(
            ignore.add_filter,
            Some(vec![
                "dnsrecords".to_string(),
                "domain=example.org".to_string()
            ])
        );
        assert!(ignore.remove_filter.is_none());
    }

    #[test]
    fn test_parse_hook_callback() {
        let cli = Cli::try_parse_from([
            "hostward",
            "hook",
            "callback",
            "post_domain_add",
            "--hooks",
            "nginx",
            "--hooks",
            "dnsmasq",
            "--",
            "example.org",
        ])
        .unwrap();

        let Commands::Hook(HookCommands::Callback(callback)) = cli.command else {
            panic!("expected hook callback");
        };
        assert_eq!(callback.action, "post_domain_add");
        assert_eq!(callback.hooks, vec!["nginx", "dnsmasq"]);
        assert_eq!(callback.args, vec!["example.org"]);
    }

    #[test]
    fn test_invalid_return_format_is_rejected() {
        let result = Cli::try_parse_from([
            "hostward",
            "hook",
            "exec",
            "/tmp/hook",
            "--return-format",
            "xml",
        ]);
        assert!(result.is_err());
    }
}
