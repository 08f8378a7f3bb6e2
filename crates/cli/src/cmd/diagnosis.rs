//! Diagnosis commands

use anyhow::Context;
use clap::Args;
use hostward_engine::diagnosis::{Lookup, RunOptions, ShowOptions, ShowOutput};
use owo_colors::OwoColorize;

use super::print_json;
use crate::command::Command;
use crate::common::RuntimeContext;
use crate::error::{CommandError, Result};
use crate::ui;

/// List diagnosis categories
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Also print the hook implementing each category
    #[arg(long)]
    pub paths: bool,
}

impl Command for ListCommand {
    type Output = ();

    fn execute(&self, context: &RuntimeContext) -> Result<()> {
        let categories = context.with_diagnosis(|service| Ok(service.list_categories()))?;

        for (name, path) in categories {
            if self.paths {
                println!("{} {}", name.cyan(), path.display().dimmed());
            } else {
                println!("{name}");
            }
        }
        Ok(())
    }
}

/// Print a cached report, or the finding matching `key=value` criteria
#[derive(Debug, Args)]
pub struct GetCommand {
    /// Category to look up
    pub category: String,

    /// `key=value` criteria selecting one finding
    pub criteria: Vec<String>,
}

impl Command for GetCommand {
    type Output = ();

    fn execute(&self, context: &RuntimeContext) -> Result<()> {
        let lookup =
            context.with_diagnosis(|service| Ok(service.get(&self.category, &self.criteria)?))?;

        if lookup == Lookup::Item(None) {
            tracing::warn!(
                "No finding of '{}' matches {}",
                self.category,
                self.criteria.join(" ")
            );
        }
        print_json(&lookup)?;
        Ok(())
    }
}

/// Show cached diagnosis results
#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Categories to show (all when empty)
    pub categories: Vec<String>,

    /// Only show warnings and errors
    #[arg(long)]
    pub issues: bool,

    /// Keep meta, data, ignored findings and timestamps
    #[arg(long)]
    pub full: bool,

    /// Upload a text dump and print its URL
    #[arg(long, conflicts_with = "human_readable")]
    pub share: bool,

    /// Print a plain text dump
    #[arg(long)]
    pub human_readable: bool,

    /// Print reports as JSON
    #[arg(long, conflicts_with_all = ["share", "human_readable"])]
    pub json: bool,
}

impl Command for ShowCommand {
    type Output = ();

    fn execute(&self, context: &RuntimeContext) -> Result<()> {
        let options = ShowOptions {
            issues: self.issues,
            full: self.full,
            share: self.share,
            human_readable: self.human_readable,
        };
        let output = context.with_diagnosis(|service| Ok(service.show(&self.categories, options)?))?;

        match output {
            ShowOutput::NeverRan => {
                println!("{}", "Diagnosis never ran on this server yet.".yellow());
                println!("Run 'hostward diagnosis run' first.");
            }
            ShowOutput::Reports(reports) if self.json => print_json(&reports)?,
            ShowOutput::Reports(reports) => {
                if reports.is_empty() && self.issues {
                    println!("{}", "No issues found.".green());
                }
                for (index, report) in reports.iter().enumerate() {
                    if index > 0 {
                        println!();
                    }
                    ui::print_report(report);
                }
            }
            ShowOutput::Text(text) => print!("{text}"),
            ShowOutput::Url(url) => println!("{url}"),
        }
        Ok(())
    }
}

/// Run diagnosis categories
#[derive(Debug, Args)]
pub struct RunCommand {
    /// Categories to run (all when empty)
    pub categories: Vec<String>,

    /// Run even if the cached results are still fresh
    #[arg(long)]
    pub force: bool,

    /// Do nothing if diagnosis never ran on this server
    #[arg(long)]
    pub except_if_never_ran_yet: bool,

    /// Mail the issues to root afterwards
    #[arg(long)]
    pub email: bool,
}

impl Command for RunCommand {
    type Output = ();

    fn execute(&self, context: &RuntimeContext) -> Result<()> {
        let options = RunOptions {
            force: self.force,
            except_if_never_ran_yet: self.except_if_never_ran_yet,
            email: self.email,
        };
        let summary = context.with_diagnosis(|service| Ok(service.run(&self.categories, options)?))?;

        if summary.diagnosed.is_empty() && summary.failed.is_empty() {
            return Ok(());
        }

        let icon = if summary.issues > 0 {
            ui::StatusIcon::Warning
        } else {
            ui::StatusIcon::Success
        };
        println!(
            "{} Diagnosed {} categor{}, {} issue(s) found",
            icon.get(),
            summary.diagnosed.len(),
            if summary.diagnosed.len() == 1 { "y" } else { "ies" },
            summary.issues
        );

        if summary.failed.is_empty() {
            Ok(())
        } else {
            Err(CommandError::DiagnosisFailed {
                failed: summary.failed.len(),
                total: summary.diagnosed.len() + summary.failed.len(),
            })
        }
    }
}

/// Add, remove or list ignore filters
///
/// A filter is a category followed by `key=value` criteria, e.g.
/// `dnsrecords domain=example.org category=mail`.
#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct IgnoreCommand {
    /// Silence the issues matching a filter
    #[arg(long, num_args = 1.., value_name = "FILTER")]
    pub add_filter: Option<Vec<String>>,

    /// Remove an existing filter
    #[arg(long, num_args = 1.., value_name = "FILTER")]
    pub remove_filter: Option<Vec<String>>,

    /// List active filters
    #[arg(long)]
    pub list: bool,
}

impl Command for IgnoreCommand {
    type Output = ();

    fn execute(&self, context: &RuntimeContext) -> Result<()> {
        if let Some(filter) = &self.add_filter {
            let added = context
                .with_diagnosis(|service| Ok(service.ignore_add(filter)?))
                .context("Failed to add ignore filter")?;
            if added {
                println!("{} Filter added", ui::StatusIcon::Success.get());
            } else {
                println!("{} Filter already present", ui::StatusIcon::Info.get());
            }
        } else if let Some(filter) = &self.remove_filter {
            context
                .with_diagnosis(|service| Ok(service.ignore_remove(filter)?))
                .context("Failed to remove ignore filter")?;
            println!("{} Filter removed", ui::StatusIcon::Success.get());
        } else {
            let filters = context.with_diagnosis(|service| Ok(service.ignore_list()?))?;
            print_json(&filters)?;
        }
        Ok(())
    }
}
