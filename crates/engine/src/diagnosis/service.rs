//! The diagnosis driver
//!
//! Categories are the hooks of the `diagnosis` action. Running a category
//! executes its hook; everything else reads the cache.

use super::checks::FORCE_ARG;
use super::context::DiagnosisContext;
use super::ignore::{criteria_equals, matches_criteria};
use super::render::{ShownReport, dump_human_readable, localize};
use super::report::{Finding, Report};
use crate::hooks::{ExecOptions, HookExecutor, HookRegistry};
use hostward_config::{Criteria, parse_criteria, parse_filter};
use hostward_core::{Error, Mailer, PasteService, Result};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

/// Hook action holding the diagnosis categories
pub const DIAGNOSIS_ACTION: &str = "diagnosis";

/// Result of [`DiagnosisService::get`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Lookup {
    /// The whole cached report
    Report(Report),
    /// The finding matching the criteria; `None` means unknown
    Item(Option<Finding>),
}

/// Options of [`DiagnosisService::show`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ShowOptions {
    /// Only warnings and errors; categories without any are dropped
    pub issues: bool,
    /// Keep meta, data, ignored findings and timestamps
    pub full: bool,
    /// Upload the text dump and return its URL
    pub share: bool,
    /// Return the text dump
    pub human_readable: bool,
}

/// Result of [`DiagnosisService::show`]
#[derive(Debug, Clone, PartialEq)]
pub enum ShowOutput {
    /// No diagnosis ever ran
    NeverRan,
    /// Rendered reports
    Reports(Vec<ShownReport>),
    /// Human-readable dump
    Text(String),
    /// Where the shared dump was uploaded
    Url(String),
}

/// Options of [`DiagnosisService::run`]
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Ignore cache freshness
    pub force: bool,
    /// Do nothing on a server where diagnosis never ran
    pub except_if_never_ran_yet: bool,
    /// Mail the issues to root afterwards
    pub email: bool,
}

/// What [`DiagnosisService::run`] did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Categories whose hook ran
    pub diagnosed: Vec<String>,
    /// Categories whose hook failed
    pub failed: Vec<String>,
    /// Warnings and errors in the reports produced by this run
    pub issues: usize,
}

/// List, inspect, run and silence diagnosis categories
pub struct DiagnosisService<'a> {
    registry: &'a HookRegistry,
    executor: &'a HookExecutor<'a>,
    ctx: &'a DiagnosisContext,
    paste: &'a dyn PasteService,
    mailer: &'a dyn Mailer,
    interface: String,
}

fn count_issues(report: &Value) -> usize {
    report
        .get("items")
        .and_then(Value::as_array)
        .map_or(0, |items| {
            items
                .iter()
                .filter(|item| {
                    matches!(
                        item.get("status").and_then(Value::as_str),
                        Some("WARNING" | "ERROR")
                    ) && item.get("ignored") != Some(&Value::Bool(true))
                })
                .count()
        })
}

impl<'a> DiagnosisService<'a> {
    /// Create a driver over the `diagnosis` hooks of `registry`
    pub fn new(
        registry: &'a HookRegistry,
        executor: &'a HookExecutor<'a>,
        ctx: &'a DiagnosisContext,
        paste: &'a dyn PasteService,
        mailer: &'a dyn Mailer,
    ) -> Self {
        Self {
            registry,
            executor,
            ctx,
            paste,
            mailer,
            interface: "cli".to_string(),
        }
    }

    /// Set the caller interface; `cli` gets plain text and tips
    #[must_use]
    pub fn interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = interface.into();
        self
    }

    fn is_cli(&self) -> bool {
        self.interface == "cli"
    }

    /// Categories with their hook path, in priority order
    #[must_use]
    pub fn list_categories(&self) -> Vec<(String, PathBuf)> {
        self.registry
            .list_by_priority(DIAGNOSIS_ACTION)
            .into_values()
            .flat_map(|hooks| hooks.into_iter().map(|(name, info)| (name, info.path)))
            .collect()
    }

    /// Category names, in priority order
    #[must_use]
    pub fn category_names(&self) -> Vec<String> {
        self.list_categories().into_iter().map(|(name, _)| name).collect()
    }

    /// Validate requested categories; an empty request means all of them
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownCategories` listing every unknown name
    pub fn check_categories(&self, requested: &[String]) -> Result<Vec<String>> {
        let all = self.category_names();
        if requested.is_empty() {
            return Ok(all);
        }

        let unknown: Vec<&str> = requested
            .iter()
            .filter(|c| !all.contains(c))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            return Err(Error::UnknownCategories(unknown.join(", ")));
        }

        Ok(requested.to_vec())
    }

    /// A category's cached report, or the finding whose meta is exactly
    /// the `key=value` criteria
    ///
    /// # Errors
    ///
    /// Returns error for an unknown category, malformed criteria or an
    /// unreadable cache entry
    pub fn get<S: AsRef<str>>(&self, category: &str, criteria: &[S]) -> Result<Lookup> {
        self.check_categories(&[category.to_string()])?;

        if criteria.is_empty() {
            return Ok(Lookup::Report(self.ctx.cache.read(category)?));
        }

        let criteria = parse_criteria(criteria)?;
        Ok(Lookup::Item(
            self.ctx
                .cache
                .find_by(category, |meta| criteria_equals(meta, &criteria))?,
        ))
    }

    fn collect(&self, categories: &[String], options: ShowOptions, plain: bool) -> Vec<ShownReport> {
        let mut reports = Vec::new();

        for category in categories {
            let report = match self.ctx.cache.read(category) {
                Ok(report) => report,
                Err(e) => {
                    tracing::error!(
                        "{}",
                        self.ctx.message(
                            "diagnosis_failed",
                            [("category", category.clone()), ("error", e.to_string())]
                        )
                    );
                    continue;
                }
            };

            let mut shown = localize(
                &report,
                self.ctx.translator.as_ref(),
                &self.ctx.filters_for(category),
                plain,
            );
            if !options.full {
                shown = shown.stripped();
            }
            if options.issues {
                shown = shown.issues_only();
                if shown.items.is_empty() {
                    continue;
                }
            }
            reports.push(shown);
        }

        reports
    }

    /// Localized reports of the requested categories
    ///
    /// # Errors
    ///
    /// Returns error for unknown categories or a failed upload
    pub fn show(&self, categories: &[String], options: ShowOptions) -> Result<ShowOutput> {
        if !self.ctx.cache.exists() {
            tracing::warn!("{}", self.ctx.text("diagnosis_never_ran_yet"));
            return Ok(ShowOutput::NeverRan);
        }

        let categories = self.check_categories(categories)?;
        let plain = options.share || options.human_readable || self.is_cli();
        let reports = self.collect(&categories, options, plain);

        if options.share {
            let url = self.paste.upload(&dump_human_readable(&reports))?;
            tracing::info!("Diagnosis report available at {}", url);
            Ok(ShowOutput::Url(url))
        } else if options.human_readable {
            Ok(ShowOutput::Text(dump_human_readable(&reports)))
        } else {
            Ok(ShowOutput::Reports(reports))
        }
    }

    /// Run the requested categories in priority order
    ///
    /// A failing category is logged and the others still run.
    ///
    /// # Errors
    ///
    /// Returns error for unknown categories or when mailing the digest fails
    #[tracing::instrument(skip(self))]
    pub fn run(&self, categories: &[String], options: RunOptions) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        if (options.email || options.except_if_never_ran_yet) && !self.ctx.cache.exists() {
            tracing::debug!("Diagnosis never ran on this server, nothing to do");
            return Ok(summary);
        }

        let requested = self.check_categories(categories)?;
        let paths: IndexMap<String, PathBuf> = self.list_categories().into_iter().collect();

        let args: Vec<&str> = if options.force { vec![FORCE_ARG] } else { Vec::new() };
        let exec_options = ExecOptions::new().args(args);

        for category in requested {
            let Some(path) = paths.get(&category) else {
                continue;
            };
            tracing::debug!("Running diagnosis for {} ...", category);

            match self.executor.execute(path, &exec_options) {
                Ok((_, report)) => {
                    summary.issues += count_issues(&report);
                    summary.diagnosed.push(category);
                }
                Err(e) => {
                    tracing::error!(
                        "{}",
                        self.ctx.message(
                            "diagnosis_failed_for_category",
                            [("category", category.clone()), ("error", e.to_string())]
                        )
                    );
                    summary.failed.push(category);
                }
            }
        }

        if options.email {
            self.email_issues()?;
        }
        if summary.issues > 0 && self.is_cli() {
            tracing::warn!("{}", self.ctx.text("diagnosis_display_tip"));
        }

        Ok(summary)
    }

    /// Mail the current issues to root; returns whether a mail was sent
    ///
    /// # Errors
    ///
    /// Returns error if the main domain is unknown or sending fails
    pub fn email_issues(&self) -> Result<bool> {
        let options = ShowOptions {
            issues: true,
            ..ShowOptions::default()
        };
        let reports = self.collect(&self.category_names(), options, true);
        if reports.is_empty() {
            return Ok(false);
        }

        let main = self.ctx.domains.main_domain()?;
        let from = format!("diagnosis@{main} (Automatic diagnosis on {main})");
        let subject = self
            .ctx
            .message("diagnosis_email_subject", [("domain", main.as_str())]);
        let body = format!(
            "{}\n\n---\n\n{}",
            self.ctx.text("diagnosis_email_disclaimer"),
            dump_human_readable(&reports)
        );

        self.mailer.send(&from, "root", &subject, &body)?;
        Ok(true)
    }

    fn validate_filter<S: AsRef<str>>(&self, filter: &[S]) -> Result<(String, Criteria)> {
        let (category, criteria) = parse_filter(filter)?;
        if !self.category_names().contains(&category) {
            return Err(Error::InvalidFilter(format!(
                "{category} is not a diagnosis category"
            )));
        }
        Ok((category, criteria))
    }

    /// Add an ignore filter `<category> [key=value ...]`
    ///
    /// The filter must match at least one current issue. Returns `false`
    /// when the same filter already exists.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidFilter` for a malformed filter, an unknown
    /// category or a filter matching no issue
    pub fn ignore_add<S: AsRef<str>>(&self, filter: &[S]) -> Result<bool> {
        let (category, criteria) = self.validate_filter(filter)?;

        let options = ShowOptions {
            issues: true,
            full: true,
            ..ShowOptions::default()
        };
        let matches_issue = self
            .collect(std::slice::from_ref(&category), options, true)
            .iter()
            .flat_map(|report| &report.items)
            .any(|item| {
                item.meta
                    .as_ref()
                    .is_some_and(|meta| matches_criteria(meta, &criteria))
            });
        if !matches_issue {
            return Err(Error::InvalidFilter(
                self.ctx.text("diagnosis_ignore_no_issue_found"),
            ));
        }

        if self.ctx.filters.add(&category, criteria)? {
            tracing::info!(
                "{}",
                self.ctx
                    .message("diagnosis_ignore_filter_added", [("category", category.as_str())])
            );
            Ok(true)
        } else {
            tracing::warn!(
                "{}",
                self.ctx.message(
                    "diagnosis_ignore_already_filtered",
                    [("category", category.as_str())]
                )
            );
            Ok(false)
        }
    }

    /// Remove an ignore filter `<category> [key=value ...]`
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidFilter` for a malformed or absent filter
    pub fn ignore_remove<S: AsRef<str>>(&self, filter: &[S]) -> Result<()> {
        let (category, criteria) = self.validate_filter(filter)?;
        self.ctx.filters.remove(&category, &criteria)?;
        tracing::info!(
            "{}",
            self.ctx
                .message("diagnosis_ignore_filter_removed", [("category", category.as_str())])
        );
        Ok(())
    }

    /// All ignore filters keyed by category
    ///
    /// # Errors
    ///
    /// Returns error if the filter document cannot be read
    pub fn ignore_list(&self) -> Result<IndexMap<String, Vec<Criteria>>> {
        self.ctx.filters.filters()
    }
}
