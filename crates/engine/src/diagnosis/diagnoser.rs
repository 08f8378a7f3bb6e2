//! The per-category diagnosis protocol
//!
//! [`diagnose`] decides between reusing the cache, refusing to run because
//! a dependency is unhealthy, and running the check. A fresh report is
//! written to the cache before it is localized and logged.

use super::context::DiagnosisContext;
use super::render::{ShownReport, localize};
use super::report::{Finding, Report, Status};
use hostward_core::Result;
use serde_json::{Map, Value};
use std::time::Duration;

/// A diagnosis category
pub trait Diagnoser {
    /// Category identifier, also the cache entry name
    fn id(&self) -> &'static str;

    /// Seconds a report stays valid
    fn cache_duration(&self) -> u64;

    /// Categories that must have run without errors first
    fn dependencies(&self) -> &'static [&'static str] {
        &[]
    }

    /// Produce the findings, in order
    ///
    /// # Errors
    ///
    /// An error aborts the category; the previous cache entry stays in place
    fn run(&self, ctx: &DiagnosisContext) -> Result<Vec<Finding>>;
}

/// What a call to [`diagnose`] did
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The cached report is still fresh
    Cached,
    /// A dependency has errors or never ran
    Blocked { dependency: String },
    /// The check ran and its report was cached
    Done(ShownReport),
}

impl Outcome {
    /// Hook contract form: `(0, {})`, `(1, {})` or `(0, report)`
    ///
    /// # Errors
    ///
    /// Returns error if the report cannot be serialized
    pub fn into_hook_return(self) -> Result<(i32, Value)> {
        match self {
            Self::Cached => Ok((0, Value::Object(Map::new()))),
            Self::Blocked { .. } => Ok((1, Value::Object(Map::new()))),
            Self::Done(report) => Ok((0, serde_json::to_value(report)?)),
        }
    }
}

/// Run one category unless its cache is fresh or a dependency blocks it
///
/// # Errors
///
/// Returns the check's error, or an error reading dependency caches or
/// writing the new entry
#[tracing::instrument(skip(diagnoser, ctx), fields(category = diagnoser.id()))]
pub fn diagnose(diagnoser: &dyn Diagnoser, ctx: &DiagnosisContext, force: bool) -> Result<Outcome> {
    let id = diagnoser.id();
    let duration = diagnoser.cache_duration();
    let description = ctx.describe(id);

    if !force
        && ctx
            .cache
            .age(id)
            .is_some_and(|age| age < Duration::from_secs(duration))
    {
        tracing::info!(
            "{}",
            ctx.message("diagnosis_cache_still_valid", [("category", description.as_str())])
        );
        return Ok(Outcome::Cached);
    }

    for dependency in diagnoser.dependencies() {
        let report = ctx.cache.read(dependency)?;
        if report.is_placeholder() || report.has_errors() {
            tracing::error!(
                "{}",
                ctx.message(
                    "diagnosis_cant_run_because_of_dep",
                    [("category", description.clone()), ("dep", ctx.describe(dependency))]
                )
            );
            return Ok(Outcome::Blocked {
                dependency: (*dependency).to_string(),
            });
        }
    }

    let items = diagnoser.run(ctx)?;
    let mut report = Report::new(id, i64::try_from(duration).unwrap_or(i64::MAX), items);

    ctx.cache.write(&report)?;
    report.timestamp = chrono::Utc::now().timestamp();

    let shown = localize(&report, ctx.translator.as_ref(), &ctx.filters_for(id), false);
    log_summary(ctx, &description, &shown);

    Ok(Outcome::Done(shown))
}

fn log_summary(ctx: &DiagnosisContext, description: &str, report: &ShownReport) {
    let count = |status: Status, ignored: bool| {
        report
            .items
            .iter()
            .filter(|i| i.status == status && i.is_ignored() == ignored)
            .count()
    };
    let errors = count(Status::Error, false);
    let warnings = count(Status::Warning, false);
    let ignored = count(Status::Error, true) + count(Status::Warning, true);

    let suffix = if ignored > 0 {
        format!(
            " {}",
            ctx.message("diagnosis_ignored_issues", [("nb_ignored", ignored)])
        )
    } else {
        String::new()
    };

    let category = Value::from(description);
    if errors > 0 && warnings > 0 {
        let msg = ctx.message(
            "diagnosis_found_errors_and_warnings",
            [
                ("errors", Value::from(errors)),
                ("warnings", Value::from(warnings)),
                ("category", category),
            ],
        );
        tracing::error!("{}{}", msg, suffix);
    } else if errors > 0 {
        let msg = ctx.message(
            "diagnosis_found_errors",
            [("errors", Value::from(errors)), ("category", category)],
        );
        tracing::error!("{}{}", msg, suffix);
    } else if warnings > 0 {
        let msg = ctx.message(
            "diagnosis_found_warnings",
            [("warnings", Value::from(warnings)), ("category", category)],
        );
        tracing::warn!("{}{}", msg, suffix);
    } else {
        let msg = ctx.message("diagnosis_everything_ok", [("category", category)]);
        tracing::info!("{}{}", msg, suffix);
    }
}
