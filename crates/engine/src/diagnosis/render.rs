//! Localized views of reports
//!
//! A [`ShownReport`] is what `show` hands out: messages rendered, ignore
//! flags computed. Nothing here is ever written back to the cache.

use super::i18n::{category_description, render_message, strip_html};
use super::ignore::is_ignored;
use super::report::{Meta, Report, Status};
use hostward_config::Criteria;
use hostward_core::Translator;
use serde::Serialize;

/// A finding with its messages rendered
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShownFinding {
    /// Identifying keys; only kept in full mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    /// Observed values; only kept in full mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Meta>,
    /// Severity
    pub status: Status,
    /// Rendered summary
    pub summary: String,
    /// Rendered details
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
    /// Whether an ignore filter matched; full mode only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignored: Option<bool>,
}

impl ShownFinding {
    /// Whether the finding was silenced by an ignore filter
    #[must_use]
    pub fn is_ignored(&self) -> bool {
        self.ignored.unwrap_or(false)
    }
}

/// A report with its messages rendered
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShownReport {
    /// Category id
    pub id: String,
    /// Localized category name
    pub description: String,
    /// Seconds the report stays fresh; full mode only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_for: Option<i64>,
    /// Unix time of the run; full mode only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    pub items: Vec<ShownFinding>,
}

/// Render a report and flag the findings matched by `filters`
///
/// With `plain`, markup is stripped from every message.
pub fn localize(
    report: &Report,
    translator: &dyn Translator,
    filters: &[Criteria],
    plain: bool,
) -> ShownReport {
    let text = |s: String| if plain { strip_html(&s) } else { s };

    let items = report
        .items
        .iter()
        .map(|finding| ShownFinding {
            meta: Some(finding.meta.clone()),
            data: (!finding.data.is_empty()).then(|| finding.data.clone()),
            status: finding.status,
            summary: text(render_message(translator, &finding.summary, finding)),
            details: finding
                .details
                .iter()
                .map(|detail| text(render_message(translator, detail, finding)))
                .collect(),
            ignored: Some(is_ignored(finding, filters)),
        })
        .collect();

    ShownReport {
        id: report.id.clone(),
        description: category_description(translator, &report.id),
        cached_for: Some(report.cached_for),
        timestamp: Some(report.timestamp),
        items,
    }
}

impl ShownReport {
    /// Drop ignored findings and the bookkeeping fields
    #[must_use]
    pub fn stripped(mut self) -> Self {
        self.items.retain(|item| !item.is_ignored());
        for item in &mut self.items {
            item.meta = None;
            item.data = None;
            item.ignored = None;
        }
        self.cached_for = None;
        self.timestamp = None;
        self
    }

    /// Keep warnings and errors only
    #[must_use]
    pub fn issues_only(mut self) -> Self {
        self.items.retain(|item| item.status.is_issue());
        self
    }

    /// Number of errors and warnings, ignored ones excluded
    #[must_use]
    pub fn count_issues(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.status.is_issue() && !item.is_ignored())
            .count()
    }
}

/// Flat text dump of reports
pub fn dump_human_readable(reports: &[ShownReport]) -> String {
    let mut output = String::new();

    for report in reports {
        output.push_str(&format!(
            "=================================\n{} ({})\n=================================\n\n",
            report.description, report.id
        ));
        for item in &report.items {
            output.push_str(&format!("[{}] {}\n", item.status, item.summary));
            for detail in &item.details {
                output.push_str(&format!("  - {}\n", detail.replace('\n', "\n    ")));
            }
            output.push('\n');
        }
        output.push_str("\n\n");
    }

    output
}
