//! Terminal output for diagnosis reports and hooks

pub mod icons;

pub use icons::{Icons, StatusIcon};

use chrono::{Local, TimeZone};
use hostward_engine::diagnosis::{ShownFinding, ShownReport, Status};
use owo_colors::OwoColorize;

/// Colored `[marker] STATUS` label
pub fn status_label(status: Status) -> String {
    let label = format!("{} {}", StatusIcon::from(status).get(), status);
    match status {
        Status::Success => label.green().to_string(),
        Status::Info => label.blue().to_string(),
        Status::Warning => label.yellow().to_string(),
        Status::Error => label.red().bold().to_string(),
    }
}

fn format_timestamp(timestamp: i64) -> String {
    Local
        .timestamp_opt(timestamp, 0)
        .single()
        .map_or_else(|| timestamp.to_string(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string())
}

fn print_finding(finding: &ShownFinding) {
    let ignored = if finding.is_ignored() {
        format!(" {}", "(ignored)".dimmed())
    } else {
        String::new()
    };
    println!("  {} {}{}", status_label(finding.status), finding.summary, ignored);

    for detail in &finding.details {
        println!("      {} {}", "-".dimmed(), detail);
    }

    if let Some(meta) = &finding.meta
        && !meta.is_empty()
    {
        let pairs: Vec<String> = meta.iter().map(|(k, v)| format!("{k}={v}")).collect();
        println!("      {}", pairs.join(" ").dimmed());
    }
}

/// Print one report with its findings
pub fn print_report(report: &ShownReport) {
    print!("{} {}", report.description.bold(), format!("({})", report.id).dimmed());
    if let Some(timestamp) = report.timestamp {
        print!(" {}", format!("at {}", format_timestamp(timestamp)).dimmed());
    }
    println!();

    if report.items.is_empty() {
        println!("  {}", "Nothing to report".dimmed());
    }
    for finding in &report.items {
        print_finding(finding);
    }
}
