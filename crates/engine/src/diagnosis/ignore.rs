//! Matching findings against ignore criteria

use super::report::{Finding, Meta};
use hostward_config::Criteria;
use serde_json::Value;

/// String form of a meta value, as criteria compare it
///
/// Strings are taken as-is, `null` is empty, anything else uses its JSON
/// rendering (`25`, `true`).
#[must_use]
pub fn value_as_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Whether every criteria key is present in `meta` with an equal value
///
/// An empty criteria matches everything.
#[must_use]
pub fn matches_criteria(meta: &Meta, criteria: &Criteria) -> bool {
    criteria.iter().all(|(key, expected)| {
        meta.get(key)
            .is_some_and(|value| value_as_string(value) == *expected)
    })
}

/// Whether `meta` has exactly the criteria keys, with equal values
#[must_use]
pub fn criteria_equals(meta: &Meta, criteria: &Criteria) -> bool {
    meta.len() == criteria.len() && matches_criteria(meta, criteria)
}

/// Whether a finding is silenced by one of `filters`
///
/// Only warnings and errors can be ignored.
#[must_use]
pub fn is_ignored(finding: &Finding, filters: &[Criteria]) -> bool {
    finding.status.is_issue() && filters.iter().any(|c| matches_criteria(&finding.meta, c))
}
