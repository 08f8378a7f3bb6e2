//! Domain expiration lookup through whois

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use std::sync::LazyLock;

static MEANINGFUL_LINE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[a-zA-Z0-9 ]{4,25}:").expect("Failed to compile whois line pattern")
});

static EXPIRY_ISO: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"(?i)Expir.+(\d{4}-\d{2}-\d{2})").expect("Failed to compile expiry pattern")
});

static EXPIRY_SHORT: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"(?i)Expir.+(\d{2}-\w{3}-\d{4})").expect("Failed to compile expiry pattern")
});

/// What a whois answer says about a domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    /// Registered, expiring on this date
    Date(NaiveDate),
    /// The registry does not know the domain
    NotFound,
    /// Registered, but the answer carries no recognizable expiry date
    DateNotFound,
}

impl Expiration {
    /// Message-key fragment of the two failure kinds
    #[must_use]
    pub fn failure_kind(self) -> Option<&'static str> {
        match self {
            Self::Date(_) => None,
            Self::NotFound => Some("not_found"),
            Self::DateNotFound => Some("expiration_not_found"),
        }
    }
}

fn is_meaningful(line: &str) -> bool {
    let lower = line.to_lowercase();
    MEANINGFUL_LINE.is_match(line)
        && !lower.starts_with(">>> last update of whois")
        && !lower.starts_with("notice:")
        && !line.starts_with("%%")
        && !lower.starts_with("\"http")
}

/// Parse a `whois -H` answer
///
/// Answers with six `key: value` lines or fewer are "not found" answers.
#[must_use]
pub fn parse_whois(output: &str) -> Expiration {
    let lines: Vec<&str> = output.trim().lines().collect();

    if lines.iter().filter(|line| is_meaningful(line)).count() <= 6 {
        return Expiration::NotFound;
    }

    for line in &lines {
        if let Some(caps) = EXPIRY_ISO.captures(line)
            && let Ok(date) = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d")
        {
            return Expiration::Date(date);
        }
        if let Some(caps) = EXPIRY_SHORT.captures(line)
            && let Ok(date) = NaiveDate::parse_from_str(&caps[1], "%d-%b-%Y")
        {
            return Expiration::Date(date);
        }
    }

    Expiration::DateNotFound
}

/// Alert level of an expiry date seen from `now`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryAlert {
    Success,
    Warning,
    Error,
}

/// Classify an expiry date, also returning the whole days left
#[must_use]
pub fn classify(expires: NaiveDate, now: NaiveDateTime) -> (ExpiryAlert, i64) {
    let remaining = expires.and_time(chrono::NaiveTime::MIN) - now;

    let alert = if remaining <= TimeDelta::days(15) {
        ExpiryAlert::Error
    } else if remaining <= TimeDelta::days(45) {
        ExpiryAlert::Warning
    } else {
        ExpiryAlert::Success
    };

    (alert, remaining.num_seconds().div_euclid(86_400))
}
