//! Report and finding model
//!
//! Reports are what category checks produce and what the cache stores. The
//! `meta` and `data` payloads stay open string-keyed maps: `meta` is the key
//! other categories and ignore filters look findings up by.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Open key/value payload of a finding
pub type Meta = IndexMap<String, Value>;

/// Severity of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    /// The check passed
    Success,
    /// Informational, nothing to fix
    Info,
    /// Something is probably wrong
    Warning,
    /// Something is wrong
    Error,
}

impl Status {
    /// Whether this status denotes an issue (and can be ignored)
    #[must_use]
    pub fn is_issue(self) -> bool {
        matches!(self, Self::Warning | Self::Error)
    }

    /// Upper-case name as stored in reports
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message key, optionally with format arguments
///
/// Stored as a bare string, or as a `[key, {args}]` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    /// Message without arguments
    Key(String),
    /// Message with its own arguments
    WithArgs(String, Meta),
}

impl Message {
    /// Build a message with arguments
    pub fn with_args<I, K, V>(key: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::WithArgs(
            key.into(),
            args.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        )
    }

    /// The message key
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Key(key) | Self::WithArgs(key, _) => key,
        }
    }

    /// The message's own arguments
    #[must_use]
    pub fn args(&self) -> Option<&Meta> {
        match self {
            Self::Key(_) => None,
            Self::WithArgs(_, args) => Some(args),
        }
    }
}

impl From<&str> for Message {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for Message {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

/// One observation of a category check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// What was checked
    #[serde(default)]
    pub meta: Meta,
    /// What was observed
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub data: Meta,
    /// Severity
    pub status: Status,
    /// Outcome message
    pub summary: Message,
    /// Supporting messages
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<Message>,
}

impl Finding {
    /// Create a finding with empty meta, data and details
    pub fn new(status: Status, summary: impl Into<Message>) -> Self {
        Self {
            meta: Meta::new(),
            data: Meta::new(),
            status,
            summary: summary.into(),
            details: Vec::new(),
        }
    }

    /// Add a meta entry
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Add a data entry
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Append a detail
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<Message>) -> Self {
        self.details.push(detail.into());
        self
    }

    /// Append several details
    #[must_use]
    pub fn with_details<I, M>(mut self, details: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<Message>,
    {
        self.details.extend(details.into_iter().map(Into::into));
        self
    }

    /// A data value as a string, if present and a string
    #[must_use]
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}

fn no_timestamp() -> i64 {
    -1
}

/// The outcome of one category run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Category identifier
    pub id: String,
    /// Seconds the report stays valid
    pub cached_for: i64,
    /// Modification time of the cache entry, `-1` if there is none
    #[serde(skip, default = "no_timestamp")]
    pub timestamp: i64,
    /// Findings, in the order the check produced them
    #[serde(default)]
    pub items: Vec<Finding>,
}

impl Report {
    /// A fresh report
    pub fn new(id: impl Into<String>, cached_for: i64, items: Vec<Finding>) -> Self {
        Self {
            id: id.into(),
            cached_for,
            timestamp: -1,
            items,
        }
    }

    /// The stand-in returned when a category has no cache yet
    pub fn placeholder(id: impl Into<String>) -> Self {
        Self::new(id, -1, Vec::new())
    }

    /// Whether this is a placeholder for a missing cache entry
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.timestamp == -1
    }

    /// Whether any finding is an error
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|i| i.status == Status::Error)
    }

    /// Findings that are warnings or errors
    pub fn issues(&self) -> impl Iterator<Item = &Finding> {
        self.items.iter().filter(|i| i.status.is_issue())
    }
}
