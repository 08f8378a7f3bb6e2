//! Ignore filters loaded from the diagnosis YAML document
//!
//! The document maps each diagnosis category to a list of criteria. A
//! criteria is a set of `key: value` pairs compared against the `meta` of
//! findings; an empty criteria matches every finding of its category.
//!
//! Example:
//! ```yaml
//! ignore_filters:
//!   dnsrecords:
//!     - domain: example.org
//!       category: xmpp
//!   ports:
//!     - port: 5222
//!   web: []
//! ```

use crate::Result;
use hostward_core::Error;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// One ignore criteria: meta keys and their expected string form
pub type Criteria = IndexMap<String, String>;

/// Contents of the diagnosis settings document
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisSettings {
    /// Criteria lists keyed by category
    #[serde(default, deserialize_with = "deserialize_filters")]
    pub ignore_filters: IndexMap<String, Vec<Criteria>>,

    /// Keys this crate does not manage, preserved on save
    #[serde(flatten)]
    pub other: IndexMap<String, serde_yaml::Value>,
}

/// YAML scalars are compared as strings, so `port: 443` and `port: "443"`
/// are the same criteria.
fn scalar_to_string(value: serde_yaml::Value) -> std::result::Result<String, String> {
    match value {
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        serde_yaml::Value::Null => Ok(String::new()),
        other => Err(format!("criteria values must be scalars, got {other:?}")),
    }
}

type RawFilters = IndexMap<String, Option<Vec<Option<IndexMap<String, serde_yaml::Value>>>>>;

fn deserialize_filters<'de, D>(
    deserializer: D,
) -> std::result::Result<IndexMap<String, Vec<Criteria>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawFilters>::deserialize(deserializer)?.unwrap_or_default();

    let mut filters = IndexMap::with_capacity(raw.len());
    for (category, list) in raw {
        let mut criteria_list = Vec::new();
        for criteria in list.unwrap_or_default() {
            let mut parsed = Criteria::new();
            for (key, value) in criteria.unwrap_or_default() {
                let value = scalar_to_string(value).map_err(serde::de::Error::custom)?;
                parsed.insert(key, value);
            }
            criteria_list.push(parsed);
        }
        filters.insert(category, criteria_list);
    }

    Ok(filters)
}

/// Parse `key=value` arguments into a criteria
///
/// # Errors
///
/// Returns `Error::InvalidFilter` for an argument without `=` or with an
/// empty key
pub fn parse_criteria<S: AsRef<str>>(args: &[S]) -> Result<Criteria> {
    let mut criteria = Criteria::new();
    for arg in args {
        let arg = arg.as_ref();
        match arg.split_once('=') {
            Some((key, value)) if !key.is_empty() => {
                criteria.insert(key.to_string(), value.to_string());
            }
            _ => {
                return Err(Error::InvalidFilter(format!(
                    "criteria should be of the form key=value, got '{arg}'"
                )));
            }
        }
    }
    Ok(criteria)
}

/// Parse a filter given as `<category> [key=value ...]`
///
/// # Errors
///
/// Returns `Error::InvalidFilter` when the category is missing or a
/// criteria is malformed
pub fn parse_filter<S: AsRef<str>>(args: &[S]) -> Result<(String, Criteria)> {
    let Some((category, criteria)) = args.split_first() else {
        return Err(Error::InvalidFilter(
            "a filter needs at least a category".to_string(),
        ));
    };

    Ok((category.as_ref().to_string(), parse_criteria(criteria)?))
}

/// Read-modify-write access to the ignore filters
#[derive(Debug, Clone)]
pub struct IgnoreFilterStore {
    path: PathBuf,
}

impl IgnoreFilterStore {
    /// Create a store backed by the YAML document at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing document
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the settings; a missing document means no filters
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or YAML parsing fails
    pub fn load(&self) -> Result<DiagnosisSettings> {
        if !self.path.exists() {
            return Ok(DiagnosisSettings::default());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {e}", self.path.display()))
        })?;

        if content.trim().is_empty() {
            return Ok(DiagnosisSettings::default());
        }

        serde_yaml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {e}", self.path.display())))
    }

    /// Replace the document with `settings`
    ///
    /// The new content is written to a sibling temporary file which is then
    /// renamed over the document.
    ///
    /// # Errors
    ///
    /// Returns error if serialization or the write fails
    pub fn save(&self, settings: &DiagnosisSettings) -> Result<()> {
        let content = serde_yaml::to_string(settings)
            .map_err(|e| Error::Config(format!("Failed to serialize diagnosis settings: {e}")))?;

        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let mut file = tempfile::NamedTempFile::new_in(parent)?;
        file.write_all(content.as_bytes())?;
        file.persist(&self.path).map_err(|e| {
            Error::Config(format!("Failed to write {}: {e}", self.path.display()))
        })?;

        Ok(())
    }

    /// All filters keyed by category
    ///
    /// # Errors
    ///
    /// Returns error if the document cannot be loaded
    pub fn filters(&self) -> Result<IndexMap<String, Vec<Criteria>>> {
        Ok(self.load()?.ignore_filters)
    }

    /// Filters of one category
    ///
    /// # Errors
    ///
    /// Returns error if the document cannot be loaded
    pub fn filters_for(&self, category: &str) -> Result<Vec<Criteria>> {
        Ok(self
            .load()?
            .ignore_filters
            .shift_remove(category)
            .unwrap_or_default())
    }

    /// Append a criteria to a category
    ///
    /// Returns `false` without touching the document when the criteria is
    /// already present.
    ///
    /// # Errors
    ///
    /// Returns error if the document cannot be loaded or saved
    pub fn add(&self, category: &str, criteria: Criteria) -> Result<bool> {
        let mut settings = self.load()?;
        let list = settings
            .ignore_filters
            .entry(category.to_string())
            .or_default();

        if list.contains(&criteria) {
            return Ok(false);
        }

        list.push(criteria);
        self.save(&settings)?;
        Ok(true)
    }

    /// Remove a criteria from a category
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidFilter` if the criteria is not present, or an
    /// error if the document cannot be loaded or saved
    pub fn remove(&self, category: &str, criteria: &Criteria) -> Result<()> {
        let mut settings = self.load()?;

        let Some(list) = settings.ignore_filters.get_mut(category) else {
            return Err(Error::InvalidFilter(format!(
                "no ignore filter for category '{category}'"
            )));
        };

        let Some(index) = list.iter().position(|c| c == criteria) else {
            return Err(Error::InvalidFilter(format!(
                "no such ignore filter for category '{category}'"
            )));
        };

        list.remove(index);
        if list.is_empty() {
            settings.ignore_filters.shift_remove(category);
        }

        self.save(&settings)
    }
}
