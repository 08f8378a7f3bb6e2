//! On-disk report cache
//!
//! One `<category>.json` file per category. Writes go to a temporary file
//! in the same directory which is then renamed over the entry, so readers
//! see either the previous report or the new one. The report timestamp is
//! the file's modification time and is not stored in the document.

use super::report::{Finding, Meta, Report};
use hostward_core::{Error, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Directory of cached reports
#[derive(Debug, Clone)]
pub struct ReportCache {
    dir: PathBuf,
}

impl ReportCache {
    /// Create a cache rooted at `dir`; the directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The cache directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether any diagnosis ever ran (the directory exists)
    #[must_use]
    pub fn exists(&self) -> bool {
        self.dir.is_dir()
    }

    /// Location of a category's entry
    #[must_use]
    pub fn path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    fn modified(&self, id: &str) -> Option<SystemTime> {
        fs::metadata(self.path(id)).and_then(|m| m.modified()).ok()
    }

    /// Time elapsed since the entry was written, `None` without entry
    #[must_use]
    pub fn age(&self, id: &str) -> Option<Duration> {
        self.modified(id)
            .map(|mtime| mtime.elapsed().unwrap_or_default())
    }

    /// Load a category's report, `None` without entry
    ///
    /// # Errors
    ///
    /// Returns `Error::Cache` if the entry exists but cannot be parsed
    pub fn load(&self, id: &str) -> Result<Option<Report>> {
        let path = self.path(id);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut report: Report = serde_json::from_str(&content)
            .map_err(|e| Error::Cache(format!("Failed to parse {}: {e}", path.display())))?;

        report.timestamp = self
            .modified(id)
            .and_then(|mtime| mtime.duration_since(UNIX_EPOCH).ok())
            .and_then(|d| i64::try_from(d.as_secs()).ok())
            .unwrap_or(-1);

        Ok(Some(report))
    }

    /// Load a category's report, or a placeholder if there is none yet
    ///
    /// # Errors
    ///
    /// Returns `Error::Cache` if the entry exists but cannot be parsed
    pub fn read(&self, id: &str) -> Result<Report> {
        match self.load(id)? {
            Some(report) => Ok(report),
            None => {
                tracing::warn!("No cached report for category '{}' yet", id);
                Ok(Report::placeholder(id))
            }
        }
    }

    /// Replace a category's entry
    ///
    /// # Errors
    ///
    /// Returns error if the directory or the file cannot be written
    pub fn write(&self, report: &Report) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let content = serde_json::to_vec_pretty(report)?;
        let mut file = tempfile::NamedTempFile::new_in(&self.dir)?;
        file.write_all(&content)?;

        let path = self.path(&report.id);
        file.persist(&path)
            .map_err(|e| Error::Cache(format!("Failed to write {}: {e}", path.display())))?;

        tracing::debug!("Updated cache {}", path.display());
        Ok(())
    }

    /// The first finding of a category whose `meta` satisfies `predicate`
    ///
    /// `None` means unknown: either nothing matched or there is no entry.
    ///
    /// # Errors
    ///
    /// Returns `Error::Cache` if the entry cannot be parsed
    pub fn find_by<F>(&self, id: &str, predicate: F) -> Result<Option<Finding>>
    where
        F: Fn(&Meta) -> bool,
    {
        Ok(self
            .load(id)?
            .and_then(|report| report.items.into_iter().find(|item| predicate(&item.meta))))
    }

    /// The finding of a category whose `meta` equals `meta` exactly
    ///
    /// # Errors
    ///
    /// Returns `Error::Cache` if the entry cannot be parsed
    pub fn find(&self, id: &str, meta: &Meta) -> Result<Option<Finding>> {
        self.find_by(id, |item_meta| item_meta == meta)
    }
}
