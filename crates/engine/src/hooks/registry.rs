//! Hook discovery
//!
//! Hooks live under `<root>/<action>/<priority>-<name>[.ext]` in two roots:
//! the system root shipped with hostward and the custom root managed by the
//! administrator. Nothing is cached: every listing scans the filesystem.

use hostward_config::Config;
use hostward_core::{Error, Result};
use indexmap::IndexMap;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Priority given to hooks whose filename has no `<priority>-` prefix
pub const DEFAULT_PRIORITY: &str = "50";

/// Which root a hook was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HookOrigin {
    /// Shipped with hostward
    System,
    /// Installed by the administrator or an application
    Custom,
}

/// Hook priority
///
/// Numeric priorities sort numerically (`5` before `10`); anything else
/// sorts after them, lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Priority(pub String);

impl Priority {
    /// Numeric value, if the priority is a number
    #[must_use]
    pub fn number(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.number(), other.number()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A discovered hook
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookInfo {
    /// Ordering key
    pub priority: Priority,
    /// Name, without priority prefix and extension
    pub name: String,
    /// Location of the script
    pub path: PathBuf,
    /// Root the hook comes from
    pub origin: HookOrigin,
}

/// Hooks of one action, listed per root
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FolderListing {
    /// Hooks of the system root
    pub system: Vec<HookInfo>,
    /// Hooks of the custom root
    pub custom: Vec<HookInfo>,
}

/// Split a hook filename into `(priority, name)`
///
/// The priority is everything before the first `-`; without one it is
/// [`DEFAULT_PRIORITY`]. The extension, if any, is stripped from the name.
///
/// # Examples
///
/// ```
/// use hostward_engine::hooks::split_filename;
///
/// assert_eq!(split_filename("10-ip.module"), ("10".to_string(), "ip".to_string()));
/// assert_eq!(split_filename("backup"), ("50".to_string(), "backup".to_string()));
/// ```
#[must_use]
pub fn split_filename(filename: &str) -> (String, String) {
    let (priority, rest) = filename
        .split_once('-')
        .unwrap_or((DEFAULT_PRIORITY, filename));

    let name = Path::new(rest)
        .file_stem()
        .map_or_else(|| rest.to_string(), |s| s.to_string_lossy().into_owned());

    (priority.to_string(), name)
}

fn is_skipped(filename: &str) -> bool {
    filename.starts_with('.') || filename.ends_with('~') || filename.ends_with(".pyc")
}

/// Discover hooks from the system and custom roots
#[derive(Debug, Clone)]
pub struct HookRegistry {
    system_root: PathBuf,
    custom_root: PathBuf,
}

impl HookRegistry {
    /// Create a registry over two roots
    pub fn new(system_root: impl Into<PathBuf>, custom_root: impl Into<PathBuf>) -> Self {
        Self {
            system_root: system_root.into(),
            custom_root: custom_root.into(),
        }
    }

    /// Create a registry over the configured roots
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.paths.hooks_dir, &config.paths.custom_hooks_dir)
    }

    /// The system root
    #[must_use]
    pub fn system_root(&self) -> &Path {
        &self.system_root
    }

    /// The custom root
    #[must_use]
    pub fn custom_root(&self) -> &Path {
        &self.custom_root
    }

    /// Scan one root for the hooks of an action, sorted by filename
    fn scan(&self, origin: HookOrigin, action: &str) -> Vec<HookInfo> {
        let root = match origin {
            HookOrigin::System => &self.system_root,
            HookOrigin::Custom => &self.custom_root,
        };
        let dir = root.join(action);

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(
                    "No {:?} hook for action '{}' in {}: {}",
                    origin,
                    action,
                    dir.display(),
                    e
                );
                return Vec::new();
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(std::result::Result::ok)
            .map(|e| e.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| !is_skipped(n))
            })
            .collect();

        // Stable order within a root
        paths.sort();

        paths
            .into_iter()
            .filter_map(|path| {
                let filename = path.file_name()?.to_str()?.to_string();
                let (priority, name) = split_filename(&filename);
                Some(HookInfo {
                    priority: Priority(priority),
                    name,
                    path,
                    origin,
                })
            })
            .collect()
    }

    /// All hooks of an action
    ///
    /// System hooks come first, in filename order. A custom hook with the
    /// same priority and name as a system hook replaces it in place; other
    /// custom hooks follow.
    #[must_use]
    pub fn discover(&self, action: &str) -> Vec<HookInfo> {
        let mut hooks: IndexMap<(Priority, String), HookInfo> = IndexMap::new();

        for origin in [HookOrigin::System, HookOrigin::Custom] {
            for hook in self.scan(origin, action) {
                let key = (hook.priority.clone(), hook.name.clone());
                if let Some(previous) = hooks.insert(key, hook) {
                    tracing::debug!(
                        "Hook {} is overridden by a custom hook",
                        previous.path.display()
                    );
                }
            }
        }

        hooks.into_values().collect()
    }

    /// Hooks of an action grouped by name
    ///
    /// A name can appear at several priorities; each one is kept.
    #[must_use]
    pub fn list_by_name(&self, action: &str) -> IndexMap<String, Vec<HookInfo>> {
        let mut result: IndexMap<String, Vec<HookInfo>> = IndexMap::new();
        for hook in self.discover(action) {
            result.entry(hook.name.clone()).or_default().push(hook);
        }
        result
    }

    /// Hooks of an action grouped by priority, lowest first
    #[must_use]
    pub fn list_by_priority(&self, action: &str) -> BTreeMap<Priority, IndexMap<String, HookInfo>> {
        let mut result: BTreeMap<Priority, IndexMap<String, HookInfo>> = BTreeMap::new();
        for hook in self.discover(action) {
            result
                .entry(hook.priority.clone())
                .or_default()
                .insert(hook.name.clone(), hook);
        }
        result
    }

    /// Hooks of an action listed per root, without overriding
    #[must_use]
    pub fn list_by_folder(&self, action: &str) -> FolderListing {
        FolderListing {
            system: self.scan(HookOrigin::System, action),
            custom: self.scan(HookOrigin::Custom, action),
        }
    }

    /// Every hook registered for an action under a name
    ///
    /// # Errors
    ///
    /// Returns `Error::HookNameUnknown` if no hook has this name
    pub fn info(&self, action: &str, name: &str) -> Result<Vec<HookInfo>> {
        let hooks: Vec<HookInfo> = self
            .discover(action)
            .into_iter()
            .filter(|h| h.name == name)
            .collect();

        if hooks.is_empty() {
            return Err(Error::HookNameUnknown {
                name: name.to_string(),
            });
        }

        Ok(hooks)
    }

    /// Install a hook script for an application
    ///
    /// `file` is named `<priority>-<action>`; it is copied to
    /// `<custom root>/<action>/<priority>-<app>`.
    ///
    /// # Errors
    ///
    /// Returns error if `file` does not exist or the copy fails
    pub fn add(&self, app: &str, file: &Path) -> Result<PathBuf> {
        if !file.is_file() {
            return Err(Error::FileNotFound {
                path: file.to_path_buf(),
            });
        }

        let filename = file
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::HookConfig(format!("Invalid hook file: {}", file.display())))?;
        let (priority, action) = split_filename(filename);

        let action_dir = self.custom_root.join(&action);
        fs::create_dir_all(&action_dir)?;

        let final_path = action_dir.join(format!("{priority}-{app}"));
        fs::copy(file, &final_path)?;
        tracing::debug!("Installed hook {}", final_path.display());

        Ok(final_path)
    }

    /// Remove every custom hook linked to an application
    ///
    /// Returns the removed paths. A missing custom root removes nothing.
    ///
    /// # Errors
    ///
    /// Returns error if a hook file cannot be deleted
    pub fn remove(&self, app: &str) -> Result<Vec<PathBuf>> {
        let mut removed = Vec::new();

        let Ok(actions) = fs::read_dir(&self.custom_root) else {
            return Ok(removed);
        };

        let mut action_dirs: Vec<PathBuf> = actions
            .filter_map(std::result::Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        action_dirs.sort();

        for action_dir in action_dirs {
            let Ok(scripts) = fs::read_dir(&action_dir) else {
                continue;
            };
            for script in scripts.filter_map(std::result::Result::ok) {
                let path = script.path();
                if path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(app))
                {
                    fs::remove_file(&path)?;
                    tracing::debug!("Removed hook {}", path.display());
                    removed.push(path);
                }
            }
        }

        Ok(removed)
    }
}
