//! Logging configuration for the hostward CLI
//!
//! Provides compact terminal output and optional file logging using tracing.

use crate::Result;
use std::path::Path;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Build the default filter for the hostward crates
fn default_filter(verbose: bool) -> Result<EnvFilter> {
    let level = if verbose { "debug" } else { "info" };

    // RUST_LOG wins when set
    EnvFilter::try_from_default_env()
        .or_else(|_| {
            EnvFilter::try_new(format!(
                "hostward={level},hostward_cli={level},hostward_engine={level},hostward_config={level}"
            ))
        })
        .map_err(|e| hostward_core::Error::Config(format!("Invalid log filter: {e}")))
}

fn stdout_layer(verbose: bool, filter: EnvFilter) -> BoxedLayer {
    let layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .with_ansi(true);

    if verbose {
        layer.with_filter(filter).boxed()
    } else {
        // No timestamps in normal mode
        layer.without_time().with_filter(filter).boxed()
    }
}

fn file_layer(log_path: &Path) -> Result<BoxedLayer> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;

    let filter = EnvFilter::try_new("debug")
        .map_err(|e| hostward_core::Error::Config(format!("Invalid log filter: {e}")))?;

    Ok(fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .with_filter(filter)
        .boxed())
}

/// Initialize the logging system
///
/// # Arguments
/// * `verbose` - Enable debug level logging
/// * `log_file` - Optional path to write logs to a file
///
/// # Examples
/// ```ignore
/// // Basic usage with info level
/// init(false, None)?;
///
/// // Write debug logs to a file as well
/// init(true, Some(Path::new("/var/log/hostward.log")))?;
/// ```
///
/// # Errors
///
/// Returns error if the log file cannot be opened or a global subscriber
/// is already installed
pub fn init(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let mut layers: Vec<BoxedLayer> = vec![stdout_layer(verbose, default_filter(verbose)?)];

    if let Some(log_path) = log_file {
        layers.push(file_layer(log_path)?);
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| hostward_core::Error::Config(format!("Failed to initialize logging: {e}")))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_layer_creates_log_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("hostward.log");

        let _layer = file_layer(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_file_layer_rejects_missing_directory() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing/hostward.log");

        assert!(file_layer(&path).is_err());
    }
}
