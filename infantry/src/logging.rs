//! Process-wide tracing setup shared by all three binaries.
//!
//! Filter: `RUST_LOG` when set, otherwise the configured `log_level`.
//! Output: compact lines on stderr, plus a plain-text file when
//! `default_log_directory` is configured.
//!
//! # Example
//! ```bash
//! RUST_LOG=infantry=debug infantry --root-git-path ~/src/app \
//!     --mission-folder-path ai-goals/add-widget
//! ```

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILENAME: &str = "army.log";

/// Logging keys, flattened into each component's config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub default_log_directory: Option<PathBuf>,
    pub default_log_filename: Option<String>,
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_log_directory: None,
            default_log_filename: None,
            log_level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<()> {
        if EnvFilter::try_new(&self.log_level).is_err() {
            bail!("log_level '{}' is not a valid filter", self.log_level);
        }
        if self
            .default_log_filename
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            bail!("default_log_filename must not be empty when set");
        }
        Ok(())
    }

    /// Log file path, when a log directory is configured.
    pub fn log_file_path(&self) -> Option<PathBuf> {
        let dir = self.default_log_directory.as_ref()?;
        let name = self
            .default_log_filename
            .as_deref()
            .unwrap_or(DEFAULT_LOG_FILENAME);
        Some(dir.join(name))
    }
}

/// Install the global subscriber. Call once, before any other work.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level)
            .with_context(|| format!("parse log_level '{}'", config.log_level))?,
    };

    let file_layer = match config.log_file_path() {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create log directory {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .with(file_layer)
        .try_init()
        .context("install tracing subscriber")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_path_needs_a_directory() {
        let mut cfg = LoggingConfig::default();
        assert_eq!(cfg.log_file_path(), None);

        cfg.default_log_filename = Some("infantry.log".to_string());
        assert_eq!(cfg.log_file_path(), None);

        cfg.default_log_directory = Some(PathBuf::from("logs"));
        assert_eq!(cfg.log_file_path(), Some(PathBuf::from("logs/infantry.log")));

        cfg.default_log_filename = None;
        assert_eq!(cfg.log_file_path(), Some(PathBuf::from("logs/army.log")));
    }

    #[test]
    fn rejects_unparsable_level() {
        let cfg = LoggingConfig {
            log_level: "infantry=notalevel".to_string(),
            ..LoggingConfig::default()
        };
        assert!(cfg.validate().is_err());
        assert!(LoggingConfig::default().validate().is_ok());
    }
}
