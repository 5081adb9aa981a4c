//! Service configuration
//!
//! Read from `<home>/fastsurvey.toml`. Every key is optional; a missing file
//! yields the defaults. Relative paths are resolved against the home
//! directory.
//!
//! ```toml
//! database_path = "fastsurvey.sqlite3"
//! surveys_dir = "surveys"
//! pending_max_age_hours = 72
//! ```

use crate::retention::{KeepAll, MaxAge, RetentionPolicy};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = "fastsurvey.toml";
pub const DEFAULT_DATABASE_FILE: &str = "fastsurvey.sqlite3";
pub const DEFAULT_SURVEYS_DIR: &str = "surveys";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// On-disk layout of the configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    database_path: Option<PathBuf>,
    surveys_dir: Option<PathBuf>,
    pending_max_age_hours: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// SQLite database holding pending and verified entries
    pub database_path: PathBuf,

    /// Directory of survey configuration documents (`*.json`)
    pub surveys_dir: PathBuf,

    /// Pending entries older than this are purged. `None` keeps them forever.
    pub pending_max_age_hours: Option<u32>,
}

impl ServiceConfig {
    /// Defaults rooted at `home`.
    pub fn defaults(home: &Path) -> Self {
        Self {
            database_path: home.join(DEFAULT_DATABASE_FILE),
            surveys_dir: home.join(DEFAULT_SURVEYS_DIR),
            pending_max_age_hours: None,
        }
    }

    /// Load `<home>/fastsurvey.toml`, falling back to defaults if absent.
    pub fn load(home: &Path) -> Result<Self, ConfigError> {
        let path = home.join(CONFIG_FILE_NAME);
        if !path.exists() {
            debug!(path = %path.display(), "No configuration file, using defaults");
            return Ok(Self::defaults(home));
        }

        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::from_toml(home, &text).map_err(|source| ConfigError::Parse { path, source })
    }

    /// Parse a configuration document, resolving relative paths against `home`.
    pub fn from_toml(home: &Path, text: &str) -> Result<Self, toml::de::Error> {
        let file: ConfigFile = toml::from_str(text)?;
        let defaults = Self::defaults(home);

        Ok(Self {
            database_path: file
                .database_path
                .map(|p| home.join(p))
                .unwrap_or(defaults.database_path),
            surveys_dir: file
                .surveys_dir
                .map(|p| home.join(p))
                .unwrap_or(defaults.surveys_dir),
            pending_max_age_hours: file.pending_max_age_hours,
        })
    }

    /// Retention policy for pending entries.
    pub fn retention(&self) -> Arc<dyn RetentionPolicy> {
        match self.pending_max_age_hours {
            Some(hours) => Arc::new(MaxAge::hours(hours)),
            None => Arc::new(KeepAll),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let home = TempDir::new().unwrap();
        let config = ServiceConfig::load(home.path()).unwrap();
        assert_eq!(config, ServiceConfig::defaults(home.path()));
        assert_eq!(config.database_path, home.path().join("fastsurvey.sqlite3"));
    }

    #[test]
    fn test_relative_and_absolute_paths() {
        let home = Path::new("/srv/fastsurvey");
        let config = ServiceConfig::from_toml(
            home,
            "database_path = \"/var/lib/survey.db\"\nsurveys_dir = \"conf\"\npending_max_age_hours = 24\n",
        )
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/var/lib/survey.db"));
        assert_eq!(config.surveys_dir, home.join("conf"));
        assert_eq!(config.pending_max_age_hours, Some(24));
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let config = ServiceConfig::from_toml(Path::new("/h"), "colour = \"blue\"\n").unwrap();
        assert_eq!(config, ServiceConfig::defaults(Path::new("/h")));
    }

    #[test]
    fn test_invalid_file_is_reported() {
        let home = TempDir::new().unwrap();
        std::fs::write(home.path().join(CONFIG_FILE_NAME), "pending_max_age_hours = \"soon\"").unwrap();
        let err = ServiceConfig::load(home.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
