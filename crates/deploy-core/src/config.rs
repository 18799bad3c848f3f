//! Deployment configuration
//!
//! ```toml
//! enabled = true
//! repository = "deployment"
//! update_interval_secs = 15
//! retry_faulty = true
//! ```
//!
//! A relative `repository` is resolved against the directory holding the
//! configuration file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use deploy_fs::{ConfigStore, NormalizedPath};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default scan period in seconds.
pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 15;

/// Default repository directory name.
pub const DEFAULT_REPOSITORY: &str = "deployment";

/// Settings for the engine, scanner and scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentConfig {
    /// Whether periodic scanning runs at all
    pub enabled: bool,
    /// Repository root holding one directory per handler
    pub repository: PathBuf,
    /// Seconds between scheduled scans
    pub update_interval_secs: u64,
    /// Re-attempt unchanged faulty units on every scan
    pub retry_faulty: bool,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            repository: PathBuf::from(DEFAULT_REPOSITORY),
            update_interval_secs: DEFAULT_UPDATE_INTERVAL_SECS,
            retry_faulty: true,
        }
    }
}

impl DeploymentConfig {
    /// Load and validate a configuration file (`.toml`, `.json`, `.yaml`).
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] when the file cannot be read or parsed, or
    /// when a value is out of range.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config: Self = ConfigStore::new()
            .load(&NormalizedPath::new(path))
            .map_err(|e| Error::InvalidConfig {
                message: e.to_string(),
            })?;

        if config.repository.is_relative() {
            let base = path.parent().unwrap_or_else(|| Path::new("."));
            config.repository = base.join(&config.repository);
        }

        config.validate()?;
        tracing::debug!(
            config = %path.display(),
            repository = %config.repository.display(),
            "Loaded deployment configuration"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.update_interval_secs == 0 {
            return Err(Error::InvalidConfig {
                message: "update_interval_secs must be greater than zero".into(),
            });
        }
        if self.repository.as_os_str().is_empty() {
            return Err(Error::InvalidConfig {
                message: "repository must not be empty".into(),
            });
        }
        Ok(())
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = DeploymentConfig::default();
        assert!(config.enabled);
        assert_eq!(config.repository, PathBuf::from("deployment"));
        assert_eq!(config.update_interval(), Duration::from_secs(15));
        assert!(config.retry_faulty);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = DeploymentConfig {
            update_interval_secs: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: DeploymentConfig = toml::from_str("update_interval_secs = 3").unwrap();
        assert_eq!(config.update_interval_secs, 3);
        assert!(config.enabled);
        assert_eq!(config.repository, PathBuf::from("deployment"));
    }
}
