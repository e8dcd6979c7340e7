//! Layered configuration: built-in defaults, an optional TOML file, then
//! `LUME_`-prefixed environment variables.

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dedup::DEFAULT_BUFFER_SIZE;

pub const ENV_PREFIX: &str = "LUME_";
pub const DEFAULT_MAX_FILES: usize = 10_000;
pub const DEFAULT_MAX_ERROR_DISPLAY: usize = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LumeConfig {
    /// Append log output to this file in addition to stderr.
    pub log_file: Option<PathBuf>,
    /// Lifetime statistics JSON. No stats are kept when unset.
    pub stats_file: Option<PathBuf>,
    /// Candidates processed per batch.
    pub max_files: usize,
    /// Failures listed in the end-of-run report.
    pub max_error_display: usize,
    /// Read buffer for hashing and copying, in bytes.
    pub buffer_size: usize,
    /// Skip rename and always copy, verify and delete.
    pub force_copy: bool,
}

impl Default for LumeConfig {
    fn default() -> Self {
        Self {
            log_file: None,
            stats_file: None,
            max_files: DEFAULT_MAX_FILES,
            max_error_display: DEFAULT_MAX_ERROR_DISPLAY,
            buffer_size: DEFAULT_BUFFER_SIZE,
            force_copy: false,
        }
    }
}

impl LumeConfig {
    /// Load configuration. An explicitly named file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(LumeConfig::default()));
        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.display().to_string()));
            }
            figment = figment.merge(Toml::file(path));
        }
        Self::from_figment(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: LumeConfig = figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_files == 0 {
            return Err(ConfigError::ValidationError(
                "max_files must be greater than zero".into(),
            ));
        }
        if self.buffer_size == 0 {
            return Err(ConfigError::ValidationError(
                "buffer_size must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        Jail::expect_with(|_jail| {
            let config = LumeConfig::load(None).unwrap();
            assert_eq!(config, LumeConfig::default());
            assert_eq!(config.max_files, 10_000);
            assert_eq!(config.max_error_display, 10);
            assert_eq!(config.buffer_size, 64 * 1024);
            assert!(!config.force_copy);
            Ok(())
        });
    }

    #[test]
    fn test_file_then_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "lume.toml",
                r#"
stats_file = "/var/lib/lume/stats.json"
max_files = 500
force_copy = true
"#,
            )?;
            jail.set_env("LUME_MAX_FILES", "42");

            let config = LumeConfig::load(Some(Path::new("lume.toml"))).unwrap();
            assert_eq!(config.max_files, 42);
            assert!(config.force_copy);
            assert_eq!(
                config.stats_file,
                Some(PathBuf::from("/var/lib/lume/stats.json"))
            );
            assert_eq!(config.max_error_display, 10);
            Ok(())
        });
    }

    #[test]
    fn test_missing_file() {
        let err = LumeConfig::load(Some(Path::new("/nonexistent/lume.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_bad_value() {
        Jail::expect_with(|jail| {
            jail.create_file("lume.toml", "max_files = \"lots\"")?;
            let err = LumeConfig::load(Some(Path::new("lume.toml"))).unwrap_err();
            assert!(matches!(err, ConfigError::ParseError(_)));
            Ok(())
        });
    }

    #[test]
    fn test_zero_max_files_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("lume.toml", "max_files = 0")?;
            let err = LumeConfig::load(Some(Path::new("lume.toml"))).unwrap_err();
            assert!(matches!(err, ConfigError::ValidationError(_)));
            Ok(())
        });
    }
}
