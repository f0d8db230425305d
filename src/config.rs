//! Configuration loaded from `podup.toml`
//!
//! Every setting has a default, so the file is optional. Example:
//!
//! ```toml
//! [index]
//! cdn_url = "https://cdn.cocoapods.org/"
//! timeout_secs = 10
//! concurrency = 6
//!
//! [retry]
//! max_attempts = 3
//! base_delay_ms = 200
//! ```

use crate::error::ConfigError;
use crate::resolver::DEFAULT_CONCURRENCY;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file name looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "podup.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub index: IndexConfig,
    pub retry: RetryConfig,
}

/// Spec index endpoints and fetch limits
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct IndexConfig {
    /// Public CocoaPods CDN
    pub cdn_url: String,
    /// GitHub REST API used for private spec repositories
    pub github_api_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum concurrent prefetches
    pub concurrency: usize,
    pub user_agent: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            cdn_url: "https://cdn.cocoapods.org/".to_string(),
            github_api_url: "https://api.github.com".to_string(),
            timeout_secs: 10,
            concurrency: DEFAULT_CONCURRENCY,
            user_agent: concat!("podup/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl IndexConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Retry schedule for remote fetches
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 5000,
        }
    }
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from an explicit path, or from `podup.toml` in
    /// `dir` when it exists, falling back to defaults
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Self, ConfigError> {
        let path: PathBuf = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = dir.join(DEFAULT_CONFIG_FILE);
                if !candidate.is_file() {
                    log::debug!("no {} found, using defaults", DEFAULT_CONFIG_FILE);
                    return Ok(Self::default());
                }
                candidate
            }
        };

        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::Read {
            path: path.clone(),
            source: e,
        })?;
        log::debug!("loaded config from {}", path.display());
        Self::from_toml(&content, &path)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "retry.max_attempts".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.index.concurrency == 0 {
            return Err(ConfigError::Invalid {
                key: "index.concurrency".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            return Err(ConfigError::Invalid {
                key: "retry.max_delay_ms".to_string(),
                message: "must not be smaller than retry.base_delay_ms".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.index.cdn_url, "https://cdn.cocoapods.org/");
        assert_eq!(config.index.timeout(), Duration::from_secs(10));
        assert_eq!(config.retry.max_attempts, 3);
        assert!(config.index.user_agent.starts_with("podup/"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::from_toml(
            "[index]\ncdn_url = \"https://mirror.example.com/\"\n",
            Path::new("podup.toml"),
        )
        .unwrap();
        assert_eq!(config.index.cdn_url, "https://mirror.example.com/");
        assert_eq!(config.index.concurrency, 6);
        assert_eq!(config.retry, RetryConfig::default());
    }

    #[test]
    fn test_rejects_zero_attempts() {
        let err = Config::from_toml("[retry]\nmax_attempts = 0\n", Path::new("podup.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let err = Config::from_toml("[index]\ncdn = \"x\"\n", Path::new("podup.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_load_missing_default_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(None, dir.path()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_default_file_from_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_FILE),
            "[retry]\nmax_attempts = 5\n",
        )
        .unwrap();
        let config = Config::load(None, dir.path()).unwrap();
        assert_eq!(config.retry.max_attempts, 5);
    }

    #[test]
    fn test_load_explicit_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml")), dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
