//! Configuration: an optional TOML file plus CLI overrides.
//!
//! Constants live here instead of module-level mutable state so independent
//! crawls (and tests) never share limiter or snapshot configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::archive::{DEFAULT_MODULE_SNAPSHOT, DEFAULT_SNAPSHOT};
use crate::rate_limit::RateLimitConfig;

/// User agent presented to the archive.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 5.1; rv:40.0) Gecko/20100101 Firefox/40.0";

/// Config file name searched for in the working directory.
pub const CONFIG_FILENAME: &str = "playsrec.toml";

/// Configuration file structure. Every field is optional; missing values
/// fall back to the defaults in [`Settings`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Directory receiving downloaded videos.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    /// User agent string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    /// Maximum requests per rate limit window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_requests: Option<usize>,
    /// Rate limit window width in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_secs: Option<u64>,
    /// Sleep granularity while the window is full, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_secs: Option<u64>,
    /// Snapshot timestamp for profile and embed pages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<String>,
    /// Snapshot timestamp for the pagination endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_snapshot: Option<String>,
    /// Quality tags to prefer, best first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_preference: Option<Vec<String>>,
    /// Concurrent download workers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
}

impl Config {
    /// Load a config file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Load `playsrec.toml` from the working directory if present.
    pub fn discover() -> anyhow::Result<Self> {
        let path = PathBuf::from(CONFIG_FILENAME);
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub output_dir: PathBuf,
    pub user_agent: String,
    pub request_timeout: Duration,
    pub max_requests: usize,
    pub interval: Duration,
    pub backoff: Duration,
    pub snapshot: String,
    pub module_snapshot: String,
    pub quality_preference: Vec<String>,
    pub workers: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("Downloads"),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(30),
            max_requests: 15,
            interval: Duration::from_secs(60),
            backoff: Duration::from_secs(4),
            snapshot: DEFAULT_SNAPSHOT.to_string(),
            module_snapshot: DEFAULT_MODULE_SNAPSHOT.to_string(),
            quality_preference: vec!["720".to_string(), "480".to_string()],
            workers: 1,
        }
    }
}

impl Settings {
    /// Resolve settings from a config file, falling back to defaults.
    pub fn from_config(config: Config) -> Self {
        let defaults = Self::default();
        Self {
            output_dir: config.output_dir.map(PathBuf::from).unwrap_or(defaults.output_dir),
            user_agent: config.user_agent.unwrap_or(defaults.user_agent),
            request_timeout: config
                .request_timeout
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            max_requests: config.max_requests.unwrap_or(defaults.max_requests),
            interval: config
                .interval_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.interval),
            backoff: config
                .backoff_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.backoff),
            snapshot: config.snapshot.unwrap_or(defaults.snapshot),
            module_snapshot: config.module_snapshot.unwrap_or(defaults.module_snapshot),
            quality_preference: config
                .quality_preference
                .unwrap_or(defaults.quality_preference),
            workers: config.workers.unwrap_or(defaults.workers),
        }
    }

    /// Rate limiter configuration for this run.
    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_requests: self.max_requests,
            interval: self.interval,
            backoff: self.backoff,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_original_client() {
        let settings = Settings::default();
        assert_eq!(settings.max_requests, 15);
        assert_eq!(settings.interval, Duration::from_secs(60));
        assert_eq!(settings.backoff, Duration::from_secs(4));
        assert_eq!(settings.snapshot, "20191210043532");
        assert_eq!(settings.module_snapshot, "20191210164839");
    }

    #[test]
    fn test_from_config_overrides() {
        let config = Config {
            output_dir: Some("/tmp/videos".to_string()),
            max_requests: Some(5),
            interval_secs: Some(10),
            quality_preference: Some(vec!["480".to_string()]),
            ..Default::default()
        };
        let settings = Settings::from_config(config);
        assert_eq!(settings.output_dir, PathBuf::from("/tmp/videos"));
        assert_eq!(settings.max_requests, 5);
        assert_eq!(settings.interval, Duration::from_secs(10));
        assert_eq!(settings.quality_preference, vec!["480".to_string()]);
        // Untouched fields keep their defaults
        assert_eq!(settings.workers, 1);
    }

    #[test]
    fn test_parse_config_file() {
        let config: Config = toml::from_str(
            r#"
            output_dir = "recovered"
            max_requests = 10
            quality_preference = ["720", "480", "360"]
            "#,
        )
        .unwrap();
        assert_eq!(config.output_dir.as_deref(), Some("recovered"));
        assert_eq!(config.max_requests, Some(10));
        assert_eq!(config.quality_preference.as_ref().unwrap().len(), 3);
    }
}
