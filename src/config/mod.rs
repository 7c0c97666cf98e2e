//! Configuration module for Spool Uploadr
//!
//! Handles loading and parsing of YAML configuration files with support for
//! environment variable expansion and validation. The configuration is loaded
//! once at startup and handed to every component as an immutable value.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Default REST endpoint of the cloud disk API
pub const DEFAULT_API_URL: &str = "https://cloud-api.yandex.net/v1/disk";

// ============================================================================
// Validation Helpers
// ============================================================================

/// Validate that a URL starts with http:// or https://
fn is_valid_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root directory for per-run log files
    pub log_dir: PathBuf,

    /// OAuth application identifier, used to build the authorization URL
    #[serde(default)]
    pub app_id: String,

    /// OAuth token. Empty means the one-time authorization has not been done.
    #[serde(default)]
    pub token: String,

    /// Local folder to drain
    pub local_dir: PathBuf,

    /// Destination folder on the remote disk (e.g. `disk:/backup`)
    pub remote_dir: String,

    /// Uploads pause while remote usage is above this percentage
    #[serde(default = "default_quota_limit_percent")]
    pub quota_limit_percent: u8,

    /// Replace network transfers with a fixed delay
    #[serde(default)]
    pub simulation: bool,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        ConfigLoader::load(path)
    }

    /// Parse configuration from YAML text (after environment expansion)
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        ConfigLoader::parse(content)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "log_dir must not be empty".into(),
            ));
        }

        if self.local_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "local_dir must not be empty".into(),
            ));
        }

        if self.remote_dir.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "remote_dir must not be empty".into(),
            ));
        }

        if self.quota_limit_percent > 100 {
            return Err(ConfigError::ValidationError(format!(
                "Invalid quota_limit_percent {}: must be between 0 and 100",
                self.quota_limit_percent
            )));
        }

        if !is_valid_http_url(&self.api_url) {
            return Err(ConfigError::ValidationError(
                "Invalid api_url: must start with http:// or https://".into(),
            ));
        }

        if self.token.is_empty() && self.app_id.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "app_id is required while token is empty".into(),
            ));
        }

        // simulation_delay_secs and failure_cooldown_secs may be 0
        for (name, secs) in [
            ("poll_interval_secs", self.timing.poll_interval_secs),
            ("quota_backoff_secs", self.timing.quota_backoff_secs),
            ("memory_sample_secs", self.timing.memory_sample_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "timing.{} must be greater than 0",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Whether an OAuth token has been configured
    pub fn is_authenticated(&self) -> bool {
        !self.token.is_empty()
    }

    /// Configuration as a single log-friendly line, with the token hidden
    pub fn summary(&self) -> String {
        format!(
            "log_dir={} local_dir={} remote_dir={} quota_limit={}% simulation={} api_url={} token={}",
            self.log_dir.display(),
            self.local_dir.display(),
            self.remote_dir,
            self.quota_limit_percent,
            self.simulation,
            self.api_url,
            if self.token.is_empty() { "<unset>" } else { "<redacted>" }
        )
    }
}

fn default_quota_limit_percent() -> u8 {
    90
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

/// Fixed delays of the control loop, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Sleep between scans of an empty local folder. Default: 10
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Sleep after a failed quota check. Default: 30
    #[serde(default = "default_quota_backoff")]
    pub quota_backoff_secs: u64,

    /// Stand-in for the transfer in simulation mode. Default: 5, may be 0
    #[serde(default = "default_simulation_delay")]
    pub simulation_delay_secs: u64,

    /// Cooldown after a failed upload attempt. Default: 10, may be 0
    #[serde(default = "default_failure_cooldown")]
    pub failure_cooldown_secs: u64,

    /// Process memory sampling cadence. Default: 120
    #[serde(default = "default_memory_sample")]
    pub memory_sample_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            quota_backoff_secs: default_quota_backoff(),
            simulation_delay_secs: default_simulation_delay(),
            failure_cooldown_secs: default_failure_cooldown(),
            memory_sample_secs: default_memory_sample(),
        }
    }
}

impl TimingConfig {
    /// Convert to the runtime representation
    pub fn timings(&self) -> Timings {
        Timings {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            quota_backoff: Duration::from_secs(self.quota_backoff_secs),
            simulation_delay: Duration::from_secs(self.simulation_delay_secs),
            failure_cooldown: Duration::from_secs(self.failure_cooldown_secs),
            memory_sample: Duration::from_secs(self.memory_sample_secs),
        }
    }
}

fn default_poll_interval() -> u64 {
    10
}

fn default_quota_backoff() -> u64 {
    30
}

fn default_simulation_delay() -> u64 {
    5
}

fn default_failure_cooldown() -> u64 {
    10
}

fn default_memory_sample() -> u64 {
    120
}

/// Delays used by the control loop components
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub poll_interval: Duration,
    pub quota_backoff: Duration,
    pub simulation_delay: Duration,
    pub failure_cooldown: Duration,
    pub memory_sample: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        TimingConfig::default().timings()
    }
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

impl MetricsConfig {
    /// Loopback address the metrics endpoint binds to
    pub fn address(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }
}

fn default_metrics_port() -> u16 {
    9090
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            log_dir: "/var/log/spool".into(),
            app_id: "app".into(),
            token: "token".into(),
            local_dir: "/data/outbox".into(),
            remote_dir: "disk:/backup".into(),
            quota_limit_percent: 80,
            simulation: false,
            api_url: default_api_url(),
            timing: TimingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }

    #[test]
    fn test_default_timings() {
        let timings = Timings::default();
        assert_eq!(timings.poll_interval, Duration::from_secs(10));
        assert_eq!(timings.quota_backoff, Duration::from_secs(30));
        assert_eq!(timings.simulation_delay, Duration::from_secs(5));
        assert_eq!(timings.failure_cooldown, Duration::from_secs(10));
        assert_eq!(timings.memory_sample, Duration::from_secs(120));
    }

    #[test]
    fn test_valid_config() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_quota_limit_out_of_range() {
        let mut config = test_config();
        config.quota_limit_percent = 101;
        assert!(config.validate().is_err());

        config.quota_limit_percent = 100;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_remote_dir_rejected() {
        let mut config = test_config();
        config.remote_dir = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_app_id_without_token() {
        let mut config = test_config();
        config.token.clear();
        config.app_id.clear();
        assert!(config.validate().is_err());

        config.app_id = "app".into();
        assert!(config.validate().is_ok());
        assert!(!config.is_authenticated());
    }

    #[test]
    fn test_zero_polling_delays_rejected() {
        for field in ["poll_interval_secs", "quota_backoff_secs", "memory_sample_secs"] {
            let yaml = format!(
                "log_dir: /var/log/spool\ntoken: t\nlocal_dir: /data/outbox\nremote_dir: \"disk:/backup\"\ntiming:\n  {}: 0\n",
                field
            );
            match Config::from_yaml(&yaml) {
                Err(ConfigError::ValidationError(message)) => assert!(message.contains(field)),
                other => panic!("expected validation error for {}, got {:?}", field, other),
            }
        }
    }

    #[test]
    fn test_zero_cooldown_and_simulation_delay_allowed() {
        let mut config = test_config();
        config.timing.failure_cooldown_secs = 0;
        config.timing.simulation_delay_secs = 0;
        assert!(config.validate().is_ok());
        assert_eq!(config.timing.timings().failure_cooldown, Duration::ZERO);
    }

    #[test]
    fn test_invalid_api_url() {
        let mut config = test_config();
        config.api_url = "ftp://example.com".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_summary_hides_token() {
        let config = test_config();
        let summary = config.summary();
        assert!(!summary.contains("token=token"));
        assert!(summary.contains("<redacted>"));
        assert!(summary.contains("quota_limit=80%"));
    }

    #[test]
    fn test_metrics_address() {
        let metrics = MetricsConfig::default();
        assert!(!metrics.enabled);
        assert_eq!(metrics.address(), "127.0.0.1:9090");
    }
}
