//! Configuration loader with environment variable expansion

use super::{Config, ConfigError};
use lazy_static::lazy_static;
use std::path::{Path, PathBuf};

lazy_static! {
    // ${VAR} or ${VAR:-default}
    static ref ENV_VAR: regex_lite::Regex =
        regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}").unwrap();
}

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Expand, parse and validate configuration text
    pub fn parse(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content);
        let mut config: Config = serde_yaml::from_str(&expanded)?;
        config.log_dir = Self::expand_home(&config.log_dir);
        config.local_dir = Self::expand_home(&config.local_dir);
        config.validate()?;
        Ok(config)
    }

    /// Expand environment variables in the format `${VAR_NAME}` or
    /// `${VAR_NAME:-default}`.
    ///
    /// A variable that is unset and has no default keeps its placeholder.
    fn expand_env_vars(content: &str) -> String {
        let mut last_match = 0;
        let mut result = String::with_capacity(content.len());

        for cap in ENV_VAR.captures_iter(content) {
            let Some(full_match) = cap.get(0) else {
                continue;
            };
            result.push_str(&content[last_match..full_match.start()]);

            let value = match std::env::var(&cap[1]) {
                Ok(val) => val,
                Err(_) => match cap.get(2) {
                    Some(default) => default.as_str().to_string(),
                    None => full_match.as_str().to_string(),
                },
            };
            result.push_str(&value);

            last_match = full_match.end();
        }

        result.push_str(&content[last_match..]);
        result
    }

    /// Replace a leading `~` with the user's home directory
    fn expand_home(path: &Path) -> PathBuf {
        let Ok(rest) = path.strip_prefix("~") else {
            return path.to_path_buf();
        };
        match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(rest),
            None => path.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[serial_test::serial]
    fn test_expand_env_vars() {
        std::env::set_var("SPOOL_TEST_VAR", "test_value");
        let content = "key: ${SPOOL_TEST_VAR}";
        let expanded = ConfigLoader::expand_env_vars(content);
        assert_eq!(expanded, "key: test_value");
        std::env::remove_var("SPOOL_TEST_VAR");
    }

    #[test]
    #[serial_test::serial]
    fn test_expand_env_vars_default() {
        std::env::remove_var("SPOOL_MISSING_VAR");
        assert_eq!(
            ConfigLoader::expand_env_vars("a: ${SPOOL_MISSING_VAR:-fallback}"),
            "a: fallback"
        );
        assert_eq!(ConfigLoader::expand_env_vars("a: '${SPOOL_MISSING_VAR:-}'"), "a: ''");
        assert_eq!(
            ConfigLoader::expand_env_vars("a: ${SPOOL_MISSING_VAR}"),
            "a: ${SPOOL_MISSING_VAR}"
        );
    }

    #[test]
    #[serial_test::serial]
    fn test_expand_home() {
        let previous = std::env::var_os("HOME");
        std::env::set_var("HOME", "/home/spool");
        assert_eq!(
            ConfigLoader::expand_home(Path::new("~/outbox")),
            PathBuf::from("/home/spool/outbox")
        );
        assert_eq!(
            ConfigLoader::expand_home(Path::new("/srv/outbox")),
            PathBuf::from("/srv/outbox")
        );
        match previous {
            Some(home) => std::env::set_var("HOME", home),
            None => std::env::remove_var("HOME"),
        }
    }

    #[test]
    fn test_parse_minimal_config() {
        let config = ConfigLoader::parse(
            r#"
log_dir: /var/log/spool
token: abc
local_dir: /data/outbox
remote_dir: "disk:/backup"
"#,
        )
        .unwrap();

        assert_eq!(config.quota_limit_percent, 90);
        assert!(!config.simulation);
        assert_eq!(config.api_url, crate::config::DEFAULT_API_URL);
        assert_eq!(config.timing.poll_interval_secs, 10);
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn test_parse_rejects_invalid_limit() {
        let result = ConfigLoader::parse(
            r#"
log_dir: /var/log/spool
token: abc
local_dir: /data/outbox
remote_dir: "disk:/backup"
quota_limit_percent: 150
"#,
        );
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }
}
