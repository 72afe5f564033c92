//! Client configuration loading
//!
//! Resolution priority for the backend base URL:
//! 1. Explicit value (command-line argument, highest priority)
//! 2. `GENODASH_API_URL` environment variable
//! 3. TOML config file (`~/.config/genodash/config.toml`)
//! 4. Compiled default (`http://localhost:5000`)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Compiled default backend address
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";

/// Default interval between poll requests
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3000;

/// Consecutive poll failures before a warning is surfaced to the UI
pub const DEFAULT_POLL_WARN_AFTER: u32 = 3;

/// Consecutive poll failures before the loop gives up entirely.
/// The original polled forever; a hard cap bounds background traffic
/// once a job becomes permanently unreachable.
pub const DEFAULT_POLL_MAX_FAILURES: u32 = 20;

/// Per-request timeout for one-shot calls
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Client configuration shared by all services
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub poll_interval: Duration,
    pub poll_warn_after: u32,
    pub poll_max_failures: u32,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            poll_warn_after: DEFAULT_POLL_WARN_AFTER,
            poll_max_failures: DEFAULT_POLL_MAX_FAILURES,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

/// On-disk configuration file shape
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    api_base_url: Option<String>,
    poll_interval_ms: Option<u64>,
    poll_warn_after: Option<u32>,
    poll_max_failures: Option<u32>,
    request_timeout_secs: Option<u64>,
}

impl ClientConfig {
    /// Resolve configuration using the documented priority order.
    ///
    /// `cli_base_url` is the command-line override, if given. A config
    /// file that exists but fails to parse is an error, not a silent
    /// fallback to defaults.
    pub fn resolve(cli_base_url: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = default_config_path() {
            if path.exists() {
                let contents = std::fs::read_to_string(&path)?;
                let file: ConfigFile = toml::from_str(&contents)
                    .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
                config.apply_file(file);
            }
        }

        if let Ok(url) = std::env::var("GENODASH_API_URL") {
            if !url.is_empty() {
                config.api_base_url = url;
            }
        }

        if let Some(url) = cli_base_url {
            config.api_base_url = url.to_string();
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a config file's contents over the defaults (used directly
    /// by tests; `resolve` handles the on-disk lookup).
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| Error::Config(e.to_string()))?;
        let mut config = Self::default();
        config.apply_file(file);
        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, file: ConfigFile) {
        if let Some(url) = file.api_base_url {
            self.api_base_url = url;
        }
        if let Some(ms) = file.poll_interval_ms {
            self.poll_interval = Duration::from_millis(ms);
        }
        if let Some(n) = file.poll_warn_after {
            self.poll_warn_after = n;
        }
        if let Some(n) = file.poll_max_failures {
            self.poll_max_failures = n;
        }
        if let Some(s) = file.request_timeout_secs {
            self.request_timeout = Duration::from_secs(s);
        }
    }

    fn validate(&self) -> Result<()> {
        if self.api_base_url.is_empty() {
            return Err(Error::Config("api_base_url must not be empty".into()));
        }
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://")
        {
            return Err(Error::Config(format!(
                "api_base_url must be an http(s) URL, got '{}'",
                self.api_base_url
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::Config("poll_interval_ms must be > 0".into()));
        }
        if self.poll_max_failures < self.poll_warn_after {
            return Err(Error::Config(
                "poll_max_failures must be >= poll_warn_after".into(),
            ));
        }
        Ok(())
    }
}

/// `~/.config/genodash/config.toml` (platform equivalent via `dirs`)
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("genodash").join("config.toml"))
}

/// Default location for the persisted session file
pub fn default_session_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("genodash").join("session.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = ClientConfig::default();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.poll_interval, Duration::from_millis(3000));
        assert_eq!(config.poll_warn_after, 3);
        assert!(config.poll_max_failures >= config.poll_warn_after);
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = ClientConfig::from_toml_str(
            r#"
            api_base_url = "https://genodash.example.org"
            poll_interval_ms = 500
            poll_warn_after = 2
            poll_max_failures = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.api_base_url, "https://genodash.example.org");
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.poll_warn_after, 2);
        assert_eq!(config.poll_max_failures, 10);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(matches!(
            ClientConfig::from_toml_str("api_base_url = 42"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn rejects_non_http_url() {
        assert!(matches!(
            ClientConfig::from_toml_str(r#"api_base_url = "ftp://nope""#),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn rejects_zero_poll_interval() {
        assert!(matches!(
            ClientConfig::from_toml_str("poll_interval_ms = 0"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn rejects_cap_below_warn_threshold() {
        let toml = "poll_warn_after = 5\npoll_max_failures = 2";
        assert!(matches!(
            ClientConfig::from_toml_str(toml),
            Err(Error::Config(_))
        ));
    }
}
