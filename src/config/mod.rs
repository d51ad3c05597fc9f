//! Configuration management for wanwatch.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Router access configuration.
    #[serde(default)]
    pub router: RouterConfig,

    /// Watchdog configuration.
    #[serde(default)]
    pub watch: WatchConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("Failed to read config: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| Error::Config(format!("Failed to write config: {e}")))?;

        Ok(())
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.router.hostname.is_empty() {
            return Err(Error::InvalidConfig("Router hostname is empty".into()));
        }

        if self.watch.destinations.is_empty() {
            return Err(Error::InvalidConfig(
                "At least one probe destination is required".into(),
            ));
        }

        if self.watch.interval.is_zero() {
            return Err(Error::InvalidConfig("Watch interval must be nonzero".into()));
        }

        Ok(())
    }

    /// Get default config path.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("dev", "wanwatch", "wanwatch").map_or_else(
            || PathBuf::from("wanwatch.toml"),
            |dirs| dirs.config_dir().join("config.toml"),
        )
    }
}

/// Router access configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Hostname or IP of the router's web interface.
    #[serde(default = "default_hostname")]
    pub hostname: String,

    /// Login username.
    #[serde(default = "default_username")]
    pub username: String,

    /// Login password.
    #[serde(default)]
    pub password: String,

    /// Don't make changes to the modem.
    #[serde(default)]
    pub dry_run: bool,
}

fn default_hostname() -> String {
    "192.168.1.1".into()
}
fn default_username() -> String {
    "admin".into()
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            hostname: default_hostname(),
            username: default_username(),
            password: String::new(),
            dry_run: false,
        }
    }
}

/// Watchdog configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Interval between connectivity checks.
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,

    /// Use raw ICMP sockets instead of unprivileged ping sockets.
    #[serde(default)]
    pub raw_socket: bool,

    /// Ordered probe destinations; the first entry is the primary and
    /// the rest are fallbacks against endpoint outages.
    #[serde(default = "default_destinations")]
    pub destinations: Vec<String>,
}

fn default_interval() -> Duration {
    Duration::from_secs(15)
}
fn default_destinations() -> Vec<String> {
    vec!["1.1.1.1".into()]
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            raw_socket: false,
            destinations: default_destinations(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (text or json).
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Enable colored output.
    #[serde(default = "default_color")]
    pub color: bool,
}

fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}
fn default_color() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            color: default_color(),
        }
    }
}

/// Initialize logging.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.format == "json" {
        subscriber
            .with(fmt::layer().json())
            .try_init()
            .map_err(|e| Error::Config(format!("Failed to init logging: {e}")))?;
    } else {
        subscriber
            .with(fmt::layer().with_ansi(config.color))
            .try_init()
            .map_err(|e| Error::Config(format!("Failed to init logging: {e}")))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.router.hostname, "192.168.1.1");
        assert_eq!(config.watch.interval, Duration::from_secs(15));
        assert_eq!(config.watch.destinations, vec!["1.1.1.1".to_string()]);
    }

    #[test]
    fn test_parse_toml() {
        let config: Config = toml::from_str(
            r#"
            [router]
            hostname = "10.0.0.1"
            username = "admin"
            password = "secret"

            [watch]
            interval = "30s"
            raw_socket = true
            destinations = ["1.1.1.1", "9.9.9.9"]
            "#,
        )
        .unwrap();

        config.validate().unwrap();
        assert_eq!(config.router.hostname, "10.0.0.1");
        assert_eq!(config.watch.interval, Duration::from_secs(30));
        assert!(config.watch.raw_socket);
        assert_eq!(config.watch.destinations.len(), 2);
    }

    #[test]
    fn test_validate_rejects_empty_destinations() {
        let mut config = Config::default();
        config.watch.destinations.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = Config::default();
        config.watch.interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }
}
