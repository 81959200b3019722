//! Application configuration loaded from a JSON file.
//!
//! ```json
//! {
//!   "watchdog": { "interval": 60, "store_path": "data/seen_offers.json" },
//!   "blacklist": ["Some Game"],
//!   "client": { "detail_timeout_secs": 10 },
//!   "discovery": { "excluded_url_prefixes": ["https://www.amazon.com/luna"] }
//! }
//! ```
//!
//! Every section is optional. Unknown sections (such as `notifiers`, read by
//! the notification backends) are ignored.

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::stores::DEFAULT_STORE_PATH;
use crate::traits::filter::TitleBlacklist;
use crate::types::config::{ClientConfig, DiscoveryConfig, WatchdogConfig};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "OFFER_WATCH_CONFIG";

/// Config file used when nothing else is specified.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogSection {
    /// Polling interval in minutes
    pub interval: u64,

    /// Seen-set document location
    pub store_path: PathBuf,
}

impl Default for WatchdogSection {
    fn default() -> Self {
        Self {
            interval: 60,
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub watchdog: WatchdogSection,

    /// Game titles that are never surfaced
    pub blacklist: Vec<String>,

    pub client: ClientConfig,

    pub discovery: DiscoveryConfig,
}

impl AppConfig {
    /// Load and validate the config file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: AppConfig =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Resolve the config path: explicit path, then `OFFER_WATCH_CONFIG`
    /// (a `.env` file is honoured), then `config.json`.
    pub fn resolve_path(explicit: Option<PathBuf>) -> PathBuf {
        let _ = dotenvy::dotenv();

        explicit
            .or_else(|| env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.watchdog.interval == 0 {
            return Err(ConfigError::Invalid(
                "watchdog.interval must be at least 1 minute".to_string(),
            ));
        }
        if self.watchdog.interval.checked_mul(60).is_none() {
            return Err(ConfigError::Invalid(format!(
                "watchdog.interval of {} minutes is out of range",
                self.watchdog.interval
            )));
        }
        if self.client.detail_timeout_secs == 0 || self.client.offers_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "client timeouts must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }

    pub fn watchdog_config(&self) -> WatchdogConfig {
        WatchdogConfig::new().with_interval_minutes(self.watchdog.interval)
    }

    /// Filter rejecting blacklisted game titles.
    pub fn filter(&self) -> TitleBlacklist {
        TitleBlacklist::new(self.blacklist.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::journey;
    use crate::traits::filter::OfferFilter;
    use chrono::Duration;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.json");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_full_config() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"{
                "watchdog": { "interval": 15, "store_path": "/var/lib/offers.json" },
                "notifiers": { "discord": [{ "webhook_url": "https://example.com/hook" }] },
                "blacklist": ["Game A"],
                "client": { "detail_timeout_secs": 20 }
            }"#,
        );

        let config = AppConfig::load(&path).unwrap();

        assert_eq!(config.watchdog.interval, 15);
        assert_eq!(config.watchdog.store_path, PathBuf::from("/var/lib/offers.json"));
        assert_eq!(
            config.watchdog_config().interval,
            std::time::Duration::from_secs(15 * 60)
        );
        assert_eq!(config.client.detail_timeout_secs, 20);
        assert_eq!(config.client.offers_timeout_secs, 30);

        let filter = config.filter();
        assert!(!filter.accept(&journey("a", "Game A", Duration::days(1))));
        assert!(filter.accept(&journey("b", "Game B", Duration::days(1))));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "{}");

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.watchdog.store_path, PathBuf::from(DEFAULT_STORE_PATH));
        assert!(config.filter().is_empty());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, r#"{"watchdog": {"interval": 0}}"#);

        assert!(matches!(
            AppConfig::load(&path),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_oversized_interval_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, r#"{"watchdog": {"interval": 307445734561825861}}"#);

        assert!(matches!(
            AppConfig::load(&path),
            Err(ConfigError::Invalid(_))
        ));

        let config = AppConfig {
            watchdog: WatchdogSection {
                interval: u64::MAX,
                ..WatchdogSection::default()
            },
            ..AppConfig::default()
        };
        assert_eq!(
            config.watchdog_config().interval,
            std::time::Duration::from_secs(u64::MAX)
        );
    }

    #[test]
    fn test_missing_and_malformed_files() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            AppConfig::load(dir.path().join("missing.json")),
            Err(ConfigError::Read { .. })
        ));

        let path = write_config(&dir, "{ not json");
        assert!(matches!(
            AppConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_explicit_path_wins() {
        let path = AppConfig::resolve_path(Some(PathBuf::from("custom.json")));
        assert_eq!(path, PathBuf::from("custom.json"));
    }
}
