//! Configuration types for scraping, discovery and scheduling.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default landing page that issues the offer feed query.
pub const DEFAULT_LANDING_URL: &str = "https://gaming.amazon.com/home";

/// URL prefix of the GraphQL endpoint the page talks to.
pub const DEFAULT_GRAPHQL_URL_PREFIX: &str = "https://gaming.amazon.com/graphql?";

/// Operation-name prefix of the offer feed query.
pub const DEFAULT_OFFERS_OPERATION_PREFIX: &str = "OffersContext_Offers";

/// Exact operation name of the item detail query.
pub const DEFAULT_DETAIL_OPERATION: &str = "OfferDetail_Item";

/// Luna offers share the feed but are an unrelated product line.
pub const DEFAULT_EXCLUDED_URL_PREFIX: &str = "https://www.amazon.com/luna";

/// Configuration for the scraping client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Page that issues the offer feed query on load.
    pub landing_url: String,

    /// Only responses whose URL starts with this prefix are inspected.
    pub graphql_url_prefix: String,

    /// Offer feed operation names start with this prefix.
    pub offers_operation_prefix: String,

    /// Item detail operation name (exact match).
    pub detail_operation: String,

    /// Bounded wait for the offer feed response, in seconds.
    ///
    /// Default: 30.
    pub offers_timeout_secs: u64,

    /// Bounded wait for an item detail response, in seconds.
    ///
    /// Default: 10.
    pub detail_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            landing_url: DEFAULT_LANDING_URL.to_string(),
            graphql_url_prefix: DEFAULT_GRAPHQL_URL_PREFIX.to_string(),
            offers_operation_prefix: DEFAULT_OFFERS_OPERATION_PREFIX.to_string(),
            detail_operation: DEFAULT_DETAIL_OPERATION.to_string(),
            offers_timeout_secs: 30,
            detail_timeout_secs: 10,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offers_timeout(&self) -> Duration {
        Duration::from_secs(self.offers_timeout_secs)
    }

    pub fn detail_timeout(&self) -> Duration {
        Duration::from_secs(self.detail_timeout_secs)
    }

    /// Set the landing page URL.
    pub fn with_landing_url(mut self, url: impl Into<String>) -> Self {
        self.landing_url = url.into();
        self
    }

    /// Set the detail operation name.
    pub fn with_detail_operation(mut self, operation: impl Into<String>) -> Self {
        self.detail_operation = operation.into();
        self
    }
}

/// Configuration for the offer correlator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// External URLs under these prefixes are skipped.
    pub excluded_url_prefixes: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            excluded_url_prefixes: vec![DEFAULT_EXCLUDED_URL_PREFIX.to_string()],
        }
    }
}

impl DiscoveryConfig {
    /// Exclude an additional URL prefix.
    pub fn exclude_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.excluded_url_prefixes.push(prefix.into());
        self
    }

    pub fn is_excluded(&self, url: &str) -> bool {
        self.excluded_url_prefixes
            .iter()
            .any(|prefix| url.starts_with(prefix.as_str()))
    }
}

/// Configuration for the watchdog scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchdogConfig {
    /// Delay between the end of one cycle and the start of the next.
    ///
    /// Default: 60 minutes.
    pub interval: Duration,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60 * 60),
        }
    }
}

impl WatchdogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Polling interval in whole minutes. Saturates instead of overflowing.
    pub fn with_interval_minutes(mut self, minutes: u64) -> Self {
        self.interval = Duration::from_secs(minutes.saturating_mul(60));
        self
    }

    /// Polling interval as an arbitrary duration.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_minutes_saturates() {
        let config = WatchdogConfig::new().with_interval_minutes(307_445_734_561_825_861);
        assert_eq!(config.interval, Duration::from_secs(u64::MAX));
        assert_eq!(
            WatchdogConfig::new().with_interval_minutes(15).interval,
            Duration::from_secs(900)
        );
    }

    #[test]
    fn test_defaults() {
        let client = ClientConfig::default();
        assert_eq!(client.detail_timeout(), Duration::from_secs(10));
        assert_eq!(client.offers_operation_prefix, "OffersContext_Offers");

        assert_eq!(WatchdogConfig::default().interval, Duration::from_secs(3600));
    }

    #[test]
    fn test_luna_excluded_by_default() {
        let discovery = DiscoveryConfig::default();
        assert!(discovery.is_excluded("https://www.amazon.com/luna/game/1"));
        assert!(!discovery.is_excluded("https://gaming.amazon.com/dp/1"));
    }

    #[test]
    fn test_partial_client_override() {
        let client: ClientConfig =
            serde_json::from_str(r#"{"detail_timeout_secs": 3}"#).unwrap();
        assert_eq!(client.detail_timeout(), Duration::from_secs(3));
        assert_eq!(client.landing_url, DEFAULT_LANDING_URL);
    }
}
