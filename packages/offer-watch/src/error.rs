//! Typed errors for the offer watcher.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can tell
//! a recoverable per-offer timeout apart from everything else.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors raised by a browser capability implementation.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// Navigation to a URL failed
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// The page was already closed
    #[error("page already closed")]
    PageClosed,

    /// Driver or protocol level failure
    #[error("browser protocol error: {0}")]
    Protocol(String),
}

/// Errors that can occur while scraping offer data.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No matching response arrived within the bounded wait
    #[error("timed out after {waited:?} waiting for {operation} on {url}")]
    Timeout {
        operation: String,
        url: String,
        waited: Duration,
    },

    /// Browser capability failed
    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),

    /// Response body did not match the expected record shape
    #[error("malformed {operation} payload: {source}")]
    MalformedPayload {
        operation: String,
        #[source]
        source: serde_json::Error,
    },

    /// The page stopped producing responses before a match arrived
    #[error("response stream closed before {operation} arrived")]
    ResponseStreamClosed { operation: String },

    /// External offer without a claim URL
    #[error("offer {offer_id} has no external URL")]
    MissingExternalUrl { offer_id: String },
}

impl ClientError {
    /// Whether this is the recoverable detail-fetch timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Timeout { .. })
    }
}

/// Errors from a seen-set store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem operation failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Persisted document could not be parsed
    #[error("corrupt store document {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Document could not be serialized
    #[error("failed to serialize store document: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors that abort a single watchdog cycle.
#[derive(Debug, Error)]
pub enum WatchError {
    /// Discovery failed
    #[error("discovery failed: {0}")]
    Client(#[from] ClientError),

    /// Seen-set store failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors loading the application configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Error returned by a notifier backend.
#[derive(Debug, Error)]
#[error("notifier {notifier} failed: {source}")]
pub struct NotifyError {
    pub notifier: String,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl NotifyError {
    pub fn new(
        notifier: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            notifier: notifier.into(),
            source: source.into(),
        }
    }
}

/// Result type alias for browser operations.
pub type BrowserResult<T> = std::result::Result<T, BrowserError>;

/// Result type alias for scraping operations.
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for watchdog cycles.
pub type WatchResult<T> = std::result::Result<T, WatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_distinct() {
        let timeout = ClientError::Timeout {
            operation: "OfferDetail_Item".into(),
            url: "https://example.com".into(),
            waited: Duration::from_secs(10),
        };
        assert!(timeout.is_timeout());

        let closed = ClientError::ResponseStreamClosed {
            operation: "OfferDetail_Item".into(),
        };
        assert!(!closed.is_timeout());

        let browser = ClientError::from(BrowserError::PageClosed);
        assert!(!browser.is_timeout());
    }

    #[test]
    fn test_watch_error_wraps_sources() {
        let err = WatchError::from(ClientError::MissingExternalUrl {
            offer_id: "abc".into(),
        });
        assert!(err.to_string().contains("abc"));
    }
}
