//! Prime Gaming Offer Watcher
//!
//! Periodically discovers promotional offers by observing the GraphQL
//! traffic of a browser page, deduplicates them against a persistent
//! seen-set, and broadcasts each cycle's new offers to notifier backends.
//!
//! # Pipeline
//!
//! ```text
//! Watchdog tick
//!   └─► OfferCorrelator::discover (via ScrapingClient + Browser)
//!         └─► prune expired ─► unseen ─► OfferFilter ─► SeenStore::add
//!               └─► OfferBus::emit(OfferBatch) ─► spawn_notifier tasks
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use offer_watch::{
//!     spawn_notifier, AppConfig, JsonFileStore, OfferCorrelator, ScrapingClient, Watchdog,
//! };
//!
//! let config = AppConfig::load("config.json")?;
//! let client = ScrapingClient::with_config(browser, config.client.clone());
//! let correlator = OfferCorrelator::new(client).with_config(config.discovery.clone());
//! let store = JsonFileStore::open(&config.watchdog.store_path).await?;
//!
//! let watchdog = Watchdog::builder(correlator, store)
//!     .filter(config.filter())
//!     .config(config.watchdog_config())
//!     .build();
//! spawn_notifier(watchdog.bus(), my_webhook_notifier);
//! watchdog.start();
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Seams provided by the application (Browser, SeenStore, OfferFilter, Notifier)
//! - [`types`] - Offer record model and configuration
//! - [`client`] - Response-observing scraping client
//! - [`correlator`] - Offer feed to journey resolution
//! - [`stores`] - Seen-set backends (MemoryStore, JsonFileStore)
//! - [`watchdog`] - Scheduler
//! - [`events`] - Batch broadcast and notifier fan-out
//! - [`testing`] - Mock implementations for testing

pub mod client;
pub mod clock;
pub mod config;
pub mod correlator;
pub mod error;
pub mod events;
pub mod stores;
pub mod telemetry;
pub mod testing;
pub mod traits;
pub mod types;
pub mod watchdog;

// Re-export core types at crate root
pub use client::ScrapingClient;
pub use clock::{Clock, SystemClock};
pub use config::AppConfig;
pub use correlator::OfferCorrelator;
pub use error::{
    BrowserError, ClientError, ConfigError, NotifyError, StoreError, WatchError,
};
pub use events::{spawn_notifier, OfferBatch, OfferBus};
pub use stores::{JsonFileStore, MemoryStore};
pub use traits::{
    browser::{Browser, InterceptedResponse, Page, ResponseStream},
    filter::{AcceptAll, OfferFilter, TitleBlacklist},
    notifier::Notifier,
    store::SeenStore,
};
pub use types::{
    config::{ClientConfig, DiscoveryConfig, WatchdogConfig},
    item::{Game, GameAssets, Item, ItemOffer, RewardItem},
    journey::JourneyInfo,
    offer::{DeliveryMethod, PrimeOffer},
};
pub use watchdog::{Watchdog, WatchdogBuilder, WatchdogState};
