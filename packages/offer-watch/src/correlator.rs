//! Offer correlator: turns the raw offer feed into detailed journeys.
//!
//! ```text
//! offer feed ─► external only ─► not excluded ─► item detail ─► not expired ─► by item id
//!                                                   │
//!                                                   └─ timeout: skip offer
//! ```

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{error, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::client::ScrapingClient;
use crate::error::ClientResult;
use crate::traits::browser::Browser;
use crate::types::{config::DiscoveryConfig, journey::JourneyInfo};

/// Resolves the offer feed into deduplicated, eligible journeys.
///
/// Read-only: the only side effects are the client's page operations.
pub struct OfferCorrelator<B: Browser> {
    client: ScrapingClient<B>,
    config: DiscoveryConfig,
    clock: Arc<dyn Clock>,
}

impl<B: Browser> OfferCorrelator<B> {
    /// Create a correlator with the default exclusions and the wall clock.
    pub fn new(client: ScrapingClient<B>) -> Self {
        Self {
            client,
            config: DiscoveryConfig::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Set the discovery configuration.
    pub fn with_config(mut self, config: DiscoveryConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the clock used for expiry checks.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn client(&self) -> &ScrapingClient<B> {
        &self.client
    }

    /// Discover the currently available journeys, in feed order.
    ///
    /// A detail-fetch timeout skips that offer. Any other error aborts
    /// discovery.
    pub async fn discover(&self) -> ClientResult<Vec<JourneyInfo>> {
        let offers = self.client.fetch_top_level_offers().await?;
        info!(count = offers.len(), "Fetched offer feed");

        let mut journeys: IndexMap<String, JourneyInfo> = IndexMap::new();
        for offer in offers {
            if !offer.is_external() {
                info!(
                    offer_id = %offer.id,
                    title = %offer.title,
                    delivery_method = %offer.delivery_method,
                    "Ignoring non external offer"
                );
                continue;
            }

            let Some(url) = offer.external_url() else {
                warn!(offer_id = %offer.id, title = %offer.title, "External offer has no URL");
                continue;
            };

            if self.config.is_excluded(url) {
                info!(offer_id = %offer.id, title = %offer.title, url, "Ignoring excluded offer");
                continue;
            }

            let item = match self.client.fetch_item_detail(&offer).await {
                Ok(item) => item,
                Err(e) if e.is_timeout() => {
                    error!(offer_id = %offer.id, url, error = %e, "Timeout when getting item detail");
                    continue;
                }
                Err(e) => return Err(e),
            };

            if item.is_expired(self.clock.now()) {
                info!(offer_id = %offer.id, item_id = %item.id, "Ignoring expired item");
                continue;
            }

            // Last write wins; position of the first occurrence is kept
            journeys.insert(item.id.clone(), JourneyInfo::new(offer, item));
        }

        Ok(journeys.into_values().collect())
    }
}
