//! The unit of identity, deduplication and notification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::item::Item;
use super::offer::PrimeOffer;

/// A prime offer paired with its detailed item.
///
/// Keyed by `item.id`: two prime offers resolving to the same item are the
/// same journey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneyInfo {
    pub prime_offer: PrimeOffer,
    pub item: Item,
}

impl JourneyInfo {
    pub fn new(prime_offer: PrimeOffer, item: Item) -> Self {
        Self { prime_offer, item }
    }

    /// Deduplication key.
    pub fn key(&self) -> &str {
        &self.item.id
    }

    pub fn game_title(&self) -> &str {
        self.item.game_title()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.item.is_expired(now)
    }
}
