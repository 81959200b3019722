//! Seen-set storage trait.

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::types::journey::JourneyInfo;

/// Durable record of which journeys have already been surfaced.
///
/// Every operation is keyed by `item.id`. Entries are write-once: adding an
/// existing key leaves the stored record untouched.
#[async_trait]
pub trait SeenStore: Send + Sync {
    /// Insert a journey. Returns `true` if it was not already present.
    async fn add(&self, info: &JourneyInfo) -> StoreResult<bool>;

    /// Remove a journey. Returns `true` if an entry was removed.
    async fn remove(&self, info: &JourneyInfo) -> StoreResult<bool>;

    /// Check whether a journey with the same key is stored.
    async fn contains(&self, info: &JourneyInfo) -> StoreResult<bool>;

    /// All stored journeys, in insertion order.
    async fn all(&self) -> StoreResult<Vec<JourneyInfo>>;

    /// Number of stored journeys.
    async fn len(&self) -> StoreResult<usize> {
        Ok(self.all().await?.len())
    }
}

#[async_trait]
impl<S: SeenStore + ?Sized> SeenStore for std::sync::Arc<S> {
    async fn add(&self, info: &JourneyInfo) -> StoreResult<bool> {
        (**self).add(info).await
    }

    async fn remove(&self, info: &JourneyInfo) -> StoreResult<bool> {
        (**self).remove(info).await
    }

    async fn contains(&self, info: &JourneyInfo) -> StoreResult<bool> {
        (**self).contains(info).await
    }

    async fn all(&self) -> StoreResult<Vec<JourneyInfo>> {
        (**self).all().await
    }

    async fn len(&self) -> StoreResult<usize> {
        (**self).len().await
    }
}
