//! In-memory seen-set for testing and short-lived runs.

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::RwLock;

use crate::error::StoreResult;
use crate::traits::store::SeenStore;
use crate::types::journey::JourneyInfo;

/// In-memory seen-set.
///
/// Useful for testing and development. Not suitable for production
/// as every offer is surfaced again after a restart.
#[derive(Default)]
pub struct MemoryStore {
    items: RwLock<IndexMap<String, JourneyInfo>>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with journeys.
    pub fn with_items(items: impl IntoIterator<Item = JourneyInfo>) -> Self {
        let mut map = IndexMap::new();
        for info in items {
            map.entry(info.key().to_string()).or_insert(info);
        }
        Self {
            items: RwLock::new(map),
        }
    }

    /// Clear all stored data.
    pub async fn clear(&self) {
        self.items.write().await.clear();
    }
}

#[async_trait]
impl SeenStore for MemoryStore {
    async fn add(&self, info: &JourneyInfo) -> StoreResult<bool> {
        let mut items = self.items.write().await;
        if items.contains_key(info.key()) {
            return Ok(false);
        }
        items.insert(info.key().to_string(), info.clone());
        Ok(true)
    }

    async fn remove(&self, info: &JourneyInfo) -> StoreResult<bool> {
        Ok(self.items.write().await.shift_remove(info.key()).is_some())
    }

    async fn contains(&self, info: &JourneyInfo) -> StoreResult<bool> {
        Ok(self.items.read().await.contains_key(info.key()))
    }

    async fn all(&self) -> StoreResult<Vec<JourneyInfo>> {
        Ok(self.items.read().await.values().cloned().collect())
    }

    async fn len(&self) -> StoreResult<usize> {
        Ok(self.items.read().await.len())
    }
}
