//! Broadcast bus carrying each cycle's batch of new offers.
//!
//! # Guarantees
//!
//! - **Fire-and-forget**: `emit` never waits on subscribers
//! - **In-memory only**: batches are not persisted
//! - **No replay**: subscribers only see batches emitted after subscribing,
//!   and lagged subscribers skip what they missed
//!
//! Notifier backends are attached with [`spawn_notifier`], which runs each
//! backend in its own task so a slow or failing backend cannot hold up the
//! watchdog.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::traits::notifier::Notifier;
use crate::types::journey::JourneyInfo;

/// Default channel capacity for the bus.
const DEFAULT_CAPACITY: usize = 64;

/// The journeys surfaced by one watchdog cycle. May be empty.
#[derive(Debug, Clone)]
pub struct OfferBatch {
    /// Cycle number, starting at 1
    pub cycle: u64,

    /// When the cycle finished discovery
    pub discovered_at: DateTime<Utc>,

    /// New journeys, in discovery order
    pub offers: Arc<Vec<JourneyInfo>>,
}

impl OfferBatch {
    pub fn new(cycle: u64, offers: Vec<JourneyInfo>) -> Self {
        Self {
            cycle,
            discovered_at: Utc::now(),
            offers: Arc::new(offers),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.offers.len()
    }
}

/// Broadcast bus for offer batches.
///
/// Clones share the same channel.
#[derive(Clone)]
pub struct OfferBus {
    sender: broadcast::Sender<OfferBatch>,
}

impl OfferBus {
    /// Create a new bus with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new bus with the specified capacity.
    ///
    /// The capacity determines how many batches can be buffered before
    /// slow subscribers start lagging.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit a batch to all subscribers.
    ///
    /// Returns the number of subscribers that received it.
    pub fn emit(&self, batch: OfferBatch) -> usize {
        self.sender.send(batch).unwrap_or(0)
    }

    /// Subscribe to batches emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<OfferBatch> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for OfferBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OfferBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfferBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// Feed every batch on `bus` to `notifier` from a dedicated task.
///
/// The subscription is taken before this returns, so no batch emitted
/// afterwards is missed. The task ends when every bus handle is dropped.
pub fn spawn_notifier<N>(bus: &OfferBus, notifier: N) -> JoinHandle<()>
where
    N: Notifier + 'static,
{
    let mut receiver = bus.subscribe();
    tokio::spawn(async move {
        let name = notifier.name().to_string();
        info!(notifier = %name, "Notifier subscribed");

        loop {
            match receiver.recv().await {
                Ok(batch) => {
                    debug!(notifier = %name, cycle = batch.cycle, count = batch.len(), "Delivering batch");
                    if let Err(e) = notifier.on_update(&batch.offers).await {
                        error!(notifier = %name, cycle = batch.cycle, error = %e, "Notifier failed");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(notifier = %name, skipped, "Notifier lagged, batches dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!(notifier = %name, "Offer bus closed, notifier stopping");
                    break;
                }
            }
        }
    })
}
