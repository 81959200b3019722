//! Watchdog: runs the discovery pipeline on a fixed interval.
//!
//! # Architecture
//!
//! ```text
//! start()
//!   └─► loop task
//!         ├─► cycle: prune expired ─► discover ─► unseen + filter ─► store.add ─► bus.emit
//!         ├─► cycle error: log, emit nothing
//!         └─► sleep(interval) ◄── stop() cancels here, never mid-cycle
//! ```
//!
//! Cycles never overlap: the next sleep is armed only after the previous
//! cycle has finished, whether it succeeded or failed.
//!
//! Accepted journeys are persisted as soon as they are accepted, before the
//! batch is emitted. A cycle that fails halfway keeps what it already stored
//! and emits nothing, so a journey may be recorded as seen without ever
//! having been delivered. It is never delivered twice.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, Instrument};

use crate::clock::{Clock, SystemClock};
use crate::correlator::OfferCorrelator;
use crate::error::WatchResult;
use crate::events::{OfferBatch, OfferBus};
use crate::traits::{
    browser::Browser,
    filter::{AcceptAll, OfferFilter},
    store::SeenStore,
};
use crate::types::{config::WatchdogConfig, journey::JourneyInfo};

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogState {
    /// Never started
    Idle,

    /// A cycle is in flight
    Running,

    /// Waiting for the next cycle
    Armed,

    /// Loop exited after `stop()`
    Stopped,
}

struct Inner<B: Browser, S: SeenStore> {
    correlator: OfferCorrelator<B>,
    store: S,
    filter: Arc<dyn OfferFilter>,
    bus: OfferBus,
    config: WatchdogConfig,
    clock: Arc<dyn Clock>,
    cycles: AtomicU64,
    /// Serializes cycles, including ones run by hand
    cycle_lock: tokio::sync::Mutex<()>,
    state: watch::Sender<WatchdogState>,
}

struct LoopControl {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Periodically discovers offers and emits the ones not seen before.
pub struct Watchdog<B: Browser + 'static, S: SeenStore + 'static> {
    inner: Arc<Inner<B, S>>,
    control: Mutex<Option<LoopControl>>,
}

/// Builder for [`Watchdog`].
///
/// Defaults: accept-all filter, a fresh bus, a 60 minute interval and the
/// wall clock.
pub struct WatchdogBuilder<B: Browser, S: SeenStore> {
    correlator: OfferCorrelator<B>,
    store: S,
    filter: Arc<dyn OfferFilter>,
    bus: OfferBus,
    config: WatchdogConfig,
    clock: Arc<dyn Clock>,
}

impl<B: Browser + 'static, S: SeenStore + 'static> WatchdogBuilder<B, S> {
    /// Set the acceptance filter.
    pub fn filter(mut self, filter: impl OfferFilter + 'static) -> Self {
        self.filter = Arc::new(filter);
        self
    }

    /// Emit batches on an existing bus.
    pub fn bus(mut self, bus: OfferBus) -> Self {
        self.bus = bus;
        self
    }

    /// Set the scheduler configuration.
    pub fn config(mut self, config: WatchdogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the clock used for expiry, for both pruning and discovery.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> Watchdog<B, S> {
        let (state, _) = watch::channel(WatchdogState::Idle);
        let correlator = self.correlator.with_clock(self.clock.clone());

        Watchdog {
            inner: Arc::new(Inner {
                correlator,
                store: self.store,
                filter: self.filter,
                bus: self.bus,
                config: self.config,
                clock: self.clock,
                cycles: AtomicU64::new(0),
                cycle_lock: tokio::sync::Mutex::new(()),
                state,
            }),
            control: Mutex::new(None),
        }
    }
}

impl<B: Browser + 'static, S: SeenStore + 'static> Watchdog<B, S> {
    /// Create a watchdog with default filter, bus, interval and clock.
    pub fn new(correlator: OfferCorrelator<B>, store: S) -> Self {
        Self::builder(correlator, store).build()
    }

    pub fn builder(correlator: OfferCorrelator<B>, store: S) -> WatchdogBuilder<B, S> {
        WatchdogBuilder {
            correlator,
            store,
            filter: Arc::new(AcceptAll),
            bus: OfferBus::new(),
            config: WatchdogConfig::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Bus that receives one batch per successful cycle.
    pub fn bus(&self) -> &OfferBus {
        &self.inner.bus
    }

    pub fn store(&self) -> &S {
        &self.inner.store
    }

    pub fn state(&self) -> WatchdogState {
        *self.inner.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<WatchdogState> {
        self.inner.state.subscribe()
    }

    /// Number of cycles started so far.
    pub fn cycles(&self) -> u64 {
        self.inner.cycles.load(Ordering::SeqCst)
    }

    /// Start the cycle loop on the current tokio runtime.
    ///
    /// The first cycle runs immediately. Returns `false` without doing
    /// anything if a loop is running and has not been stopped.
    ///
    /// After `stop()` a new loop may be started right away. It waits for
    /// the old loop to exit, including any in-flight cycle, before running
    /// its first cycle.
    pub fn start(&self) -> bool {
        let mut control = self.control.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = control.as_ref() {
            if !existing.handle.is_finished() && !existing.token.is_cancelled() {
                debug!("Watchdog already running");
                return false;
            }
        }

        let previous = control.take().map(|existing| existing.handle);
        let token = CancellationToken::new();
        let inner = self.inner.clone();
        let loop_token = token.clone();

        let handle = tokio::spawn(async move {
            if let Some(previous) = previous {
                if let Err(e) = previous.await {
                    error!(error = %e, "Previous watchdog loop failed");
                }
            }
            run_loop(inner, loop_token).await;
        });
        *control = Some(LoopControl { token, handle });
        true
    }

    /// Cancel the armed timer. An in-flight cycle runs to completion.
    pub fn stop(&self) {
        let control = self.control.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = control.as_ref() {
            existing.token.cancel();
        }
    }

    /// Stop and wait for the loop to exit.
    pub async fn shutdown(&self) {
        let control = self
            .control
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(LoopControl { token, handle }) = control {
            token.cancel();
            if let Err(e) = handle.await {
                error!(error = %e, "Watchdog loop task failed");
            }
        }
    }

    /// Run a single cycle now and return the newly accepted journeys.
    ///
    /// Waits for any cycle already in flight.
    pub async fn run_cycle(&self) -> WatchResult<Vec<JourneyInfo>> {
        self.inner.run_cycle().await
    }
}

impl<B: Browser + 'static, S: SeenStore + 'static> Drop for Watchdog<B, S> {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_loop<B, S>(inner: Arc<Inner<B, S>>, token: CancellationToken)
where
    B: Browser + 'static,
    S: SeenStore + 'static,
{
    let interval = inner.config.interval;

    loop {
        if let Err(e) = inner.run_cycle().await {
            error!(error = %e, "Offer check failed");
        }

        if token.is_cancelled() {
            break;
        }

        info!(?interval, "Checking again after interval");
        inner.state.send_replace(WatchdogState::Armed);

        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    info!("Watchdog stopped");
    inner.state.send_replace(WatchdogState::Stopped);
}

impl<B: Browser, S: SeenStore> Inner<B, S> {
    async fn run_cycle(&self) -> WatchResult<Vec<JourneyInfo>> {
        let _guard = self.cycle_lock.lock().await;
        let cycle = self.cycles.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_replace(WatchdogState::Running);

        self.cycle(cycle)
            .instrument(info_span!("cycle", cycle))
            .await
    }

    async fn cycle(&self, cycle: u64) -> WatchResult<Vec<JourneyInfo>> {
        let pruned = self.prune_expired().await?;
        if pruned > 0 {
            info!(pruned, "Removed expired offers");
        }

        info!("Fetching prime offers...");
        let discovered = self.correlator.discover().await?;
        info!(count = discovered.len(), "Found offers");

        let mut new_offers = Vec::new();
        for info in discovered {
            if self.store.contains(&info).await? {
                continue;
            }

            if !self.filter.accept(&info) {
                info!(item_id = %info.key(), title = %info.game_title(), "Offer rejected by filter");
                continue;
            }

            if self.store.add(&info).await? {
                new_offers.push(info);
            }
        }
        info!(count = new_offers.len(), "Found new offers");

        let receivers = self.bus.emit(OfferBatch::new(cycle, new_offers.clone()));
        debug!(receivers, "Emitted offer batch");

        Ok(new_offers)
    }

    /// Remove every stored journey whose item has expired.
    async fn prune_expired(&self) -> WatchResult<usize> {
        let now = self.clock.now();
        let mut pruned = 0;

        for info in self.store.all().await? {
            if info.is_expired(now) && self.store.remove(&info).await? {
                debug!(item_id = %info.key(), title = %info.game_title(), "Pruned expired offer");
                pruned += 1;
            }
        }
        Ok(pruned)
    }
}
