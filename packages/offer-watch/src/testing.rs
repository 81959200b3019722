//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the watcher without
//! driving a real browser or sending real notifications.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::StreamExt;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::{mpsc, Notify};

use crate::clock::Clock;
use crate::error::{BrowserError, BrowserResult, NotifyError};
use crate::traits::{
    browser::{Browser, InterceptedResponse, Page, ResponseStream},
    notifier::Notifier,
};
use crate::types::{
    config::{DEFAULT_DETAIL_OPERATION, DEFAULT_LANDING_URL},
    item::{Item, ItemOffer},
    journey::JourneyInfo,
    offer::PrimeOffer,
};

/// GraphQL endpoint URL used by the canned responses.
pub const GRAPHQL_URL: &str = "https://gaming.amazon.com/graphql?nonce=test";

/// Operation name used by canned offer feed responses.
pub const FEED_OPERATION: &str = "OffersContext_Offers_And_Items";

/// A GraphQL response for the given operation with a raw JSON body.
pub fn graphql_response(operation: &str, body: impl Into<String>) -> InterceptedResponse {
    InterceptedResponse::new(GRAPHQL_URL, body).with_post_data(
        serde_json::json!({ "operationName": operation, "query": "query { ... }" }).to_string(),
    )
}

/// An offer feed response listing the given offers.
pub fn feed_response(offers: &[PrimeOffer]) -> InterceptedResponse {
    let body = serde_json::json!({ "data": { "primeOffers": offers } });
    graphql_response(FEED_OPERATION, body.to_string())
}

/// An item detail response for the given item.
pub fn detail_response(item: &Item) -> InterceptedResponse {
    let body = serde_json::json!({ "data": { "item": item } });
    graphql_response(DEFAULT_DETAIL_OPERATION, body.to_string())
}

/// An external offer whose claim page is `https://gaming.amazon.com/dp/<id>`.
pub fn external_offer(id: &str) -> PrimeOffer {
    PrimeOffer::external(
        id,
        format!("Offer {}", id),
        format!("https://gaming.amazon.com/dp/{}", id),
    )
}

/// An item with a single sub-offer ending at `end`.
pub fn item_ending(id: &str, game_title: &str, end: DateTime<Utc>) -> Item {
    Item::new(id, game_title).with_offer(ItemOffer::new(format!("{}-offer", id)).ending_at(end))
}

/// A journey whose only sub-offer ends `ends_in` from now.
pub fn journey(item_id: &str, game_title: &str, ends_in: Duration) -> JourneyInfo {
    JourneyInfo::new(
        external_offer(&format!("offer-{}", item_id)),
        item_ending(item_id, game_title, Utc::now() + ends_in),
    )
}

#[derive(Default)]
struct MockBrowserState {
    /// Responses replayed on navigation, by URL
    routes: RwLock<HashMap<String, Vec<InterceptedResponse>>>,

    /// Navigation failures by URL
    failures: RwLock<HashMap<String, String>>,

    /// URLs whose navigation never completes
    stalls: RwLock<HashSet<String>>,

    /// Every URL navigated to, in order
    navigations: RwLock<Vec<String>>,

    opened: AtomicUsize,
    closed: AtomicUsize,
}

/// A scripted in-memory browser.
///
/// Navigating to a URL replays the responses registered for it. URLs with
/// no registered responses stay silent, so waits on them time out. Clones
/// share state, which lets tests keep a handle for assertions.
#[derive(Clone, Default)]
pub struct MockBrowser {
    state: Arc<MockBrowserState>,
}

impl MockBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replay `response` when navigating to `url` (builder pattern).
    pub fn with_response(self, url: impl Into<String>, response: InterceptedResponse) -> Self {
        self.add_response(url, response);
        self
    }

    /// Serve `offers` as the offer feed on the default landing page.
    pub fn with_feed(self, offers: &[PrimeOffer]) -> Self {
        self.set_feed(offers);
        self
    }

    /// Serve `item` as the detail behind `offer`'s claim page.
    pub fn with_detail(self, offer: &PrimeOffer, item: &Item) -> Self {
        self.set_detail(offer, item);
        self
    }

    /// Fail navigation to `url` (builder pattern).
    pub fn with_navigation_failure(self, url: impl Into<String>) -> Self {
        self.state
            .failures
            .write()
            .unwrap()
            .insert(url.into(), "net::ERR_CONNECTION_RESET".to_string());
        self
    }

    /// Never complete navigation to `url` (builder pattern).
    pub fn with_stalled_navigation(self, url: impl Into<String>) -> Self {
        self.state.stalls.write().unwrap().insert(url.into());
        self
    }

    pub fn add_response(&self, url: impl Into<String>, response: InterceptedResponse) {
        self.state
            .routes
            .write()
            .unwrap()
            .entry(url.into())
            .or_default()
            .push(response);
    }

    /// Replace the offer feed.
    pub fn set_feed(&self, offers: &[PrimeOffer]) {
        self.state
            .routes
            .write()
            .unwrap()
            .insert(DEFAULT_LANDING_URL.to_string(), vec![feed_response(offers)]);
    }

    /// Replace the detail behind an offer's claim page.
    pub fn set_detail(&self, offer: &PrimeOffer, item: &Item) {
        if let Some(url) = offer.external_url() {
            self.state
                .routes
                .write()
                .unwrap()
                .insert(url.to_string(), vec![detail_response(item)]);
        }
    }

    /// Make navigation to `url` silent again.
    pub fn clear_responses(&self, url: &str) {
        self.state.routes.write().unwrap().remove(url);
    }

    pub fn pages_opened(&self) -> usize {
        self.state.opened.load(Ordering::SeqCst)
    }

    pub fn pages_closed(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }

    /// Pages opened but not yet closed.
    pub fn open_pages(&self) -> usize {
        self.pages_opened() - self.pages_closed()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.navigations.read().unwrap().clone()
    }
}

#[async_trait]
impl Browser for MockBrowser {
    async fn new_page(&self) -> BrowserResult<Box<dyn Page>> {
        self.state.opened.fetch_add(1, Ordering::SeqCst);
        let (sender, receiver) = mpsc::unbounded_channel();
        Ok(Box::new(MockPage {
            state: self.state.clone(),
            sender,
            receiver: Mutex::new(Some(receiver)),
            closed: AtomicBool::new(false),
        }))
    }
}

struct MockPage {
    state: Arc<MockBrowserState>,
    sender: mpsc::UnboundedSender<InterceptedResponse>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<InterceptedResponse>>>,
    closed: AtomicBool,
}

#[async_trait]
impl Page for MockPage {
    async fn responses(&self) -> BrowserResult<ResponseStream> {
        let receiver = self
            .receiver
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| BrowserError::Protocol("responses already subscribed".into()))?;

        Ok(futures::stream::unfold(receiver, |mut receiver| async move {
            receiver.recv().await.map(|response| (response, receiver))
        })
        .boxed())
    }

    async fn goto(&self, url: &str) -> BrowserResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BrowserError::PageClosed);
        }

        self.state.navigations.write().unwrap().push(url.to_string());

        let stalled = self.state.stalls.read().unwrap().contains(url);
        if stalled {
            futures::future::pending::<()>().await;
        }

        if let Some(reason) = self.state.failures.read().unwrap().get(url) {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: reason.clone(),
            });
        }

        let responses = self
            .state
            .routes
            .read()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_default();
        for response in responses {
            let _ = self.sender.send(response);
        }
        Ok(())
    }

    async fn close(&self) -> BrowserResult<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.state.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// A clock that only moves when told to.
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<RwLock<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(RwLock::new(now)),
        }
    }

    /// Start at the current wall-clock time.
    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write().unwrap() = now;
    }

    pub fn advance(&self, by: Duration) {
        *self.now.write().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap()
    }
}

/// A notifier that records every batch it receives.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    batches: Arc<Mutex<Vec<Vec<JourneyInfo>>>>,
    received: Arc<Notify>,
    fail: Arc<AtomicBool>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record batches but report failure for each (builder pattern).
    pub fn failing(self) -> Self {
        self.fail.store(true, Ordering::SeqCst);
        self
    }

    pub fn batches(&self) -> Vec<Vec<JourneyInfo>> {
        self.batches.lock().unwrap().clone()
    }

    /// Wait until at least `count` batches have been recorded.
    pub async fn wait_for_batches(&self, count: usize) {
        loop {
            if self.batches.lock().unwrap().len() >= count {
                return;
            }
            self.received.notified().await;
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn on_update(&self, offers: &[JourneyInfo]) -> Result<(), NotifyError> {
        self.batches.lock().unwrap().push(offers.to_vec());
        self.received.notify_one();

        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::new(self.name(), "webhook rejected the message"));
        }
        Ok(())
    }
}
