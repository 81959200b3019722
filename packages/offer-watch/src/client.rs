//! Scraping client that rides along with the page's own GraphQL traffic.
//!
//! The remote API is never called directly. Each fetch opens a page,
//! navigates, and waits for the first response to a query recognised by its
//! declared operation name, which is the only identifier that stays stable
//! across markup and query-shape changes.
//!
//! ```text
//! new_page ─► subscribe ─► goto(url) ─► first matching response ─► parse
//!    │                                                              │
//!    └──────────────────────── close (every path) ◄─────────────────┘
//! ```

use std::time::Duration;

use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};
use crate::traits::browser::{Browser, InterceptedResponse, Page};
use crate::types::{config::ClientConfig, item::Item, offer::PrimeOffer};

/// How a request's operation name is recognised.
#[derive(Debug, Clone, Copy)]
pub enum OperationMatch<'a> {
    /// Operation name starts with the given prefix
    Prefix(&'a str),

    /// Operation name equals the given name
    Exact(&'a str),
}

impl OperationMatch<'_> {
    fn label(&self) -> &str {
        match self {
            OperationMatch::Prefix(name) | OperationMatch::Exact(name) => name,
        }
    }

    fn matches_name(&self, operation_name: &str) -> bool {
        match self {
            OperationMatch::Prefix(prefix) => operation_name.starts_with(prefix),
            OperationMatch::Exact(name) => operation_name == *name,
        }
    }

    /// Whether any operation declared in the request body matches.
    pub fn matches_post_data(&self, post_data: Option<&str>) -> bool {
        post_data
            .map(operation_names)
            .unwrap_or_default()
            .iter()
            .any(|name| self.matches_name(name))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphqlRequest {
    #[serde(default)]
    operation_name: Option<String>,
}

/// Single request or a batch in one POST body.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GraphqlRequestBody {
    Single(GraphqlRequest),
    Batch(Vec<GraphqlRequest>),
}

/// Operation names declared in a GraphQL request body.
///
/// Bodies that are not GraphQL JSON declare no operations.
pub fn operation_names(post_data: &str) -> Vec<String> {
    match serde_json::from_str::<GraphqlRequestBody>(post_data) {
        Ok(GraphqlRequestBody::Single(request)) => request.operation_name.into_iter().collect(),
        Ok(GraphqlRequestBody::Batch(requests)) => requests
            .into_iter()
            .filter_map(|request| request.operation_name)
            .collect(),
        Err(_) => vec![],
    }
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OffersData {
    prime_offers: Vec<PrimeOffer>,
}

#[derive(Debug, Deserialize)]
struct ItemData {
    item: Item,
}

/// Fetches offer data by observing a browser page's network responses.
///
/// Holds only shared references to the browser, so several fetches may run
/// concurrently on separate pages.
pub struct ScrapingClient<B: Browser> {
    browser: B,
    config: ClientConfig,
}

impl<B: Browser> ScrapingClient<B> {
    /// Create a client with the default configuration.
    pub fn new(browser: B) -> Self {
        Self::with_config(browser, ClientConfig::default())
    }

    /// Create with a custom configuration.
    pub fn with_config(browser: B, config: ClientConfig) -> Self {
        Self { browser, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn browser(&self) -> &B {
        &self.browser
    }

    /// Fetch the offer feed from the landing page.
    pub async fn fetch_top_level_offers(&self) -> ClientResult<Vec<PrimeOffer>> {
        let matcher = OperationMatch::Prefix(&self.config.offers_operation_prefix);
        let response = self
            .capture(
                &self.config.landing_url,
                matcher,
                self.config.offers_timeout(),
            )
            .await?;

        let payload: GraphqlResponse<OffersData> = parse_payload(&response, matcher)?;
        debug!(count = payload.data.prime_offers.len(), "Parsed offer feed");
        Ok(payload.data.prime_offers)
    }

    /// Fetch the detailed item behind an external offer.
    ///
    /// Fails with [`ClientError::Timeout`] if the detail query does not
    /// answer within the configured wait.
    pub async fn fetch_item_detail(&self, offer: &PrimeOffer) -> ClientResult<Item> {
        let url = offer
            .external_url()
            .ok_or_else(|| ClientError::MissingExternalUrl {
                offer_id: offer.id.clone(),
            })?;

        let matcher = OperationMatch::Exact(&self.config.detail_operation);
        let response = self
            .capture(url, matcher, self.config.detail_timeout())
            .await?;

        let payload: GraphqlResponse<ItemData> = parse_payload(&response, matcher)?;
        Ok(payload.data.item)
    }

    /// Open a page, wait for the matching response and close the page
    /// regardless of the outcome.
    async fn capture(
        &self,
        url: &str,
        matcher: OperationMatch<'_>,
        timeout: Duration,
    ) -> ClientResult<InterceptedResponse> {
        let page = self.browser.new_page().await?;

        let result = self
            .wait_for_response(page.as_ref(), url, matcher, timeout)
            .await;

        if let Err(e) = page.close().await {
            warn!(url, error = %e, "Failed to close page");
        }

        result
    }

    async fn wait_for_response(
        &self,
        page: &dyn Page,
        url: &str,
        matcher: OperationMatch<'_>,
        timeout: Duration,
    ) -> ClientResult<InterceptedResponse> {
        // Subscribe first: the query may complete while navigation is in flight
        let mut responses = page.responses().await?;

        // The wait covers navigation too; a stalled goto is a timeout
        let endpoint = self.config.graphql_url_prefix.as_str();
        let exchange = async {
            page.goto(url).await?;

            while let Some(response) = responses.next().await {
                if response.url().starts_with(endpoint)
                    && matcher.matches_post_data(response.post_data())
                {
                    return Ok(Some(response));
                }
            }
            Ok::<_, ClientError>(None)
        };

        match tokio::time::timeout(timeout, exchange).await {
            Ok(Ok(Some(response))) => Ok(response),
            Ok(Ok(None)) => Err(ClientError::ResponseStreamClosed {
                operation: matcher.label().to_string(),
            }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ClientError::Timeout {
                operation: matcher.label().to_string(),
                url: url.to_string(),
                waited: timeout,
            }),
        }
    }
}

fn parse_payload<T: DeserializeOwned>(
    response: &InterceptedResponse,
    matcher: OperationMatch<'_>,
) -> ClientResult<T> {
    response
        .json()
        .map_err(|source| ClientError::MalformedPayload {
            operation: matcher.label().to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BrowserError;
    use crate::testing::{
        detail_response, feed_response, graphql_response, MockBrowser, GRAPHQL_URL,
    };
    use crate::types::item::ItemOffer;
    use chrono::{Duration as ChronoDuration, Utc};

    const HOME: &str = "https://gaming.amazon.com/home";

    fn fast_config() -> ClientConfig {
        ClientConfig {
            offers_timeout_secs: 1,
            detail_timeout_secs: 1,
            ..ClientConfig::default()
        }
    }

    #[test]
    fn test_operation_names_single_and_batch() {
        assert_eq!(
            operation_names(r#"{"operationName": "OffersContext_Offers_And_Items", "query": "..."}"#),
            vec!["OffersContext_Offers_And_Items"]
        );
        assert_eq!(
            operation_names(r#"[{"operationName": "A"}, {"query": "{}"}, {"operationName": "B"}]"#),
            vec!["A", "B"]
        );
        assert!(operation_names("not json").is_empty());
        assert!(operation_names(r#"{"query": "{}"}"#).is_empty());
    }

    #[test]
    fn test_operation_match() {
        let prefix = OperationMatch::Prefix("OffersContext_Offers");
        assert!(prefix.matches_post_data(Some(r#"{"operationName": "OffersContext_Offers_And_Items"}"#)));
        assert!(!prefix.matches_post_data(Some(r#"{"operationName": "Other"}"#)));
        assert!(!prefix.matches_post_data(None));

        let exact = OperationMatch::Exact("OfferDetail_Item");
        assert!(exact.matches_post_data(Some(r#"{"operationName": "OfferDetail_Item"}"#)));
        assert!(!exact.matches_post_data(Some(r#"{"operationName": "OfferDetail_Item_Extra"}"#)));
    }

    #[tokio::test]
    async fn test_fetch_top_level_offers_skips_unrelated_responses() {
        let offer = PrimeOffer::external("o1", "Offer 1", "https://gaming.amazon.com/dp/1");
        let browser = MockBrowser::new()
            .with_response(HOME, InterceptedResponse::new("https://gaming.amazon.com/static/app.js", "{}"))
            .with_response(HOME, graphql_response("SomethingElse", r#"{"data": {}}"#))
            .with_response(HOME, feed_response(&[offer.clone()]));
        let client = ScrapingClient::with_config(browser.clone(), fast_config());

        let offers = client.fetch_top_level_offers().await.unwrap();

        assert_eq!(offers, vec![offer]);
        assert_eq!(browser.pages_opened(), 1);
        assert_eq!(browser.pages_closed(), 1);
        assert_eq!(browser.navigations(), vec![HOME.to_string()]);
    }

    #[tokio::test]
    async fn test_fetch_item_detail() {
        let offer = PrimeOffer::external("o1", "Offer 1", "https://gaming.amazon.com/dp/1");
        let item = Item::new("item-1", "Game A")
            .with_offer(ItemOffer::new("s").ending_at(Utc::now() + ChronoDuration::days(1)));
        let browser = MockBrowser::new().with_response(
            "https://gaming.amazon.com/dp/1",
            detail_response(&item),
        );
        let client = ScrapingClient::with_config(browser.clone(), fast_config());

        let fetched = client.fetch_item_detail(&offer).await.unwrap();

        assert_eq!(fetched, item);
        assert_eq!(browser.pages_closed(), 1);
    }

    #[tokio::test]
    async fn test_detail_timeout_closes_page() {
        let offer = PrimeOffer::external("o1", "Offer 1", "https://gaming.amazon.com/dp/silent");
        let browser = MockBrowser::new();
        let client = ScrapingClient::with_config(browser.clone(), fast_config());

        let err = client.fetch_item_detail(&offer).await.unwrap_err();

        assert!(err.is_timeout(), "expected timeout, got {err}");
        assert_eq!(browser.pages_opened(), 1);
        assert_eq!(browser.pages_closed(), 1);
        assert_eq!(browser.open_pages(), 0);
    }

    #[tokio::test]
    async fn test_stalled_navigation_times_out() {
        let offer = PrimeOffer::external("o1", "Offer 1", "https://gaming.amazon.com/dp/stalled");
        let browser = MockBrowser::new().with_stalled_navigation("https://gaming.amazon.com/dp/stalled");
        let client = ScrapingClient::with_config(browser.clone(), fast_config());

        let err = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            client.fetch_item_detail(&offer),
        )
        .await
        .expect("detail wait should bound navigation")
        .unwrap_err();

        assert!(err.is_timeout(), "expected timeout, got {err}");
        assert_eq!(browser.navigations(), vec!["https://gaming.amazon.com/dp/stalled"]);
        assert_eq!(browser.open_pages(), 0);
    }

    #[tokio::test]
    async fn test_navigation_error_closes_page() {
        let offer = PrimeOffer::external("o1", "Offer 1", "https://gaming.amazon.com/dp/broken");
        let browser = MockBrowser::new().with_navigation_failure("https://gaming.amazon.com/dp/broken");
        let client = ScrapingClient::with_config(browser.clone(), fast_config());

        let err = client.fetch_item_detail(&offer).await.unwrap_err();

        assert!(matches!(err, ClientError::Browser(BrowserError::Navigation { .. })));
        assert_eq!(browser.pages_closed(), 1);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_distinct() {
        let browser = MockBrowser::new().with_response(
            HOME,
            graphql_response(
                "OffersContext_Offers_And_Items",
                r#"{"data": {"primeOffers": [{"id": 7}]}}"#,
            ),
        );
        let client = ScrapingClient::with_config(browser.clone(), fast_config());

        let err = client.fetch_top_level_offers().await.unwrap_err();

        assert!(matches!(err, ClientError::MalformedPayload { .. }));
        assert_eq!(browser.pages_closed(), 1);
    }

    #[tokio::test]
    async fn test_null_item_is_malformed() {
        let offer = PrimeOffer::external("o1", "Offer 1", "https://gaming.amazon.com/dp/1");
        let browser = MockBrowser::new().with_response(
            "https://gaming.amazon.com/dp/1",
            graphql_response("OfferDetail_Item", r#"{"data": {"item": null}}"#),
        );
        let client = ScrapingClient::with_config(browser, fast_config());

        let err = client.fetch_item_detail(&offer).await.unwrap_err();
        assert!(matches!(err, ClientError::MalformedPayload { .. }));
    }

    #[tokio::test]
    async fn test_missing_external_url() {
        let mut offer = PrimeOffer::external("o1", "Offer 1", "unused");
        offer.content.external_url = None;
        let browser = MockBrowser::new();
        let client = ScrapingClient::new(browser.clone());

        let err = client.fetch_item_detail(&offer).await.unwrap_err();

        assert!(matches!(err, ClientError::MissingExternalUrl { .. }));
        assert_eq!(browser.pages_opened(), 0);
    }

    #[tokio::test]
    async fn test_response_outside_endpoint_is_ignored() {
        let offer = PrimeOffer::external("o1", "Offer 1", "https://gaming.amazon.com/dp/1");
        let item = Item::new("item-1", "Game A");
        let mut off_endpoint = detail_response(&item);
        off_endpoint.url = "https://cdn.example.com/graphql?x=1".to_string();
        let browser =
            MockBrowser::new().with_response("https://gaming.amazon.com/dp/1", off_endpoint);
        let client = ScrapingClient::with_config(browser, fast_config());

        let err = client.fetch_item_detail(&offer).await.unwrap_err();
        assert!(err.is_timeout());
        assert!(GRAPHQL_URL.starts_with(&client.config().graphql_url_prefix));
    }

    #[tokio::test]
    async fn test_concurrent_fetches_use_separate_pages() {
        let first = PrimeOffer::external("o1", "Offer 1", "https://gaming.amazon.com/dp/1");
        let second = PrimeOffer::external("o2", "Offer 2", "https://gaming.amazon.com/dp/2");
        let browser = MockBrowser::new()
            .with_response("https://gaming.amazon.com/dp/1", detail_response(&Item::new("a", "A")))
            .with_response("https://gaming.amazon.com/dp/2", detail_response(&Item::new("b", "B")));
        let client = ScrapingClient::with_config(browser.clone(), fast_config());

        let (a, b) = tokio::join!(
            client.fetch_item_detail(&first),
            client.fetch_item_detail(&second)
        );

        assert_eq!(a.unwrap().id, "a");
        assert_eq!(b.unwrap().id, "b");
        assert_eq!(browser.pages_opened(), 2);
        assert_eq!(browser.open_pages(), 0);
    }
}
