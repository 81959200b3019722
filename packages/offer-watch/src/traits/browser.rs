//! Browser capability consumed by the scraping client.
//!
//! The watcher never issues GraphQL requests itself. It opens a page, lets
//! the page load, and observes the responses to the requests the page makes
//! on its own. Any automation runtime can back these traits.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::de::DeserializeOwned;

use crate::error::BrowserResult;

/// A network response observed on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct InterceptedResponse {
    /// Request URL
    pub url: String,

    /// Body of the request that produced this response, if any
    pub post_data: Option<String>,

    /// Response body
    pub body: String,
}

impl InterceptedResponse {
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            post_data: None,
            body: body.into(),
        }
    }

    /// Set the request post data.
    pub fn with_post_data(mut self, post_data: impl Into<String>) -> Self {
        self.post_data = Some(post_data.into());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn post_data(&self) -> Option<&str> {
        self.post_data.as_deref()
    }

    /// Parse the response body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.body)
    }
}

/// Stream of responses observed on a page, in arrival order.
///
/// Dropping the stream cancels the subscription.
pub type ResponseStream = BoxStream<'static, InterceptedResponse>;

/// A browser session that can open pages.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Open a new page. The caller must close it.
    async fn new_page(&self) -> BrowserResult<Box<dyn Page>>;
}

/// A single open page.
#[async_trait]
pub trait Page: Send + Sync {
    /// Subscribe to responses received from now on.
    ///
    /// Subscribe before navigating so no response is missed.
    async fn responses(&self) -> BrowserResult<ResponseStream>;

    /// Navigate to a URL.
    async fn goto(&self, url: &str) -> BrowserResult<()>;

    /// Close the page.
    async fn close(&self) -> BrowserResult<()>;
}

#[async_trait]
impl<B: Browser + ?Sized> Browser for std::sync::Arc<B> {
    async fn new_page(&self) -> BrowserResult<Box<dyn Page>> {
        (**self).new_page().await
    }
}
