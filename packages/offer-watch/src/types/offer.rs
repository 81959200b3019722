//! Top-level offer descriptors from the offer feed.

use serde::{Deserialize, Serialize};

/// How an offer is delivered to the claimant.
///
/// Unknown wire values are kept verbatim in `Other` so they survive a
/// round trip through the seen-set document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeliveryMethod {
    /// Claimed on an external product page (the only kind we follow)
    ExternalOffer,

    /// Granted directly to the account
    DirectEntitlement,

    /// Anything else the feed reports
    Other(String),
}

impl DeliveryMethod {
    pub fn as_str(&self) -> &str {
        match self {
            DeliveryMethod::ExternalOffer => "EXTERNAL_OFFER",
            DeliveryMethod::DirectEntitlement => "DIRECT_ENTITLEMENT",
            DeliveryMethod::Other(value) => value,
        }
    }
}

impl From<String> for DeliveryMethod {
    fn from(value: String) -> Self {
        match value.as_str() {
            "EXTERNAL_OFFER" => DeliveryMethod::ExternalOffer,
            "DIRECT_ENTITLEMENT" => DeliveryMethod::DirectEntitlement,
            _ => DeliveryMethod::Other(value),
        }
    }
}

impl From<DeliveryMethod> for String {
    fn from(value: DeliveryMethod) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for DeliveryMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Offer content block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OfferContent {
    /// Claim page for external offers
    #[serde(rename = "externalURL", default)]
    pub external_url: Option<String>,
}

/// A top-level offer as listed in the offer feed.
///
/// Sourced fresh every cycle; only persisted as part of a
/// [`JourneyInfo`](crate::types::journey::JourneyInfo).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimeOffer {
    pub id: String,

    pub title: String,

    pub delivery_method: DeliveryMethod,

    #[serde(default)]
    pub content: OfferContent,
}

impl PrimeOffer {
    /// Create an external offer pointing at a claim page.
    pub fn external(
        id: impl Into<String>,
        title: impl Into<String>,
        external_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            delivery_method: DeliveryMethod::ExternalOffer,
            content: OfferContent {
                external_url: Some(external_url.into()),
            },
        }
    }

    /// Set the delivery method.
    pub fn with_delivery_method(mut self, method: DeliveryMethod) -> Self {
        self.delivery_method = method;
        self
    }

    pub fn external_url(&self) -> Option<&str> {
        self.content.external_url.as_deref()
    }

    pub fn is_external(&self) -> bool {
        self.delivery_method == DeliveryMethod::ExternalOffer
    }
}
