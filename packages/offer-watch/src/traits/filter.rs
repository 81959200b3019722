//! Caller-supplied acceptance rules for discovered journeys.

use std::collections::HashSet;

use crate::types::journey::JourneyInfo;

/// Decides whether a newly discovered journey should be surfaced.
///
/// Called once per discovered, unseen journey per cycle. Implementations
/// should be pure.
pub trait OfferFilter: Send + Sync {
    fn accept(&self, info: &JourneyInfo) -> bool;
}

// Blanket implementation: plain closures are filters
impl<F> OfferFilter for F
where
    F: Fn(&JourneyInfo) -> bool + Send + Sync,
{
    fn accept(&self, info: &JourneyInfo) -> bool {
        self(info)
    }
}

/// Accepts everything. The default filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl OfferFilter for AcceptAll {
    fn accept(&self, _info: &JourneyInfo) -> bool {
        true
    }
}

/// Rejects journeys whose game title is blacklisted (exact match).
#[derive(Debug, Clone, Default)]
pub struct TitleBlacklist {
    titles: HashSet<String>,
}

impl TitleBlacklist {
    pub fn new(titles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            titles: titles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }
}

impl OfferFilter for TitleBlacklist {
    fn accept(&self, info: &JourneyInfo) -> bool {
        !self.titles.contains(info.game_title())
    }
}
