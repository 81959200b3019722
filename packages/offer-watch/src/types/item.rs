//! Detailed offer records ("journey items") reachable from a prime offer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single reward line-item inside an offer bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardItem {
    pub id: String,

    #[serde(default)]
    pub title: Option<String>,
}

/// Image source set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaSource {
    #[serde(default)]
    pub src1x: Option<String>,
}

/// Media asset (cover art, card art).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaAsset {
    #[serde(default)]
    pub default_media: Option<MediaSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameAssets {
    pub title: String,

    #[serde(default)]
    pub cover_art: Option<MediaAsset>,
}

/// Parent game metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    #[serde(default)]
    pub id: Option<String>,

    pub assets: GameAssets,
}

/// A time-windowed sub-offer of an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemOffer {
    pub id: String,

    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,

    /// `None` means the sub-offer has no announced end
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

impl ItemOffer {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            start_time: None,
            end_time: None,
        }
    }

    pub fn ending_at(mut self, end: DateTime<Utc>) -> Self {
        self.end_time = Some(end);
        self
    }

    pub fn starting_at(mut self, start: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self
    }

    /// Ended strictly before `now`.
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        matches!(self.end_time, Some(end) if end < now)
    }
}

/// The detailed offer record.
///
/// `id` is the identity used for deduplication across cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,

    /// Reward line-items
    #[serde(default)]
    pub items: Vec<RewardItem>,

    pub game: Game,

    /// Free-game bundle flag
    #[serde(rename = "isFGWP", default)]
    pub is_free_game: bool,

    /// Time-windowed sub-offers
    #[serde(default)]
    pub offers: Vec<ItemOffer>,
}

impl Item {
    /// Create an item for a game with no rewards or sub-offers.
    pub fn new(id: impl Into<String>, game_title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            items: vec![],
            game: Game {
                id: None,
                assets: GameAssets {
                    title: game_title.into(),
                    cover_art: None,
                },
            },
            is_free_game: false,
            offers: vec![],
        }
    }

    /// Add a sub-offer.
    pub fn with_offer(mut self, offer: ItemOffer) -> Self {
        self.offers.push(offer);
        self
    }

    /// Add a reward line-item.
    pub fn with_reward(mut self, reward: RewardItem) -> Self {
        self.items.push(reward);
        self
    }

    /// Mark as a free-game bundle.
    pub fn free_game(mut self) -> Self {
        self.is_free_game = true;
        self
    }

    pub fn game_title(&self) -> &str {
        &self.game.assets.title
    }

    pub fn cover_art_url(&self) -> Option<&str> {
        self.game
            .assets
            .cover_art
            .as_ref()
            .and_then(|art| art.default_media.as_ref())
            .and_then(|media| media.src1x.as_deref())
    }

    /// Every sub-offer ended strictly before `now`.
    ///
    /// An item with no sub-offers is expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.offers.iter().all(|offer| offer.has_ended(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_parses_detail_payload() {
        let json = r#"{
            "id": "amzn1.pg.item.42",
            "isFGWP": true,
            "items": [{ "id": "r1", "title": "Game Key" }],
            "game": {
                "id": "g1",
                "assets": {
                    "title": "Game A",
                    "coverArt": { "defaultMedia": { "src1x": "https://img/cover.jpg" } }
                }
            },
            "offers": [{
                "id": "o1",
                "startTime": "2024-01-01T00:00:00Z",
                "endTime": "2024-02-01T00:00:00Z"
            }]
        }"#;

        let item: Item = serde_json::from_str(json).unwrap();
        assert_eq!(item.id, "amzn1.pg.item.42");
        assert!(item.is_free_game);
        assert_eq!(item.game_title(), "Game A");
        assert_eq!(item.cover_art_url(), Some("https://img/cover.jpg"));
        assert_eq!(item.items.len(), 1);
        assert!(item.offers[0].end_time.is_some());
    }

    #[test]
    fn test_expired_only_when_all_offers_ended() {
        let now = Utc::now();
        let ended = ItemOffer::new("a").ending_at(now - Duration::days(1));
        let running = ItemOffer::new("b").ending_at(now + Duration::days(1));

        let item = Item::new("x", "Game").with_offer(ended.clone());
        assert!(item.is_expired(now));

        let item = Item::new("x", "Game").with_offer(ended).with_offer(running);
        assert!(!item.is_expired(now));
    }

    #[test]
    fn test_end_time_equal_to_now_is_not_ended() {
        let now = Utc::now();
        let item = Item::new("x", "Game").with_offer(ItemOffer::new("a").ending_at(now));
        assert!(!item.is_expired(now));
    }

    #[test]
    fn test_open_ended_offer_never_expires() {
        let now = Utc::now();
        let item = Item::new("x", "Game").with_offer(ItemOffer::new("a"));
        assert!(!item.is_expired(now + Duration::days(3650)));
    }

    #[test]
    fn test_no_offers_is_expired() {
        assert!(Item::new("x", "Game").is_expired(Utc::now()));
    }
}
