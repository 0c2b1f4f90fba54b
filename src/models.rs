//! Stored document types for the three sync collections

use serde::{Deserialize, Serialize};

/// Fixed relic refinement tiers, stored verbatim on every relic document
pub const RELIC_SUBTYPES: &str = "intact, exceptional, flawless, radiant";

/// Slug used for the synthetic reward appended when a drop table
/// under-represents a rarity tier
pub const BONUS_REWARD_URL: &str = "forma_blueprint";

/// Raw price record for one catalog item, keyed by `item_id`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawPrice {
    pub item_id: String,
    pub url_name: String,
    pub price_90d: f64,
    pub price_48h: f64,
    pub observed_at: i64,
}

/// One relic a part drops from, with the part's rarity tier in that relic
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartSource {
    pub relic_url: String,
    pub rarity: String,
}

/// One part of a prime set, embedded in [`PrimeSetDoc`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartEntry {
    pub item_url: String,
    pub item_id: String,
    pub ducats: Option<i64>,
    pub trading_tax: Option<i64>,
    pub quantity_for_set: Option<i64>,
    pub item_name: String,
    pub price_90d: f64,
    pub price_48h: f64,
    pub sources: Vec<PartSource>,
}

/// Composite document for one prime set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrimeSetDoc {
    pub set_id: String,
    pub set_url: String,
    pub set_p90d: f64,
    pub set_p48h: f64,
    pub parts: Vec<PartEntry>,
}

/// One reward of a relic drop table, embedded in [`RelicDoc`].
///
/// Natural rewards carry a part id and the part's price pair; the synthetic
/// bonus reward carries only the slug and a rarity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RewardEntry {
    pub part_url: String,
    pub part_id: Option<String>,
    pub ducats: Option<i64>,
    pub rarity: String,
    pub price_90d: Option<f64>,
    pub price_48h: Option<f64>,
}

impl RewardEntry {
    /// The synthetic reward appended by the rarity-bonus rule.
    pub fn bonus(rarity: &str) -> Self {
        Self {
            part_url: BONUS_REWARD_URL.to_string(),
            part_id: None,
            ducats: None,
            rarity: rarity.to_string(),
            price_90d: None,
            price_48h: None,
        }
    }

    /// True for the synthetic bonus entry.
    pub fn is_bonus(&self) -> bool {
        self.part_id.is_none()
    }
}

/// Composite document for one relic
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelicDoc {
    pub relic_id: String,
    pub relic_url: String,
    pub price_90d: f64,
    pub price_48h: f64,
    pub subtypes: String,
    pub rewards: Vec<RewardEntry>,
}
