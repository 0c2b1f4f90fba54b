//! Relic reward derivation
//!
//! Relic documents are derived entirely from data already in the store: the
//! reward table of a relic is the set of part entries whose drop sources
//! name it. No network calls happen here.

use std::collections::{HashMap, HashSet};

use crate::classify::is_relic;
use crate::market::CatalogItem;
use crate::models::{PrimeSetDoc, RawPrice, RelicDoc, RewardEntry, RELIC_SUBTYPES};

/// A fully populated drop table has exactly this many natural rewards
const NATURAL_TABLE_SIZE: usize = 5;
/// Minimum common rewards before the bonus rule fires
const MIN_COMMON: usize = 3;
/// Minimum uncommon rewards before the bonus rule fires
const MIN_UNCOMMON: usize = 2;

/// Derive one relic document per catalog relic that is not already stored.
pub fn derive_relics(
    catalog: &[CatalogItem],
    raw: &HashMap<String, RawPrice>,
    sets: &[PrimeSetDoc],
    existing_relics: &HashSet<String>,
) -> Vec<RelicDoc> {
    let pending: Vec<&CatalogItem> = catalog
        .iter()
        .filter(|item| is_relic(&item.url_name) && !existing_relics.contains(&item.url_name))
        .collect();

    log::info!("Deriving {} relic documents", pending.len());

    let mut docs = Vec::with_capacity(pending.len());
    for relic_item in pending {
        let mut rewards = collect_rewards(&relic_item.url_name, sets);
        apply_bonus_reward(&mut rewards);

        let (price_90d, price_48h) = raw
            .get(&relic_item.id)
            .map(|r| (r.price_90d, r.price_48h))
            .unwrap_or((0.0, 0.0));

        docs.push(RelicDoc {
            relic_id: relic_item.id.clone(),
            relic_url: relic_item.url_name.clone(),
            price_90d,
            price_48h,
            subtypes: RELIC_SUBTYPES.to_string(),
            rewards,
        });
    }
    docs
}

/// Collect every part entry across all sets that lists this relic as a
/// drop source.
fn collect_rewards(relic_url: &str, sets: &[PrimeSetDoc]) -> Vec<RewardEntry> {
    let mut rewards = Vec::new();
    for set in sets {
        for part in &set.parts {
            for source in &part.sources {
                if source.relic_url == relic_url {
                    rewards.push(RewardEntry {
                        part_url: part.item_url.clone(),
                        part_id: Some(part.item_id.clone()),
                        ducats: part.ducats,
                        rarity: source.rarity.clone(),
                        price_90d: Some(part.price_90d),
                        price_48h: Some(part.price_48h),
                    });
                }
            }
        }
    }
    rewards
}

/// Complete an under-represented drop table with a synthetic reward.
///
/// Applies only to tables with exactly [`NATURAL_TABLE_SIZE`] natural
/// rewards: fewer than [`MIN_COMMON`] commons gets a common bonus, else
/// fewer than [`MIN_UNCOMMON`] uncommons gets an uncommon bonus.
fn apply_bonus_reward(rewards: &mut Vec<RewardEntry>) {
    if rewards.len() != NATURAL_TABLE_SIZE {
        return;
    }

    let common = rewards.iter().filter(|r| r.rarity == "common").count();
    let uncommon = rewards.iter().filter(|r| r.rarity == "uncommon").count();

    if common < MIN_COMMON {
        rewards.push(RewardEntry::bonus("common"));
    } else if uncommon < MIN_UNCOMMON {
        rewards.push(RewardEntry::bonus("uncommon"));
    }
}
