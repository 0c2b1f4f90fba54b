//! Prime set assembly
//!
//! A set document is built from three joins: the catalog prefix match that
//! finds the set's parts, the `include=item` detail that carries ducats and
//! quantities, and the raw price records fetched earlier in the run. Drop
//! sources come back as opaque relic id strings and are resolved to relic
//! names by cross-referencing the catalog.

use std::collections::{HashMap, HashSet};

use crate::classify::{is_part, is_set, set_base_name};
use crate::error::Result;
use crate::market::{CatalogItem, DropSource, DropsourcesResponse, MarketClient};
use crate::models::{PartEntry, PartSource, PrimeSetDoc, RawPrice};

/// Resolve opaque drop-source ids to relic names.
///
/// Each source's `relic` field is a comma-separated list of relic ids; a
/// catalog entry whose id is contained in such an id string names the relic.
/// Sources that reference nothing resolvable (or are not relic drops at
/// all) are dropped, so an unresolvable listing degrades to an empty list.
pub fn resolve_sources(dropsources: &[DropSource], catalog: &[CatalogItem]) -> Vec<PartSource> {
    let mut sources = Vec::new();
    for drop in dropsources {
        let (Some(relic_ids), Some(rarity)) = (&drop.relic, &drop.rarity) else {
            continue;
        };
        for relic_id in relic_ids.split(',') {
            for item in catalog {
                if relic_id.contains(&item.id) {
                    sources.push(PartSource {
                        relic_url: item.url_name.clone(),
                        rarity: rarity.clone(),
                    });
                }
            }
        }
    }
    sources
}

/// Build one composite document per set that is not already stored.
///
/// A part whose dropsources fetch fails is kept with an empty source list
/// and no set-membership detail; its prices still come from the raw
/// records. The set's own price pair comes from the set's raw record.
pub async fn build_sets(
    client: &MarketClient,
    catalog: &[CatalogItem],
    raw: &HashMap<String, RawPrice>,
    existing_sets: &HashSet<String>,
) -> Vec<PrimeSetDoc> {
    let pending: Vec<&CatalogItem> = catalog
        .iter()
        .filter(|item| is_set(&item.url_name) && !existing_sets.contains(&item.url_name))
        .collect();

    log::info!("Building {} set documents", pending.len());

    let mut docs = Vec::with_capacity(pending.len());
    for set_item in pending {
        let Some(base) = set_base_name(&set_item.url_name) else {
            continue;
        };
        let prefix = format!("{base}_");

        let members: Vec<&CatalogItem> = catalog
            .iter()
            .filter(|item| is_part(&item.url_name) && item.url_name.starts_with(&prefix))
            .collect();

        let names: Vec<&str> = members.iter().map(|i| i.url_name.as_str()).collect();
        let results = client.fetch_all_dropsources(&names).await;

        let parts = members
            .iter()
            .zip(results)
            .map(|(member, result)| part_entry(member, result, catalog, raw))
            .collect();

        let (set_p90d, set_p48h) = price_pair(raw, &set_item.id);
        docs.push(PrimeSetDoc {
            set_id: set_item.id.clone(),
            set_url: set_item.url_name.clone(),
            set_p90d,
            set_p48h,
            parts,
        });
    }
    docs
}

fn part_entry(
    member: &CatalogItem,
    result: Result<DropsourcesResponse>,
    catalog: &[CatalogItem],
    raw: &HashMap<String, RawPrice>,
) -> PartEntry {
    let (price_90d, price_48h) = price_pair(raw, &member.id);

    let mut entry = PartEntry {
        item_url: member.url_name.clone(),
        item_id: member.id.clone(),
        ducats: None,
        trading_tax: None,
        quantity_for_set: None,
        item_name: member.url_name.clone(),
        price_90d,
        price_48h,
        sources: Vec::new(),
    };

    match result {
        Ok(resp) => {
            entry.sources = resolve_sources(&resp.payload.dropsources, catalog);
            if let Some(detail) = resp
                .items_in_set()
                .iter()
                .find(|i| i.url_name == member.url_name)
            {
                entry.ducats = detail.ducats;
                entry.trading_tax = detail.trading_tax;
                entry.quantity_for_set = detail.quantity_for_set;
                entry.item_name = detail.en.item_name.clone();
            }
        }
        Err(e) => {
            log::warn!("Dropsources for {} unavailable: {}", member.url_name, e);
        }
    }
    entry
}

fn price_pair(raw: &HashMap<String, RawPrice>, item_id: &str) -> (f64, f64) {
    raw.get(item_id)
        .map(|r| (r.price_90d, r.price_48h))
        .unwrap_or((0.0, 0.0))
}
