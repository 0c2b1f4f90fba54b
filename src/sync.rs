//! Full synchronization pipeline
//!
//! Audit, fetch, derive, write. Each stage runs only when the audit snapshot
//! says its collection needs work, clears the collection's flags in the
//! returned snapshot after a successful write pass, and leaves them dirty on
//! failure so the next run repeats the same work. Per-item fetch failures
//! are logged and skipped; store write failures abort the run.

use std::collections::HashSet;

use rusqlite::Connection;

use crate::audit::{audit, SyncState};
use crate::classify::{classify, Category};
use crate::database;
use crate::error::Result;
use crate::market::{CatalogItem, MarketClient};
use crate::models::RawPrice;
use crate::relics::derive_relics;
use crate::sets::build_sets;
use crate::stats::average_prices;

/// Write and failure counts of one pipeline run
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Raw price rows written
    pub raw_writes: usize,
    /// Set documents written
    pub set_writes: usize,
    /// Relic documents written
    pub relic_writes: usize,
    /// Per-item fetches that failed and were skipped
    pub fetch_failures: usize,
}

impl SyncReport {
    /// Total rows written across all three collections
    pub fn total_writes(&self) -> usize {
        self.raw_writes + self.set_writes + self.relic_writes
    }
}

/// Run one full sync against the live catalog.
///
/// Fetches the catalog, audits the store and runs whatever stages the audit
/// marks dirty. The refresh toggles additionally re-project stored set and
/// relic prices from the raw records.
pub async fn run_sync(
    conn: &mut Connection,
    client: &MarketClient,
    refresh_sets: bool,
    refresh_relics: bool,
) -> Result<(SyncState, SyncReport)> {
    let items = client.items().await?;
    let catalog: Vec<CatalogItem> = items
        .into_iter()
        .filter(|item| classify(&item.url_name) != Category::Unclassified)
        .collect();
    log::info!("Catalog fetched: {} classified items", catalog.len());

    let now = chrono::Utc::now().timestamp();
    let state = audit(conn, &catalog, now)?.with_refresh_toggles(refresh_sets, refresh_relics);

    run_with_state(conn, client, &catalog, state).await
}

/// Run the fetch/derive/write sequence under an existing audit snapshot.
pub async fn run_with_state(
    conn: &mut Connection,
    client: &MarketClient,
    catalog: &[CatalogItem],
    state: SyncState,
) -> Result<(SyncState, SyncReport)> {
    let mut report = SyncReport::default();

    if !state.needs_work() {
        log::info!("Store is in sync, nothing to do");
        return Ok((state, report));
    }

    let state = sync_raw_prices(conn, client, catalog, state, &mut report).await?;
    let state = sync_sets(conn, client, catalog, state, &mut report).await?;
    let state = sync_relics(conn, catalog, state, &mut report)?;

    log::info!(
        "Sync complete: {} raw, {} set, {} relic writes ({} fetches failed)",
        report.raw_writes,
        report.set_writes,
        report.relic_writes,
        report.fetch_failures
    );
    Ok((state, report))
}

/// Bring the raw price collection up to date.
///
/// A corrupt collection is completed by fetching whatever the store lacks
/// (everything when it is empty). A clean but stale collection is refreshed
/// wholesale.
async fn sync_raw_prices(
    conn: &mut Connection,
    client: &MarketClient,
    catalog: &[CatalogItem],
    mut state: SyncState,
    report: &mut SyncReport,
) -> Result<SyncState> {
    if !state.raw_not_corrupted {
        let mut targets: Vec<&CatalogItem> = catalog.iter().collect();
        if state.raw_not_missing {
            let stored = database::load_raw_prices(conn)?;
            targets.retain(|item| !stored.contains_key(&item.id));
        }
        log::info!("Fetching price statistics for {} items", targets.len());

        let records = fetch_price_records(client, &targets, state.audited_at, report).await;
        let result = database::upsert_raw_prices(conn, &records, !state.raw_not_missing)?;
        report.raw_writes += result.writes();

        state.raw_not_corrupted = true;
        state.raw_not_missing = true;
        state.prices_fresh = true;
    } else if !state.prices_fresh {
        let targets: Vec<&CatalogItem> = catalog.iter().collect();
        log::info!("Prices outdated, refreshing all {} items", targets.len());

        let records = fetch_price_records(client, &targets, state.audited_at, report).await;
        let result = database::upsert_raw_prices(conn, &records, false)?;
        report.raw_writes += result.writes();

        state.prices_fresh = true;
    }
    Ok(state)
}

async fn fetch_price_records(
    client: &MarketClient,
    targets: &[&CatalogItem],
    observed_at: i64,
    report: &mut SyncReport,
) -> Vec<RawPrice> {
    let names: Vec<&str> = targets.iter().map(|i| i.url_name.as_str()).collect();
    let results = client.fetch_all_statistics(&names).await;

    let mut records = Vec::with_capacity(targets.len());
    for (item, result) in targets.iter().zip(results) {
        match result {
            Ok(stats) => {
                let (price_90d, price_48h) = average_prices(&stats);
                records.push(RawPrice {
                    item_id: item.id.clone(),
                    url_name: item.url_name.clone(),
                    price_90d,
                    price_48h,
                    observed_at,
                });
            }
            Err(e) => {
                report.fetch_failures += 1;
                log::warn!("Skipping {}: {}", item.url_name, e);
            }
        }
    }
    records
}

/// Build missing set documents, then optionally re-project set prices.
async fn sync_sets(
    conn: &mut Connection,
    client: &MarketClient,
    catalog: &[CatalogItem],
    mut state: SyncState,
    report: &mut SyncReport,
) -> Result<SyncState> {
    if !state.sets_not_corrupted {
        let raw = database::load_raw_prices(conn)?;
        let existing: HashSet<String> = if state.sets_not_missing {
            database::load_sets(conn)?
                .into_iter()
                .map(|doc| doc.set_url)
                .collect()
        } else {
            HashSet::new()
        };

        let docs = build_sets(client, catalog, &raw, &existing).await;
        let result = database::upsert_sets(conn, &docs, !state.sets_not_missing)?;
        report.set_writes += result.writes();

        state.sets_not_corrupted = true;
        state.sets_not_missing = true;
    }

    if state.refresh_set_prices {
        let raw = database::load_raw_prices(conn)?;
        report.set_writes += database::refresh_set_prices(conn, &raw)?;
        state.refresh_set_prices = false;
    }
    Ok(state)
}

/// Derive missing relic documents, then optionally re-project relic prices.
fn sync_relics(
    conn: &mut Connection,
    catalog: &[CatalogItem],
    mut state: SyncState,
    report: &mut SyncReport,
) -> Result<SyncState> {
    if !state.relics_not_corrupted {
        let raw = database::load_raw_prices(conn)?;
        let sets = database::load_sets(conn)?;
        let existing: HashSet<String> = if state.relics_not_missing {
            database::load_relics(conn)?
                .into_iter()
                .map(|doc| doc.relic_url)
                .collect()
        } else {
            HashSet::new()
        };

        let docs = derive_relics(catalog, &raw, &sets, &existing);
        let result = database::upsert_relics(conn, &docs, !state.relics_not_missing)?;
        report.relic_writes += result.writes();

        state.relics_not_corrupted = true;
        state.relics_not_missing = true;
    }

    if state.refresh_relic_prices {
        let raw = database::load_raw_prices(conn)?;
        report.relic_writes += database::refresh_relic_prices(conn, &raw)?;
        state.refresh_relic_prices = false;
    }
    Ok(state)
}
