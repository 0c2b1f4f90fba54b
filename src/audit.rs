//! Consistency audit of the local store against the live catalog
//!
//! The audit never diffs document content. Per-category document counts are
//! a sufficient proxy for "needs a full re-derive", and a single newest
//! timestamp decides price staleness. The result is an immutable snapshot;
//! writer stages return updated copies instead of mutating shared state.

use rusqlite::Connection;

use crate::classify::{classify, Category};
use crate::database;
use crate::error::Result;
use crate::market::CatalogItem;

/// Raw prices older than this many seconds are considered outdated
pub const STALENESS_WINDOW_SECS: i64 = 86_400;

/// Per-run consistency snapshot produced by [`audit`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncState {
    /// Raw price count matches the catalog
    pub raw_not_corrupted: bool,
    /// Raw price collection holds at least one record
    pub raw_not_missing: bool,
    /// Set document count matches the catalog
    pub sets_not_corrupted: bool,
    /// Set collection holds at least one document
    pub sets_not_missing: bool,
    /// Relic document count matches the catalog
    pub relics_not_corrupted: bool,
    /// Relic collection holds at least one document
    pub relics_not_missing: bool,
    /// Newest raw price is inside the staleness window
    pub prices_fresh: bool,
    /// Manual toggle: re-project set prices from raw records
    pub refresh_set_prices: bool,
    /// Manual toggle: re-project relic prices from raw records
    pub refresh_relic_prices: bool,
    /// Epoch second the audit ran at; used as `observed_at` for all raw
    /// prices written this run
    pub audited_at: i64,
}

impl SyncState {
    /// Snapshot with every flag clean
    pub fn clean(audited_at: i64) -> Self {
        Self {
            raw_not_corrupted: true,
            raw_not_missing: true,
            sets_not_corrupted: true,
            sets_not_missing: true,
            relics_not_corrupted: true,
            relics_not_missing: true,
            prices_fresh: true,
            refresh_set_prices: false,
            refresh_relic_prices: false,
            audited_at,
        }
    }

    /// Copy of this snapshot with the manual refresh toggles set
    pub fn with_refresh_toggles(mut self, sets: bool, relics: bool) -> Self {
        self.refresh_set_prices = sets;
        self.refresh_relic_prices = relics;
        self
    }

    /// True when any stage of the pipeline has work to do
    pub fn needs_work(&self) -> bool {
        !self.raw_not_corrupted
            || !self.sets_not_corrupted
            || !self.relics_not_corrupted
            || !self.prices_fresh
            || self.refresh_set_prices
            || self.refresh_relic_prices
    }
}

/// Classified catalog entry counts per category
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CategoryCounts {
    pub parts: usize,
    pub sets: usize,
    pub relics: usize,
}

impl CategoryCounts {
    /// Expected size of the raw price collection
    pub fn total(&self) -> usize {
        self.parts + self.sets + self.relics
    }
}

/// Count classified entries per category.
pub fn count_categories(catalog: &[CatalogItem]) -> CategoryCounts {
    let mut counts = CategoryCounts::default();
    for item in catalog {
        match classify(&item.url_name) {
            Category::Part => counts.parts += 1,
            Category::Set => counts.sets += 1,
            Category::Relic => counts.relics += 1,
            Category::Unclassified => {}
        }
    }
    counts
}

/// Audit the store against the freshly fetched catalog.
///
/// `now` is the epoch second the run started at. A count mismatch marks the
/// collection corrupt and records whether anything is stored at all; a raw
/// mismatch also invalidates price freshness, because without a trustworthy
/// collection there is no trustworthy timestamp.
pub fn audit(conn: &Connection, catalog: &[CatalogItem], now: i64) -> Result<SyncState> {
    let counts = count_categories(catalog);
    let mut state = SyncState::clean(now);

    let raw_stored = database::raw_price_count(conn)?;
    if raw_stored != counts.total() as i64 {
        state.raw_not_corrupted = false;
        state.prices_fresh = false;
        state.raw_not_missing = raw_stored != 0;
    }

    let sets_stored = database::set_count(conn)?;
    if sets_stored != counts.sets as i64 {
        state.sets_not_corrupted = false;
        state.sets_not_missing = sets_stored != 0;
    }

    let relics_stored = database::relic_count(conn)?;
    if relics_stored != counts.relics as i64 {
        state.relics_not_corrupted = false;
        state.relics_not_missing = relics_stored != 0;
    }

    if state.raw_not_corrupted {
        let newest = database::latest_observed_at(conn)?;
        match newest {
            Some(observed) if now - observed <= STALENESS_WINDOW_SECS => {}
            _ => state.prices_fresh = false,
        }
    }

    log::info!(
        "Audit: {} parts, {} sets, {} relics in catalog; raw ok={}, sets ok={}, relics ok={}, prices fresh={}",
        counts.parts,
        counts.sets,
        counts.relics,
        state.raw_not_corrupted,
        state.sets_not_corrupted,
        state.relics_not_corrupted,
        state.prices_fresh
    );

    Ok(state)
}
