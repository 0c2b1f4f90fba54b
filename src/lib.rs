//! Relic Sync - Warframe Market price & composition database
//!
//! Synchronizes a local SQLite store with the warframe.market API:
//! classifies the item catalog, audits the store for missing or outdated
//! data, fetches price statistics under a strict rate budget, and derives
//! prime set and relic reward documents from the raw data.

pub mod audit;
pub mod classify;
pub mod database;
pub mod error;
pub mod market;
pub mod models;
pub mod relics;
pub mod sets;
pub mod stats;
pub mod sync;

pub use audit::{audit, SyncState};
pub use error::{Result, SyncError};
pub use market::MarketClient;
pub use sync::{run_sync, run_with_state, SyncReport};
