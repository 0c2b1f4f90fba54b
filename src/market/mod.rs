//! warframe.market API client for fetching the item catalog, price
//! statistics and relic drop sources

mod client;
mod models;

pub use client::{MarketClient, API_BASE_URL, CALL_DELAY_MS, MAX_IN_FLIGHT};
pub use models::{
    CatalogItem, ClosedStatistics, DropSource, DropsourcesResponse, ItemInSet, LiveStatistics,
    PricePoint, StatisticsPayload,
};
