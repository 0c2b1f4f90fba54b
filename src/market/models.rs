//! Response payload structures for the warframe.market v1 API

use serde::Deserialize;

/// One entry of the full item catalog (`GET /items`)
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CatalogItem {
    pub id: String,
    pub url_name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ItemsResponse {
    pub payload: ItemsPayload,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ItemsPayload {
    pub items: Vec<CatalogItem>,
}

/// A single point of a price history window. `avg_price` is null on the
/// live window whenever no order closed in that slot.
#[derive(Debug, Deserialize, Clone)]
pub struct PricePoint {
    pub avg_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatisticsResponse {
    pub payload: StatisticsPayload,
}

/// Price statistics for one item (`GET /items/{name}/statistics`):
/// a ~90 day closed-order history and a ~48 hour live history.
#[derive(Debug, Deserialize)]
pub struct StatisticsPayload {
    pub statistics_closed: ClosedStatistics,
    pub statistics_live: LiveStatistics,
}

#[derive(Debug, Deserialize)]
pub struct ClosedStatistics {
    #[serde(rename = "90days")]
    pub days_90: Vec<PricePoint>,
}

#[derive(Debug, Deserialize)]
pub struct LiveStatistics {
    #[serde(rename = "48hours")]
    pub hours_48: Vec<PricePoint>,
}

/// One drop source of a part. `relic` is a comma-separated string of opaque
/// relic ids; entries for non-relic sources carry neither field.
#[derive(Debug, Deserialize, Clone)]
pub struct DropSource {
    #[serde(default)]
    pub relic: Option<String>,
    #[serde(default)]
    pub rarity: Option<String>,
}

/// Set membership detail for one item, from the `include=item` side of a
/// dropsources query.
#[derive(Debug, Deserialize, Clone)]
pub struct ItemInSet {
    pub url_name: String,
    pub id: String,
    #[serde(default)]
    pub ducats: Option<i64>,
    #[serde(default)]
    pub trading_tax: Option<i64>,
    #[serde(default)]
    pub quantity_for_set: Option<i64>,
    pub en: LocalizedName,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LocalizedName {
    pub item_name: String,
}

/// Full response of `GET /items/{name}/dropsources?include=item`
#[derive(Debug, Deserialize)]
pub struct DropsourcesResponse {
    pub payload: DropsourcesPayload,
    #[serde(default)]
    pub include: Option<DropsourcesInclude>,
}

#[derive(Debug, Deserialize)]
pub struct DropsourcesPayload {
    pub dropsources: Vec<DropSource>,
}

#[derive(Debug, Deserialize)]
pub struct DropsourcesInclude {
    pub item: IncludedItem,
}

#[derive(Debug, Deserialize)]
pub struct IncludedItem {
    pub items_in_set: Vec<ItemInSet>,
}

impl DropsourcesResponse {
    /// The full set composition shipped alongside the dropsources, if the
    /// `include=item` side was present.
    pub fn items_in_set(&self) -> &[ItemInSet] {
        self.include
            .as_ref()
            .map(|i| i.item.items_in_set.as_slice())
            .unwrap_or(&[])
    }
}
