//! Database operations for the three sync collections
//!
//! Uses parameterized queries exclusively. All multi-row writes run inside a
//! single transaction; a rejected transaction aborts the run and the next
//! run repeats the same work (every write path is idempotent).
//!
//! Set parts and relic rewards are embedded arrays, stored as JSON text
//! columns and (de)serialized with serde_json.

use std::collections::HashMap;

use rusqlite::{params, Connection, OptionalExtension, Transaction};

use crate::error::Result;
use crate::models::{PrimeSetDoc, RawPrice, RelicDoc};

/// Initialize the database schema
///
/// Creates the three collections if they don't exist:
/// - `raw_prices`: one price record per classified catalog item
/// - `prime_sets`: one composite document per prime set
/// - `relics`: one reward-table document per relic
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS raw_prices (
            item_id TEXT PRIMARY KEY,
            url_name TEXT NOT NULL,
            price_90d REAL NOT NULL,
            price_48h REAL NOT NULL,
            observed_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_raw_prices_url ON raw_prices(url_name);
        CREATE INDEX IF NOT EXISTS idx_raw_prices_observed ON raw_prices(observed_at);

        CREATE TABLE IF NOT EXISTS prime_sets (
            set_id TEXT PRIMARY KEY,
            set_url TEXT NOT NULL,
            set_p90d REAL NOT NULL,
            set_p48h REAL NOT NULL,
            parts TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_prime_sets_url ON prime_sets(set_url);

        CREATE TABLE IF NOT EXISTS relics (
            relic_id TEXT PRIMARY KEY,
            relic_url TEXT NOT NULL,
            price_90d REAL NOT NULL,
            price_48h REAL NOT NULL,
            subtypes TEXT NOT NULL,
            rewards TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_relics_url ON relics(relic_url);
        ",
    )?;

    log::info!("Database schema initialized");
    Ok(())
}

/// Number of raw price records
pub fn raw_price_count(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM raw_prices", [], |row| row.get(0))?)
}

/// Number of prime set documents
pub fn set_count(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM prime_sets", [], |row| row.get(0))?)
}

/// Number of relic documents
pub fn relic_count(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM relics", [], |row| row.get(0))?)
}

/// Epoch of the most recently observed raw price, if any
pub fn latest_observed_at(conn: &Connection) -> Result<Option<i64>> {
    let latest: Option<i64> =
        conn.query_row("SELECT MAX(observed_at) FROM raw_prices", [], |row| {
            row.get(0)
        })?;
    Ok(latest)
}

/// Load all raw price records, keyed by item id
pub fn load_raw_prices(conn: &Connection) -> Result<HashMap<String, RawPrice>> {
    let mut stmt = conn.prepare(
        "SELECT item_id, url_name, price_90d, price_48h, observed_at FROM raw_prices",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(RawPrice {
            item_id: row.get(0)?,
            url_name: row.get(1)?,
            price_90d: row.get(2)?,
            price_48h: row.get(3)?,
            observed_at: row.get(4)?,
        })
    })?;

    let mut records = HashMap::new();
    for row in rows {
        let record = row?;
        records.insert(record.item_id.clone(), record);
    }
    Ok(records)
}

/// Load all prime set documents
pub fn load_sets(conn: &Connection) -> Result<Vec<PrimeSetDoc>> {
    let mut stmt =
        conn.prepare("SELECT set_id, set_url, set_p90d, set_p48h, parts FROM prime_sets ORDER BY set_url")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, f64>(2)?,
            row.get::<_, f64>(3)?,
            row.get::<_, String>(4)?,
        ))
    })?;

    let mut docs = Vec::new();
    for row in rows {
        let (set_id, set_url, set_p90d, set_p48h, parts_json) = row?;
        docs.push(PrimeSetDoc {
            set_id,
            set_url,
            set_p90d,
            set_p48h,
            parts: serde_json::from_str(&parts_json)?,
        });
    }
    Ok(docs)
}

/// Load all relic documents
pub fn load_relics(conn: &Connection) -> Result<Vec<RelicDoc>> {
    let mut stmt = conn.prepare(
        "SELECT relic_id, relic_url, price_90d, price_48h, subtypes, rewards FROM relics
         ORDER BY relic_url",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, f64>(2)?,
            row.get::<_, f64>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
        ))
    })?;

    let mut docs = Vec::new();
    for row in rows {
        let (relic_id, relic_url, price_90d, price_48h, subtypes, rewards_json) = row?;
        docs.push(RelicDoc {
            relic_id,
            relic_url,
            price_90d,
            price_48h,
            subtypes,
            rewards: serde_json::from_str(&rewards_json)?,
        });
    }
    Ok(docs)
}

/// Result of one bulk upsert pass
#[derive(Debug, Default)]
pub struct UpsertResult {
    /// Rows inserted for the first time
    pub inserted: usize,
    /// Rows replaced because a field differed
    pub updated: usize,
    /// Rows left untouched (stored copy already equal)
    pub skipped: usize,
}

impl UpsertResult {
    /// Rows actually written
    pub fn writes(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Upsert raw price records as one transaction.
///
/// With `blind_insert` (collection was never populated) every record is
/// inserted without a lookup. Otherwise each record is compared against the
/// stored row: equal rows are skipped, differing rows replaced.
pub fn upsert_raw_prices(
    conn: &mut Connection,
    records: &[RawPrice],
    blind_insert: bool,
) -> Result<UpsertResult> {
    let tx = conn.transaction()?;
    let result = upsert_raw_prices_tx(&tx, records, blind_insert)?;
    tx.commit()?;
    log::info!(
        "Raw prices: {} inserted, {} updated, {} unchanged",
        result.inserted,
        result.updated,
        result.skipped
    );
    Ok(result)
}

fn upsert_raw_prices_tx(
    tx: &Transaction<'_>,
    records: &[RawPrice],
    blind_insert: bool,
) -> Result<UpsertResult> {
    let mut stmt = tx.prepare_cached(
        "INSERT OR REPLACE INTO raw_prices (item_id, url_name, price_90d, price_48h, observed_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;

    let mut result = UpsertResult::default();
    for record in records {
        if !blind_insert {
            let existing = tx
                .query_row(
                    "SELECT item_id, url_name, price_90d, price_48h, observed_at
                     FROM raw_prices WHERE item_id = ?1",
                    params![&record.item_id],
                    |row| {
                        Ok(RawPrice {
                            item_id: row.get(0)?,
                            url_name: row.get(1)?,
                            price_90d: row.get(2)?,
                            price_48h: row.get(3)?,
                            observed_at: row.get(4)?,
                        })
                    },
                )
                .optional()?;

            match existing {
                Some(stored) if stored == *record => {
                    result.skipped += 1;
                    continue;
                }
                Some(_) => result.updated += 1,
                None => result.inserted += 1,
            }
        } else {
            result.inserted += 1;
        }

        stmt.execute(params![
            &record.item_id,
            &record.url_name,
            record.price_90d,
            record.price_48h,
            record.observed_at,
        ])?;
    }
    Ok(result)
}

/// Upsert prime set documents as one transaction. Same insert/compare/skip
/// contract as [`upsert_raw_prices`].
pub fn upsert_sets(
    conn: &mut Connection,
    docs: &[PrimeSetDoc],
    blind_insert: bool,
) -> Result<UpsertResult> {
    let tx = conn.transaction()?;
    let result = upsert_sets_tx(&tx, docs, blind_insert)?;
    tx.commit()?;
    log::info!(
        "Prime sets: {} inserted, {} updated, {} unchanged",
        result.inserted,
        result.updated,
        result.skipped
    );
    Ok(result)
}

fn upsert_sets_tx(
    tx: &Transaction<'_>,
    docs: &[PrimeSetDoc],
    blind_insert: bool,
) -> Result<UpsertResult> {
    let mut stmt = tx.prepare_cached(
        "INSERT OR REPLACE INTO prime_sets (set_id, set_url, set_p90d, set_p48h, parts)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;

    let mut result = UpsertResult::default();
    for doc in docs {
        let parts_json = serde_json::to_string(&doc.parts)?;

        if !blind_insert {
            let existing = tx
                .query_row(
                    "SELECT set_url, set_p90d, set_p48h, parts FROM prime_sets WHERE set_id = ?1",
                    params![&doc.set_id],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, f64>(1)?,
                            row.get::<_, f64>(2)?,
                            row.get::<_, String>(3)?,
                        ))
                    },
                )
                .optional()?;

            match existing {
                Some((url, p90, p48, parts))
                    if url == doc.set_url
                        && p90 == doc.set_p90d
                        && p48 == doc.set_p48h
                        && parts == parts_json =>
                {
                    result.skipped += 1;
                    continue;
                }
                Some(_) => result.updated += 1,
                None => result.inserted += 1,
            }
        } else {
            result.inserted += 1;
        }

        stmt.execute(params![
            &doc.set_id,
            &doc.set_url,
            doc.set_p90d,
            doc.set_p48h,
            parts_json,
        ])?;
    }
    Ok(result)
}

/// Upsert relic documents as one transaction. Same insert/compare/skip
/// contract as [`upsert_raw_prices`].
pub fn upsert_relics(
    conn: &mut Connection,
    docs: &[RelicDoc],
    blind_insert: bool,
) -> Result<UpsertResult> {
    let tx = conn.transaction()?;
    let result = upsert_relics_tx(&tx, docs, blind_insert)?;
    tx.commit()?;
    log::info!(
        "Relics: {} inserted, {} updated, {} unchanged",
        result.inserted,
        result.updated,
        result.skipped
    );
    Ok(result)
}

fn upsert_relics_tx(
    tx: &Transaction<'_>,
    docs: &[RelicDoc],
    blind_insert: bool,
) -> Result<UpsertResult> {
    let mut stmt = tx.prepare_cached(
        "INSERT OR REPLACE INTO relics
         (relic_id, relic_url, price_90d, price_48h, subtypes, rewards)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;

    let mut result = UpsertResult::default();
    for doc in docs {
        let rewards_json = serde_json::to_string(&doc.rewards)?;

        if !blind_insert {
            let existing = tx
                .query_row(
                    "SELECT relic_url, price_90d, price_48h, subtypes, rewards
                     FROM relics WHERE relic_id = ?1",
                    params![&doc.relic_id],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, f64>(1)?,
                            row.get::<_, f64>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, String>(4)?,
                        ))
                    },
                )
                .optional()?;

            match existing {
                Some((url, p90, p48, subtypes, rewards))
                    if url == doc.relic_url
                        && p90 == doc.price_90d
                        && p48 == doc.price_48h
                        && subtypes == doc.subtypes
                        && rewards == rewards_json =>
                {
                    result.skipped += 1;
                    continue;
                }
                Some(_) => result.updated += 1,
                None => result.inserted += 1,
            }
        } else {
            result.inserted += 1;
        }

        stmt.execute(params![
            &doc.relic_id,
            &doc.relic_url,
            doc.price_90d,
            doc.price_48h,
            &doc.subtypes,
            rewards_json,
        ])?;
    }
    Ok(result)
}

/// Re-project stored set documents with current raw prices.
///
/// Joins set and part ids against the raw price records and rewrites the
/// price fields only; the set composition is never re-derived here. Records
/// without a matching raw price keep their stored values.
///
/// Returns the number of documents rewritten.
pub fn refresh_set_prices(
    conn: &mut Connection,
    raw: &HashMap<String, RawPrice>,
) -> Result<usize> {
    let sets = load_sets(conn)?;

    let mut refreshed = Vec::new();
    for mut doc in sets {
        if let Some(record) = raw.get(&doc.set_id) {
            doc.set_p90d = record.price_90d;
            doc.set_p48h = record.price_48h;
        }
        for part in &mut doc.parts {
            if let Some(record) = raw.get(&part.item_id) {
                part.price_90d = record.price_90d;
                part.price_48h = record.price_48h;
            }
        }
        refreshed.push(doc);
    }

    let result = upsert_sets(conn, &refreshed, false)?;
    log::info!("Refreshed prices on {} set documents", result.writes());
    Ok(result.writes())
}

/// Re-project stored relic documents with current raw prices.
///
/// Relic and natural-reward prices are joined from the raw records by id;
/// the synthetic bonus reward has no id and is left untouched.
///
/// Returns the number of documents rewritten.
pub fn refresh_relic_prices(
    conn: &mut Connection,
    raw: &HashMap<String, RawPrice>,
) -> Result<usize> {
    let relics = load_relics(conn)?;

    let mut refreshed = Vec::new();
    for mut doc in relics {
        if let Some(record) = raw.get(&doc.relic_id) {
            doc.price_90d = record.price_90d;
            doc.price_48h = record.price_48h;
        }
        for reward in &mut doc.rewards {
            let Some(part_id) = &reward.part_id else {
                continue;
            };
            if let Some(record) = raw.get(part_id) {
                reward.price_90d = Some(record.price_90d);
                reward.price_48h = Some(record.price_48h);
            }
        }
        refreshed.push(doc);
    }

    let result = upsert_relics(conn, &refreshed, false)?;
    log::info!("Refreshed prices on {} relic documents", result.writes());
    Ok(result.writes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{part_entry, raw_price, relic_doc, reward, set_doc};
    use crate::models::RewardEntry;

    /// Create an in-memory database for testing
    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn init_schema_creates_tables() {
        let conn = test_db();

        for table in ["raw_prices", "prime_sets", "relics"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    params![table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {table}");
        }
    }

    #[test]
    fn counts_start_at_zero() {
        let conn = test_db();
        assert_eq!(raw_price_count(&conn).unwrap(), 0);
        assert_eq!(set_count(&conn).unwrap(), 0);
        assert_eq!(relic_count(&conn).unwrap(), 0);
    }

    #[test]
    fn latest_observed_at_empty_is_none() {
        let conn = test_db();
        assert_eq!(latest_observed_at(&conn).unwrap(), None);
    }

    #[test]
    fn latest_observed_at_returns_max() {
        let mut conn = test_db();
        let records = vec![
            raw_price("a", "ember_prime_chassis", 10.0, 9.0, 1_000),
            raw_price("b", "ember_prime_set", 100.0, 95.0, 3_000),
            raw_price("c", "axi_a1_relic", 5.0, 4.0, 2_000),
        ];
        upsert_raw_prices(&mut conn, &records, true).unwrap();

        assert_eq!(latest_observed_at(&conn).unwrap(), Some(3_000));
    }

    #[test]
    fn blind_insert_counts_everything_as_inserted() {
        let mut conn = test_db();
        let records = vec![
            raw_price("a", "ember_prime_chassis", 10.0, 9.0, 1_000),
            raw_price("b", "ember_prime_set", 100.0, 95.0, 1_000),
        ];

        let result = upsert_raw_prices(&mut conn, &records, true).unwrap();
        assert_eq!(result.inserted, 2);
        assert_eq!(result.writes(), 2);
        assert_eq!(raw_price_count(&conn).unwrap(), 2);
    }

    #[test]
    fn upsert_skips_identical_records() {
        let mut conn = test_db();
        let records = vec![raw_price("a", "ember_prime_chassis", 10.0, 9.0, 1_000)];
        upsert_raw_prices(&mut conn, &records, true).unwrap();

        // Same content again: no writes.
        let result = upsert_raw_prices(&mut conn, &records, false).unwrap();
        assert_eq!(result.skipped, 1);
        assert_eq!(result.writes(), 0);
    }

    #[test]
    fn upsert_updates_changed_records() {
        let mut conn = test_db();
        upsert_raw_prices(
            &mut conn,
            &[raw_price("a", "ember_prime_chassis", 10.0, 9.0, 1_000)],
            true,
        )
        .unwrap();

        let result = upsert_raw_prices(
            &mut conn,
            &[raw_price("a", "ember_prime_chassis", 12.0, 9.5, 2_000)],
            false,
        )
        .unwrap();
        assert_eq!(result.updated, 1);
        assert_eq!(raw_price_count(&conn).unwrap(), 1);

        let stored = load_raw_prices(&conn).unwrap();
        assert_eq!(stored["a"].price_90d, 12.0);
        assert_eq!(stored["a"].observed_at, 2_000);
    }

    #[test]
    fn upsert_inserts_missing_records_in_compare_mode() {
        let mut conn = test_db();
        upsert_raw_prices(
            &mut conn,
            &[raw_price("a", "ember_prime_chassis", 10.0, 9.0, 1_000)],
            true,
        )
        .unwrap();

        let result = upsert_raw_prices(
            &mut conn,
            &[raw_price("b", "nova_prime_chassis", 20.0, 19.0, 1_000)],
            false,
        )
        .unwrap();
        assert_eq!(result.inserted, 1);
        assert_eq!(raw_price_count(&conn).unwrap(), 2);
    }

    #[test]
    fn set_documents_round_trip_through_json_column() {
        let mut conn = test_db();
        let doc = set_doc(
            "ember_prime_set",
            "set1",
            vec![part_entry(
                "ember_prime_chassis",
                "part1",
                &[("axi_a1_relic", "rare")],
            )],
        );

        upsert_sets(&mut conn, &[doc.clone()], true).unwrap();

        let loaded = load_sets(&conn).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0], doc);
        assert_eq!(loaded[0].parts[0].sources[0].relic_url, "axi_a1_relic");
    }

    #[test]
    fn set_upsert_skips_identical_documents() {
        let mut conn = test_db();
        let doc = set_doc("ember_prime_set", "set1", vec![]);
        upsert_sets(&mut conn, &[doc.clone()], true).unwrap();

        let result = upsert_sets(&mut conn, &[doc], false).unwrap();
        assert_eq!(result.skipped, 1);
        assert_eq!(result.writes(), 0);
    }

    #[test]
    fn relic_documents_round_trip_through_json_column() {
        let mut conn = test_db();
        let doc = relic_doc(
            "axi_a1_relic",
            "relic1",
            vec![
                reward("ember_prime_chassis", "part1", "rare"),
                RewardEntry::bonus("common"),
            ],
        );

        upsert_relics(&mut conn, &[doc.clone()], true).unwrap();

        let loaded = load_relics(&conn).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0], doc);
        assert!(loaded[0].rewards[1].is_bonus());
    }

    #[test]
    fn refresh_set_prices_joins_raw_records() {
        let mut conn = test_db();
        let doc = set_doc(
            "ember_prime_set",
            "set1",
            vec![part_entry("ember_prime_chassis", "part1", &[])],
        );
        upsert_sets(&mut conn, &[doc], true).unwrap();

        let raw: HashMap<String, RawPrice> = [
            raw_price("set1", "ember_prime_set", 120.0, 110.0, 2_000),
            raw_price("part1", "ember_prime_chassis", 15.0, 14.0, 2_000),
        ]
        .into_iter()
        .map(|r| (r.item_id.clone(), r))
        .collect();

        let rewritten = refresh_set_prices(&mut conn, &raw).unwrap();
        assert_eq!(rewritten, 1);

        let loaded = load_sets(&conn).unwrap();
        assert_eq!(loaded[0].set_p90d, 120.0);
        assert_eq!(loaded[0].parts[0].price_90d, 15.0);
        assert_eq!(loaded[0].parts[0].price_48h, 14.0);
    }

    #[test]
    fn refresh_set_prices_without_matches_writes_nothing() {
        let mut conn = test_db();
        let doc = set_doc("ember_prime_set", "set1", vec![]);
        upsert_sets(&mut conn, &[doc], true).unwrap();

        let rewritten = refresh_set_prices(&mut conn, &HashMap::new()).unwrap();
        assert_eq!(rewritten, 0);
    }

    #[test]
    fn refresh_relic_prices_leaves_bonus_rewards_alone() {
        let mut conn = test_db();
        let doc = relic_doc(
            "axi_a1_relic",
            "relic1",
            vec![
                reward("ember_prime_chassis", "part1", "rare"),
                RewardEntry::bonus("common"),
            ],
        );
        upsert_relics(&mut conn, &[doc], true).unwrap();

        let raw: HashMap<String, RawPrice> = [
            raw_price("relic1", "axi_a1_relic", 8.0, 7.0, 2_000),
            raw_price("part1", "ember_prime_chassis", 30.0, 28.0, 2_000),
        ]
        .into_iter()
        .map(|r| (r.item_id.clone(), r))
        .collect();

        let rewritten = refresh_relic_prices(&mut conn, &raw).unwrap();
        assert_eq!(rewritten, 1);

        let loaded = load_relics(&conn).unwrap();
        assert_eq!(loaded[0].price_90d, 8.0);
        assert_eq!(loaded[0].rewards[0].price_90d, Some(30.0));
        let bonus = &loaded[0].rewards[1];
        assert!(bonus.is_bonus());
        assert_eq!(bonus.price_90d, None);
        assert_eq!(bonus.price_48h, None);
    }
}
