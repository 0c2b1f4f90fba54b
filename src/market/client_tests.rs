//! Tests for the rate-limited market client.

use std::time::Duration;

use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::MarketClient;
use crate::error::SyncError;

/// Statistics body with a single closed-window point at `avg`.
fn statistics_json(avg: f64) -> serde_json::Value {
    serde_json::json!({
        "payload": {
            "statistics_closed": {"90days": [{"avg_price": avg}]},
            "statistics_live": {"48hours": [{"avg_price": avg}]}
        }
    })
}

fn items_json(names: &[(&str, &str)]) -> serde_json::Value {
    let items: Vec<serde_json::Value> = names
        .iter()
        .map(|(id, name)| serde_json::json!({"id": id, "url_name": name}))
        .collect();
    serde_json::json!({"payload": {"items": items}})
}

/// Client pointed at a mock server, with no pacing delay so tests stay fast.
fn test_client(server: &MockServer) -> MarketClient {
    MarketClient::with_config(server.uri(), 3, Duration::ZERO)
}

// ── items ────────────────────────────────────────────────────────────

#[tokio::test]
async fn items_returns_catalog() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(items_json(&[
            ("id1", "ember_prime_set"),
            ("id2", "axi_a1_relic"),
        ])))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let items = client.items().await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].url_name, "ember_prime_set");
    assert_eq!(items[1].id, "id2");
}

#[tokio::test]
async fn items_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = test_client(&server);
    match client.items().await {
        Err(SyncError::HttpStatus(status)) => {
            assert_eq!(status, reqwest::StatusCode::SERVICE_UNAVAILABLE);
        }
        other => panic!("Expected HttpStatus error, got: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{ not json"))
        .mount(&server)
        .await;

    let client = test_client(&server);
    assert!(client.items().await.is_err());
}

// ── statistics ───────────────────────────────────────────────────────

#[tokio::test]
async fn statistics_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items/ember_prime_chassis/statistics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(statistics_json(14.5)))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let stats = client.statistics("ember_prime_chassis").await.unwrap();
    assert_eq!(stats.statistics_closed.days_90[0].avg_price, Some(14.5));
}

#[tokio::test]
async fn statistics_404() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = test_client(&server);
    match client.statistics("nonexistent_item").await {
        Err(SyncError::HttpStatus(status)) => {
            assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
        }
        other => panic!("Expected HttpStatus error, got: {other:?}"),
    }
}

// ── fetch_all_statistics ─────────────────────────────────────────────

#[tokio::test]
async fn batch_preserves_order_and_isolates_failures() {
    let server = MockServer::start().await;

    // Items 3 and 7 fail; everything else answers with its own index as
    // the price so slots can be told apart.
    for i in 0..10 {
        let mock = Mock::given(method("GET")).and(path(format!("/items/item_{i}/statistics")));
        let mock = if i == 3 || i == 7 {
            mock.respond_with(ResponseTemplate::new(500))
        } else {
            mock.respond_with(ResponseTemplate::new(200).set_body_json(statistics_json(i as f64)))
        };
        mock.mount(&server).await;
    }

    let client = test_client(&server);
    let names: Vec<String> = (0..10).map(|i| format!("item_{i}")).collect();
    let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();

    let results = client.fetch_all_statistics(&name_refs).await;
    assert_eq!(results.len(), 10);

    for (i, result) in results.iter().enumerate() {
        if i == 3 || i == 7 {
            assert!(result.is_err(), "slot {i} should have failed");
        } else {
            let stats = result.as_ref().unwrap();
            assert_eq!(
                stats.statistics_closed.days_90[0].avg_price,
                Some(i as f64),
                "slot {i} carries the wrong payload"
            );
        }
    }
}

#[tokio::test]
async fn batch_never_exceeds_concurrency_ceiling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/items/.+/statistics$"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(statistics_json(1.0))
                .set_delay(Duration::from_millis(20)),
        )
        .mount(&server)
        .await;

    let client = test_client(&server);
    let names: Vec<String> = (0..50).map(|i| format!("item_{i}")).collect();
    let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();

    let results = client.fetch_all_statistics(&name_refs).await;
    assert_eq!(results.len(), 50);
    assert!(results.iter().all(Result::is_ok));
    assert!(
        client.peak_in_flight() <= 3,
        "peak in flight was {}",
        client.peak_in_flight()
    );
}

// ── dropsources ──────────────────────────────────────────────────────

#[tokio::test]
async fn dropsources_parses_include_side() {
    let server = MockServer::start().await;
    let body = serde_json::json!({
        "payload": {
            "dropsources": [{"relic": "relic_id_1,relic_id_2", "rarity": "uncommon"}]
        },
        "include": {
            "item": {
                "items_in_set": [{
                    "url_name": "ember_prime_chassis",
                    "id": "part1",
                    "ducats": 45,
                    "trading_tax": 2000,
                    "quantity_for_set": 1,
                    "en": {"item_name": "Ember Prime Chassis"}
                }]
            }
        }
    });
    Mock::given(method("GET"))
        .and(path("/items/ember_prime_chassis/dropsources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let resp = client.dropsources_with_item("ember_prime_chassis").await.unwrap();
    assert_eq!(resp.payload.dropsources[0].rarity.as_deref(), Some("uncommon"));
    let parts = resp.items_in_set();
    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].ducats, Some(45));
    assert_eq!(parts[0].en.item_name, "Ember Prime Chassis");
}
