//! Monitor tests against a fake REST backend served by Axum.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use evdealer_agent::config::AgentConfig;
use evdealer_agent::monitor;
use evdealer_backend::{ApiConfig, DealerApi};
use evdealer_core::availability::StockKey;
use evdealer_pipeline::AvailabilityService;
use evdealer_stock::AvailabilityStore;

async fn stock(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
    let version_id: i64 = params["version_id"].parse().unwrap();
    let color_id: i64 = params["color_id"].parse().unwrap();
    if color_id == 999 {
        return (StatusCode::INTERNAL_SERVER_ERROR, "stock service down").into_response();
    }
    Json(json!({"data": {
        "version_id": version_id,
        "color_id": color_id,
        "quantity": 4,
        "updated_at": "2026-10-18T08:00:00Z",
    }}))
    .into_response()
}

async fn spawn_backend() -> String {
    let router = Router::new().route("/api/v1/stock", get(stock));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn warm_resolves_reachable_keys_and_skips_failures() {
    let base_url = spawn_backend().await;
    let api = DealerApi::new(&ApiConfig {
        base_url,
        ..Default::default()
    })
    .unwrap();
    let store = Arc::new(AvailabilityStore::default());
    let availability = AvailabilityService::new(Arc::new(api), Arc::clone(&store));

    let good = StockKey::new(11, 101);
    let bad = StockKey::new(11, 999);
    let entries = monitor::warm(&availability, &[good, bad]).await;

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].key, good);
    assert_eq!(entries[0].quantity, 4);
    assert_eq!(store.get(&good).await.unwrap().quantity, 4);
    assert!(store.get(&bad).await.is_none());
}

#[tokio::test]
async fn run_stops_on_shutdown_without_push_channel() {
    let base_url = spawn_backend().await;
    let vars: HashMap<&str, String> = HashMap::from([
        ("BACKEND_API_URL", base_url),
        // Nothing listens here; the listener keeps retrying in the background.
        ("STOCK_WS_URL", "ws://127.0.0.1:9/ws/stock".to_string()),
        ("RECONNECT_INITIAL_MS", "10".to_string()),
        ("WATCH_KEYS", "11:101".to_string()),
    ]);
    let config = AgentConfig::from_lookup(|name| vars.get(name).cloned()).unwrap();

    let result = tokio::time::timeout(
        Duration::from_secs(10),
        monitor::run(&config, tokio::time::sleep(Duration::from_millis(200))),
    )
    .await
    .unwrap();

    assert!(result.is_ok());
}
