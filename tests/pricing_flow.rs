//! End-to-end pricing flows driven through the HTTP router over the
//! in-memory store and cache backends.

#![allow(clippy::panic, clippy::indexing_slicing)]

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use tower::ServiceExt;

use hotel_pricing::api;
use hotel_pricing::app_state::AppState;
use hotel_pricing::cache::{CacheBackend, CacheTtls, FailingBackend, MemoryBackend, PriceCache};
use hotel_pricing::config::EngineConfig;
use hotel_pricing::domain::{OccupancySnapshot, RoomId, RoomPricingState};
use hotel_pricing::notify::{ApprovalNotification, Notifier, NotifyError};
use hotel_pricing::persistence::{MemoryStore, OccupancyProvider, PricingStore};

#[derive(Debug, Default)]
struct Recorder {
    sent: Mutex<Vec<ApprovalNotification>>,
}

#[async_trait]
impl Notifier for Recorder {
    async fn notify(&self, notification: &ApprovalNotification) -> Result<(), NotifyError> {
        self.sent.lock().push(notification.clone());
        Ok(())
    }
}

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    notifier: Arc<Recorder>,
}

fn app_with(primary: Arc<dyn CacheBackend>) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(Recorder::default());
    let cache = Arc::new(PriceCache::new(primary, "it", CacheTtls::default(), 1000));
    let state = AppState::new(
        Arc::clone(&store) as Arc<dyn PricingStore>,
        Arc::clone(&store) as Arc<dyn OccupancyProvider>,
        cache,
        Arc::clone(&notifier) as Arc<dyn Notifier>,
        EngineConfig::default(),
    );
    TestApp {
        router: api::build_router().with_state(state),
        store,
        notifier,
    }
}

fn app() -> TestApp {
    app_with(Arc::new(MemoryBackend::new()))
}

fn seed_room(store: &MemoryStore, occupancy_rate: f64) -> RoomId {
    let room_id = RoomId::new();
    store.put_room(RoomPricingState {
        room_id,
        name: "Deluxe King".into(),
        base_price: dec!(500000),
        price_per_night: Some(dec!(500000)),
        min_auto_price: Some(dec!(450000)),
        max_auto_price: Some(dec!(700000)),
        auto_pricing_enabled: true,
    });
    store.put_occupancy(OccupancySnapshot {
        room_id,
        date: Utc::now().date_naive(),
        total_allotment: 10,
        booked_units: 9,
        available_units: 1,
        occupancy_rate,
        demand_score: 9.0,
    });
    room_id
}

async fn call(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    };
    let Ok(request) = request else {
        panic!("bad request {method} {uri}");
    };
    let Ok(response) = router.clone().oneshot(request).await else {
        panic!("router failed on {method} {uri}");
    };
    let status = response.status();
    let Ok(bytes) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
        panic!("unreadable body");
    };
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn decimal(value: &Value) -> Decimal {
    let Some(raw) = value.as_str() else {
        panic!("expected decimal string, got {value}");
    };
    let Ok(d) = Decimal::from_str(raw) else {
        panic!("not a decimal: {raw}");
    };
    d
}

#[tokio::test]
async fn high_occupancy_event_goes_through_approval() {
    let t = app();
    let room_id = seed_room(&t.store, 90.0);

    let (status, event) = call(
        &t.router,
        "POST",
        "/api/v1/pricing/events",
        Some(json!({ "event_type": "occupancy_update", "room_id": room_id, "priority": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(event["status"], "pending");

    let (status, body) = call(&t.router, "POST", "/api/v1/pricing/process", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["result"]["events_processed"], 1);
    assert_eq!(body["result"]["approvals_created"], 1);
    assert_eq!(body["result"]["prices_updated"], 0);
    assert_eq!(body["result"]["errors"], 0);
    assert_eq!(t.notifier.sent.lock().len(), 1);
    assert_eq!(t.store.room(room_id).map(|r| r.base_price), Some(dec!(500000)));

    let event_id = event["id"].as_str().unwrap_or_default().to_string();
    let (_, stored) = call(&t.router, "GET", &format!("/api/v1/pricing/events/{event_id}"), None).await;
    assert_eq!(stored["status"], "completed");
    assert_eq!(stored["processed"], true);

    let (status, list) = call(&t.router, "GET", "/api/v1/approvals?status=pending", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["total"], 1);
    let approval = &list["data"][0];
    assert_eq!(decimal(&approval["new_price"]), dec!(650000));
    assert_eq!(decimal(&approval["price_change_percentage"]), dec!(30));

    let approval_id = approval["id"].as_str().unwrap_or_default().to_string();
    let (status, approved) = call(
        &t.router,
        "POST",
        &format!("/api/v1/approvals/{approval_id}/approve"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], "approved");
    assert_eq!(t.store.room(room_id).map(|r| r.base_price), Some(dec!(650000)));

    let (status, quote) = call(&t.router, "GET", &format!("/api/v1/rooms/{room_id}/price"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&quote["price"]), dec!(650000));
    assert_eq!(quote["source"], "cache");

    let (status, again) = call(
        &t.router,
        "POST",
        &format!("/api/v1/approvals/{approval_id}/reject"),
        Some(json!({ "reason": "too late" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(again["error"]["code"], 2003);
}

#[tokio::test]
async fn empty_queue_is_a_successful_run() {
    let t = app();
    let (status, body) = call(&t.router, "POST", "/api/v1/pricing/process", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    for counter in ["events_processed", "prices_updated", "approvals_created", "errors"] {
        assert_eq!(body["result"][counter], 0, "{counter}");
    }

    let (status, metrics) = call(&t.router, "GET", "/api/v1/pricing/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(metrics["events_processed"], 0);
}

#[tokio::test]
async fn claim_failure_returns_500_envelope() {
    let t = app();
    t.store.fail_claims(true);
    let (status, body) = call(&t.router, "POST", "/api/v1/pricing/process", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
}

#[tokio::test]
async fn failing_event_exhausts_retries_over_three_runs() {
    let t = app();
    let room_id = seed_room(&t.store, 80.0);
    t.store.fail_occupancy_for(room_id);
    let (_, event) = call(
        &t.router,
        "POST",
        "/api/v1/pricing/events",
        Some(json!({ "event_type": "booking_change", "room_id": room_id })),
    )
    .await;
    let event_id = event["id"].as_str().unwrap_or_default().to_string();

    for _ in 0..3 {
        let (status, body) = call(&t.router, "POST", "/api/v1/pricing/process", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["errors"], 1);
    }
    let (_, stored) = call(&t.router, "GET", &format!("/api/v1/pricing/events/{event_id}"), None).await;
    assert_eq!(stored["status"], "failed");
    assert_eq!(stored["retry_count"], 3);
    assert_eq!(stored["processed"], false);

    let (_, body) = call(&t.router, "POST", "/api/v1/pricing/process", None).await;
    assert_eq!(body["result"]["events_processed"], 0);
    assert_eq!(body["result"]["errors"], 0);
}

#[tokio::test]
async fn cache_outage_degrades_to_fallback() {
    let t = app_with(Arc::new(FailingBackend));
    let room_id = seed_room(&t.store, 75.0);

    let (status, health) = call(&t.router, "GET", "/health/cache", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(health["primary_healthy"], false);

    let (status, first) = call(&t.router, "GET", &format!("/api/v1/rooms/{room_id}/price"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["source"], "room");

    let (status, second) = call(&t.router, "GET", &format!("/api/v1/rooms/{room_id}/price"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["source"], "cache");
    assert_eq!(decimal(&second["price"]), dec!(500000));
}

#[tokio::test]
async fn rejects_bad_input() {
    let t = app();
    let (status, body) = call(
        &t.router,
        "POST",
        "/api/v1/pricing/events",
        Some(json!({ "event_type": "  ", "room_id": RoomId::new() })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 1001);

    let (status, _) = call(&t.router, "GET", "/api/v1/approvals?status=maybe", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&t.router, "GET", &format!("/api/v1/rooms/{}/price", RoomId::new()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, health) = call(&t.router, "GET", "/health/cache", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
}
