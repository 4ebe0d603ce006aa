//! In-process scenario tests for the payout HTTP surface.
//!
//! The router is driven with `tower::ServiceExt::oneshot`, backed by the
//! in-memory order store and a recording notifier. Tests that wait for
//! deferred payouts run on paused tokio time.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use reward_api::{app, AppState};
use reward_core::{Notifier, Order, OrderStatus, PayoutResult};
use reward_engine::{InMemoryOrderRepository, LifecycleEngine, PayoutPolicy, RandomSource, ScriptedRandom, ThreadRandom};
use tower::ServiceExt; // oneshot
use url::Url;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RecordingNotifier {
    calls: Mutex<Vec<(Url, Order)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, callback_url: &Url, order: &Order) -> PayoutResult<()> {
        self.calls.lock().unwrap().push((callback_url.clone(), order.clone()));
        Ok(())
    }
}

struct Harness {
    router: axum::Router,
    engine: LifecycleEngine,
    notifier: Arc<RecordingNotifier>,
}

fn harness_with(policy: PayoutPolicy, random: Arc<dyn RandomSource>) -> Harness {
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = LifecycleEngine::new(
        Arc::new(InMemoryOrderRepository::new()),
        notifier.clone(),
        Arc::new(policy),
        random,
    );
    Harness {
        router: app(AppState::new(engine.clone())),
        engine,
        notifier,
    }
}

fn harness() -> Harness {
    harness_with(PayoutPolicy::default(), Arc::new(ThreadRandom))
}

async fn call(router: &axum::Router, req: Request<Body>) -> (StatusCode, Bytes) {
    let resp = router.clone().oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    (status, body)
}

fn parse_json(b: Bytes) -> serde_json::Value {
    serde_json::from_slice(&b).expect("body is not valid JSON")
}

/// Success bodies carry their payload under `data`.
fn data_of(b: Bytes) -> serde_json::Value {
    let mut json = parse_json(b);
    let data = json.get_mut("data").expect("success body has a data envelope").take();
    assert!(json.get("error").is_none());
    data
}

fn payout_request(path: &str, sc_id: Uuid, callback: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json");
    if let Some(url) = callback {
        builder = builder.header("x-callback-url", url);
    }
    builder
        .body(Body::from(serde_json::json!({ "scId": sc_id }).to_string()))
        .unwrap()
}

fn status_request(order_id: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(format!("/r2/payout/status?order-id={}", order_id))
        .body(Body::empty())
        .unwrap()
}

fn status_of(json: &serde_json::Value) -> OrderStatus {
    serde_json::from_value(json["status"].clone()).expect("status field")
}

// ---------------------------------------------------------------------------
// POST /r1/payout
// ---------------------------------------------------------------------------

#[tokio::test]
async fn r1_returns_terminal_status_matching_store() {
    let h = harness();
    let sc_id = Uuid::new_v4();

    let (status, body) = call(&h.router, payout_request("/r1/payout", sc_id, None)).await;
    assert_eq!(status, StatusCode::OK);

    let json = data_of(body);
    let returned = status_of(&json);
    assert!(returned.is_terminal());

    let stored = h.engine.find_by_sc_id(sc_id).await.unwrap().expect("order stored");
    assert_eq!(json["orderId"], stored.order_id.to_string());
    assert_eq!(stored.status, returned);
    assert_eq!(h.engine.in_flight(), 0);
}

#[tokio::test]
async fn r1_wraps_payload_in_data_envelope() {
    let h = harness();

    let (status, body) = call(&h.router, payout_request("/r1/payout", Uuid::new_v4(), None)).await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    let fields: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(fields, ["data"]);
    assert!(json["data"]["orderId"].is_string());
    assert!(json["data"]["status"].is_string());
}

#[tokio::test]
async fn r1_duplicate_requests_create_two_orders() {
    let h = harness();
    let sc_id = Uuid::new_v4();

    let (_, first) = call(&h.router, payout_request("/r1/payout", sc_id, None)).await;
    let (_, second) = call(&h.router, payout_request("/r1/payout", sc_id, None)).await;

    assert_ne!(data_of(first)["orderId"], data_of(second)["orderId"]);
}

// ---------------------------------------------------------------------------
// POST /r2/payout + GET /r2/payout/status
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn r2_pending_then_terminal_after_max_pending() {
    let h = harness();
    let sc_id = Uuid::new_v4();

    let (status, body) = call(&h.router, payout_request("/r2/payout", sc_id, None)).await;
    assert_eq!(status, StatusCode::OK);
    let json = data_of(body);
    assert_eq!(json["status"], "PENDING");
    let order_id = json["orderId"].as_str().unwrap().to_string();

    let stored = h.engine.find_by_sc_id(sc_id).await.unwrap().unwrap();
    assert_eq!(stored.order_id.to_string(), order_id);
    assert_eq!(stored.status, OrderStatus::Pending);

    tokio::time::sleep(Duration::from_secs(11)).await;

    let (status, body) = call(&h.router, status_request(&order_id)).await;
    assert_eq!(status, StatusCode::OK);
    let settled = status_of(&data_of(body));
    assert!(settled.is_terminal());
    assert!(h.notifier.calls.lock().unwrap().is_empty());

    // Terminal status is stable
    tokio::time::sleep(Duration::from_secs(20)).await;
    for _ in 0..3 {
        let (_, body) = call(&h.router, status_request(&order_id)).await;
        assert_eq!(status_of(&data_of(body)), settled);
    }
}

#[tokio::test]
async fn status_errors_map_to_client_codes() {
    let h = harness();

    let (status, body) = call(&h.router, status_request(&Uuid::new_v4().to_string())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(parse_json(body)["error"].as_str().unwrap().contains("not found"));

    let (status, _) = call(&h.router, status_request("definitely-not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let missing = Request::builder()
        .method("GET")
        .uri("/r2/payout/status")
        .body(Body::empty())
        .unwrap();
    let (status, _) = call(&h.router, missing).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn status_reads_r1_orders_too() {
    let h = harness();
    let (_, body) = call(&h.router, payout_request("/r1/payout", Uuid::new_v4(), None)).await;
    let created = data_of(body);

    let (status, body) = call(&h.router, status_request(created["orderId"].as_str().unwrap())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data_of(body)["status"], created["status"]);
}

// ---------------------------------------------------------------------------
// POST /r3/payout
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn r3_notifies_callback_exactly_once() {
    let h = harness();
    let sc_id = Uuid::new_v4();
    let callback = "https://local.testing/completedOrder";

    let (status, body) = call(&h.router, payout_request("/r3/payout", sc_id, Some(callback))).await;
    assert_eq!(status, StatusCode::OK);
    let json = data_of(body);
    assert_eq!(json["status"], "PENDING");

    tokio::time::sleep(Duration::from_secs(11)).await;

    let stored = h.engine.find_by_sc_id(sc_id).await.unwrap().unwrap();
    assert!(stored.status.is_terminal());

    let calls = h.notifier.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0.as_str(), callback);
    assert_eq!(calls[0].1.order_id, stored.order_id);
    assert_eq!(calls[0].1.status, stored.status);
}

#[tokio::test]
async fn r3_rejects_missing_or_invalid_callback() {
    let h = harness();

    for callback in [None, Some("not a url"), Some("/relative"), Some("ftp://host/file")] {
        let sc_id = Uuid::new_v4();
        let (status, body) = call(&h.router, payout_request("/r3/payout", sc_id, callback)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "callback {:?}", callback);
        assert!(parse_json(body)["error"].as_str().unwrap().contains("x-callback-url"));
        assert!(h.engine.find_by_sc_id(sc_id).await.unwrap().is_none());
    }
    assert_eq!(h.engine.in_flight(), 0);
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_bodies_are_rejected() {
    let h = harness();

    let bodies = [
        "{}".to_string(),
        r#"{"scId": "not-a-uuid"}"#.to_string(),
        serde_json::json!({ "scId": Uuid::nil() }).to_string(),
        "not json".to_string(),
    ];

    for path in ["/r1/payout", "/r2/payout", "/r3/payout"] {
        for body in &bodies {
            let req = Request::builder()
                .method("POST")
                .uri(path)
                .header("content-type", "application/json")
                .header("x-callback-url", "https://local.testing/cb")
                .body(Body::from(body.clone()))
                .unwrap();
            let (status, _) = call(&h.router, req).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{} with {}", path, body);
        }
    }

    let no_content_type = Request::builder()
        .method("POST")
        .uri("/r1/payout")
        .body(Body::from(serde_json::json!({ "scId": Uuid::new_v4() }).to_string()))
        .unwrap();
    let (status, _) = call(&h.router, no_content_type).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Force success
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn force_success_settles_every_mode_as_success() {
    // Every coin flip would say FAILED
    let h = harness_with(
        PayoutPolicy::new(true, 10),
        Arc::new(ScriptedRandom::new().with_flips([false; 32])),
    );

    let mut order_ids = Vec::new();
    for (path, callback) in [
        ("/r1/payout", None),
        ("/r2/payout", None),
        ("/r3/payout", Some("https://local.testing/cb")),
    ] {
        let (_, body) = call(&h.router, payout_request(path, Uuid::new_v4(), callback)).await;
        order_ids.push(data_of(body)["orderId"].as_str().unwrap().to_string());
    }

    tokio::time::sleep(Duration::from_secs(11)).await;

    for order_id in &order_ids {
        let (_, body) = call(&h.router, status_request(order_id)).await;
        assert_eq!(data_of(body)["status"], "SUCCESS");
    }
    assert_eq!(h.notifier.calls.lock().unwrap()[0].1.status, OrderStatus::Success);
}

#[tokio::test(start_paused = true)]
async fn policy_changes_apply_to_next_decision() {
    let h = harness_with(
        PayoutPolicy::new(false, 10),
        Arc::new(ScriptedRandom::new().with_flips([false; 32])),
    );

    let (_, body) = call(&h.router, payout_request("/r1/payout", Uuid::new_v4(), None)).await;
    assert_eq!(data_of(body)["status"], "FAILED");

    h.engine.policy().set_force_success(true);

    let (_, body) = call(&h.router, payout_request("/r1/payout", Uuid::new_v4(), None)).await;
    assert_eq!(data_of(body)["status"], "SUCCESS");
}

// ---------------------------------------------------------------------------
// System routes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_service_and_request_id() {
    let h = harness();
    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let resp = h.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));

    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = parse_json(body);
    assert_eq!(json["ok"], true);
    assert_eq!(json["service"], "reward-service-mock");
}

#[tokio::test]
async fn request_id_is_propagated() {
    let h = harness();
    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .header("x-request-id", "abc-123")
        .body(Body::empty())
        .unwrap();

    let resp = h.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.headers()["x-request-id"], "abc-123");
}

#[tokio::test]
async fn credit_accepts_any_body() {
    let h = harness();
    let req = Request::builder()
        .method("PUT")
        .uri("/credit")
        .body(Body::from(r#"{"status":"SUCCESS"}"#))
        .unwrap();

    let (status, body) = call(&h.router, req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
}
