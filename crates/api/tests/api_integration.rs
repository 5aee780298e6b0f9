//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use api::AppState;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusHandle;
use payments::{DEFAULT_RETURN_URL, InMemoryPaymentLedger, LocalGateway};
use rooms::{InMemoryRoomStore, InMemoryRouteHistory};
use serde_json::{Value, json};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> axum::Router {
    api::create_app(api::create_default_state(), get_metrics_handle())
}

fn setup_with_gateway() -> (axum::Router, LocalGateway) {
    let gateway = LocalGateway::new();
    let state = AppState::new(
        Arc::new(InMemoryRoomStore::new()),
        Arc::new(InMemoryPaymentLedger::new()),
        Arc::new(gateway.clone()),
        Arc::new(InMemoryRouteHistory::new()),
        DEFAULT_RETURN_URL,
    );
    let app = api::create_app(Arc::new(state), get_metrics_handle());
    (app, gateway)
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    caller: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user_id) = caller {
        builder = builder.header("x-user-id", user_id);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

fn room_body(capacity: u32) -> Value {
    json!({
        "capacity": capacity,
        "start_location": { "latitude": 55.7558, "longitude": 37.6173, "address": "Red Square" },
        "end_location": { "latitude": 55.9726, "longitude": 37.4146, "address": "Airport" }
    })
}

async fn create_room(app: &axum::Router, driver: &str, capacity: u32) -> String {
    let (status, room) = send(app, "POST", "/rooms", Some(driver), Some(room_body(capacity))).await;
    assert_eq!(status, StatusCode::CREATED);
    room["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();
    let (status, json) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].as_str().is_some());
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().starts_with("text/plain"));
}

#[tokio::test]
async fn test_create_room_requires_caller() {
    let app = setup();
    let (status, json) = send(&app, "POST", "/rooms", None, Some(room_body(3))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "unauthenticated");

    let (status, _) = send(&app, "POST", "/rooms", Some("  "), Some(room_body(3))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_and_get_room() {
    let app = setup();
    let room_id = create_room(&app, "driver-1", 3).await;

    let (status, room) = send(&app, "GET", &format!("/rooms/{room_id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(room["id"], room_id.as_str());
    assert_eq!(room["creator_id"], "driver-1");
    assert_eq!(room["status"], "waiting");
    assert_eq!(room["members"], json!(["driver-1"]));
    assert_eq!(room["member_count"], 1);
    assert_eq!(room["start_location"]["address"], "Red Square");
}

#[tokio::test]
async fn test_create_room_rejects_zero_capacity() {
    let app = setup();
    let (status, json) = send(&app, "POST", "/rooms", Some("driver-1"), Some(room_body(0))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "invalid_argument");
    assert_eq!(json["error"], "capacity must be positive");
}

#[tokio::test]
async fn test_get_nonexistent_room() {
    let app = setup();
    let (status, json) = send(&app, "GET", "/rooms/no-such-room", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "not_found");
}

#[tokio::test]
async fn test_join_until_full() {
    let app = setup();
    let room_id = create_room(&app, "driver-1", 2).await;

    let (status, room) = send(
        &app,
        "POST",
        &format!("/rooms/{room_id}/join"),
        Some("passenger-1"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(room["members"], json!(["driver-1", "passenger-1"]));

    let (status, json) = send(
        &app,
        "POST",
        &format!("/rooms/{room_id}/join"),
        Some("passenger-2"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "failed_precondition");
    assert_eq!(json["error"], "room is full");

    let (_, room) = send(&app, "GET", &format!("/rooms/{room_id}"), None, None).await;
    assert_eq!(room["status"], "full");

    let (_, rooms) = send(&app, "GET", "/rooms", None, None).await;
    assert!(
        !rooms
            .as_array()
            .unwrap()
            .iter()
            .any(|r| r["id"] == room_id.as_str())
    );
}

#[tokio::test]
async fn test_exit_room() {
    let app = setup();
    let room_id = create_room(&app, "driver-1", 3).await;
    send(
        &app,
        "POST",
        &format!("/rooms/{room_id}/join"),
        Some("passenger-1"),
        None,
    )
    .await;

    let (status, json) = send(
        &app,
        "POST",
        &format!("/rooms/{room_id}/exit"),
        Some("passenger-1"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);

    let (_, room) = send(&app, "GET", &format!("/rooms/{room_id}"), None, None).await;
    assert_eq!(room["members"], json!(["driver-1"]));
}

#[tokio::test]
async fn test_complete_ride_settles_every_member() {
    let app = setup();
    let room_id = create_room(&app, "driver-1", 3).await;
    for passenger in ["passenger-1", "passenger-2"] {
        let (status, _) = send(
            &app,
            "POST",
            &format!("/rooms/{room_id}/join"),
            Some(passenger),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, receipt) = send(
        &app,
        "POST",
        &format!("/rooms/{room_id}/complete"),
        Some("driver-1"),
        Some(json!({ "total_price": 900.0, "distance_km": 32.5 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["total_price"], 900.0);
    assert_eq!(receipt["cost_per_member"], 300.0);
    assert_eq!(receipt["payments_count"], 3);

    let (status, json) = send(
        &app,
        "POST",
        &format!("/rooms/{room_id}/complete"),
        Some("driver-1"),
        Some(json!({ "total_price": 900.0, "distance_km": 32.5 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "already_exists");

    let (status, json) = send(
        &app,
        "POST",
        &format!("/rooms/{room_id}/join"),
        Some("passenger-3"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "ride already completed");

    let (status, history) = send(&app, "GET", "/payments/history", Some("passenger-1"), None).await;
    assert_eq!(status, StatusCode::OK);
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["status"], "succeeded");
    assert_eq!(history[0]["amount"], 300.0);
    assert_eq!(history[0]["currency"], "RUB");

    let payment_id = history[0]["payment_id"].as_str().unwrap();
    let (status, details) = send(&app, "GET", &format!("/payments/{payment_id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["record"]["payment_id"], payment_id);
    assert_eq!(details["gateway"]["status"], "succeeded");
    assert_eq!(details["gateway"]["amount"]["value"], "300.00");
}

#[tokio::test]
async fn test_route_history_after_completion() {
    let app = setup();
    let room_id = create_room(&app, "driver-1", 2).await;
    send(
        &app,
        "POST",
        &format!("/rooms/{room_id}/join"),
        Some("passenger-1"),
        None,
    )
    .await;
    let (status, _) = send(
        &app,
        "POST",
        &format!("/rooms/{room_id}/complete"),
        Some("driver-1"),
        Some(json!({ "total_price": 500.0, "distance_km": 12.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The route is written in the background.
    let mut routes = Vec::new();
    for _ in 0..50 {
        let (status, json) = send(&app, "GET", "/routes/history", Some("passenger-1"), None).await;
        assert_eq!(status, StatusCode::OK);
        routes = json.as_array().cloned().unwrap_or_default();
        if !routes.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0]["room_id"], room_id.as_str());
    assert_eq!(routes[0]["driver_id"], "driver-1");
    assert_eq!(routes[0]["start_point"], "Red Square");
    assert_eq!(routes[0]["distance_km"], 12.0);

    let (status, _) = send(&app, "GET", "/routes/history", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_process_and_refund_payments() {
    let (app, gateway) = setup_with_gateway();

    let (status, settled) = send(
        &app,
        "POST",
        "/payments/process",
        None,
        Some(json!({
            "room_id": "room-42",
            "user_ids": ["u1", "u2"],
            "amount_per_user": 250.0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settled["success"], true);
    assert_eq!(settled["payments"].as_array().unwrap().len(), 2);
    assert_eq!(gateway.charge_count(), 2);

    let (status, refund) = send(
        &app,
        "POST",
        "/payments/refund",
        None,
        Some(json!({ "room_id": "room-42" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(refund["success"], true);
    let refunded = refund["refunded"].as_array().unwrap();
    assert_eq!(refunded.len(), 2);
    assert!(refunded.iter().all(|r| r["status"] == "refunded"));
    assert!(refunded.iter().all(|r| r["description"] == "Ride cancelled"));
    assert_eq!(gateway.refund_count(), 2);

    let (_, refund) = send(
        &app,
        "POST",
        "/payments/refund",
        None,
        Some(json!({ "room_id": "room-42" })),
    )
    .await;
    assert_eq!(refund["refunded"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_process_payment_rejects_bad_amount() {
    let (app, gateway) = setup_with_gateway();
    let (status, json) = send(
        &app,
        "POST",
        "/payments/process",
        None,
        Some(json!({ "room_id": "room-1", "user_ids": ["u1"], "amount_per_user": 0.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "invalid_argument");
    assert_eq!(gateway.charge_count(), 0);
}

#[tokio::test]
async fn test_gateway_failure_is_internal() {
    let (app, gateway) = setup_with_gateway();
    gateway.set_fail_on_create(true);

    let (status, json) = send(
        &app,
        "POST",
        "/payments/process",
        None,
        Some(json!({ "room_id": "room-1", "user_ids": ["u1", "u2"], "amount_per_user": 100.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "internal");

    let (_, history) = send(&app, "GET", "/payments/history", Some("u1"), None).await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["status"], "failed");

    let (_, history) = send(&app, "GET", "/payments/history", Some("u2"), None).await;
    assert!(history.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_get_nonexistent_payment() {
    let app = setup();
    let (status, json) = send(&app, "GET", "/payments/missing", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "not_found");
}

#[tokio::test]
async fn test_malformed_body_uses_error_envelope() {
    let app = setup();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/rooms")
                .header("x-user-id", "driver-1")
                .header("content-type", "application/json")
                .body(Body::from("{\"capacity\": "))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["code"], "invalid_argument");
    assert!(json["error"].as_str().is_some());

    let (status, json) = send(
        &app,
        "POST",
        "/payments/process",
        None,
        Some(json!({ "room_id": "room-1", "amount_per_user": 100.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "invalid_argument");
}
