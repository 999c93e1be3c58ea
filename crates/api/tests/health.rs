//! Integration tests for the operational endpoints and general HTTP behaviour.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{body_json, build_test_app, get, post_json, JOB_ID};
use jobstatus_events::InMemoryBroker;

// ---------------------------------------------------------------------------
// Test: GET /health reports the broker connection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_returns_ok_with_json() {
    let broker = InMemoryBroker::new("de");
    let app = build_test_app(&broker).await;

    let response = get(app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["broker_connected"], true);
}

#[tokio::test]
async fn health_is_degraded_after_failed_reconnect() {
    let broker = InMemoryBroker::new("de");
    let app = build_test_app(&broker).await;
    broker.fail_next_publishes(1);
    broker.fail_next_connects(1);

    let response = post_json(
        app.clone(),
        &format!("/{JOB_ID}/status"),
        r#"{"Hostname":"h1","Message":"m","State":"running"}"#,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(get(app, "/health").await).await;
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["broker_connected"], false);
}

#[tokio::test(start_paused = true)]
async fn health_answers_while_an_update_holds_the_publisher() {
    let broker = InMemoryBroker::new("de");
    let app = build_test_app(&broker).await;
    broker.set_latency(Duration::from_secs(3));

    let in_flight = {
        let app = app.clone();
        tokio::spawn(async move {
            post_json(
                app,
                &format!("/{JOB_ID}/status"),
                r#"{"Hostname":"h1","Message":"m","State":"running"}"#,
            )
            .await
            .status()
        })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    let response = tokio::time::timeout(Duration::from_millis(500), get(app, "/health"))
        .await
        .expect("/health must not wait for the update");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["broker_connected"], true);
    assert!(!in_flight.is_finished());

    assert_eq!(in_flight.await.unwrap(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Test: GET /debug/vars exposes publisher counters
// ---------------------------------------------------------------------------

#[tokio::test]
async fn debug_vars_reports_publisher_stats() {
    let broker = InMemoryBroker::new("de");
    let app = build_test_app(&broker).await;
    broker.fail_next_publishes(1);

    let response = post_json(
        app.clone(),
        &format!("/{JOB_ID}/status"),
        r#"{"Hostname":"h1","Message":"m","State":"running"}"#,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(app, "/debug/vars").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["cmdline"].is_array());
    assert!(json["uptime_secs"].is_u64());
    assert_eq!(json["exchange"], "de");
    assert_eq!(json["routing_key"], "jobs.updates");
    assert_eq!(json["publisher"]["published"], 1);
    assert_eq!(json["publisher"]["publish_failures"], 1);
    assert_eq!(json["publisher"]["reconnect_attempts"], 1);
    assert_eq!(json["publisher"]["reconnect_failures"], 0);
}

// ---------------------------------------------------------------------------
// Test: Unknown route returns 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_route_returns_404() {
    let broker = InMemoryBroker::new("de");
    let app = build_test_app(&broker).await;

    let response = get(app, "/this-route-does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({ "error": "No route for /this-route-does-not-exist" })
    );
}

// ---------------------------------------------------------------------------
// Test: x-request-id header is present in response
// ---------------------------------------------------------------------------

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let broker = InMemoryBroker::new("de");
    let app = build_test_app(&broker).await;

    let response = get(app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let request_id = response
        .headers()
        .get("x-request-id")
        .expect("Response must contain an x-request-id header");

    // The value should be a UUID string (36 chars with hyphens).
    assert_eq!(request_id.to_str().unwrap().len(), 36);
}
