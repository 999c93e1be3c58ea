#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use jobstatus_api::config::{AmqpConfig, ServerConfig};
use jobstatus_api::router::build_app_router;
use jobstatus_api::state::AppState;
use jobstatus_events::{InMemoryBroker, JobUpdatePublisher};

pub const JOB_ID: &str = "11111111-1111-1111-1111-111111111111";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        request_timeout_secs: 30,
        publish_timeout_secs: 5,
        connect_timeout_secs: 5,
        update_timeout_secs: 20,
        amqp: AmqpConfig {
            uri: "memory://".to_string(),
            exchange: "de".to_string(),
            routing_key: "jobs.updates".to_string(),
        },
    }
}

/// Build the full application router backed by `broker`.
///
/// Uses the same [`build_app_router`] as `main.rs`, so tests exercise the
/// production middleware stack.
pub async fn build_test_app(broker: &InMemoryBroker) -> Router {
    build_test_app_with_config(broker, test_config()).await
}

/// Like [`build_test_app`], with caller-chosen timeouts.
pub async fn build_test_app_with_config(broker: &InMemoryBroker, config: ServerConfig) -> Router {
    let config = Arc::new(config);
    let publisher = JobUpdatePublisher::connect(broker.clone(), config.publisher_config())
        .await
        .expect("in-memory broker should connect");

    let state = AppState::new(Arc::new(publisher), Arc::clone(&config));
    build_app_router(state, &config)
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
