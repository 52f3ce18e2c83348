#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use fleet_core::registry::MachineRegistry;
use fleet_core::store::{InMemoryMachineStore, MachineStore};
use fleet_events::EventBus;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use fleet_api::config::ServerConfig;
use fleet_api::router::build_app_router;
use fleet_api::state::AppState;
use fleet_api::ws::WsManager;

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default)
/// and a 30-second request timeout.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        telemetry_interval: Duration::from_secs(5),
        simulator_enabled: false,
        ws_subscriber_buffer: 16,
        database_url: None,
    }
}

/// Everything a test may need to poke at behind the router.
pub struct TestApp {
    pub router: Router,
    pub registry: MachineRegistry,
    pub ws_manager: Arc<WsManager>,
    pub event_bus: Arc<EventBus>,
}

/// Build the full application router over a fresh in-memory store.
pub fn build_test_app() -> TestApp {
    build_test_app_with_store(Arc::new(InMemoryMachineStore::new()))
}

/// Build the full application router over `store`, with the same
/// middleware stack production uses.
pub fn build_test_app_with_store(store: Arc<dyn MachineStore>) -> TestApp {
    let config = test_config();
    let registry = MachineRegistry::new(store);
    let ws_manager = Arc::new(WsManager::with_buffer(config.ws_subscriber_buffer));
    let event_bus = Arc::new(EventBus::default());

    let state = AppState {
        registry: registry.clone(),
        config: Arc::new(config.clone()),
        ws_manager: Arc::clone(&ws_manager),
        event_bus: Arc::clone(&event_bus),
    };

    let router = build_app_router(state, &config).expect("test config is valid");

    TestApp {
        router,
        registry,
        ws_manager,
        event_bus,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.expect("router is infallible")
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    json_request(app, Method::POST, uri, body).await
}

pub async fn put_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    json_request(app, Method::PUT, uri, body).await
}

async fn json_request(app: Router, method: Method, uri: &str, body: Value) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
