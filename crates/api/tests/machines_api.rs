//! Integration tests for the `/api/v1/machines` endpoints.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use common::{body_json, build_test_app, delete, get, post_json, put_json, send};
use fleet_core::machine::{Machine, MachineStatus};
use fleet_core::store::{MachineStore, StoreError};
use fleet_core::types::MachineId;
use serde_json::{json, Value};

async fn create(app: &common::TestApp, name: &str, status: &str) -> Value {
    let response = post_json(
        app.router.clone(),
        "/api/v1/machines",
        json!({"name": name, "latitude": 51.5, "longitude": -0.12, "status": status}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"].clone()
}

// ---------------------------------------------------------------------------
// Test: POST creates a machine, returns 201 with Location header
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_returns_created_machine_and_location() {
    let app = build_test_app();

    let response = post_json(
        app.router.clone(),
        "/api/v1/machines",
        json!({"name": "Lathe 1", "latitude": 40.7, "longitude": -74.0, "status": "Operating"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();

    let data = body_json(response).await["data"].clone();
    assert_eq!(location, format!("/api/v1/machines/{}", data["id"].as_str().unwrap()));
    assert_eq!(data["name"], "Lathe 1");
    assert_eq!(data["latitude"], 40.7);
    assert_eq!(data["longitude"], -74.0);
    assert_eq!(data["status"], "Operating");
    assert_eq!(data["rpm"], 0);
    assert_eq!(data["created_at"], data["updated_at"]);

    let fetched = body_json(get(app.router.clone(), &location).await).await;
    assert_eq!(fetched["data"], data);
}

// ---------------------------------------------------------------------------
// Test: duplicate names are rejected case-insensitively
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_with_duplicate_name_returns_409() {
    let app = build_test_app();
    create(&app, "Press", "Idle").await;

    let response = post_json(
        app.router.clone(),
        "/api/v1/machines",
        json!({"name": "PRESS", "latitude": 0.0, "longitude": 0.0, "status": "Idle"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["code"], "CONFLICT");
    assert_eq!(json["error"], "A machine with the name 'PRESS' already exists.");
}

// ---------------------------------------------------------------------------
// Test: invalid payloads never reach the registry
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_with_invalid_fields_returns_400() {
    let app = build_test_app();
    let long_name = "x".repeat(101);
    let bodies = [
        json!({"name": "  ", "latitude": 0.0, "longitude": 0.0, "status": "Idle"}),
        json!({"name": long_name, "latitude": 0.0, "longitude": 0.0, "status": "Idle"}),
        json!({"name": "Drill", "latitude": 90.01, "longitude": 0.0, "status": "Idle"}),
        json!({"name": "Drill", "latitude": 0.0, "longitude": -180.5, "status": "Idle"}),
        json!({"name": "Drill", "latitude": 0.0, "longitude": 0.0, "status": "Unknown"}),
        json!({"name": "Drill", "latitude": 0.0, "longitude": 0.0, "status": "Flying"}),
        json!({"name": "Drill", "latitude": 0.0, "status": "Idle"}),
    ];

    for body in bodies {
        let response = post_json(app.router.clone(), "/api/v1/machines", body.clone()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
        let json = body_json(response).await;
        assert_eq!(json["code"], "VALIDATION_ERROR", "body: {body}");
    }

    let list = body_json(get(app.router.clone(), "/api/v1/machines").await).await;
    assert_eq!(list["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn create_with_malformed_json_returns_400() {
    let app = build_test_app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/machines")
        .header("content-type", "application/json")
        .body(Body::from("{\"name\": "))
        .unwrap();

    let response = send(app.router, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
}

// ---------------------------------------------------------------------------
// Test: list and list-by-status
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_returns_every_machine() {
    let app = build_test_app();
    create(&app, "A", "Idle").await;
    create(&app, "B", "Fault").await;
    create(&app, "C", "Operating").await;

    let json = body_json(get(app.router.clone(), "/api/v1/machines").await).await;

    let mut names: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["name"].as_str().unwrap())
        .collect();
    names.sort();
    assert_eq!(names, vec!["A", "B", "C"]);
}

#[tokio::test]
async fn list_by_status_is_case_insensitive() {
    let app = build_test_app();
    create(&app, "A", "Fault").await;
    create(&app, "B", "Idle").await;
    create(&app, "C", "Fault").await;

    let response = get(app.router.clone(), "/api/v1/machines/status/fAuLt").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert!(data.iter().all(|m| m["status"] == "Fault"));
}

#[tokio::test]
async fn list_by_unknown_status_name_returns_400() {
    let app = build_test_app();

    let response = get(app.router, "/api/v1/machines/status/flying").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Test: get
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_unknown_machine_returns_404() {
    let app = build_test_app();
    let id = uuid::Uuid::new_v4();

    let response = get(app.router, &format!("/api/v1/machines/{id}")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

#[tokio::test]
async fn get_with_malformed_id_returns_400() {
    let app = build_test_app();

    let response = get(app.router, "/api/v1/machines/not-a-uuid").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Test: update details
// ---------------------------------------------------------------------------

#[tokio::test]
async fn update_details_changes_name_and_location_only() {
    let app = build_test_app();
    let created = create(&app, "Mill", "Maintenance").await;
    let id = created["id"].as_str().unwrap();

    let response = put_json(
        app.router.clone(),
        &format!("/api/v1/machines/{id}"),
        json!({"name": "Mill 2", "latitude": -33.9, "longitude": 151.2}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let data = body_json(response).await["data"].clone();
    assert_eq!(data["name"], "Mill 2");
    assert_eq!(data["latitude"], -33.9);
    assert_eq!(data["longitude"], 151.2);
    assert_eq!(data["status"], "Maintenance");
    assert_eq!(data["rpm"], 0);
    assert_eq!(data["created_at"], created["created_at"]);
    assert_ne!(data["updated_at"], created["updated_at"]);
}

#[tokio::test]
async fn update_details_of_unknown_machine_returns_404() {
    let app = build_test_app();
    let id = uuid::Uuid::new_v4();

    let response = put_json(
        app.router,
        &format!("/api/v1/machines/{id}"),
        json!({"name": "Ghost", "latitude": 0.0, "longitude": 0.0}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rename_to_taken_name_returns_409() {
    let app = build_test_app();
    create(&app, "Taken", "Idle").await;
    let other = create(&app, "Other", "Idle").await;
    let id = other["id"].as_str().unwrap();

    let response = put_json(
        app.router.clone(),
        &format!("/api/v1/machines/{id}"),
        json!({"name": "taken", "latitude": 0.0, "longitude": 0.0}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let unchanged = body_json(get(app.router, &format!("/api/v1/machines/{id}")).await).await;
    assert_eq!(unchanged["data"]["name"], "Other");
}

// ---------------------------------------------------------------------------
// Test: update telemetry
// ---------------------------------------------------------------------------

#[tokio::test]
async fn update_telemetry_writes_status_and_rpm() {
    let app = build_test_app();
    let created = create(&app, "Turbine", "Idle").await;
    let id = created["id"].as_str().unwrap();

    let response = put_json(
        app.router.clone(),
        &format!("/api/v1/machines/{id}/telemetry"),
        json!({"status": "Operating", "rpm": 2400}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["data"]["message"].as_str().unwrap().contains(id));

    let fetched = body_json(get(app.router, &format!("/api/v1/machines/{id}")).await).await;
    assert_eq!(fetched["data"]["status"], "Operating");
    assert_eq!(fetched["data"]["rpm"], 2400);
    assert_eq!(fetched["data"]["name"], "Turbine");
    assert_eq!(fetched["data"]["updated_at"], created["updated_at"]);
}

#[tokio::test]
async fn update_telemetry_of_unknown_machine_returns_404() {
    let app = build_test_app();
    let id = uuid::Uuid::new_v4();

    let response = put_json(
        app.router,
        &format!("/api/v1/machines/{id}/telemetry"),
        json!({"status": "Idle", "rpm": 10}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_telemetry_rejects_negative_rpm_and_sentinel_status() {
    let app = build_test_app();
    let created = create(&app, "Pump", "Idle").await;
    let uri = format!("/api/v1/machines/{}/telemetry", created["id"].as_str().unwrap());

    for body in [
        json!({"status": "Idle", "rpm": -1}),
        json!({"status": "Unknown", "rpm": 100}),
    ] {
        let response = put_json(app.router.clone(), &uri, body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn update_telemetry_rejects_rpm_beyond_integer_range() {
    let app = build_test_app();
    let created = create(&app, "Spindle", "Idle").await;
    let uri = format!("/api/v1/machines/{}/telemetry", created["id"].as_str().unwrap());

    let response = put_json(
        app.router.clone(),
        &uri,
        json!({"status": "Operating", "rpm": 2_147_483_648u64}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

    let id = created["id"].as_str().unwrap().parse().unwrap();
    let machine = app.registry.get(id).await.unwrap().unwrap();
    assert_eq!(machine.rpm(), 0);
}

// ---------------------------------------------------------------------------
// Test: delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delete_removes_machine() {
    let app = build_test_app();
    let created = create(&app, "Crane", "Shutdown").await;
    let uri = format!("/api/v1/machines/{}", created["id"].as_str().unwrap());

    let response = delete(app.router.clone(), &uri).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["data"]["message"].is_string());

    assert_eq!(get(app.router.clone(), &uri).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(delete(app.router, &uri).await.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: store outage maps to 503
// ---------------------------------------------------------------------------

struct UnreachableStore;

#[async_trait]
impl MachineStore for UnreachableStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
    async fn find_by_id(&self, _id: MachineId) -> Result<Option<Machine>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
    async fn list(&self) -> Result<Vec<Machine>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
    async fn list_by_status(&self, _status: MachineStatus) -> Result<Vec<Machine>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
    async fn insert(&self, _machine: &Machine) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
    async fn save_telemetry(&self, _machine: &Machine) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
    async fn save_details(&self, _machine: &Machine) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
    async fn delete(&self, _id: MachineId) -> Result<bool, StoreError> {
        Err(StoreError::Corrupt("row 7".into()))
    }
    async fn exists_by_name(&self, _name: &str) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}

#[tokio::test]
async fn unavailable_store_returns_503_and_other_store_errors_500() {
    let app = common::build_test_app_with_store(Arc::new(UnreachableStore));

    let response = get(app.router.clone(), "/api/v1/machines").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["code"], "SERVICE_UNAVAILABLE");

    let id = uuid::Uuid::new_v4();
    let response = delete(app.router, &format!("/api/v1/machines/{id}")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
}
