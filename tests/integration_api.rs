//! Ops API Integration Tests

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use finance_events::api::{self, AppState};
use finance_events::registry::STANDARD_ENTRY_COUNT;
use serde_json::Value;
use tower::util::ServiceExt;
use uuid::Uuid;

mod common;

fn app(expected_entries: Option<usize>) -> Router {
    let h = common::harness();
    let state = AppState::new(h.registry, Arc::new(h.bus)).with_expected_entries(expected_entries);
    api::build_router(state)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health() {
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app(None).oneshot(req).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"OK");
}

#[tokio::test]
async fn test_registry_listing() {
    let (status, body) = get(app(None), "/api/v1/events/registry").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entries"].as_array().map(Vec::len), Some(STANDARD_ENTRY_COUNT));
    assert_eq!(body["statistics"]["total_entries"], STANDARD_ENTRY_COUNT);

    let first = &body["entries"][0];
    assert_eq!(first["workflow_name"], "user_registration");
    assert_eq!(first["family"], "workflow");
    assert_eq!(first["event_classes"][0], "UserRegistrationAttempted");
}

#[tokio::test]
async fn test_registry_statistics() {
    let (status, body) = get(app(None), "/api/v1/events/registry/statistics").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["workflows"], 10);
    assert_eq!(body["operational"], 3);
    assert_eq!(body["event_classes"], 33);
}

#[tokio::test]
async fn test_workflow_detail_lists_subscriptions() {
    let (status, body) = get(app(None), "/api/v1/events/registry/password_change").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["audit_action_name"], "user.password_change");
    assert_eq!(body["requires_invalidation"], true);

    let subscriptions = body["subscriptions"].as_array().unwrap();
    assert_eq!(subscriptions.len(), 8);
    let succeeded: Vec<&str> = subscriptions
        .iter()
        .filter(|s| s["event_type"] == "PasswordChangeSucceeded")
        .map(|s| s["handler"].as_str().unwrap())
        .collect();
    assert_eq!(succeeded, vec!["logging", "audit", "notification", "invalidation"]);
}

#[tokio::test]
async fn test_unknown_workflow_is_not_found() {
    let (status, body) = get(app(None), "/api/v1/events/registry/money_laundering").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "workflow_not_found");
    assert_eq!(body["details"], "money_laundering");
}

#[tokio::test]
async fn test_subscriptions_listing() {
    let registry = finance_events::WorkflowRegistry::standard();
    let expected: usize = registry
        .get_all()
        .iter()
        .map(|entry| entry.expected_subscriptions().len())
        .sum();

    let (status, body) = get(app(None), "/api/v1/events/subscriptions").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], expected);
    assert_eq!(body["subscriptions"].as_array().map(Vec::len), Some(expected));
}

#[tokio::test]
async fn test_compliance_report() {
    let (status, body) = get(app(Some(STANDARD_ENTRY_COUNT)), "/api/v1/events/compliance").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["compliant"], true);
    assert_eq!(body["workflows_checked"], STANDARD_ENTRY_COUNT);
    assert!(body["violations"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_compliance_report_with_wrong_expected_count() {
    let (status, body) = get(app(Some(12)), "/api/v1/events/compliance").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["compliant"], false);
    assert_eq!(body["violations"][0]["kind"], "entry_count_mismatch");
    assert_eq!(body["violations"][0]["expected"], 12);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let request_id = Uuid::new_v4().to_string();
    let req = Request::builder()
        .uri("/api/v1/events/registry/statistics")
        .header("x-request-id", &request_id)
        .body(Body::empty())
        .unwrap();

    let response = app(None).oneshot(req).await.unwrap();

    assert_eq!(
        response.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some(request_id.as_str())
    );
}

#[tokio::test]
async fn test_compliance_failure_carries_request_context() {
    let request_id = Uuid::new_v4().to_string();
    let req = Request::builder()
        .uri("/api/v1/events/compliance")
        .header("x-request-id", &request_id)
        .body(Body::empty())
        .unwrap();

    let response = app(Some(12)).oneshot(req).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        response.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some(request_id.as_str())
    );
}
