//! API Routes
//!
//! Read-only ops endpoints over the registry and the live event bus.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::bus::EventBus;
use crate::compliance::{check_compliance, ComplianceReport};
use crate::domain::{EventType, OperationContext};
use crate::error::AppError;
use crate::registry::{RegistryStatistics, WorkflowMetadata, WorkflowRegistry};

/// Shared state of the ops API
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<WorkflowRegistry>,
    pub bus: Arc<EventBus>,
    pub expected_entries: Option<usize>,
}

impl AppState {
    pub fn new(registry: Arc<WorkflowRegistry>, bus: Arc<EventBus>) -> Self {
        Self {
            registry,
            bus,
            expected_entries: None,
        }
    }

    pub fn with_expected_entries(mut self, expected: Option<usize>) -> Self {
        self.expected_entries = expected;
        self
    }
}

// =========================================================================
// Response types
// =========================================================================

#[derive(Debug, Serialize)]
pub struct RegistryResponse {
    pub statistics: RegistryStatistics,
    pub entries: Vec<WorkflowMetadata>,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub event_type: EventType,
    /// Invocation position within the event type
    pub position: usize,
    pub handler: String,
    pub method: String,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionsResponse {
    pub total: usize,
    pub subscriptions: Vec<SubscriptionResponse>,
}

#[derive(Debug, Serialize)]
pub struct WorkflowResponse {
    #[serde(flatten)]
    pub metadata: WorkflowMetadata,
    pub subscriptions: Vec<SubscriptionResponse>,
}

fn subscriptions_of(bus: &EventBus, event_type: EventType) -> Vec<SubscriptionResponse> {
    bus.handlers_for(event_type)
        .into_iter()
        .enumerate()
        .map(|(position, id)| SubscriptionResponse {
            event_type,
            position,
            handler: id.handler().to_string(),
            method: id.method().to_string(),
        })
        .collect()
}

/// Create the API router with all routes
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/events/registry", get(list_registry))
        .route("/events/registry/statistics", get(registry_statistics))
        .route("/events/registry/:workflow_name", get(get_workflow))
        .route("/events/subscriptions", get(list_subscriptions))
        .route("/events/compliance", get(compliance))
}

// =========================================================================
// GET /events/registry
// =========================================================================

async fn list_registry(State(state): State<AppState>) -> Json<RegistryResponse> {
    Json(RegistryResponse {
        statistics: state.registry.statistics(),
        entries: state.registry.get_all().to_vec(),
    })
}

// =========================================================================
// GET /events/registry/statistics
// =========================================================================

async fn registry_statistics(State(state): State<AppState>) -> Json<RegistryStatistics> {
    Json(state.registry.statistics())
}

// =========================================================================
// GET /events/registry/:workflow_name
// =========================================================================

async fn get_workflow(
    State(state): State<AppState>,
    Path(workflow_name): Path<String>,
) -> Result<Json<WorkflowResponse>, AppError> {
    let metadata = state
        .registry
        .get_by_workflow_name(&workflow_name)
        .ok_or_else(|| AppError::WorkflowNotFound(workflow_name.clone()))?;

    let subscriptions = metadata
        .event_classes
        .iter()
        .flat_map(|event_type| subscriptions_of(&state.bus, *event_type))
        .collect();

    Ok(Json(WorkflowResponse {
        metadata: metadata.clone(),
        subscriptions,
    }))
}

// =========================================================================
// GET /events/subscriptions
// =========================================================================

async fn list_subscriptions(State(state): State<AppState>) -> Json<SubscriptionsResponse> {
    let subscriptions: Vec<SubscriptionResponse> = state
        .bus
        .event_types()
        .into_iter()
        .flat_map(|event_type| subscriptions_of(&state.bus, event_type))
        .collect();

    Json(SubscriptionsResponse {
        total: subscriptions.len(),
        subscriptions,
    })
}

// =========================================================================
// GET /events/compliance
// =========================================================================

/// 200 when compliant, 503 with the same body otherwise
async fn compliance(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
) -> (StatusCode, Json<ComplianceReport>) {
    let report = check_compliance(&state.registry, &state.bus, state.expected_entries);
    if report.is_compliant() {
        return (StatusCode::OK, Json(report));
    }

    tracing::warn!(
        violations = report.violations.len(),
        correlation_id = ?context.correlation_id,
        "Compliance check requested on a non-compliant event bus"
    );
    (StatusCode::SERVICE_UNAVAILABLE, Json(report))
}
