//! Common test utilities

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use finance_events::audit::{AuditError, AuditRecord, AuditStore, InMemoryAuditStore};
use finance_events::ports::{InMemoryLogSink, InMemoryNotificationSender, InMemorySessionStore};
use finance_events::registry::STANDARD_ENTRY_COUNT;
use finance_events::{
    build_event_bus, BusConfig, DispatchContext, Event, EventBus, EventBusDependencies,
    EventHandler, HandlerError, WorkflowRegistry,
};
use parking_lot::Mutex;
use uuid::Uuid;

/// Event bus wired from the standard registry over in-memory collaborators
pub struct Harness {
    pub registry: Arc<WorkflowRegistry>,
    pub audit: Arc<InMemoryAuditStore>,
    pub notifications: Arc<InMemoryNotificationSender>,
    pub sessions: Arc<InMemorySessionStore>,
    pub log_sink: Arc<InMemoryLogSink>,
    pub bus: EventBus,
}

pub fn harness() -> Harness {
    let audit = Arc::new(InMemoryAuditStore::new());
    build_harness(audit.clone(), audit)
}

/// Harness whose audit handler writes to `store` instead of the in-memory one
pub fn harness_with_audit_store(store: Arc<dyn AuditStore>) -> Harness {
    build_harness(Arc::new(InMemoryAuditStore::new()), store)
}

fn build_harness(audit: Arc<InMemoryAuditStore>, audit_store: Arc<dyn AuditStore>) -> Harness {
    let registry = Arc::new(WorkflowRegistry::standard());
    let notifications = Arc::new(InMemoryNotificationSender::new());
    let sessions = Arc::new(InMemorySessionStore::new());
    let log_sink = Arc::new(InMemoryLogSink::new());

    let dependencies =
        EventBusDependencies::new(audit_store, notifications.clone(), sessions.clone())
            .with_log_sink(log_sink.clone());
    let config = BusConfig::default()
        .strict()
        .with_expected_entries(STANDARD_ENTRY_COUNT);

    let bus = build_event_bus(registry.clone(), dependencies, config)
        .expect("standard registry wires cleanly");

    Harness {
        registry,
        audit,
        notifications,
        sessions,
        log_sink,
        bus,
    }
}

/// Audit store whose database is always down
pub struct FailingAuditStore;

#[async_trait]
impl AuditStore for FailingAuditStore {
    async fn record(&self, _record: AuditRecord) -> Result<Uuid, AuditError> {
        Err(AuditError::Unavailable("audit database offline".to_string()))
    }
}

/// What a probe saw on one invocation
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub label: &'static str,
    pub event_id: Uuid,
    pub correlation_id: Option<Uuid>,
    pub had_context: bool,
}

/// Handler that records every invocation into a shared journal
pub struct Probe {
    label: &'static str,
    journal: Arc<Mutex<Vec<Observation>>>,
}

impl Probe {
    pub fn new(label: &'static str, journal: &Arc<Mutex<Vec<Observation>>>) -> Arc<Self> {
        Arc::new(Self {
            label,
            journal: journal.clone(),
        })
    }
}

#[async_trait]
impl EventHandler for Probe {
    async fn handle(
        &self,
        event: &Event,
        context: Option<&mut DispatchContext<'_>>,
    ) -> Result<(), HandlerError> {
        let correlation_id = context
            .as_deref()
            .and_then(|context| context.operation())
            .and_then(|operation| operation.correlation_id);

        self.journal.lock().push(Observation {
            label: self.label,
            event_id: event.id(),
            correlation_id,
            had_context: context.is_some(),
        });
        Ok(())
    }
}

/// Handler that always fails
pub struct Exploding;

#[async_trait]
impl EventHandler for Exploding {
    async fn handle(
        &self,
        _event: &Event,
        _context: Option<&mut DispatchContext<'_>>,
    ) -> Result<(), HandlerError> {
        Err(HandlerError::other("exploded"))
    }
}

pub fn journal() -> Arc<Mutex<Vec<Observation>>> {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn labels(journal: &Arc<Mutex<Vec<Observation>>>) -> Vec<&'static str> {
    journal.lock().iter().map(|observation| observation.label).collect()
}
