//! Composition Root
//!
//! Builds a ready-to-use event bus from the workflow registry: one
//! subscription per (event class, flagged category) pair, nothing wired by
//! hand.

use std::sync::Arc;

use crate::audit::{AuditStore, InMemoryAuditStore};
use crate::bus::{BusConfig, EventBus, EventHandler, HandlerId};
use crate::compliance::{check_compliance, ComplianceReport};
use crate::handlers::{AuditHandler, InvalidationHandler, LoggingHandler, NotificationHandler};
use crate::ports::{
    InMemorySessionStore, LogSink, LoggingNotificationSender, NotificationSender, SessionStore,
    TracingLogSink,
};
use crate::registry::{HandlerCategory, WorkflowRegistry};

/// Collaborators the category handlers are built from
#[derive(Clone)]
pub struct EventBusDependencies {
    pub audit_store: Arc<dyn AuditStore>,
    pub notifications: Arc<dyn NotificationSender>,
    pub sessions: Arc<dyn SessionStore>,
    pub log_sink: Arc<dyn LogSink>,
}

impl EventBusDependencies {
    pub fn new(
        audit_store: Arc<dyn AuditStore>,
        notifications: Arc<dyn NotificationSender>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            audit_store,
            notifications,
            sessions,
            log_sink: Arc::new(TracingLogSink),
        }
    }

    pub fn with_log_sink(mut self, log_sink: Arc<dyn LogSink>) -> Self {
        self.log_sink = log_sink;
        self
    }

    /// Process-local collaborators: in-memory audit trail and session
    /// store, notifications logged instead of sent
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryAuditStore::new()),
            Arc::new(LoggingNotificationSender),
            Arc::new(InMemorySessionStore::new()),
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WiringError {
    #[error("Event bus wiring is not compliant ({} violations)", .0.violations.len())]
    NonCompliant(ComplianceReport),
}

/// One shared instance per category
struct CategoryHandlers {
    logging: Arc<dyn EventHandler>,
    audit: Arc<dyn EventHandler>,
    notification: Arc<dyn EventHandler>,
    invalidation: Arc<dyn EventHandler>,
}

impl CategoryHandlers {
    fn new(registry: &Arc<WorkflowRegistry>, dependencies: &EventBusDependencies) -> Self {
        Self {
            logging: Arc::new(LoggingHandler::new(dependencies.log_sink.clone())),
            audit: Arc::new(AuditHandler::new(
                dependencies.audit_store.clone(),
                registry.clone(),
            )),
            notification: Arc::new(NotificationHandler::new(dependencies.notifications.clone())),
            invalidation: Arc::new(InvalidationHandler::new(dependencies.sessions.clone())),
        }
    }

    fn get(&self, category: HandlerCategory) -> Arc<dyn EventHandler> {
        match category {
            HandlerCategory::Logging => self.logging.clone(),
            HandlerCategory::Audit => self.audit.clone(),
            HandlerCategory::Notification => self.notification.clone(),
            HandlerCategory::Invalidation => self.invalidation.clone(),
        }
    }
}

/// Build the event bus for `registry`.
///
/// In strict mode the compliance check runs before the bus is handed out
/// and any violation is returned as an error.
pub fn build_event_bus(
    registry: Arc<WorkflowRegistry>,
    dependencies: EventBusDependencies,
    config: BusConfig,
) -> Result<EventBus, WiringError> {
    let handlers = CategoryHandlers::new(&registry, &dependencies);
    let strict = config.strict_wiring;
    let expected_entries = config.expected_entries;

    let mut bus = EventBus::new(config).with_log_sink(dependencies.log_sink.clone());
    for entry in registry.get_all() {
        for (event_type, category) in entry.expected_subscriptions() {
            bus.subscribe(
                event_type,
                HandlerId::for_category(category, event_type),
                handlers.get(category),
            );
        }
    }

    tracing::info!(
        entries = registry.len(),
        subscriptions = bus.subscription_count(),
        strict = strict,
        "Event bus wired"
    );

    if strict {
        let report = check_compliance(&registry, &bus, expected_entries);
        if !report.is_compliant() {
            for violation in &report.violations {
                tracing::error!(violation = %violation, "Event bus wiring violation");
            }
            return Err(WiringError::NonCompliant(report));
        }
    }

    Ok(bus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventType, OperationalKind, Workflow, WorkflowState};
    use crate::registry::{WorkflowMetadata, STANDARD_ENTRY_COUNT};

    #[test]
    fn test_standard_registry_builds_in_strict_mode() {
        let registry = Arc::new(WorkflowRegistry::standard());
        let config = BusConfig::default()
            .strict()
            .with_expected_entries(STANDARD_ENTRY_COUNT);

        let bus =
            build_event_bus(registry.clone(), EventBusDependencies::in_memory(), config).unwrap();

        let report = check_compliance(&registry, &bus, Some(STANDARD_ENTRY_COUNT));
        assert!(report.is_compliant(), "{:?}", report.violations);
    }

    #[test]
    fn test_subscriptions_follow_flags() {
        let registry = Arc::new(WorkflowRegistry::standard());
        let bus = build_event_bus(registry, EventBusDependencies::in_memory(), BusConfig::default())
            .unwrap();

        let attempted =

            EventType::workflow_event(Workflow::PasswordChange, WorkflowState::Attempted);
        let succeeded =
            EventType::workflow_event(Workflow::PasswordChange, WorkflowState::Succeeded);

        let names = |event_type: EventType| -> Vec<String> {
            bus.handlers_for(event_type)
                .iter()
                .map(|id| id.handler().to_string())
                .collect()
        };
        assert_eq!(names(attempted), vec!["logging", "audit"]);
        assert_eq!(
            names(succeeded),
            vec!["logging", "audit", "notification", "invalidation"]
        );
        assert_eq!(
            names(EventType::Operational(OperationalKind::SessionActivityUpdated)),
            vec!["logging"]
        );
    }

    #[test]
    fn test_malformed_entry_fails_strict_wiring() {
        let mut broken =
            WorkflowMetadata::for_workflow(Workflow::AccountSync, "provider.account_sync")
                .with_logging()
                .with_audit();
        broken.event_classes.truncate(1);
        let registry = Arc::new(WorkflowRegistry::new(vec![broken]));

        let err = build_event_bus(
            registry,
            EventBusDependencies::in_memory(),
            BusConfig::default().strict(),
        )
        .unwrap_err();

        let WiringError::NonCompliant(report) = err;
        assert_eq!(report.violations.len(), 2);
    }

    #[test]
    fn test_expected_entry_count_enforced() {
        let registry = Arc::new(WorkflowRegistry::standard());
        let config = BusConfig::default().strict().with_expected_entries(12);

        let result = build_event_bus(registry, EventBusDependencies::in_memory(), config);

        assert!(matches!(result, Err(WiringError::NonCompliant(_))));
    }
}
