//! Audit Handler
//!
//! Appends one audit record per event, classified by the registry's
//! audit action name.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::audit::{AuditRecord, AuditStore};
use crate::bus::{DispatchContext, EventHandler, HandlerError};
use crate::domain::{Event, EventPayload};
use crate::registry::{HandlerCategory, WorkflowRegistry};

/// Payload fields never written to the audit trail
const REDACTED_FIELDS: &[&str] = &["verification_token"];

pub struct AuditHandler {
    store: Arc<dyn AuditStore>,
    registry: Arc<WorkflowRegistry>,
}

impl AuditHandler {
    pub fn new(store: Arc<dyn AuditStore>, registry: Arc<WorkflowRegistry>) -> Self {
        Self { store, registry }
    }

    /// Build the record for `event`, without request metadata
    pub fn record_for(&self, event: &Event) -> Result<AuditRecord, HandlerError> {
        let event_type = event.event_type();
        let entry = self
            .registry
            .get_by_event_type(event_type)
            .ok_or(HandlerError::Unregistered(event_type))?;

        if !entry.requires_audit {
            return Err(HandlerError::Unsupported {
                handler: HandlerCategory::Audit.as_str(),
                event_type,
            });
        }

        let (resource_type, resource_id) = event.resource();
        Ok(
            AuditRecord::new(entry.audit_action_for(event_type), event.id(), event.occurred_at())
                .actor(event.actor_id())
                .resource(resource_type, resource_id)
                .metadata(&audit_metadata(event)),
        )
    }
}

fn audit_metadata(event: &Event) -> Value {
    let payload = match event.payload() {
        EventPayload::Workflow(workflow_event) => serde_json::to_value(workflow_event),
        EventPayload::Operational(operational) => serde_json::to_value(operational),
    };

    let mut metadata = payload.unwrap_or(Value::Null);
    if let Value::Object(fields) = &mut metadata {
        for key in REDACTED_FIELDS {
            fields.remove(*key);
        }
    }
    metadata
}

#[async_trait]
impl EventHandler for AuditHandler {
    async fn handle(
        &self,
        event: &Event,
        context: Option<&mut DispatchContext<'_>>,
    ) -> Result<(), HandlerError> {
        let mut record = self.record_for(event)?;

        // Inside the publisher's transaction when one was lent to us
        let audit_id = match context {
            Some(context) => {
                if let Some(operation) = context.operation() {
                    record = record.operation(operation);
                }
                context.session().record(record).await?
            }
            None => self.store.record(record).await?,
        };

        tracing::debug!(
            audit_id = %audit_id,
            event_id = %event.id(),
            event_type = %event.event_type(),
            "Audit record written"
        );
        Ok(())
    }
}
