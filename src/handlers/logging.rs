//! Logging Handler
//!
//! Structured log record for every event it is subscribed to.

use std::sync::Arc;

use async_trait::async_trait;

use crate::bus::{DispatchContext, EventHandler, HandlerError};
use crate::domain::{Event, EventPayload, WorkflowState};
use crate::ports::{LogLevel, LogRecord, LogSink};

pub struct LoggingHandler {
    sink: Arc<dyn LogSink>,
}

impl LoggingHandler {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }

    fn record_for(event: &Event) -> LogRecord {
        let (level, message) = match event.payload() {
            EventPayload::Workflow(workflow_event) => match workflow_event.state() {
                WorkflowState::Attempted => (LogLevel::Info, "Workflow attempted"),
                WorkflowState::Succeeded => (LogLevel::Info, "Workflow succeeded"),
                WorkflowState::Failed => (LogLevel::Warn, "Workflow failed"),
            },
            EventPayload::Operational(operational) if operational.kind().is_security_relevant() => {
                (LogLevel::Warn, "Security-relevant activity")
            }
            EventPayload::Operational(_) => (LogLevel::Debug, "Operational event"),
        };

        let event_type = event.event_type();
        let mut record = LogRecord::new(level, message)
            .field("event_type", event_type)
            .field("event_id", event.id())
            .field("workflow", event_type.registry_name())
            .field("occurred_at", event.occurred_at().to_rfc3339());

        if let Some(actor_id) = event.actor_id() {
            record = record.field("actor_id", actor_id);
        }
        if let Some(reason) = event.as_workflow().and_then(|e| e.failure_reason()) {
            record = record.field("reason", reason);
        }
        record
    }
}

#[async_trait]
impl EventHandler for LoggingHandler {
    async fn handle(
        &self,
        event: &Event,
        context: Option<&mut DispatchContext<'_>>,
    ) -> Result<(), HandlerError> {
        let mut record = Self::record_for(event);
        if let Some(correlation_id) = context
            .as_deref()
            .and_then(|context| context.operation())
            .and_then(|operation| operation.correlation_id)
        {
            record = record.field("correlation_id", correlation_id);
        }

        self.sink.emit(record);
        Ok(())
    }
}
