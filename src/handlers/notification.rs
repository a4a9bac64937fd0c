//! Notification Handler
//!
//! Sends user-facing messages after successful workflows.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::bus::{DispatchContext, EventHandler, HandlerError};
use crate::domain::{Event, WorkflowEvent};
use crate::ports::{NotificationSender, NotificationTemplate};
use crate::registry::HandlerCategory;

pub struct NotificationHandler {
    sender: Arc<dyn NotificationSender>,
}

impl NotificationHandler {
    pub fn new(sender: Arc<dyn NotificationSender>) -> Self {
        Self { sender }
    }
}

/// Template, recipient and template payload for an event, if it notifies
fn notification_for(event: &Event) -> Option<(NotificationTemplate, &str, serde_json::Value)> {
    match event.as_workflow()? {
        WorkflowEvent::UserRegistrationSucceeded {
            user_id,
            email,
            verification_token,
        } => Some((
            NotificationTemplate::EmailVerification,
            email.as_str(),
            json!({ "user_id": user_id, "verification_token": verification_token }),
        )),
        WorkflowEvent::EmailVerificationSucceeded { user_id, email } => Some((
            NotificationTemplate::Welcome,
            email.as_str(),
            json!({ "user_id": user_id }),
        )),
        WorkflowEvent::PasswordChangeSucceeded {
            user_id,
            email,
            initiated_by,
        } => Some((
            NotificationTemplate::PasswordChanged,
            email.as_str(),
            json!({
                "user_id": user_id,
                "initiated_by": initiated_by,
                "changed_at": event.occurred_at(),
            }),
        )),
        WorkflowEvent::PasswordResetSucceeded { user_id, email } => Some((
            NotificationTemplate::PasswordResetCompleted,
            email.as_str(),
            json!({ "user_id": user_id, "reset_at": event.occurred_at() }),
        )),
        _ => None,
    }
}

#[async_trait]
impl EventHandler for NotificationHandler {
    async fn handle(
        &self,
        event: &Event,
        _context: Option<&mut DispatchContext<'_>>,
    ) -> Result<(), HandlerError> {
        let (template, recipient, payload) =
            notification_for(event).ok_or(HandlerError::Unsupported {
                handler: HandlerCategory::Notification.as_str(),
                event_type: event.event_type(),
            })?;

        self.sender.send(template, recipient, payload).await?;

        tracing::debug!(
            template = %template,
            event_id = %event.id(),
            "Notification sent"
        );
        Ok(())
    }
}
