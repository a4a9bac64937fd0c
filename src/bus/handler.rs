//! Handler contract
//!
//! What the bus calls, what it passes along, and how handlers fail.

use std::borrow::Cow;
use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::audit::{AuditError, AuditSession};
use crate::domain::{Event, EventType, OperationContext};
use crate::ports::{NotificationError, SessionStoreError};
use crate::registry::HandlerCategory;

/// Identity of a subscription: handler name plus method name.
///
/// Only used for logs, reports and compliance checks; routing is by
/// event type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct HandlerId {
    handler: Cow<'static, str>,
    method: Cow<'static, str>,
}

impl HandlerId {
    pub fn new(
        handler: impl Into<Cow<'static, str>>,
        method: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            handler: handler.into(),
            method: method.into(),
        }
    }

    /// Identity of a category handler's method for one event class
    pub fn for_category(category: HandlerCategory, event_type: EventType) -> Self {
        Self::new(category.as_str(), event_type.handler_method())
    }

    pub fn handler(&self) -> &str {
        &self.handler
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Category this handler belongs to, if it is a category handler
    pub fn category(&self) -> Option<HandlerCategory> {
        HandlerCategory::from_name(&self.handler)
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.handler, self.method)
    }
}

/// Resources the publisher lends to handlers for one publish call.
///
/// Borrowed, never stored: once `publish` returns the bus holds nothing.
pub struct DispatchContext<'a> {
    session: &'a mut (dyn AuditSession + 'a),
    operation: Option<OperationContext>,
}

impl<'a> DispatchContext<'a> {
    /// Wrap the publisher's open audit session
    pub fn new(session: &'a mut (dyn AuditSession + 'a)) -> Self {
        Self {
            session,
            operation: None,
        }
    }

    pub fn with_operation(mut self, operation: OperationContext) -> Self {
        self.operation = Some(operation);
        self
    }

    pub fn session(&mut self) -> &mut (dyn AuditSession + 'a) {
        &mut *self.session
    }

    pub fn operation(&self) -> Option<&OperationContext> {
        self.operation.as_ref()
    }
}

impl fmt::Debug for DispatchContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchContext")
            .field("operation", &self.operation)
            .finish_non_exhaustive()
    }
}

/// Errors a handler may return; the bus logs them and moves on
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("Audit error: {0}")]
    Audit(#[from] AuditError),

    #[error("Notification error: {0}")]
    Notification(#[from] NotificationError),

    #[error("Session store error: {0}")]
    Invalidation(#[from] SessionStoreError),

    #[error("{handler} handler has no behaviour for {event_type}")]
    Unsupported {
        handler: &'static str,
        event_type: EventType,
    },

    #[error("No registry entry for {0}")]
    Unregistered(EventType),

    #[error("{0}")]
    Other(String),
}

impl HandlerError {
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// A subscriber of the event bus
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(
        &self,
        event: &Event,
        context: Option<&mut DispatchContext<'_>>,
    ) -> Result<(), HandlerError>;
}
