//! Event Bus
//!
//! Routes each published event to the handlers subscribed to its exact
//! type, in registration order. Fan-out is sequential and fail-open: a
//! handler that errors, panics or times out is logged and recorded, and
//! the remaining handlers still run.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::FutureExt;
use uuid::Uuid;

use crate::domain::{Event, EventType};
use crate::ports::{LogRecord, LogSink, TracingLogSink};

use super::handler::{DispatchContext, EventHandler, HandlerError, HandlerId};

/// Default per-handler timeout
pub const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(5);

/// Message of the log record emitted for every handler failure
pub const HANDLER_FAILED_MESSAGE: &str = "event handler failed";

// =========================================================================
// Configuration
// =========================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    /// Upper bound for a single handler invocation; `None` waits forever
    pub handler_timeout: Option<Duration>,
    /// Run the compliance check when the bus is built and refuse to start
    /// on any violation
    pub strict_wiring: bool,
    /// Expected number of registry entries, checked when set
    pub expected_entries: Option<usize>,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            handler_timeout: Some(DEFAULT_HANDLER_TIMEOUT),
            strict_wiring: false,
            expected_entries: None,
        }
    }
}

impl BusConfig {
    pub fn strict(mut self) -> Self {
        self.strict_wiring = true;
        self
    }

    pub fn with_handler_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.handler_timeout = timeout;
        self
    }

    pub fn with_expected_entries(mut self, expected: usize) -> Self {
        self.expected_entries = Some(expected);
        self
    }
}

// =========================================================================
// Subscriptions and outcomes
// =========================================================================

/// One handler registered for one event type
#[derive(Clone)]
pub struct Subscription {
    id: HandlerId,
    handler: Arc<dyn EventHandler>,
}

impl Subscription {
    pub fn id(&self) -> &HandlerId {
        &self.id
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Why a handler invocation did not complete
#[derive(Debug, thiserror::Error)]
pub enum HandlerFailure {
    #[error(transparent)]
    Error(HandlerError),

    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    #[error("panicked: {0}")]
    Panicked(String),
}

/// Result of one handler invocation
#[derive(Debug)]
pub enum HandlerOutcome {
    Completed {
        handler: HandlerId,
        elapsed: Duration,
    },
    Failed {
        handler: HandlerId,
        failure: HandlerFailure,
        elapsed: Duration,
    },
}

impl HandlerOutcome {
    pub fn handler(&self) -> &HandlerId {
        match self {
            HandlerOutcome::Completed { handler, .. } | HandlerOutcome::Failed { handler, .. } => {
                handler
            }
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, HandlerOutcome::Completed { .. })
    }

    pub fn failure(&self) -> Option<&HandlerFailure> {
        match self {
            HandlerOutcome::Failed { failure, .. } => Some(failure),
            HandlerOutcome::Completed { .. } => None,
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            HandlerOutcome::Completed { elapsed, .. } | HandlerOutcome::Failed { elapsed, .. } => {
                *elapsed
            }
        }
    }
}

/// What happened during one `publish` call.
///
/// Purely informational: publishing has already succeeded from the
/// caller's point of view whatever the report contains.
#[derive(Debug)]
pub struct PublishReport {
    pub event_id: Uuid,
    pub event_type: EventType,
    pub outcomes: Vec<HandlerOutcome>,
}

impl PublishReport {
    fn new(event: &Event) -> Self {
        Self {
            event_id: event.id(),
            event_type: event.event_type(),
            outcomes: Vec::new(),
        }
    }

    pub fn handler_count(&self) -> usize {
        self.outcomes.len()
    }

    /// Handlers in invocation order
    pub fn invoked(&self) -> Vec<&HandlerId> {
        self.outcomes.iter().map(HandlerOutcome::handler).collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = &HandlerOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.is_completed())
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn is_clean(&self) -> bool {
        self.failure_count() == 0
    }
}

// =========================================================================
// Publisher seam
// =========================================================================

/// Anything events can be published to.
///
/// Services depend on this rather than on `EventBus` directly.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(
        &self,
        event: &Event,
        context: Option<&mut DispatchContext<'_>>,
    ) -> PublishReport;
}

// =========================================================================
// Event bus
// =========================================================================

/// In-process publish/subscribe dispatcher.
///
/// Subscriptions are added with `&mut self` while wiring; afterwards the
/// bus is shared read-only (usually behind an `Arc`).
pub struct EventBus {
    subscriptions: HashMap<EventType, Vec<Subscription>>,
    config: BusConfig,
    log_sink: Arc<dyn LogSink>,
}

impl EventBus {
    pub fn new(config: BusConfig) -> Self {
        Self {
            subscriptions: HashMap::new(),
            config,
            log_sink: Arc::new(TracingLogSink),
        }
    }

    /// Replace the sink handler failures are reported to
    pub fn with_log_sink(mut self, log_sink: Arc<dyn LogSink>) -> Self {
        self.log_sink = log_sink;
        self
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Append a handler to the list for exactly `event_type`.
    ///
    /// Subscribing the same identity twice registers it twice; the
    /// compliance check reports such duplicates.
    pub fn subscribe(
        &mut self,
        event_type: EventType,
        id: HandlerId,
        handler: Arc<dyn EventHandler>,
    ) {
        tracing::trace!(event_type = %event_type, handler = %id, "Subscribing handler");
        self.subscriptions
            .entry(event_type)
            .or_default()
            .push(Subscription { id, handler });
    }

    /// Remove every subscription of `id` to `event_type`.
    ///
    /// Returns whether anything was removed.
    pub fn unsubscribe(&mut self, event_type: EventType, id: &HandlerId) -> bool {
        let Some(list) = self.subscriptions.get_mut(&event_type) else {
            return false;
        };

        let before = list.len();
        list.retain(|subscription| &subscription.id != id);
        let removed = list.len() != before;

        if list.is_empty() {
            self.subscriptions.remove(&event_type);
        }
        removed
    }

    /// Handler identities for `event_type`, in invocation order
    pub fn handlers_for(&self, event_type: EventType) -> Vec<&HandlerId> {
        self.subscriptions
            .get(&event_type)
            .map(|list| list.iter().map(Subscription::id).collect())
            .unwrap_or_default()
    }

    pub fn has_subscribers(&self, event_type: EventType) -> bool {
        self.subscriptions.contains_key(&event_type)
    }

    /// Every subscription, sorted by event type, registration order kept
    /// within a type
    pub fn subscriptions(&self) -> Vec<(EventType, &HandlerId)> {
        let mut event_types: Vec<EventType> = self.subscriptions.keys().copied().collect();
        event_types.sort();

        event_types
            .into_iter()
            .flat_map(|event_type| {
                self.handlers_for(event_type)
                    .into_iter()
                    .map(move |id| (event_type, id))
            })
            .collect()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.values().map(Vec::len).sum()
    }

    /// Event types with at least one subscriber
    pub fn event_types(&self) -> Vec<EventType> {
        let mut event_types: Vec<EventType> = self.subscriptions.keys().copied().collect();
        event_types.sort();
        event_types
    }

    /// Deliver `event` to every handler subscribed to its type.
    ///
    /// Never fails. `context` is reborrowed for each handler and released
    /// when this returns.
    pub async fn publish(
        &self,
        event: &Event,
        mut context: Option<&mut DispatchContext<'_>>,
    ) -> PublishReport {
        let mut report = PublishReport::new(event);

        let Some(subscriptions) = self.subscriptions.get(&report.event_type) else {
            tracing::trace!(
                event_type = %report.event_type,
                event_id = %event.id(),
                "No subscribers for event"
            );
            return report;
        };

        for subscription in subscriptions {
            let started = Instant::now();
            let result = self.invoke(subscription, event, context.as_deref_mut()).await;
            let elapsed = started.elapsed();

            let outcome = match result {
                Ok(()) => {
                    tracing::trace!(
                        event_type = %report.event_type,
                        handler = %subscription.id,
                        elapsed_us = elapsed.as_micros() as u64,
                        "Event handler completed"
                    );
                    HandlerOutcome::Completed {
                        handler: subscription.id.clone(),
                        elapsed,
                    }
                }
                Err(failure) => {
                    self.log_sink.emit(
                        LogRecord::error(HANDLER_FAILED_MESSAGE)
                            .field("event_type", report.event_type)
                            .field("event_id", event.id())
                            .field("handler", &subscription.id)
                            .field("error", &failure),
                    );
                    HandlerOutcome::Failed {
                        handler: subscription.id.clone(),
                        failure,
                        elapsed,
                    }
                }
            };
            report.outcomes.push(outcome);
        }

        report
    }

    async fn invoke(
        &self,
        subscription: &Subscription,
        event: &Event,
        context: Option<&mut DispatchContext<'_>>,
    ) -> Result<(), HandlerFailure> {
        let call = AssertUnwindSafe(subscription.handler.handle(event, context)).catch_unwind();

        let result = match self.config.handler_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => return Err(HandlerFailure::TimedOut(limit)),
            },
            None => call.await,
        };

        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => Err(HandlerFailure::Error(error)),
            Err(payload) => Err(HandlerFailure::Panicked(panic_message(payload.as_ref()))),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("event_types", &self.subscriptions.len())
            .field("subscriptions", &self.subscription_count())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EventPublisher for EventBus {
    async fn publish(
        &self,
        event: &Event,
        context: Option<&mut DispatchContext<'_>>,
    ) -> PublishReport {
        EventBus::publish(self, event, context).await
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
