//! Event dispatch
//!
//! The handler contract, the in-process event bus and the workflow
//! invocation guard.

pub mod dispatcher;
pub mod handler;
pub mod workflow;

pub use dispatcher::{
    BusConfig, EventBus, EventPublisher, HandlerFailure, HandlerOutcome, PublishReport,
    Subscription, DEFAULT_HANDLER_TIMEOUT, HANDLER_FAILED_MESSAGE,
};
pub use handler::{DispatchContext, EventHandler, HandlerError, HandlerId};
pub use workflow::{InvocationError, WorkflowInvocation};
