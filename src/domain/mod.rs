//! Domain module
//!
//! Event contract, event taxonomy and request metadata.

pub mod context;
pub mod events;

pub use context::OperationContext;
pub use events::{
    Event, EventFamily, EventPayload, EventType, OperationalEvent, OperationalKind, Workflow,
    WorkflowEvent, WorkflowState,
};
