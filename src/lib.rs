//! finance_events Library
//!
//! Domain event bus of the financial account aggregation backend.
//! Re-exports modules for the binaries, integration testing and
//! external use.

pub mod api;
pub mod audit;
pub mod bus;
pub mod compliance;
pub mod config;
pub mod db;
pub mod domain;
pub mod handlers;
pub mod ports;
pub mod registry;
pub mod wiring;

mod error;

pub use bus::{
    BusConfig, DispatchContext, EventBus, EventHandler, EventPublisher, HandlerError, HandlerId,
    PublishReport, WorkflowInvocation,
};
pub use compliance::{check_compliance, ComplianceReport, Violation};
pub use config::Config;
pub use domain::{Event, EventType, OperationContext, OperationalEvent, WorkflowEvent};
pub use error::AppError;
pub use registry::{HandlerCategory, WorkflowMetadata, WorkflowRegistry};
pub use wiring::{build_event_bus, EventBusDependencies, WiringError};
