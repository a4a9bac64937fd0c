//! Event Handlers
//!
//! The four cross-cutting handler categories the composition root
//! subscribes from registry metadata.

mod audit;
mod invalidation;
mod logging;
mod notification;

pub use audit::AuditHandler;
pub use invalidation::{revocation_for, InvalidationHandler};
pub use logging::LoggingHandler;
pub use notification::NotificationHandler;
