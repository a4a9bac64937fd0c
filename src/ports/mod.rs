//! Collaborator ports
//!
//! Capability interfaces the handler categories depend on, with
//! in-memory implementations and the production defaults.
//! The audit store lives in `crate::audit`.

pub mod log;
pub mod notification;
pub mod sessions;

pub use log::{InMemoryLogSink, LogLevel, LogRecord, LogSink, TracingLogSink};
pub use notification::{
    InMemoryNotificationSender, LoggingNotificationSender, NotificationError, NotificationSender,
    NotificationTemplate, SentNotification,
};
pub use sessions::{InMemorySessionStore, RevocationSubject, SessionStore, SessionStoreError};
