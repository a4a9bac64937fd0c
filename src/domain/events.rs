//! Domain Events
//!
//! Event contract and taxonomy for the event bus.
//! Events are immutable facts that have happened in the system.
//!
//! Two families exist and are kept structurally apart:
//! - workflow events, three per business operation (attempted, succeeded, failed)
//! - operational events, a single fact with no outcome pairing

use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

// =========================================================================
// Taxonomy
// =========================================================================

/// Lifecycle state of a workflow event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    Attempted,
    Succeeded,
    Failed,
}

impl WorkflowState {
    pub const ALL: [WorkflowState; 3] = [
        WorkflowState::Attempted,
        WorkflowState::Succeeded,
        WorkflowState::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::Attempted => "attempted",
            WorkflowState::Succeeded => "succeeded",
            WorkflowState::Failed => "failed",
        }
    }

    fn class_suffix(&self) -> &'static str {
        match self {
            WorkflowState::Attempted => "Attempted",
            WorkflowState::Succeeded => "Succeeded",
            WorkflowState::Failed => "Failed",
        }
    }

    /// Succeeded and Failed close an invocation
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WorkflowState::Attempted)
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Business workflows tracked with attempted/succeeded/failed events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Workflow {
    UserRegistration,
    UserLogin,
    UserLogout,
    EmailVerification,
    PasswordChange,
    PasswordReset,
    ProviderConnection,
    ProviderDisconnection,
    ProviderTokenRefresh,
    AccountSync,
}

impl Workflow {
    pub const ALL: [Workflow; 10] = [
        Workflow::UserRegistration,
        Workflow::UserLogin,
        Workflow::UserLogout,
        Workflow::EmailVerification,
        Workflow::PasswordChange,
        Workflow::PasswordReset,
        Workflow::ProviderConnection,
        Workflow::ProviderDisconnection,
        Workflow::ProviderTokenRefresh,
        Workflow::AccountSync,
    ];

    /// Registry name of the workflow
    pub fn as_str(&self) -> &'static str {
        match self {
            Workflow::UserRegistration => "user_registration",
            Workflow::UserLogin => "user_login",
            Workflow::UserLogout => "user_logout",
            Workflow::EmailVerification => "email_verification",
            Workflow::PasswordChange => "password_change",
            Workflow::PasswordReset => "password_reset",
            Workflow::ProviderConnection => "provider_connection",
            Workflow::ProviderDisconnection => "provider_disconnection",
            Workflow::ProviderTokenRefresh => "provider_token_refresh",
            Workflow::AccountSync => "account_sync",
        }
    }

    fn class_prefix(&self) -> &'static str {
        match self {
            Workflow::UserRegistration => "UserRegistration",
            Workflow::UserLogin => "UserLogin",
            Workflow::UserLogout => "UserLogout",
            Workflow::EmailVerification => "EmailVerification",
            Workflow::PasswordChange => "PasswordChange",
            Workflow::PasswordReset => "PasswordReset",
            Workflow::ProviderConnection => "ProviderConnection",
            Workflow::ProviderDisconnection => "ProviderDisconnection",
            Workflow::ProviderTokenRefresh => "ProviderTokenRefresh",
            Workflow::AccountSync => "AccountSync",
        }
    }

    /// Resource type recorded in the audit trail
    pub fn resource_type(&self) -> &'static str {
        match self {
            Workflow::UserRegistration
            | Workflow::UserLogin
            | Workflow::EmailVerification
            | Workflow::PasswordChange
            | Workflow::PasswordReset => "user",
            Workflow::UserLogout => "session",
            Workflow::ProviderConnection
            | Workflow::ProviderDisconnection
            | Workflow::ProviderTokenRefresh
            | Workflow::AccountSync => "provider_connection",
        }
    }

    /// The three event classes composing this workflow
    pub fn event_types(self) -> [EventType; 3] {
        WorkflowState::ALL.map(|state| EventType::Workflow {
            workflow: self,
            state,
        })
    }
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single-fact telemetry events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationalKind {
    SessionActivityUpdated,
    SuspiciousSessionActivity,
    ProviderTokenExpiring,
}

impl OperationalKind {
    pub const ALL: [OperationalKind; 3] = [
        OperationalKind::SessionActivityUpdated,
        OperationalKind::SuspiciousSessionActivity,
        OperationalKind::ProviderTokenExpiring,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationalKind::SessionActivityUpdated => "session_activity_updated",
            OperationalKind::SuspiciousSessionActivity => "suspicious_session_activity",
            OperationalKind::ProviderTokenExpiring => "provider_token_expiring",
        }
    }

    fn class_name(&self) -> &'static str {
        match self {
            OperationalKind::SessionActivityUpdated => "SessionActivityUpdated",
            OperationalKind::SuspiciousSessionActivity => "SuspiciousSessionActivity",
            OperationalKind::ProviderTokenExpiring => "ProviderTokenExpiring",
        }
    }

    /// Security-relevant operational events carry an audit obligation
    pub fn is_security_relevant(&self) -> bool {
        matches!(self, OperationalKind::SuspiciousSessionActivity)
    }

    pub fn resource_type(&self) -> &'static str {
        match self {
            OperationalKind::SessionActivityUpdated
            | OperationalKind::SuspiciousSessionActivity => "session",
            OperationalKind::ProviderTokenExpiring => "provider_connection",
        }
    }
}

/// Event family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventFamily {
    Workflow,
    Operational,
}

impl EventFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventFamily::Workflow => "workflow",
            EventFamily::Operational => "operational",
        }
    }
}

/// Routing key of the dispatcher: one value per concrete event class.
///
/// Displays as the event class name, e.g. `UserRegistrationAttempted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventType {
    Workflow {
        workflow: Workflow,
        state: WorkflowState,
    },
    Operational(OperationalKind),
}

impl EventType {
    pub fn workflow_event(workflow: Workflow, state: WorkflowState) -> Self {
        EventType::Workflow { workflow, state }
    }

    pub fn family(&self) -> EventFamily {
        match self {
            EventType::Workflow { .. } => EventFamily::Workflow,
            EventType::Operational(_) => EventFamily::Operational,
        }
    }

    pub fn workflow(&self) -> Option<Workflow> {
        match self {
            EventType::Workflow { workflow, .. } => Some(*workflow),
            EventType::Operational(_) => None,
        }
    }

    pub fn state(&self) -> Option<WorkflowState> {
        match self {
            EventType::Workflow { state, .. } => Some(*state),
            EventType::Operational(_) => None,
        }
    }

    /// Name of the registry entry this class belongs to
    pub fn registry_name(&self) -> &'static str {
        match self {
            EventType::Workflow { workflow, .. } => workflow.as_str(),
            EventType::Operational(kind) => kind.as_str(),
        }
    }

    /// Conventional handler method name, e.g. `on_password_change_succeeded`.
    ///
    /// Used for handler identity in logs and compliance reports only.
    pub fn handler_method(&self) -> String {
        match self {
            EventType::Workflow { workflow, state } => {
                format!("on_{}_{}", workflow.as_str(), state.as_str())
            }
            EventType::Operational(kind) => format!("on_{}", kind.as_str()),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Workflow { workflow, state } => {
                write!(f, "{}{}", workflow.class_prefix(), state.class_suffix())
            }
            EventType::Operational(kind) => f.write_str(kind.class_name()),
        }
    }
}

impl Serialize for EventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// =========================================================================
// Workflow event payloads
// =========================================================================

/// Workflow events, three per business operation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkflowEvent {
    UserRegistrationAttempted {
        email: String,
    },
    UserRegistrationSucceeded {
        user_id: Uuid,
        email: String,
        verification_token: String,
    },
    UserRegistrationFailed {
        email: String,
        reason: String,
    },

    UserLoginAttempted {
        email: String,
    },
    UserLoginSucceeded {
        user_id: Uuid,
        email: String,
        session_id: Uuid,
    },
    UserLoginFailed {
        email: String,
        reason: String,
    },

    UserLogoutAttempted {
        user_id: Uuid,
        session_id: Uuid,
    },
    UserLogoutSucceeded {
        user_id: Uuid,
        session_id: Uuid,
    },
    UserLogoutFailed {
        user_id: Uuid,
        session_id: Uuid,
        reason: String,
    },

    EmailVerificationAttempted {
        email: String,
    },
    EmailVerificationSucceeded {
        user_id: Uuid,
        email: String,
    },
    EmailVerificationFailed {
        email: String,
        reason: String,
    },

    PasswordChangeAttempted {
        user_id: Uuid,
    },
    PasswordChangeSucceeded {
        user_id: Uuid,
        email: String,
        initiated_by: String,
    },
    PasswordChangeFailed {
        user_id: Uuid,
        reason: String,
    },

    PasswordResetAttempted {
        email: String,
    },
    PasswordResetSucceeded {
        user_id: Uuid,
        email: String,
    },
    PasswordResetFailed {
        email: String,
        reason: String,
    },

    ProviderConnectionAttempted {
        user_id: Uuid,
        provider_slug: String,
    },
    ProviderConnectionSucceeded {
        user_id: Uuid,
        connection_id: Uuid,
        provider_slug: String,
    },
    ProviderConnectionFailed {
        user_id: Uuid,
        provider_slug: String,
        reason: String,
    },

    ProviderDisconnectionAttempted {
        user_id: Uuid,
        connection_id: Uuid,
        provider_slug: String,
    },
    ProviderDisconnectionSucceeded {
        user_id: Uuid,
        connection_id: Uuid,
        provider_slug: String,
    },
    ProviderDisconnectionFailed {
        user_id: Uuid,
        connection_id: Uuid,
        provider_slug: String,
        reason: String,
    },

    ProviderTokenRefreshAttempted {
        user_id: Uuid,
        connection_id: Uuid,
        provider_slug: String,
    },
    ProviderTokenRefreshSucceeded {
        user_id: Uuid,
        connection_id: Uuid,
        provider_slug: String,
    },
    ProviderTokenRefreshFailed {
        user_id: Uuid,
        connection_id: Uuid,
        provider_slug: String,
        reason: String,
        needs_user_action: bool,
    },

    AccountSyncAttempted {
        user_id: Uuid,
        connection_id: Uuid,
    },
    AccountSyncSucceeded {
        user_id: Uuid,
        connection_id: Uuid,
        accounts_synced: u32,
    },
    AccountSyncFailed {
        user_id: Uuid,
        connection_id: Uuid,
        reason: String,
    },
}

impl WorkflowEvent {
    /// Workflow and lifecycle state of this event
    pub fn kind(&self) -> (Workflow, WorkflowState) {
        use WorkflowEvent::*;
        use WorkflowState::{Attempted, Failed, Succeeded};

        match self {
            UserRegistrationAttempted { .. } => (Workflow::UserRegistration, Attempted),
            UserRegistrationSucceeded { .. } => (Workflow::UserRegistration, Succeeded),
            UserRegistrationFailed { .. } => (Workflow::UserRegistration, Failed),
            UserLoginAttempted { .. } => (Workflow::UserLogin, Attempted),
            UserLoginSucceeded { .. } => (Workflow::UserLogin, Succeeded),
            UserLoginFailed { .. } => (Workflow::UserLogin, Failed),
            UserLogoutAttempted { .. } => (Workflow::UserLogout, Attempted),
            UserLogoutSucceeded { .. } => (Workflow::UserLogout, Succeeded),
            UserLogoutFailed { .. } => (Workflow::UserLogout, Failed),
            EmailVerificationAttempted { .. } => (Workflow::EmailVerification, Attempted),
            EmailVerificationSucceeded { .. } => (Workflow::EmailVerification, Succeeded),
            EmailVerificationFailed { .. } => (Workflow::EmailVerification, Failed),
            PasswordChangeAttempted { .. } => (Workflow::PasswordChange, Attempted),
            PasswordChangeSucceeded { .. } => (Workflow::PasswordChange, Succeeded),
            PasswordChangeFailed { .. } => (Workflow::PasswordChange, Failed),
            PasswordResetAttempted { .. } => (Workflow::PasswordReset, Attempted),
            PasswordResetSucceeded { .. } => (Workflow::PasswordReset, Succeeded),
            PasswordResetFailed { .. } => (Workflow::PasswordReset, Failed),
            ProviderConnectionAttempted { .. } => (Workflow::ProviderConnection, Attempted),
            ProviderConnectionSucceeded { .. } => (Workflow::ProviderConnection, Succeeded),
            ProviderConnectionFailed { .. } => (Workflow::ProviderConnection, Failed),
            ProviderDisconnectionAttempted { .. } => (Workflow::ProviderDisconnection, Attempted),
            ProviderDisconnectionSucceeded { .. } => (Workflow::ProviderDisconnection, Succeeded),
            ProviderDisconnectionFailed { .. } => (Workflow::ProviderDisconnection, Failed),
            ProviderTokenRefreshAttempted { .. } => (Workflow::ProviderTokenRefresh, Attempted),
            ProviderTokenRefreshSucceeded { .. } => (Workflow::ProviderTokenRefresh, Succeeded),
            ProviderTokenRefreshFailed { .. } => (Workflow::ProviderTokenRefresh, Failed),
            AccountSyncAttempted { .. } => (Workflow::AccountSync, Attempted),
            AccountSyncSucceeded { .. } => (Workflow::AccountSync, Succeeded),
            AccountSyncFailed { .. } => (Workflow::AccountSync, Failed),
        }
    }

    pub fn workflow(&self) -> Workflow {
        self.kind().0
    }

    pub fn state(&self) -> WorkflowState {
        self.kind().1
    }

    pub fn event_type(&self) -> EventType {
        let (workflow, state) = self.kind();
        EventType::Workflow { workflow, state }
    }

    /// User the event is about, when known at this point of the workflow
    pub fn actor_id(&self) -> Option<Uuid> {
        use WorkflowEvent::*;

        match self {
            UserRegistrationSucceeded { user_id, .. }
            | UserLoginSucceeded { user_id, .. }
            | UserLogoutAttempted { user_id, .. }
            | UserLogoutSucceeded { user_id, .. }
            | UserLogoutFailed { user_id, .. }
            | EmailVerificationSucceeded { user_id, .. }
            | PasswordChangeAttempted { user_id }
            | PasswordChangeSucceeded { user_id, .. }
            | PasswordChangeFailed { user_id, .. }
            | PasswordResetSucceeded { user_id, .. }
            | ProviderConnectionAttempted { user_id, .. }
            | ProviderConnectionSucceeded { user_id, .. }
            | ProviderConnectionFailed { user_id, .. }
            | ProviderDisconnectionAttempted { user_id, .. }
            | ProviderDisconnectionSucceeded { user_id, .. }
            | ProviderDisconnectionFailed { user_id, .. }
            | ProviderTokenRefreshAttempted { user_id, .. }
            | ProviderTokenRefreshSucceeded { user_id, .. }
            | ProviderTokenRefreshFailed { user_id, .. }
            | AccountSyncAttempted { user_id, .. }
            | AccountSyncSucceeded { user_id, .. }
            | AccountSyncFailed { user_id, .. } => Some(*user_id),
            UserRegistrationAttempted { .. }
            | UserRegistrationFailed { .. }
            | UserLoginAttempted { .. }
            | UserLoginFailed { .. }
            | EmailVerificationAttempted { .. }
            | EmailVerificationFailed { .. }
            | PasswordResetAttempted { .. }
            | PasswordResetFailed { .. } => None,
        }
    }

    /// Email address carried by the event, if any
    pub fn email(&self) -> Option<&str> {
        use WorkflowEvent::*;

        match self {
            UserRegistrationAttempted { email }
            | UserRegistrationSucceeded { email, .. }
            | UserRegistrationFailed { email, .. }
            | UserLoginAttempted { email }
            | UserLoginSucceeded { email, .. }
            | UserLoginFailed { email, .. }
            | EmailVerificationAttempted { email }
            | EmailVerificationSucceeded { email, .. }
            | EmailVerificationFailed { email, .. }
            | PasswordChangeSucceeded { email, .. }
            | PasswordResetAttempted { email }
            | PasswordResetSucceeded { email, .. }
            | PasswordResetFailed { email, .. } => Some(email.as_str()),
            _ => None,
        }
    }

    /// Failure reason of a Failed event
    pub fn failure_reason(&self) -> Option<&str> {
        use WorkflowEvent::*;

        match self {
            UserRegistrationFailed { reason, .. }
            | UserLoginFailed { reason, .. }
            | UserLogoutFailed { reason, .. }
            | EmailVerificationFailed { reason, .. }
            | PasswordChangeFailed { reason, .. }
            | PasswordResetFailed { reason, .. }
            | ProviderConnectionFailed { reason, .. }
            | ProviderDisconnectionFailed { reason, .. }
            | ProviderTokenRefreshFailed { reason, .. }
            | AccountSyncFailed { reason, .. } => Some(reason.as_str()),
            _ => None,
        }
    }

    /// Resource identifier for the audit trail
    pub fn resource_id(&self) -> Option<String> {
        use WorkflowEvent::*;

        match self {
            UserLogoutAttempted { session_id, .. }
            | UserLogoutSucceeded { session_id, .. }
            | UserLogoutFailed { session_id, .. } => Some(session_id.to_string()),
            ProviderConnectionSucceeded { connection_id, .. }
            | ProviderDisconnectionAttempted { connection_id, .. }
            | ProviderDisconnectionSucceeded { connection_id, .. }
            | ProviderDisconnectionFailed { connection_id, .. }
            | ProviderTokenRefreshAttempted { connection_id, .. }
            | ProviderTokenRefreshSucceeded { connection_id, .. }
            | ProviderTokenRefreshFailed { connection_id, .. }
            | AccountSyncAttempted { connection_id, .. }
            | AccountSyncSucceeded { connection_id, .. }
            | AccountSyncFailed { connection_id, .. } => Some(connection_id.to_string()),
            _ => self.actor_id().map(|id| id.to_string()),
        }
    }
}

// =========================================================================
// Operational event payloads
// =========================================================================

/// Operational events, single state, high frequency
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OperationalEvent {
    SessionActivityUpdated {
        session_id: Uuid,
        user_id: Uuid,
        #[serde(skip_serializing_if = "Option::is_none")]
        client_ip: Option<IpAddr>,
    },
    SuspiciousSessionActivity {
        session_id: Uuid,
        user_id: Uuid,
        reason: String,
    },
    ProviderTokenExpiring {
        user_id: Uuid,
        connection_id: Uuid,
        provider_slug: String,
        expires_at: DateTime<Utc>,
    },
}

impl OperationalEvent {
    pub fn kind(&self) -> OperationalKind {
        match self {
            OperationalEvent::SessionActivityUpdated { .. } => {
                OperationalKind::SessionActivityUpdated
            }
            OperationalEvent::SuspiciousSessionActivity { .. } => {
                OperationalKind::SuspiciousSessionActivity
            }
            OperationalEvent::ProviderTokenExpiring { .. } => {
                OperationalKind::ProviderTokenExpiring
            }
        }
    }

    pub fn event_type(&self) -> EventType {
        EventType::Operational(self.kind())
    }

    pub fn actor_id(&self) -> Option<Uuid> {
        match self {
            OperationalEvent::SessionActivityUpdated { user_id, .. }
            | OperationalEvent::SuspiciousSessionActivity { user_id, .. }
            | OperationalEvent::ProviderTokenExpiring { user_id, .. } => Some(*user_id),
        }
    }

    pub fn resource_id(&self) -> Option<String> {
        match self {
            OperationalEvent::SessionActivityUpdated { session_id, .. }
            | OperationalEvent::SuspiciousSessionActivity { session_id, .. } => {
                Some(session_id.to_string())
            }
            OperationalEvent::ProviderTokenExpiring { connection_id, .. } => {
                Some(connection_id.to_string())
            }
        }
    }
}

// =========================================================================
// Event contract
// =========================================================================

/// Payload of an event, one of the two families
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "family", content = "event", rename_all = "snake_case")]
pub enum EventPayload {
    Workflow(WorkflowEvent),
    Operational(OperationalEvent),
}

impl From<WorkflowEvent> for EventPayload {
    fn from(event: WorkflowEvent) -> Self {
        EventPayload::Workflow(event)
    }
}

impl From<OperationalEvent> for EventPayload {
    fn from(event: OperationalEvent) -> Self {
        EventPayload::Operational(event)
    }
}

/// An immutable domain event.
///
/// Identity and equality are by `id`; two events with identical payloads
/// are still distinct facts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    id: Uuid,
    occurred_at: DateTime<Utc>,
    payload: EventPayload,
}

impl Event {
    /// Create a new event with a fresh id, stamped now
    pub fn new(payload: impl Into<EventPayload>) -> Self {
        Self {
            id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            payload: payload.into(),
        }
    }

    /// Rebuild an event with a known identity (replay, tests)
    pub fn with_identity(
        id: Uuid,
        occurred_at: DateTime<Utc>,
        payload: impl Into<EventPayload>,
    ) -> Self {
        Self {
            id,
            occurred_at,
            payload: payload.into(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }

    pub fn event_type(&self) -> EventType {
        match &self.payload {
            EventPayload::Workflow(event) => event.event_type(),
            EventPayload::Operational(event) => event.event_type(),
        }
    }

    pub fn family(&self) -> EventFamily {
        self.event_type().family()
    }

    pub fn as_workflow(&self) -> Option<&WorkflowEvent> {
        match &self.payload {
            EventPayload::Workflow(event) => Some(event),
            EventPayload::Operational(_) => None,
        }
    }

    pub fn as_operational(&self) -> Option<&OperationalEvent> {
        match &self.payload {
            EventPayload::Operational(event) => Some(event),
            EventPayload::Workflow(_) => None,
        }
    }

    pub fn actor_id(&self) -> Option<Uuid> {
        match &self.payload {
            EventPayload::Workflow(event) => event.actor_id(),
            EventPayload::Operational(event) => event.actor_id(),
        }
    }

    /// Resource type and id for the audit trail
    pub fn resource(&self) -> (&'static str, Option<String>) {
        match &self.payload {
            EventPayload::Workflow(event) => {
                (event.workflow().resource_type(), event.resource_id())
            }
            EventPayload::Operational(event) => {
                (event.kind().resource_type(), event.resource_id())
            }
        }
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Event {}

impl Hash for Event {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration_attempted() -> WorkflowEvent {
        WorkflowEvent::UserRegistrationAttempted {
            email: "alice@example.com".to_string(),
        }
    }

    #[test]
    fn test_event_type_display_uses_class_name() {
        let event_type =
            EventType::workflow_event(Workflow::PasswordChange, WorkflowState::Succeeded);
        assert_eq!(event_type.to_string(), "PasswordChangeSucceeded");

        let operational = EventType::Operational(OperationalKind::SessionActivityUpdated);
        assert_eq!(operational.to_string(), "SessionActivityUpdated");
    }

    #[test]
    fn test_handler_method_names() {
        let event_type =
            EventType::workflow_event(Workflow::UserRegistration, WorkflowState::Attempted);
        assert_eq!(event_type.handler_method(), "on_user_registration_attempted");

        let operational = EventType::Operational(OperationalKind::SuspiciousSessionActivity);
        assert_eq!(operational.handler_method(), "on_suspicious_session_activity");
    }

    #[test]
    fn test_workflow_event_types_cover_all_states() {
        let types = Workflow::AccountSync.event_types();
        let states: Vec<_> = types.iter().filter_map(|t| t.state()).collect();
        assert_eq!(states, WorkflowState::ALL.to_vec());
        assert!(types.iter().all(|t| t.workflow() == Some(Workflow::AccountSync)));
    }

    #[test]
    fn test_equality_is_by_id() {
        let first = Event::new(registration_attempted());
        let second = Event::new(registration_attempted());
        assert_ne!(first, second);

        let copy = first.clone();
        assert_eq!(first, copy);

        let rebuilt = Event::with_identity(first.id(), Utc::now(), registration_attempted());
        assert_eq!(first, rebuilt);
    }

    #[test]
    fn test_event_accessors() {
        let user_id = Uuid::new_v4();
        let session_id = Uuid::new_v4();
        let event = Event::new(WorkflowEvent::UserLogoutSucceeded { user_id, session_id });

        assert_eq!(event.family(), EventFamily::Workflow);
        assert_eq!(event.actor_id(), Some(user_id));
        assert_eq!(event.resource(), ("session", Some(session_id.to_string())));
        assert!(event.as_operational().is_none());
        assert_eq!(
            event.as_workflow().map(|e| e.state()),
            Some(WorkflowState::Succeeded)
        );
    }

    #[test]
    fn test_failure_reason_only_on_failed_events() {
        let failed = WorkflowEvent::UserLoginFailed {
            email: "bob@example.com".to_string(),
            reason: "invalid_credentials".to_string(),
        };
        assert_eq!(failed.failure_reason(), Some("invalid_credentials"));
        assert!(failed.state().is_terminal());
        assert!(registration_attempted().failure_reason().is_none());
        assert!(!registration_attempted().state().is_terminal());
    }

    #[test]
    fn test_event_serialization() {
        let event = Event::new(OperationalEvent::SuspiciousSessionActivity {
            session_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            reason: "ip_change".to_string(),
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["payload"]["family"], "operational");
        assert_eq!(json["payload"]["event"]["type"], "SuspiciousSessionActivity");

        let deserialized: Event = serde_json::from_value(json).unwrap();
        assert_eq!(deserialized, event);
        assert_eq!(deserialized.event_type(), event.event_type());
    }

    #[test]
    fn test_event_type_serializes_as_class_name() {
        let event_type = EventType::workflow_event(Workflow::UserLogin, WorkflowState::Failed);
        let json = serde_json::to_string(&event_type).unwrap();
        assert_eq!(json, r#""UserLoginFailed""#);
    }
}
