//! Workflow Catalog
//!
//! The complete set of registry entries for the backend. Adding a workflow
//! here is all it takes to have it logged, audited and notified.

use crate::domain::{OperationalKind, Workflow};

use super::WorkflowMetadata;

/// Number of entries in the standard catalog
pub const STANDARD_ENTRY_COUNT: usize = 13;

/// Build the standard catalog
pub fn standard_entries() -> Vec<WorkflowMetadata> {
    vec![
        // Authentication and account lifecycle
        WorkflowMetadata::for_workflow(Workflow::UserRegistration, "user.registration")
            .with_logging()
            .with_audit()
            .with_notification(),
        WorkflowMetadata::for_workflow(Workflow::UserLogin, "auth.login")
            .with_logging()
            .with_audit(),
        WorkflowMetadata::for_workflow(Workflow::UserLogout, "auth.logout")
            .with_logging()
            .with_audit()
            .with_invalidation(),
        WorkflowMetadata::for_workflow(Workflow::EmailVerification, "user.email_verification")
            .with_logging()
            .with_audit()
            .with_notification(),
        WorkflowMetadata::for_workflow(Workflow::PasswordChange, "user.password_change")
            .with_logging()
            .with_audit()
            .with_notification()
            .with_invalidation(),
        WorkflowMetadata::for_workflow(Workflow::PasswordReset, "user.password_reset")
            .with_logging()
            .with_audit()
            .with_notification()
            .with_invalidation(),
        // Provider integrations
        WorkflowMetadata::for_workflow(Workflow::ProviderConnection, "provider.connection")
            .with_logging()
            .with_audit(),
        WorkflowMetadata::for_workflow(Workflow::ProviderDisconnection, "provider.disconnection")
            .with_logging()
            .with_audit()
            .with_invalidation(),
        WorkflowMetadata::for_workflow(Workflow::ProviderTokenRefresh, "provider.token_refresh")
            .with_logging()
            .with_audit(),
        WorkflowMetadata::for_workflow(Workflow::AccountSync, "provider.account_sync")
            .with_logging()
            .with_audit(),
        // Operational telemetry
        WorkflowMetadata::for_operational(
            OperationalKind::SessionActivityUpdated,
            "session.activity",
        )
        .with_logging(),
        WorkflowMetadata::for_operational(
            OperationalKind::SuspiciousSessionActivity,
            "security.suspicious_session_activity",
        )
        .with_logging()
        .with_audit(),
        WorkflowMetadata::for_operational(
            OperationalKind::ProviderTokenExpiring,
            "provider.token_expiring",
        )
        .with_logging(),
    ]
}
