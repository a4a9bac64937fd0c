//! Invalidation Handler
//!
//! Revokes sessions and cached provider credentials once a
//! security-sensitive workflow has succeeded.

use std::sync::Arc;

use async_trait::async_trait;

use crate::bus::{DispatchContext, EventHandler, HandlerError};
use crate::domain::{Event, WorkflowEvent};
use crate::ports::{RevocationSubject, SessionStore};
use crate::registry::HandlerCategory;

pub struct InvalidationHandler {
    sessions: Arc<dyn SessionStore>,
}

impl InvalidationHandler {
    pub fn new(sessions: Arc<dyn SessionStore>) -> Self {
        Self { sessions }
    }
}

/// What an event invalidates, if anything
pub fn revocation_for(event: &Event) -> Option<RevocationSubject> {
    match event.as_workflow()? {
        WorkflowEvent::PasswordChangeSucceeded { user_id, .. }
        | WorkflowEvent::PasswordResetSucceeded { user_id, .. } => {
            Some(RevocationSubject::AllUserSessions { user_id: *user_id })
        }
        WorkflowEvent::UserLogoutSucceeded { session_id, .. } => Some(RevocationSubject::Session {
            session_id: *session_id,
        }),
        WorkflowEvent::ProviderDisconnectionSucceeded { connection_id, .. } => {
            Some(RevocationSubject::ProviderCredentials {
                connection_id: *connection_id,
            })
        }
        _ => None,
    }
}

#[async_trait]
impl EventHandler for InvalidationHandler {
    async fn handle(
        &self,
        event: &Event,
        _context: Option<&mut DispatchContext<'_>>,
    ) -> Result<(), HandlerError> {
        let subject = revocation_for(event).ok_or(HandlerError::Unsupported {
            handler: HandlerCategory::Invalidation.as_str(),
            event_type: event.event_type(),
        })?;

        let revoked = self.sessions.revoke(&subject).await?;
        tracing::info!(
            subject = %subject,
            revoked = revoked,
            event_id = %event.id(),
            "Revoked sessions"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::InMemorySessionStore;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_password_change_revokes_all_sessions() {
        let store = Arc::new(InMemorySessionStore::new());
        let user_id = Uuid::new_v4();
        let other_user = Uuid::new_v4();
        store.open_session(user_id);
        store.open_session(user_id);
        store.open_session(other_user);

        let handler = InvalidationHandler::new(store.clone());
        let event = Event::new(WorkflowEvent::PasswordChangeSucceeded {
            user_id,
            email: "jane@example.com".to_string(),
            initiated_by: "user".to_string(),
        });
        handler.handle(&event, None).await.unwrap();

        assert_eq!(store.active_sessions(user_id), 0);
        assert_eq!(store.active_sessions(other_user), 1);
        assert_eq!(store.revocations(), vec![RevocationSubject::AllUserSessions { user_id }]);
    }

    #[tokio::test]
    async fn test_provider_disconnection_drops_cached_credentials() {
        let store = Arc::new(InMemorySessionStore::new());
        let connection_id = Uuid::new_v4();
        store.cache_provider_credentials(connection_id);

        let handler = InvalidationHandler::new(store.clone());
        let event = Event::new(WorkflowEvent::ProviderDisconnectionSucceeded {
            user_id: Uuid::new_v4(),
            connection_id,
            provider_slug: "plaid".to_string(),
        });
        handler.handle(&event, None).await.unwrap();

        assert!(!store.has_provider_credentials(connection_id));
    }

    #[test]
    fn test_failed_workflows_revoke_nothing() {
        let event = Event::new(WorkflowEvent::PasswordChangeFailed {
            user_id: Uuid::new_v4(),
            reason: "wrong current password".to_string(),
        });
        assert_eq!(revocation_for(&event), None);
    }
}
