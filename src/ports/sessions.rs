//! Session Store
//!
//! Cache/session revocation used by the invalidation handler.

use std::collections::{HashMap, HashSet};
use std::fmt;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use uuid::Uuid;

/// What to revoke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RevocationSubject {
    /// Every active session of a user
    AllUserSessions { user_id: Uuid },
    /// A single session
    Session { session_id: Uuid },
    /// Cached credentials of a provider connection
    ProviderCredentials { connection_id: Uuid },
}

impl fmt::Display for RevocationSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevocationSubject::AllUserSessions { user_id } => {
                write!(f, "user:{}:sessions", user_id)
            }
            RevocationSubject::Session { session_id } => write!(f, "session:{}", session_id),
            RevocationSubject::ProviderCredentials { connection_id } => {
                write!(f, "provider_connection:{}:credentials", connection_id)
            }
        }
    }
}

/// Session store errors
#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("Session store unavailable: {0}")]
    Unavailable(String),
}

/// Port for revoking sessions and cached credentials
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Revoke everything matching the subject; returns the number of entries removed
    async fn revoke(&self, subject: &RevocationSubject) -> Result<u64, SessionStoreError>;
}

#[derive(Debug, Default)]
struct SessionState {
    /// session id -> user id
    sessions: HashMap<Uuid, Uuid>,
    provider_credentials: HashSet<Uuid>,
    revocations: Vec<RevocationSubject>,
}

/// In-memory session store
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    state: Mutex<SessionState>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session for a user
    pub fn open_session(&self, user_id: Uuid) -> Uuid {
        let session_id = Uuid::new_v4();
        self.state.lock().sessions.insert(session_id, user_id);
        session_id
    }

    pub fn cache_provider_credentials(&self, connection_id: Uuid) {
        self.state.lock().provider_credentials.insert(connection_id);
    }

    pub fn active_sessions(&self, user_id: Uuid) -> usize {
        self.state
            .lock()
            .sessions
            .values()
            .filter(|owner| **owner == user_id)
            .count()
    }

    pub fn has_provider_credentials(&self, connection_id: Uuid) -> bool {
        self.state.lock().provider_credentials.contains(&connection_id)
    }

    /// Every revocation requested so far, in order
    pub fn revocations(&self) -> Vec<RevocationSubject> {
        self.state.lock().revocations.clone()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn revoke(&self, subject: &RevocationSubject) -> Result<u64, SessionStoreError> {
        let mut state = self.state.lock();
        state.revocations.push(*subject);

        let removed = match subject {
            RevocationSubject::AllUserSessions { user_id } => {
                let before = state.sessions.len();
                state.sessions.retain(|_, owner| owner != user_id);
                before - state.sessions.len()
            }
            RevocationSubject::Session { session_id } => {
                usize::from(state.sessions.remove(session_id).is_some())
            }
            RevocationSubject::ProviderCredentials { connection_id } => {
                usize::from(state.provider_credentials.remove(connection_id))
            }
        };

        Ok(removed as u64)
    }
}
