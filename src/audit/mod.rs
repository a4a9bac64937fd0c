//! Audit Trail
//!
//! Append-only, tamper-evident audit records written by the audit handler.
//! Records are hash chained: each entry's hash covers its own content and
//! the previous entry's hash.

mod memory;
mod postgres;

use std::net::IpAddr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::OperationContext;

pub use memory::{InMemoryAuditSession, InMemoryAuditStore};
pub use postgres::PgAuditStore;

/// Hash preceding the first entry of the chain
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

// =========================================================================
// Records
// =========================================================================

/// An audit record before it is stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub event_id: Uuid,
    pub action: String,
    pub actor_id: Option<Uuid>,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub metadata: serde_json::Value,
    pub correlation_id: Option<Uuid>,
    pub client_ip: Option<IpAddr>,
    pub user_agent: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl AuditRecord {
    /// Start a record for an action triggered by an event
    pub fn new(action: impl Into<String>, event_id: Uuid, occurred_at: DateTime<Utc>) -> Self {
        Self {
            event_id,
            action: action.into(),
            actor_id: None,
            resource_type: String::new(),
            resource_id: None,
            metadata: serde_json::Value::Null,
            correlation_id: None,
            client_ip: None,
            user_agent: None,
            occurred_at,
        }
    }

    pub fn actor(mut self, actor_id: Option<Uuid>) -> Self {
        self.actor_id = actor_id;
        self
    }

    pub fn resource(mut self, resource_type: &str, resource_id: Option<String>) -> Self {
        self.resource_type = resource_type.to_string();
        self.resource_id = resource_id;
        self
    }

    /// Attach serialized metadata; an unserializable value is stored as null
    pub fn metadata<T: Serialize>(mut self, metadata: &T) -> Self {
        self.metadata = serde_json::to_value(metadata).unwrap_or(serde_json::Value::Null);
        self
    }

    /// Copy request metadata; the request user fills in a missing actor
    pub fn operation(mut self, context: &OperationContext) -> Self {
        self.correlation_id = context.correlation_id;
        self.client_ip = context.client_ip;
        self.user_agent = context.user_agent.clone();
        if self.actor_id.is_none() {
            self.actor_id = context.request_user_id;
        }
        self
    }
}

/// A stored audit log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub sequence_number: i64,
    pub record: AuditRecord,
    pub previous_hash: String,
    pub current_hash: String,
    pub recorded_at: DateTime<Utc>,
}

/// Result of hash chain verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainVerificationResult {
    pub is_valid: bool,
    pub entries_checked: u64,
    pub first_invalid_entry: Option<Uuid>,
    pub expected_hash: Option<String>,
    pub actual_hash: Option<String>,
}

impl ChainVerificationResult {
    fn valid(entries_checked: u64) -> Self {
        Self {
            is_valid: true,
            entries_checked,
            first_invalid_entry: None,
            expected_hash: None,
            actual_hash: None,
        }
    }

    fn invalid(entries_checked: u64, entry: Uuid, expected: String, actual: String) -> Self {
        Self {
            is_valid: false,
            entries_checked,
            first_invalid_entry: Some(entry),
            expected_hash: Some(expected),
            actual_hash: Some(actual),
        }
    }
}

/// Hash of one chain link. `metadata_text` is the stored JSON text.
pub fn chain_hash(
    id: Uuid,
    sequence_number: i64,
    action: &str,
    actor_id: Option<Uuid>,
    metadata_text: &str,
    previous_hash: &str,
) -> String {
    let input = format!(
        "{}{}{}{}{}{}",
        id,
        sequence_number,
        action,
        actor_id.map(|u| u.to_string()).unwrap_or_default(),
        metadata_text,
        previous_hash
    );
    sha256_hex(&input)
}

/// Calculate SHA-256 hash and return as hex string
fn sha256_hex(input: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

// =========================================================================
// Ports
// =========================================================================

/// Audit errors
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Audit store unavailable: {0}")]
    Unavailable(String),
}

/// Append-only audit store. Each call runs in its own short-lived transaction.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn record(&self, record: AuditRecord) -> Result<Uuid, AuditError>;
}

/// An open transaction owned by a publisher.
///
/// Records written here commit or roll back together with the
/// publisher's business writes.
#[async_trait]
pub trait AuditSession: Send {
    async fn record(&mut self, record: AuditRecord) -> Result<Uuid, AuditError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_record_builder() {
        let event_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let record = AuditRecord::new("user.password_change.succeeded", event_id, Utc::now())
            .actor(Some(user_id))
            .resource("user", Some(user_id.to_string()))
            .metadata(&serde_json::json!({ "initiated_by": "user" }));

        assert_eq!(record.action, "user.password_change.succeeded");
        assert_eq!(record.actor_id, Some(user_id));
        assert_eq!(record.resource_type, "user");
        assert_eq!(record.metadata["initiated_by"], "user");
    }

    #[test]
    fn test_operation_context_fills_missing_actor() {
        let request_user = Uuid::new_v4();
        let correlation_id = Uuid::new_v4();
        let context = OperationContext::new()
            .with_request_user(request_user)
            .with_correlation_id(correlation_id);

        let record = AuditRecord::new("auth.login.attempted", Uuid::new_v4(), Utc::now())
            .operation(&context);
        assert_eq!(record.actor_id, Some(request_user));
        assert_eq!(record.correlation_id, Some(correlation_id));

        let actor = Uuid::new_v4();
        let record = AuditRecord::new("auth.login.succeeded", Uuid::new_v4(), Utc::now())
            .actor(Some(actor))
            .operation(&context);
        assert_eq!(record.actor_id, Some(actor));
    }

    #[test]
    fn test_chain_hash_depends_on_previous() {
        let id = Uuid::new_v4();
        let first = chain_hash(id, 1, "auth.login.attempted", None, "{}", GENESIS_HASH);
        let second = chain_hash(id, 1, "auth.login.attempted", None, "{}", &first);

        assert_eq!(first.len(), 64); // SHA-256 produces 64 hex characters
        assert_ne!(first, second);
    }
}
