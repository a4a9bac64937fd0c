//! In-memory audit store
//!
//! Keeps the hash chain in process. Used by tests and by the ops server
//! when no database is configured.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use super::{
    chain_hash, AuditError, AuditLogEntry, AuditRecord, AuditSession, AuditStore,
    ChainVerificationResult, GENESIS_HASH,
};

/// In-memory append-only audit store
#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    entries: Mutex<Vec<AuditLogEntry>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a transactional session; nothing is visible until commit
    pub fn begin(&self) -> InMemoryAuditSession<'_> {
        InMemoryAuditSession {
            store: self,
            pending: Vec::new(),
        }
    }

    pub fn entries(&self) -> Vec<AuditLogEntry> {
        self.entries.lock().clone()
    }

    /// Actions in append order
    pub fn actions(&self) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .map(|entry| entry.record.action.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Verify the integrity of the hash chain
    pub fn verify_hash_chain(&self) -> ChainVerificationResult {
        let entries = self.entries.lock();
        let mut previous_hash = GENESIS_HASH.to_string();

        for entry in entries.iter() {
            if entry.previous_hash != previous_hash {
                return ChainVerificationResult::invalid(
                    entry.sequence_number as u64,
                    entry.id,
                    previous_hash,
                    entry.previous_hash.clone(),
                );
            }

            let calculated = chain_hash(
                entry.id,
                entry.sequence_number,
                &entry.record.action,
                entry.record.actor_id,
                &entry.record.metadata.to_string(),
                &entry.previous_hash,
            );
            if calculated != entry.current_hash {
                return ChainVerificationResult::invalid(
                    entry.sequence_number as u64,
                    entry.id,
                    calculated,
                    entry.current_hash.clone(),
                );
            }

            previous_hash = entry.current_hash.clone();
        }

        ChainVerificationResult::valid(entries.len() as u64)
    }

    fn append(&self, id: Uuid, record: AuditRecord) {
        let mut entries = self.entries.lock();
        let sequence_number = entries.len() as i64 + 1;
        let previous_hash = entries
            .last()
            .map(|entry| entry.current_hash.clone())
            .unwrap_or_else(|| GENESIS_HASH.to_string());
        let current_hash = chain_hash(
            id,
            sequence_number,
            &record.action,
            record.actor_id,
            &record.metadata.to_string(),
            &previous_hash,
        );

        entries.push(AuditLogEntry {
            id,
            sequence_number,
            record,
            previous_hash,
            current_hash,
            recorded_at: Utc::now(),
        });
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn record(&self, record: AuditRecord) -> Result<Uuid, AuditError> {
        let id = Uuid::new_v4();
        self.append(id, record);
        Ok(id)
    }
}

/// Session over an [`InMemoryAuditStore`]; records buffer until commit
#[derive(Debug)]
pub struct InMemoryAuditSession<'s> {
    store: &'s InMemoryAuditStore,
    pending: Vec<(Uuid, AuditRecord)>,
}

impl<'s> InMemoryAuditSession<'s> {
    /// Number of records waiting for commit
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Append every buffered record to the store
    pub fn commit(self) -> Vec<Uuid> {
        self.pending
            .into_iter()
            .map(|(id, record)| {
                self.store.append(id, record);
                id
            })
            .collect()
    }

    /// Discard every buffered record
    pub fn rollback(self) {
        tracing::debug!(discarded = self.pending.len(), "Audit session rolled back");
    }
}

#[async_trait]
impl<'s> AuditSession for InMemoryAuditSession<'s> {
    async fn record(&mut self, record: AuditRecord) -> Result<Uuid, AuditError> {
        let id = Uuid::new_v4();
        self.pending.push((id, record));
        Ok(id)
    }
}
