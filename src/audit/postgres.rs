//! Postgres audit store
//!
//! Writes to the `audit_logs` table. The sequence number and hash chain
//! are set by the database trigger (see `migrations/0001_audit_logs.sql`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{
    chain_hash, AuditError, AuditLogEntry, AuditRecord, AuditSession, AuditStore,
    ChainVerificationResult, GENESIS_HASH,
};

/// Audit store backed by Postgres
#[derive(Debug, Clone)]
pub struct PgAuditStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct AuditRow {
    id: Uuid,
    sequence_number: i64,
    event_id: Uuid,
    action: String,
    actor_id: Option<Uuid>,
    resource_type: String,
    resource_id: Option<String>,
    metadata: serde_json::Value,
    correlation_id: Option<Uuid>,
    client_ip: Option<String>,
    user_agent: Option<String>,
    occurred_at: DateTime<Utc>,
    previous_hash: String,
    current_hash: String,
    recorded_at: DateTime<Utc>,
}

impl From<AuditRow> for AuditLogEntry {
    fn from(row: AuditRow) -> Self {
        AuditLogEntry {
            id: row.id,
            sequence_number: row.sequence_number,
            record: AuditRecord {
                event_id: row.event_id,
                action: row.action,
                actor_id: row.actor_id,
                resource_type: row.resource_type,
                resource_id: row.resource_id,
                metadata: row.metadata,
                correlation_id: row.correlation_id,
                client_ip: row.client_ip.and_then(|s| s.parse().ok()),
                user_agent: row.user_agent,
                occurred_at: row.occurred_at,
            },
            previous_hash: row.previous_hash,
            current_hash: row.current_hash,
            recorded_at: row.recorded_at,
        }
    }
}

const SELECT_ENTRIES: &str = r#"
    SELECT id, sequence_number, event_id, action, actor_id,
           resource_type, resource_id, metadata, correlation_id,
           host(client_ip) AS client_ip, user_agent, occurred_at,
           previous_hash, current_hash, recorded_at
    FROM audit_logs
"#;

/// Insert one record on the given connection
async fn insert_record(conn: &mut PgConnection, record: &AuditRecord) -> Result<Uuid, AuditError> {
    let id = Uuid::new_v4();

    // sequence_number, previous_hash and current_hash are set by the trigger
    let result: (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO audit_logs (
            id, event_id, action, actor_id, resource_type, resource_id,
            metadata, correlation_id, client_ip, user_agent, occurred_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9::inet, $10, $11)
        RETURNING id
        "#,
    )
    .bind(id)
    .bind(record.event_id)
    .bind(&record.action)
    .bind(record.actor_id)
    .bind(&record.resource_type)
    .bind(&record.resource_id)
    .bind(&record.metadata)
    .bind(record.correlation_id)
    .bind(record.client_ip.map(|ip| ip.to_string()))
    .bind(&record.user_agent)
    .bind(record.occurred_at)
    .fetch_one(conn)
    .await?;

    tracing::debug!(
        audit_id = %result.0,
        action = %record.action,
        "Audit log entry created"
    );

    Ok(result.0)
}

impl PgAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Begin a transaction a publisher can hand to the bus as its session
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, AuditError> {
        Ok(self.pool.begin().await?)
    }

    /// Verify the integrity of the audit log hash chain
    pub async fn verify_hash_chain(
        &self,
        limit: Option<i64>,
    ) -> Result<ChainVerificationResult, AuditError> {
        let limit = limit.unwrap_or(1000);

        // metadata is hashed as stored text, not re-serialized
        let entries: Vec<(Uuid, i64, String, Option<Uuid>, String, String, String)> =
            sqlx::query_as(
                r#"
                SELECT id, sequence_number, action, actor_id, metadata::text,
                       previous_hash, current_hash
                FROM audit_logs
                ORDER BY sequence_number ASC
                LIMIT $1
                "#,
            )
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        let mut previous_hash = GENESIS_HASH.to_string();

        for (id, seq, action, actor_id, metadata_text, prev_hash, current_hash) in &entries {
            if prev_hash != &previous_hash {
                return Ok(ChainVerificationResult::invalid(
                    *seq as u64,
                    *id,
                    previous_hash,
                    prev_hash.clone(),
                ));
            }

            let calculated = chain_hash(*id, *seq, action, *actor_id, metadata_text, prev_hash);
            if &calculated != current_hash {
                return Ok(ChainVerificationResult::invalid(
                    *seq as u64,
                    *id,
                    calculated,
                    current_hash.clone(),
                ));
            }

            previous_hash = current_hash.clone();
        }

        Ok(ChainVerificationResult::valid(entries.len() as u64))
    }

    /// Get recent audit logs
    pub async fn get_recent(&self, limit: i64) -> Result<Vec<AuditLogEntry>, AuditError> {
        let rows: Vec<AuditRow> = sqlx::query_as(&format!(
            "{} ORDER BY sequence_number DESC LIMIT $1",
            SELECT_ENTRIES
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AuditLogEntry::from).collect())
    }

    /// Get audit logs for one actor
    pub async fn get_by_actor(
        &self,
        actor_id: Uuid,
        limit: i64,
    ) -> Result<Vec<AuditLogEntry>, AuditError> {
        let rows: Vec<AuditRow> = sqlx::query_as(&format!(
            "{} WHERE actor_id = $1 ORDER BY sequence_number DESC LIMIT $2",
            SELECT_ENTRIES
        ))
        .bind(actor_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AuditLogEntry::from).collect())
    }
}

#[async_trait]
impl AuditStore for PgAuditStore {
    async fn record(&self, record: AuditRecord) -> Result<Uuid, AuditError> {
        let mut tx = self.pool.begin().await?;
        let id = insert_record(&mut tx, &record).await?;
        tx.commit().await?;
        Ok(id)
    }
}

#[async_trait]
impl<'c> AuditSession for Transaction<'c, Postgres> {
    async fn record(&mut self, record: AuditRecord) -> Result<Uuid, AuditError> {
        insert_record(self, &record).await
    }
}
