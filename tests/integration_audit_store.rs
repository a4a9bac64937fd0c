//! Postgres Audit Store Integration Tests
//!
//! Need a database: `DATABASE_URL=... cargo test -- --ignored`

use std::sync::Arc;

use finance_events::audit::{AuditStore, PgAuditStore};
use finance_events::ports::{InMemoryNotificationSender, InMemorySessionStore};
use finance_events::{
    build_event_bus, BusConfig, DispatchContext, Event, EventBusDependencies, OperationContext,
    WorkflowEvent, WorkflowRegistry,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use uuid::Uuid;

/// Connect, apply the migration and start from an empty table
async fn setup_test_db() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    pool.execute(include_str!("../migrations/0001_audit_logs.sql"))
        .await
        .expect("Failed to apply migration");

    sqlx::query("TRUNCATE TABLE audit_logs")
        .execute(&pool)
        .await
        .expect("Failed to clean up DB");

    pool
}

#[tokio::test]
#[ignore]
async fn test_transactional_audit_commits_with_publisher() {
    let pool = setup_test_db().await;
    let store = Arc::new(PgAuditStore::new(pool.clone()));
    let dependencies = EventBusDependencies::new(
        store.clone(),
        Arc::new(InMemoryNotificationSender::new()),
        Arc::new(InMemorySessionStore::new()),
    );
    let bus = build_event_bus(
        Arc::new(WorkflowRegistry::standard()),
        dependencies,
        BusConfig::default().strict(),
    )
    .unwrap();

    let user_id = Uuid::new_v4();
    let correlation_id = Uuid::new_v4();

    // Rolled back: nothing reaches the table
    let mut tx = store.begin().await.unwrap();
    {
        let mut context = DispatchContext::new(&mut tx);
        let attempted = Event::new(WorkflowEvent::PasswordChangeAttempted { user_id });
        assert!(bus.publish(&attempted, Some(&mut context)).await.is_clean());
    }
    tx.rollback().await.unwrap();
    assert!(store.get_by_actor(user_id, 10).await.unwrap().is_empty());

    // Committed together with the publisher's own work
    let mut tx = store.begin().await.unwrap();
    {
        let mut context = DispatchContext::new(&mut tx).with_operation(
            OperationContext::new()
                .with_correlation_id(correlation_id)
                .with_client_ip("10.0.0.7".parse().unwrap()),
        );
        let attempted = Event::new(WorkflowEvent::PasswordChangeAttempted { user_id });
        bus.publish(&attempted, Some(&mut context)).await;
        let failed = Event::new(WorkflowEvent::PasswordChangeFailed {
            user_id,
            reason: "wrong current password".to_string(),
        });
        bus.publish(&failed, Some(&mut context)).await;
    }
    tx.commit().await.unwrap();

    let entries = store.get_by_actor(user_id, 10).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].record.action, "user.password_change.failed");
    assert_eq!(entries[1].record.action, "user.password_change.attempted");
    assert_eq!(entries[0].record.correlation_id, Some(correlation_id));
    assert_eq!(entries[0].record.client_ip, Some("10.0.0.7".parse().unwrap()));

    let chain = store.verify_hash_chain(None).await.unwrap();
    assert!(chain.is_valid, "{:?}", chain);
    assert_eq!(chain.entries_checked, 2);
}

#[tokio::test]
#[ignore]
async fn test_store_without_session_writes_immediately() {
    let pool = setup_test_db().await;
    let store = PgAuditStore::new(pool);
    let event = Event::new(WorkflowEvent::UserLoginAttempted {
        email: "jane@example.com".to_string(),
    });

    let record = finance_events::audit::AuditRecord::new(
        "auth.login.attempted",
        event.id(),
        event.occurred_at(),
    )
    .resource("user", None)
    .metadata(&serde_json::json!({ "email": "jane@example.com" }));
    store.record(record).await.unwrap();

    let recent = store.get_recent(5).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].sequence_number, 1);
    assert!(store.verify_hash_chain(None).await.unwrap().is_valid);
}
