//! Publish Throughput Benchmark
//!
//! Run with: cargo run --bin publish_bench --release -- --events 10000 --tasks 4

use std::sync::Arc;
use std::time::Instant;

use finance_events::audit::InMemoryAuditStore;
use finance_events::ports::{InMemoryLogSink, InMemoryNotificationSender, InMemorySessionStore};
use finance_events::{
    build_event_bus, BusConfig, DispatchContext, Event, EventBusDependencies, WorkflowEvent,
    WorkflowRegistry,
};
use uuid::Uuid;

fn arg(args: &[String], name: &str, default: u64) -> u64 {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// One password change invocation: attempted then succeeded
fn password_change(user_id: Uuid) -> [Event; 2] {
    [
        Event::new(WorkflowEvent::PasswordChangeAttempted { user_id }),
        Event::new(WorkflowEvent::PasswordChangeSucceeded {
            user_id,
            email: format!("user-{}@example.com", user_id.simple()),
            initiated_by: "user".to_string(),
        }),
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    let event_count = arg(&args, "--events", 10_000);
    let tasks = arg(&args, "--tasks", 4).max(1);

    let audit = Arc::new(InMemoryAuditStore::new());
    let notifications = Arc::new(InMemoryNotificationSender::new());
    let sessions = Arc::new(InMemorySessionStore::new());
    let log_sink = Arc::new(InMemoryLogSink::new());
    let dependencies = EventBusDependencies::new(audit.clone(), notifications.clone(), sessions)
        .with_log_sink(log_sink.clone());

    let bus = Arc::new(build_event_bus(
        Arc::new(WorkflowRegistry::standard()),
        dependencies,
        BusConfig::default().strict(),
    )?);

    println!("Publish Benchmark - {} workflow invocations on {} tasks", event_count, tasks);

    let per_task = event_count / tasks;
    let start = Instant::now();

    let mut handles = Vec::new();
    for _ in 0..tasks {
        let bus = bus.clone();
        let audit = audit.clone();
        handles.push(tokio::spawn(async move {
            let mut failures = 0usize;
            for _ in 0..per_task {
                // Each invocation commits its audit records as one unit
                let mut session = audit.begin();
                {
                    let mut context = DispatchContext::new(&mut session);
                    for event in password_change(Uuid::new_v4()) {
                        failures += bus.publish(&event, Some(&mut context)).await.failure_count();
                    }
                }
                session.commit();
            }
            failures
        }));
    }

    let mut failures = 0usize;
    for handle in handles {
        failures += handle.await?;
    }

    let elapsed = start.elapsed();
    let published = per_task * tasks * 2;
    let rate = published as f64 / elapsed.as_secs_f64();

    println!("\n=== Publish Benchmark Results ===");
    println!("Events published: {}", published);
    println!("Handler failures: {}", failures);
    println!("Audit records: {}", audit.len());
    println!("Notifications: {}", notifications.sent().len());
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!("Rate: {:.0} events/sec", rate);

    let chain = audit.verify_hash_chain();
    println!("Audit chain valid: {}", chain.is_valid);

    Ok(())
}
