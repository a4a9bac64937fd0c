//! finance_events - Domain Event Bus ops server
//!
//! Builds the event bus from the workflow registry (refusing to start on
//! a non-compliant wiring in strict mode) and serves the read-only ops API.

use std::net::SocketAddr;
use std::sync::Arc;

use finance_events::api::{self, AppState};
use finance_events::audit::{AuditStore, InMemoryAuditStore, PgAuditStore};
use finance_events::ports::{InMemorySessionStore, LoggingNotificationSender};
use finance_events::{build_event_bus, db, Config, EventBusDependencies, WorkflowRegistry};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging
fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "finance_events=debug,tower_http=debug".into());

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;
    init_tracing(config.json_logs);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!(environment = %config.environment, "Starting finance_events server");

    // Audit trail: Postgres when configured, in memory otherwise
    let pool = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let pool = db::connect(url, config.database_max_connections).await?;
            if !db::check_schema(&pool).await? {
                tracing::error!("Database schema is not complete. Please run migrations.");
                return Err(anyhow::anyhow!("Database schema incomplete"));
            }
            tracing::info!("Database connected successfully");
            Some(pool)
        }
        None => {
            if config.is_production() {
                return Err(anyhow::anyhow!("DATABASE_URL is required in production"));
            }
            tracing::warn!("DATABASE_URL not set, audit records are kept in memory");
            None
        }
    };

    let audit_store: Arc<dyn AuditStore> = match &pool {
        Some(pool) => Arc::new(PgAuditStore::new(pool.clone())),
        None => Arc::new(InMemoryAuditStore::new()),
    };
    let dependencies = EventBusDependencies::new(
        audit_store,
        Arc::new(LoggingNotificationSender),
        Arc::new(InMemorySessionStore::new()),
    );

    // Wire the bus; strict mode fails here on any violation
    let registry = Arc::new(WorkflowRegistry::standard());
    let bus = build_event_bus(registry.clone(), dependencies, config.bus_config())?;

    let state = AppState::new(registry, Arc::new(bus))
        .with_expected_entries(config.expected_registry_entries);
    let app = api::build_router(state);

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Cleanup
    tracing::info!("Server shutting down...");
    if let Some(pool) = pool {
        pool.close().await;
        tracing::info!("Database connections closed");
    }
    tracing::info!("Goodbye!");

    Ok(())
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
