use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::Context;
use fleet_core::registry::MachineRegistry;
use fleet_core::store::{InMemoryMachineStore, MachineStore};
use fleet_events::{EventBus, TelemetrySimulator};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fleet_api::config::ServerConfig;
use fleet_api::router::build_app_router;
use fleet_api::state::AppState;
use fleet_api::ws;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "fleet_api=debug,fleet_events=debug,fleet_core=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().context("Invalid server configuration")?;
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Store ---
    let store = build_store(&config).await?;
    let registry = MachineRegistry::new(store);

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());
    tracing::info!("Event bus created");

    // --- WebSocket manager + heartbeat ---
    let ws_manager = Arc::new(ws::WsManager::with_buffer(config.ws_subscriber_buffer));
    let heartbeat_cancel = CancellationToken::new();
    let heartbeat_handle = ws::start_heartbeat(Arc::clone(&ws_manager), heartbeat_cancel.clone());

    // Spawn the telemetry simulator.
    let simulator_cancel = CancellationToken::new();
    let simulator_handle = if config.simulator_enabled {
        let simulator = TelemetrySimulator::new(
            registry.clone(),
            Arc::clone(&event_bus),
            config.telemetry_interval,
        );
        Some(tokio::spawn(simulator.run(simulator_cancel.clone())))
    } else {
        tracing::warn!("Telemetry simulator disabled");
        None
    };

    // --- App state ---
    let state = AppState {
        registry,
        config: Arc::new(config.clone()),
        ws_manager: Arc::clone(&ws_manager),
        event_bus: Arc::clone(&event_bus),
    };

    let app = build_app_router(state, &config).context("Invalid CORS configuration")?;

    // --- Start server ---
    let ip: IpAddr = config
        .host
        .parse()
        .with_context(|| format!("Invalid HOST address '{}'", config.host))?;
    let addr = SocketAddr::new(ip, config.port);
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");
    let shutdown_timeout = config.shutdown_timeout();

    // Stop the producer first so no new events are emitted.
    simulator_cancel.cancel();
    if let Some(handle) = simulator_handle {
        match tokio::time::timeout(shutdown_timeout, handle).await {
            Ok(Ok(exit)) => tracing::info!(?exit, "Telemetry simulator stopped"),
            Ok(Err(e)) => tracing::error!(error = %e, "Telemetry simulator task failed"),
            Err(_) => tracing::warn!("Telemetry simulator did not stop in time"),
        }
    }

    // Drop the bus so per-connection relays end, then stop the heartbeat.
    drop(event_bus);
    heartbeat_cancel.cancel();
    let _ = tokio::time::timeout(shutdown_timeout, heartbeat_handle).await;
    tracing::info!("Background services stopped");

    // Closing the queues also ends any relay still holding a bus subscription.
    let ws_count = ws_manager.connection_count().await;
    tracing::info!(ws_count, "Closing remaining WebSocket connections");
    ws_manager.shutdown_all().await;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Pick the entity store: PostgreSQL when `DATABASE_URL` is set, otherwise
/// the process-local store.
async fn build_store(config: &ServerConfig) -> anyhow::Result<Arc<dyn MachineStore>> {
    let Some(database_url) = config.database_url.as_deref() else {
        tracing::warn!(
            "DATABASE_URL not set, using the in-memory machine store (data is not persisted)"
        );
        return Ok(Arc::new(InMemoryMachineStore::new()));
    };

    let pool = fleet_db::create_pool(database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection pool created");

    fleet_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    tracing::info!("Database health check passed");

    fleet_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    Ok(Arc::new(fleet_db::PgMachineStore::new(pool)))
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
