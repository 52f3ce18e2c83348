use std::sync::Arc;

use fleet_core::registry::MachineRegistry;
use fleet_events::EventBus;

use crate::config::ServerConfig;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Machine Registry Service; the only path to the store.
    pub registry: MachineRegistry,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// WebSocket connection manager (browser clients).
    pub ws_manager: Arc<WsManager>,
    /// Telemetry events; each WebSocket connection subscribes on connect.
    pub event_bus: Arc<EventBus>,
}
