//! WebSocket infrastructure for the real-time telemetry feed.
//!
//! Provides connection management, heartbeat monitoring, the bus-to-socket
//! relay, and the HTTP upgrade handler used by Axum routes.

mod handler;
mod heartbeat;
pub mod manager;
pub mod relay;

pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use manager::{BroadcastReport, WsManager};
pub use relay::TelemetryRelay;
