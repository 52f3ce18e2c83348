pub mod health;
pub mod machines;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                                 real-time telemetry (WebSocket)
///
/// /machines                           list, create
/// /machines/status/{status}           list by status
/// /machines/{id}                      get, update details, delete
/// /machines/{id}/telemetry            update telemetry (PUT)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // WebSocket endpoint.
        .route("/ws", get(ws::ws_handler))
        // Machine registry.
        .nest("/machines", machines::router())
}
