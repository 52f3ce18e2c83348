//! Route definitions for the machine registry.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::machines;
use crate::state::AppState;

/// Machine routes mounted at `/machines`.
///
/// ```text
/// GET    /                  -> list_machines
/// POST   /                  -> create_machine
/// GET    /status/{status}   -> list_machines_by_status
/// GET    /{id}              -> get_machine
/// PUT    /{id}              -> update_machine
/// DELETE /{id}              -> delete_machine
/// PUT    /{id}/telemetry    -> update_telemetry
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(machines::list_machines).post(machines::create_machine))
        .route("/status/{status}", get(machines::list_machines_by_status))
        .route(
            "/{id}",
            get(machines::get_machine)
                .put(machines::update_machine)
                .delete(machines::delete_machine),
        )
        .route("/{id}/telemetry", put(machines::update_telemetry))
}
