//! Handlers for the machine registry.
//!
//! Every handler goes through [`MachineRegistry`](fleet_core::registry::MachineRegistry);
//! none touches the store directly.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use fleet_core::error::CoreError;
use fleet_core::machine::{Location, MachineStatus};
use fleet_core::types::MachineId;
use fleet_db::models::machine::{
    CreateMachine, MachineResponse, UpdateMachineDetails, UpdateTelemetry,
};

use crate::error::{AppError, AppResult};
use crate::middleware::ValidatedJson;
use crate::response::DataResponse;
use crate::state::AppState;

fn not_found(id: MachineId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Machine",
        id,
    })
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// GET /api/v1/machines
pub async fn list_machines(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let machines = state.registry.list().await?;
    let data: Vec<MachineResponse> = machines.iter().map(MachineResponse::from).collect();

    Ok(Json(DataResponse { data }))
}

/// GET /api/v1/machines/status/{status}
///
/// The status segment is a symbolic name, matched case-insensitively.
pub async fn list_machines_by_status(
    State(state): State<AppState>,
    Path(status): Path<String>,
) -> AppResult<impl IntoResponse> {
    let status: MachineStatus = status.parse()?;
    let machines = state.registry.list_by_status(status).await?;
    let data: Vec<MachineResponse> = machines.iter().map(MachineResponse::from).collect();

    Ok(Json(DataResponse { data }))
}

/// GET /api/v1/machines/{id}
pub async fn get_machine(
    State(state): State<AppState>,
    Path(id): Path<MachineId>,
) -> AppResult<impl IntoResponse> {
    let machine = state.registry.get(id).await?.ok_or_else(|| not_found(id))?;

    Ok(Json(DataResponse {
        data: MachineResponse::from(&machine),
    }))
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

/// POST /api/v1/machines
///
/// Returns 201 with a `Location` header pointing at the new machine.
pub async fn create_machine(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<CreateMachine>,
) -> AppResult<impl IntoResponse> {
    let location = Location::new(input.latitude, input.longitude)?;
    let machine = state
        .registry
        .create(&input.name, location, input.status)
        .await?;

    let uri = format!("/api/v1/machines/{}", machine.id());
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, uri)],
        Json(DataResponse {
            data: MachineResponse::from(&machine),
        }),
    ))
}

/// PUT /api/v1/machines/{id}
///
/// Rename and relocate. Status and rpm are left to the telemetry path.
pub async fn update_machine(
    State(state): State<AppState>,
    Path(id): Path<MachineId>,
    ValidatedJson(input): ValidatedJson<UpdateMachineDetails>,
) -> AppResult<impl IntoResponse> {
    let location = Location::new(input.latitude, input.longitude)?;
    let machine = state
        .registry
        .update_details(id, &input.name, location)
        .await?
        .ok_or_else(|| not_found(id))?;

    Ok(Json(DataResponse {
        data: MachineResponse::from(&machine),
    }))
}

/// PUT /api/v1/machines/{id}/telemetry
///
/// Manual telemetry reading. Not published to the real-time feed.
pub async fn update_telemetry(
    State(state): State<AppState>,
    Path(id): Path<MachineId>,
    ValidatedJson(input): ValidatedJson<UpdateTelemetry>,
) -> AppResult<impl IntoResponse> {
    let updated = state
        .registry
        .update_telemetry(id, input.status, input.rpm)
        .await?;
    if !updated {
        return Err(not_found(id));
    }

    Ok(Json(DataResponse::message(format!(
        "Telemetry updated for machine {id}."
    ))))
}

/// DELETE /api/v1/machines/{id}
pub async fn delete_machine(
    State(state): State<AppState>,
    Path(id): Path<MachineId>,
) -> AppResult<impl IntoResponse> {
    if !state.registry.delete(id).await? {
        return Err(not_found(id));
    }

    Ok(Json(DataResponse::message(format!("Machine {id} deleted."))))
}
