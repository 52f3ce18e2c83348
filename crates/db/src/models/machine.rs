//! Machine models and DTOs.

use fleet_core::machine::{Location, Machine, MachineParts, MachineStatus};
use fleet_core::store::StoreError;
use fleet_core::types::{MachineId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

// ---------------------------------------------------------------------------
// Entity structs (database rows)
// ---------------------------------------------------------------------------

/// A row from the `machines` table.
#[derive(Debug, Clone, FromRow)]
pub struct MachineRow {
    pub id: MachineId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub status_id: i16,
    pub rpm: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<MachineRow> for Machine {
    type Error = StoreError;

    fn try_from(row: MachineRow) -> Result<Self, Self::Error> {
        let status = MachineStatus::from_code(row.status_id).ok_or_else(|| {
            StoreError::Corrupt(format!(
                "machine {} has unknown status_id {}",
                row.id, row.status_id
            ))
        })?;
        let rpm = u32::try_from(row.rpm).map_err(|_| {
            StoreError::Corrupt(format!("machine {} has negative rpm {}", row.id, row.rpm))
        })?;
        let location = Location::new(row.latitude, row.longitude)
            .map_err(|e| StoreError::Corrupt(format!("machine {}: {e}", row.id)))?;

        Ok(Machine::restore(MachineParts {
            id: row.id,
            name: row.name,
            location,
            status,
            rpm,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }
}

// ---------------------------------------------------------------------------
// API representation
// ---------------------------------------------------------------------------

/// External representation of a machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineResponse {
    pub id: MachineId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub status: MachineStatus,
    pub rpm: u32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&Machine> for MachineResponse {
    fn from(machine: &Machine) -> Self {
        let location = machine.location();
        Self {
            id: machine.id(),
            name: machine.name().to_string(),
            latitude: location.latitude(),
            longitude: location.longitude(),
            status: machine.status(),
            rpm: machine.rpm(),
            created_at: machine.created_at(),
            updated_at: machine.updated_at(),
        }
    }
}

// ---------------------------------------------------------------------------
// DTOs (request payloads)
// ---------------------------------------------------------------------------

/// DTO for registering a new machine.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateMachine {
    #[validate(
        length(min = 1, max = 100, message = "Machine name must not exceed 100 characters."),
        custom(function = "validate_not_blank")
    )]
    pub name: String,
    #[validate(range(
        min = -90.0,
        max = 90.0,
        message = "Latitude must be between -90 and 90."
    ))]
    pub latitude: f64,
    #[validate(range(
        min = -180.0,
        max = 180.0,
        message = "Longitude must be between -180 and 180."
    ))]
    pub longitude: f64,
    #[validate(custom(function = "validate_reportable_status"))]
    pub status: MachineStatus,
}

/// DTO for renaming and relocating a machine.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateMachineDetails {
    #[validate(
        length(min = 1, max = 100, message = "Machine name must not exceed 100 characters."),
        custom(function = "validate_not_blank")
    )]
    pub name: String,
    #[validate(range(
        min = -90.0,
        max = 90.0,
        message = "Latitude must be between -90 and 90."
    ))]
    pub latitude: f64,
    #[validate(range(
        min = -180.0,
        max = 180.0,
        message = "Longitude must be between -180 and 180."
    ))]
    pub longitude: f64,
}

/// DTO for a telemetry reading (status + rpm).
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateTelemetry {
    #[validate(custom(function = "validate_reportable_status"))]
    pub status: MachineStatus,
    /// Capped at the `INTEGER` column's maximum.
    #[validate(range(max = 2147483647, message = "RPM must not exceed 2147483647."))]
    pub rpm: u32,
}

fn validate_not_blank(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("Machine name is required.".into()));
    }
    Ok(())
}

fn validate_reportable_status(status: &MachineStatus) -> Result<(), ValidationError> {
    if !status.is_reportable() {
        return Err(ValidationError::new("status")
            .with_message(format!("Invalid machine status '{status}'.").into()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
