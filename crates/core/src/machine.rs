//! Machine domain model.
//!
//! [`Machine`] is an opaque record: fields are private and the only mutators
//! are [`Machine::update_telemetry`] and [`Machine::update_details`]. The two
//! touch disjoint field sets, which is what lets a rename and a telemetry
//! write on the same machine interleave without conflict.

use std::fmt;
use std::str::FromStr;

use chrono::{SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{MachineId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum length of a machine name, in characters.
pub const MAX_NAME_LENGTH: usize = 100;

/// Latitude bounds (inclusive).
pub const LATITUDE_RANGE: (f64, f64) = (-90.0, 90.0);

/// Longitude bounds (inclusive).
pub const LONGITUDE_RANGE: (f64, f64) = (-180.0, 180.0);

// ---------------------------------------------------------------------------
// MachineStatus
// ---------------------------------------------------------------------------

/// Operating status of a machine.
///
/// `Unknown` is a sentinel: it can be decoded from storage but is never
/// produced by the telemetry simulator and is rejected on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MachineStatus {
    Unknown,
    Operating,
    Maintenance,
    Shutdown,
    Idle,
    Fault,
}

/// Every status a machine can actually report (the enumeration minus the
/// `Unknown` sentinel).
pub const REPORTABLE_STATUSES: [MachineStatus; 5] = [
    MachineStatus::Operating,
    MachineStatus::Maintenance,
    MachineStatus::Shutdown,
    MachineStatus::Idle,
    MachineStatus::Fault,
];

impl MachineStatus {
    /// Symbolic name, as exposed over the API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Operating => "Operating",
            Self::Maintenance => "Maintenance",
            Self::Shutdown => "Shutdown",
            Self::Idle => "Idle",
            Self::Fault => "Fault",
        }
    }

    /// Numeric code used by the `machines.status_id` column.
    pub fn code(&self) -> i16 {
        match self {
            Self::Unknown => 0,
            Self::Operating => 1,
            Self::Maintenance => 2,
            Self::Shutdown => 3,
            Self::Idle => 4,
            Self::Fault => 5,
        }
    }

    /// Inverse of [`code`](Self::code).
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(Self::Unknown),
            1 => Some(Self::Operating),
            2 => Some(Self::Maintenance),
            3 => Some(Self::Shutdown),
            4 => Some(Self::Idle),
            5 => Some(Self::Fault),
            _ => None,
        }
    }

    /// `false` only for the `Unknown` sentinel.
    pub fn is_reportable(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a symbolic status name, ignoring ASCII case.
impl FromStr for MachineStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [MachineStatus::Unknown]
            .into_iter()
            .chain(REPORTABLE_STATUSES)
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let valid: Vec<&str> = REPORTABLE_STATUSES.iter().map(|s| s.as_str()).collect();
                CoreError::Validation(format!(
                    "Invalid machine status '{s}'. Must be one of: {}",
                    valid.join(", ")
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

/// Geographic position of a machine. Immutable; replaced wholesale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    latitude: f64,
    longitude: f64,
}

impl Location {
    /// Build a location, rejecting non-finite or out-of-range coordinates.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoreError> {
        check_coordinate("latitude", latitude, LATITUDE_RANGE)?;
        check_coordinate("longitude", longitude, LONGITUDE_RANGE)?;
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

fn check_coordinate(field: &str, value: f64, (min, max): (f64, f64)) -> Result<(), CoreError> {
    if !value.is_finite() || value < min || value > max {
        return Err(CoreError::Validation(format!(
            "{field} must be between {min} and {max}, got {value}"
        )));
    }
    Ok(())
}

/// Validate a machine name: non-blank and at most [`MAX_NAME_LENGTH`] characters.
pub fn validate_machine_name(name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::Validation("Machine name is required.".to_string()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "Machine name must not exceed {MAX_NAME_LENGTH} characters."
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Machine
// ---------------------------------------------------------------------------

/// Raw field values used to rehydrate a [`Machine`] from a store.
#[derive(Debug, Clone)]
pub struct MachineParts {
    pub id: MachineId,
    pub name: String,
    pub location: Location,
    pub status: MachineStatus,
    pub rpm: u32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A tracked physical machine.
#[derive(Debug, Clone, PartialEq)]
pub struct Machine {
    id: MachineId,
    name: String,
    location: Location,
    status: MachineStatus,
    rpm: u32,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Machine {
    /// Construct a new machine with a fresh id, `rpm = 0`, and
    /// `created_at == updated_at == now`.
    pub fn new(name: impl Into<String>, location: Location, status: MachineStatus) -> Self {
        let now = storage_now();
        Self {
            id: uuid::Uuid::new_v4(),
            name: name.into(),
            location,
            status,
            rpm: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild a machine previously persisted by a store.
    pub fn restore(parts: MachineParts) -> Self {
        Self {
            id: parts.id,
            name: parts.name,
            location: parts.location,
            status: parts.status,
            rpm: parts.rpm,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
        }
    }

    pub fn id(&self) -> MachineId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn status(&self) -> MachineStatus {
        self.status
    }

    pub fn rpm(&self) -> u32 {
        self.rpm
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Apply a telemetry reading. Touches `status` and `rpm` only;
    /// `updated_at` is deliberately left alone.
    pub fn update_telemetry(&mut self, status: MachineStatus, rpm: u32) {
        self.status = status;
        self.rpm = rpm;
    }

    /// Rename and relocate. Touches `name`, `location` and `updated_at` only.
    ///
    /// `updated_at` always moves forward, by at least one microsecond (the
    /// storage precision), even if the clock has not advanced.
    pub fn update_details(&mut self, name: impl Into<String>, location: Location) {
        self.name = name.into();
        self.location = location;
        let floor = self.updated_at + chrono::Duration::microseconds(1);
        self.updated_at = storage_now().max(floor);
    }
}

/// Current time truncated to the microsecond precision of `TIMESTAMPTZ`, so a
/// machine compares equal to itself after a trip through the store.
fn storage_now() -> Timestamp {
    Utc::now().trunc_subsecs(6)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
