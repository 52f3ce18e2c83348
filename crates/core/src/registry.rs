//! Machine Registry Service.
//!
//! Orchestrates CRUD against a [`MachineStore`] and owns the write-time
//! invariants: names are unique (case-insensitive), coordinates are in range,
//! telemetry writes touch only status/rpm and detail writes only
//! name/location/updated_at. Every mutation is written through to the store
//! before the call returns.

use std::sync::Arc;

use crate::error::CoreError;
use crate::machine::{validate_machine_name, Location, Machine, MachineStatus};
use crate::store::{MachineStore, StoreError};
use crate::types::MachineId;

/// Shared entry point for both the HTTP handlers and the telemetry simulator.
///
/// Cheap to clone; wraps an `Arc<dyn MachineStore>`.
#[derive(Clone)]
pub struct MachineRegistry {
    store: Arc<dyn MachineStore>,
}

impl MachineRegistry {
    pub fn new(store: Arc<dyn MachineStore>) -> Self {
        Self { store }
    }

    /// Probe the underlying store.
    pub async fn health_check(&self) -> Result<(), CoreError> {
        Ok(self.store.health_check().await?)
    }

    /// Register a new machine.
    ///
    /// Fails with [`CoreError::DuplicateName`] if any machine already uses
    /// `name`, ignoring case.
    pub async fn create(
        &self,
        name: &str,
        location: Location,
        status: MachineStatus,
    ) -> Result<Machine, CoreError> {
        validate_machine_name(name)?;

        if self.store.exists_by_name(name).await? {
            tracing::warn!(name, "Create rejected: duplicate name");
            return Err(CoreError::DuplicateName {
                name: name.to_string(),
            });
        }

        let machine = Machine::new(name, location, status);
        self.store
            .insert(&machine)
            .await
            .map_err(|e| duplicate_or_store(e, name))?;

        tracing::info!(machine_id = %machine.id(), name, "Machine created");
        Ok(machine)
    }

    /// Snapshot of the whole fleet, in no particular order.
    pub async fn list(&self) -> Result<Vec<Machine>, CoreError> {
        let machines = self.store.list().await?;
        tracing::debug!(count = machines.len(), "Listed machines");
        Ok(machines)
    }

    pub async fn list_by_status(&self, status: MachineStatus) -> Result<Vec<Machine>, CoreError> {
        let machines = self.store.list_by_status(status).await?;
        tracing::debug!(count = machines.len(), %status, "Listed machines by status");
        Ok(machines)
    }

    pub async fn get(&self, id: MachineId) -> Result<Option<Machine>, CoreError> {
        let machine = self.store.find_by_id(id).await?;
        if machine.is_none() {
            tracing::debug!(machine_id = %id, "Machine not found");
        }
        Ok(machine)
    }

    /// Apply a telemetry reading (status + rpm).
    ///
    /// Unknown ids are a no-op that returns `Ok(false)`; the same result is
    /// returned if the machine disappears between the read and the write.
    /// Every caller goes through this one method and decides for itself
    /// whether `false` is an error.
    pub async fn update_telemetry(
        &self,
        id: MachineId,
        status: MachineStatus,
        rpm: u32,
    ) -> Result<bool, CoreError> {
        let Some(mut machine) = self.store.find_by_id(id).await? else {
            tracing::warn!(machine_id = %id, "Telemetry update skipped: machine not found");
            return Ok(false);
        };

        machine.update_telemetry(status, rpm);
        let saved = self.store.save_telemetry(&machine).await?;

        if saved {
            tracing::debug!(machine_id = %id, %status, rpm, "Telemetry updated");
        } else {
            tracing::warn!(
                machine_id = %id,
                "Telemetry update skipped: machine removed concurrently"
            );
        }
        Ok(saved)
    }

    /// Rename and relocate a machine.
    ///
    /// Returns `Ok(None)` for an unknown id. The duplicate-name check runs
    /// against the new name unconditionally, so renaming a machine to its
    /// own name (in any case) is rejected as well.
    pub async fn update_details(
        &self,
        id: MachineId,
        name: &str,
        location: Location,
    ) -> Result<Option<Machine>, CoreError> {
        validate_machine_name(name)?;

        let Some(mut machine) = self.store.find_by_id(id).await? else {
            tracing::warn!(machine_id = %id, "Detail update skipped: machine not found");
            return Ok(None);
        };

        if self.store.exists_by_name(name).await? {
            tracing::warn!(machine_id = %id, name, "Rename rejected: duplicate name");
            return Err(CoreError::DuplicateName {
                name: name.to_string(),
            });
        }

        machine.update_details(name, location);
        let saved = self
            .store
            .save_details(&machine)
            .await
            .map_err(|e| duplicate_or_store(e, name))?;

        if !saved {
            tracing::warn!(machine_id = %id, "Detail update skipped: machine removed concurrently");
            return Ok(None);
        }

        // Re-read so the returned representation carries any telemetry that
        // landed while the rename was in flight.
        let current = self.store.find_by_id(id).await?;
        tracing::info!(machine_id = %id, name, "Machine details updated");
        Ok(current)
    }

    /// Returns `true` if a machine was removed, `false` if none existed.
    pub async fn delete(&self, id: MachineId) -> Result<bool, CoreError> {
        let deleted = self.store.delete(id).await?;
        if deleted {
            tracing::info!(machine_id = %id, "Machine deleted");
        } else {
            tracing::warn!(machine_id = %id, "Delete skipped: machine not found");
        }
        Ok(deleted)
    }
}

/// A store-level unique violation means another writer claimed the name
/// between our existence check and the write.
fn duplicate_or_store(err: StoreError, name: &str) -> CoreError {
    match err {
        StoreError::UniqueViolation(_) => CoreError::DuplicateName {
            name: name.to_string(),
        },
        other => CoreError::Store(other),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
