//! Entity Store contract.
//!
//! [`MachineStore`] is the persistence seam the registry is written against.
//! Two implementations exist: [`InMemoryMachineStore`] here, and the
//! PostgreSQL adapter in `fleet-db`.
//!
//! Writes are split by field set: [`save_telemetry`](MachineStore::save_telemetry)
//! persists only `status` and `rpm`, [`save_details`](MachineStore::save_details)
//! only `name`, `location` and `updated_at`. Implementations must keep the
//! two disjoint so concurrent writers never overwrite each other's fields.

mod memory;

use async_trait::async_trait;

use crate::machine::{Machine, MachineStatus};
use crate::types::MachineId;

pub use memory::InMemoryMachineStore;

/// Failure reported by a [`MachineStore`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A uniqueness rule enforced by the store itself was violated.
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// A persisted record could not be decoded into a [`Machine`].
    #[error("Corrupt machine record: {0}")]
    Corrupt(String),

    /// Any other backend failure.
    #[error("Store error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Durable keyed storage of [`Machine`] records.
#[async_trait]
pub trait MachineStore: Send + Sync {
    /// Cheap reachability probe.
    async fn health_check(&self) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: MachineId) -> Result<Option<Machine>, StoreError>;

    /// Full scan. No ordering guarantee.
    async fn list(&self) -> Result<Vec<Machine>, StoreError>;

    async fn list_by_status(&self, status: MachineStatus) -> Result<Vec<Machine>, StoreError>;

    async fn insert(&self, machine: &Machine) -> Result<(), StoreError>;

    /// Persist `status` and `rpm`. Returns `false` if no such record exists.
    async fn save_telemetry(&self, machine: &Machine) -> Result<bool, StoreError>;

    /// Persist `name`, `location` and `updated_at`. Returns `false` if no
    /// such record exists.
    async fn save_details(&self, machine: &Machine) -> Result<bool, StoreError>;

    /// Returns `true` if a record was removed.
    async fn delete(&self, id: MachineId) -> Result<bool, StoreError>;

    /// Case-insensitive name lookup.
    async fn exists_by_name(&self, name: &str) -> Result<bool, StoreError>;
}
