//! [`MachineStore`] backed by PostgreSQL through [`MachineRepo`].

use async_trait::async_trait;
use fleet_core::machine::{Machine, MachineStatus};
use fleet_core::store::{MachineStore, StoreError};
use fleet_core::types::MachineId;

use crate::models::machine::MachineRow;
use crate::repositories::MachineRepo;
use crate::DbPool;

/// PostgreSQL implementation of the entity store contract.
#[derive(Clone)]
pub struct PgMachineStore {
    pool: DbPool,
}

impl PgMachineStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Translate a sqlx failure into the store taxonomy.
///
/// - pool exhaustion / IO failures are `Unavailable`;
/// - unique-index violations (PostgreSQL 23505) are `UniqueViolation`;
/// - everything else is an opaque `Backend` error.
pub fn classify_sqlx_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StoreError::UniqueViolation(db_err.constraint().unwrap_or("unknown").to_string())
        }
        e @ (sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)) => {
            StoreError::Unavailable(e.to_string())
        }
        other => StoreError::Backend(Box::new(other)),
    }
}

fn rpm_column(machine: &Machine) -> Result<i32, StoreError> {
    i32::try_from(machine.rpm()).map_err(|e| StoreError::Backend(Box::new(e)))
}

fn decode_all(rows: Vec<MachineRow>) -> Result<Vec<Machine>, StoreError> {
    rows.into_iter().map(Machine::try_from).collect()
}

#[async_trait]
impl MachineStore for PgMachineStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        crate::health_check(&self.pool)
            .await
            .map_err(classify_sqlx_error)
    }

    async fn find_by_id(&self, id: MachineId) -> Result<Option<Machine>, StoreError> {
        MachineRepo::find_by_id(&self.pool, id)
            .await
            .map_err(classify_sqlx_error)?
            .map(Machine::try_from)
            .transpose()
    }

    async fn list(&self) -> Result<Vec<Machine>, StoreError> {
        let rows = MachineRepo::list(&self.pool)
            .await
            .map_err(classify_sqlx_error)?;
        decode_all(rows)
    }

    async fn list_by_status(&self, status: MachineStatus) -> Result<Vec<Machine>, StoreError> {
        let rows = MachineRepo::list_by_status(&self.pool, status.code())
            .await
            .map_err(classify_sqlx_error)?;
        decode_all(rows)
    }

    async fn insert(&self, machine: &Machine) -> Result<(), StoreError> {
        let location = machine.location();
        let row = MachineRow {
            id: machine.id(),
            name: machine.name().to_string(),
            latitude: location.latitude(),
            longitude: location.longitude(),
            status_id: machine.status().code(),
            rpm: rpm_column(machine)?,
            created_at: machine.created_at(),
            updated_at: machine.updated_at(),
        };
        MachineRepo::insert(&self.pool, &row)
            .await
            .map_err(classify_sqlx_error)
    }

    async fn save_telemetry(&self, machine: &Machine) -> Result<bool, StoreError> {
        MachineRepo::update_telemetry(
            &self.pool,
            machine.id(),
            machine.status().code(),
            rpm_column(machine)?,
        )
        .await
        .map_err(classify_sqlx_error)
    }

    async fn save_details(&self, machine: &Machine) -> Result<bool, StoreError> {
        let location = machine.location();
        MachineRepo::update_details(
            &self.pool,
            machine.id(),
            machine.name(),
            location.latitude(),
            location.longitude(),
            machine.updated_at(),
        )
        .await
        .map_err(classify_sqlx_error)
    }

    async fn delete(&self, id: MachineId) -> Result<bool, StoreError> {
        MachineRepo::delete(&self.pool, id)
            .await
            .map_err(classify_sqlx_error)
    }

    async fn exists_by_name(&self, name: &str) -> Result<bool, StoreError> {
        MachineRepo::exists_by_name(&self.pool, name)
            .await
            .map_err(classify_sqlx_error)
    }
}
