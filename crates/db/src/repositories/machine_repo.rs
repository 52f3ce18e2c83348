//! Repository for the `machines` table.
//!
//! Telemetry and detail updates are separate statements that never write
//! each other's columns.

use fleet_core::types::{MachineId, Timestamp};
use sqlx::PgPool;

use crate::models::machine::MachineRow;

/// Column list for `machines` queries.
const COLUMNS: &str = "\
    id, name, latitude, longitude, status_id, rpm, \
    created_at, updated_at";

/// Provides data access for machines.
pub struct MachineRepo;

impl MachineRepo {
    /// Find a machine by its ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: MachineId,
    ) -> Result<Option<MachineRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM machines WHERE id = $1");
        sqlx::query_as::<_, MachineRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List every machine.
    pub async fn list(pool: &PgPool) -> Result<Vec<MachineRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM machines");
        sqlx::query_as::<_, MachineRow>(&query)
            .fetch_all(pool)
            .await
    }

    /// List machines with the given status code.
    pub async fn list_by_status(
        pool: &PgPool,
        status_id: i16,
    ) -> Result<Vec<MachineRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM machines WHERE status_id = $1");
        sqlx::query_as::<_, MachineRow>(&query)
            .bind(status_id)
            .fetch_all(pool)
            .await
    }

    /// Insert a fully-formed row. The id and timestamps come from the caller.
    pub async fn insert(pool: &PgPool, row: &MachineRow) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO machines \
                 (id, name, latitude, longitude, status_id, rpm, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(row.id)
        .bind(&row.name)
        .bind(row.latitude)
        .bind(row.longitude)
        .bind(row.status_id)
        .bind(row.rpm)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Write `status_id` and `rpm` only.
    ///
    /// Returns `true` if a row was updated.
    pub async fn update_telemetry(
        pool: &PgPool,
        id: MachineId,
        status_id: i16,
        rpm: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE machines SET status_id = $2, rpm = $3 WHERE id = $1")
            .bind(id)
            .bind(status_id)
            .bind(rpm)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Write `name`, `latitude`, `longitude` and `updated_at` only.
    ///
    /// Returns `true` if a row was updated.
    pub async fn update_details(
        pool: &PgPool,
        id: MachineId,
        name: &str,
        latitude: f64,
        longitude: f64,
        updated_at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE machines SET \
                 name = $2, latitude = $3, longitude = $4, updated_at = $5 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(name)
        .bind(latitude)
        .bind(longitude)
        .bind(updated_at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a machine by ID.
    ///
    /// Returns `true` if a row was deleted.
    pub async fn delete(pool: &PgPool, id: MachineId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM machines WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Case-insensitive name check, served by `uq_machines_name_lower`.
    pub async fn exists_by_name(pool: &PgPool, name: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM machines WHERE lower(name) = lower($1))",
        )
        .bind(name)
        .fetch_one(pool)
        .await
    }
}
