//! Shared fixtures for the simulator integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fleet_core::machine::{Location, Machine, MachineStatus};
use fleet_core::registry::MachineRegistry;
use fleet_core::store::{InMemoryMachineStore, MachineStore, StoreError};
use fleet_core::types::MachineId;

/// In-memory store that counts telemetry writes and can be told to fail.
#[derive(Default)]
pub struct ScriptedStore {
    inner: InMemoryMachineStore,
    telemetry_writes: AtomicUsize,
    failing_ids: Mutex<HashSet<MachineId>>,
    unhealthy: bool,
}

impl ScriptedStore {
    pub fn unhealthy() -> Self {
        Self {
            unhealthy: true,
            ..Self::default()
        }
    }

    /// Make every telemetry write for `id` fail.
    pub fn fail_telemetry_for(&self, id: MachineId) {
        self.failing_ids.lock().unwrap().insert(id);
    }

    pub fn telemetry_writes(&self) -> usize {
        self.telemetry_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MachineStore for ScriptedStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        if self.unhealthy {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        self.inner.health_check().await
    }

    async fn find_by_id(&self, id: MachineId) -> Result<Option<Machine>, StoreError> {
        self.inner.find_by_id(id).await
    }

    async fn list(&self) -> Result<Vec<Machine>, StoreError> {
        self.inner.list().await
    }

    async fn list_by_status(&self, status: MachineStatus) -> Result<Vec<Machine>, StoreError> {
        self.inner.list_by_status(status).await
    }

    async fn insert(&self, machine: &Machine) -> Result<(), StoreError> {
        self.inner.insert(machine).await
    }

    async fn save_telemetry(&self, machine: &Machine) -> Result<bool, StoreError> {
        if self.failing_ids.lock().unwrap().contains(&machine.id()) {
            return Err(StoreError::Unavailable("write timed out".into()));
        }
        self.telemetry_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.save_telemetry(machine).await
    }

    async fn save_details(&self, machine: &Machine) -> Result<bool, StoreError> {
        self.inner.save_details(machine).await
    }

    async fn delete(&self, id: MachineId) -> Result<bool, StoreError> {
        self.inner.delete(id).await
    }

    async fn exists_by_name(&self, name: &str) -> Result<bool, StoreError> {
        self.inner.exists_by_name(name).await
    }
}

/// Registry over `store` with `count` machines named `M0`, `M1`, ...
pub async fn seeded_registry(
    store: Arc<ScriptedStore>,
    count: usize,
) -> (MachineRegistry, Vec<MachineId>) {
    let registry = MachineRegistry::new(store);
    let mut ids = Vec::with_capacity(count);
    for i in 0..count {
        let machine = registry
            .create(&format!("M{i}"), Location::new(10.0, 20.0).unwrap(), MachineStatus::Idle)
            .await
            .unwrap();
        ids.push(machine.id());
    }
    (registry, ids)
}
