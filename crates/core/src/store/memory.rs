use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{MachineStore, StoreError};
use crate::machine::{Machine, MachineStatus};
use crate::types::MachineId;

/// Process-local [`MachineStore`].
///
/// Used when no database is configured and as the store behind the test
/// suites. Mirrors the PostgreSQL schema's case-insensitive unique name index.
#[derive(Default)]
pub struct InMemoryMachineStore {
    machines: RwLock<HashMap<MachineId, Machine>>,
}

impl InMemoryMachineStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored machines.
    pub async fn len(&self) -> usize {
        self.machines.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.machines.read().await.is_empty()
    }
}

fn name_taken(
    machines: &HashMap<MachineId, Machine>,
    name: &str,
    except: Option<MachineId>,
) -> bool {
    let wanted = name.to_lowercase();
    machines
        .values()
        .any(|m| Some(m.id()) != except && m.name().to_lowercase() == wanted)
}

#[async_trait]
impl MachineStore for InMemoryMachineStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn find_by_id(&self, id: MachineId) -> Result<Option<Machine>, StoreError> {
        Ok(self.machines.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Machine>, StoreError> {
        Ok(self.machines.read().await.values().cloned().collect())
    }

    async fn list_by_status(&self, status: MachineStatus) -> Result<Vec<Machine>, StoreError> {
        Ok(self
            .machines
            .read()
            .await
            .values()
            .filter(|m| m.status() == status)
            .cloned()
            .collect())
    }

    async fn insert(&self, machine: &Machine) -> Result<(), StoreError> {
        let mut machines = self.machines.write().await;
        if name_taken(&machines, machine.name(), None) {
            return Err(StoreError::UniqueViolation(format!(
                "machine name '{}'",
                machine.name()
            )));
        }
        machines.insert(machine.id(), machine.clone());
        Ok(())
    }

    async fn save_telemetry(&self, machine: &Machine) -> Result<bool, StoreError> {
        let mut machines = self.machines.write().await;
        match machines.get_mut(&machine.id()) {
            Some(stored) => {
                stored.update_telemetry(machine.status(), machine.rpm());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn save_details(&self, machine: &Machine) -> Result<bool, StoreError> {
        let mut machines = self.machines.write().await;
        if !machines.contains_key(&machine.id()) {
            return Ok(false);
        }
        if name_taken(&machines, machine.name(), Some(machine.id())) {
            return Err(StoreError::UniqueViolation(format!(
                "machine name '{}'",
                machine.name()
            )));
        }
        if let Some(stored) = machines.get_mut(&machine.id()) {
            // Carry the stored telemetry forward; only detail fields change.
            let mut merged = machine.clone();
            merged.update_telemetry(stored.status(), stored.rpm());
            *stored = merged;
        }
        Ok(true)
    }

    async fn delete(&self, id: MachineId) -> Result<bool, StoreError> {
        Ok(self.machines.write().await.remove(&id).is_some())
    }

    async fn exists_by_name(&self, name: &str) -> Result<bool, StoreError> {
        Ok(name_taken(&*self.machines.read().await, name, None))
    }
}
