use crate::store::StoreError;
use crate::types::MachineId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: MachineId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("A machine with the name '{name}' already exists.")]
    DuplicateName { name: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}
