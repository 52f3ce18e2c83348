//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` struct matching the database row
//! - The `Serialize` representation returned by the API
//! - `Deserialize` + `Validate` request DTOs

pub mod machine;
