//! Fleet domain core.
//!
//! Domain types, the entity store contract, the machine registry, and the
//! pure telemetry simulation logic. Nothing in this crate talks to a
//! database or the network.

pub mod error;
pub mod machine;
pub mod registry;
pub mod store;
pub mod telemetry;
pub mod types;
