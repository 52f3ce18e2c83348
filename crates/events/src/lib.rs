//! Fleet telemetry fan-out.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`TelemetryEvent`]: the event published for each persisted reading.
//! - [`TelemetrySimulator`]: background service that periodically writes
//!   random telemetry for a sample of the fleet and publishes it.

pub mod bus;
pub mod simulator;

pub use bus::{EventBus, TelemetryEvent};
pub use simulator::{SimulatorExit, TelemetrySimulator, TickReport};
