//! Telemetry simulator.
//!
//! [`TelemetrySimulator`] runs as a background task. Each tick it picks up to
//! [`MACHINES_PER_TICK`] distinct machines at random, writes a random
//! reading for each through the [`MachineRegistry`], and publishes a
//! [`TelemetryEvent`] for every write that landed. A failure on one machine
//! is logged and does not stop the others or the loop.

use std::sync::Arc;
use std::time::Duration;

use fleet_core::error::CoreError;
use fleet_core::registry::MachineRegistry;
use fleet_core::telemetry::{draw_reading, select_sample, MACHINES_PER_TICK};
use fleet_core::types::MachineId;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio_util::sync::CancellationToken;

use crate::bus::{EventBus, TelemetryEvent};

/// Default pause between ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(5);

/// Why [`TelemetrySimulator::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatorExit {
    /// The cancellation token fired.
    Cancelled,
    /// The store failed its start-up health check; no ticks ran.
    SetupFailed,
}

/// Outcome of a single tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Machines chosen for this tick, in processing order.
    pub selected: Vec<MachineId>,
    /// Events published, one per successful write.
    pub published: Vec<TelemetryEvent>,
    /// Selected machines that vanished before their write.
    pub skipped: usize,
    /// Selected machines whose write failed.
    pub failed: usize,
    /// Cancellation was observed before every selected machine was handled.
    pub interrupted: bool,
}

// ---------------------------------------------------------------------------
// TelemetrySimulator
// ---------------------------------------------------------------------------

/// Background producer of simulated telemetry.
pub struct TelemetrySimulator {
    registry: MachineRegistry,
    bus: Arc<EventBus>,
    interval: Duration,
    rng: StdRng,
}

impl TelemetrySimulator {
    pub fn new(registry: MachineRegistry, bus: Arc<EventBus>, interval: Duration) -> Self {
        Self {
            registry,
            bus,
            interval,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Replace the RNG, e.g. with a seeded one for reproducible runs.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Run the simulator loop until `cancel` fires.
    ///
    /// The store is probed once before the first tick. Cancellation is
    /// honoured while sleeping, while a tick is in flight, and between the
    /// machines of a tick.
    pub async fn run(mut self, cancel: CancellationToken) -> SimulatorExit {
        if let Err(e) = self.registry.health_check().await {
            tracing::error!(error = %e, "Telemetry simulator cannot reach the machine store");
            return SimulatorExit::SetupFailed;
        }

        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            machines_per_tick = MACHINES_PER_TICK,
            "Telemetry simulator started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.tick(&cancel) => match result {
                    Ok(report) => {
                        tracing::debug!(
                            selected = report.selected.len(),
                            published = report.published.len(),
                            skipped = report.skipped,
                            failed = report.failed,
                            "Telemetry tick complete"
                        );
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Telemetry tick failed");
                    }
                },
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        tracing::info!("Telemetry simulator cancelled");
        SimulatorExit::Cancelled
    }

    /// Run one tick.
    ///
    /// Only a failure to list the fleet is returned as an error. Failures on
    /// individual machines are counted in the report.
    pub async fn tick(&mut self, cancel: &CancellationToken) -> Result<TickReport, CoreError> {
        let fleet = self.registry.list().await?;
        let ids: Vec<MachineId> = fleet.iter().map(|m| m.id()).collect();
        let selected = select_sample(ids, MACHINES_PER_TICK, &mut self.rng);

        let mut report = TickReport {
            selected: selected.clone(),
            ..TickReport::default()
        };

        for machine_id in selected {
            if cancel.is_cancelled() {
                report.interrupted = true;
                break;
            }

            let reading = draw_reading(&mut self.rng);
            match self
                .registry
                .update_telemetry(machine_id, reading.status, reading.rpm)
                .await
            {
                Ok(true) => {
                    let event = TelemetryEvent::from_reading(machine_id, &reading);
                    let receivers = self.bus.publish(event.clone());
                    tracing::info!(
                        machine_id = %machine_id,
                        status = %reading.status,
                        rpm = reading.rpm,
                        receivers,
                        "Simulated telemetry"
                    );
                    report.published.push(event);
                }
                Ok(false) => {
                    report.skipped += 1;
                }
                Err(e) => {
                    tracing::error!(
                        machine_id = %machine_id,
                        error = %e,
                        "Simulated telemetry write failed"
                    );
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }
}
