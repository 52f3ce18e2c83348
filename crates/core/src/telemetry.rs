//! Simulated telemetry: random readings and fleet sampling.
//!
//! Pure logic, no I/O. The simulator in `fleet-events` drives these with an
//! RNG it owns, which keeps the draws reproducible under a seeded RNG.

use std::ops::Range;

use chrono::Utc;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::machine::{MachineStatus, REPORTABLE_STATUSES};
use crate::types::Timestamp;

/// Maximum number of machines updated per simulator tick.
pub const MACHINES_PER_TICK: usize = 3;

/// Simulated rpm range: 500 inclusive to 3000 exclusive.
pub const SIMULATED_RPM: Range<u32> = 500..3000;

/// One simulated reading for a single machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryReading {
    pub status: MachineStatus,
    pub rpm: u32,
    /// When the reading was taken (not when it was persisted).
    pub captured_at: Timestamp,
}

/// Draw a reading: status uniform over [`REPORTABLE_STATUSES`], rpm uniform
/// over [`SIMULATED_RPM`].
pub fn draw_reading<R: Rng + ?Sized>(rng: &mut R) -> TelemetryReading {
    let status = REPORTABLE_STATUSES[rng.random_range(0..REPORTABLE_STATUSES.len())];
    let rpm = rng.random_range(SIMULATED_RPM);
    TelemetryReading {
        status,
        rpm,
        captured_at: Utc::now(),
    }
}

/// Pick `min(max, items.len())` distinct items uniformly at random.
///
/// Full Fisher-Yates shuffle, then truncate: every item has the same
/// probability of being selected.
pub fn select_sample<T, R: Rng + ?Sized>(mut items: Vec<T>, max: usize, rng: &mut R) -> Vec<T> {
    items.shuffle(rng);
    items.truncate(max);
    items
}
