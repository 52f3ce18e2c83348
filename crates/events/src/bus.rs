//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`TelemetryEvent`]s.
//! It is designed to be shared via `Arc<EventBus>` across the application.
//!
//! Delivery semantics:
//! - every subscriber registered at the moment of `publish` gets the event;
//! - subscribers that join later never see it (no replay);
//! - each subscriber sees events in publish order;
//! - a slow subscriber falls behind on its own cursor and observes
//!   `RecvError::Lagged`; `publish` never waits for it.

use chrono::{DateTime, Utc};
use fleet_core::machine::MachineStatus;
use fleet_core::telemetry::TelemetryReading;
use fleet_core::types::MachineId;
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

// ---------------------------------------------------------------------------
// TelemetryEvent
// ---------------------------------------------------------------------------

/// A telemetry change that was persisted for one machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub machine_id: MachineId,
    pub status: MachineStatus,
    pub rpm: u32,

    /// When the reading was captured (UTC), not when it was persisted.
    pub timestamp: DateTime<Utc>,
}

impl TelemetryEvent {
    /// Build the event for a reading applied to `machine_id`.
    pub fn from_reading(machine_id: MachineId, reading: &TelemetryReading) -> Self {
        Self {
            machine_id,
            status: reading.status,
            rpm: reading.rpm,
            timestamp: reading.captured_at,
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`TelemetryEvent`].
///
/// # Usage
///
/// ```rust
/// use fleet_events::bus::EventBus;
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
/// assert_eq!(bus.subscriber_count(), 1);
/// # drop(rx);
/// ```
pub struct EventBus {
    sender: broadcast::Sender<TelemetryEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Returns the number of subscribers the event was queued for. With no
    /// subscribers the event is dropped and `0` is returned.
    pub fn publish(&self, event: TelemetryEvent) -> usize {
        // SendError only means there are zero receivers.
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to all events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryEvent> {
        self.sender.subscribe()
    }

    /// Subscribe as a [`Stream`]. Lag is logged and skipped; the stream ends
    /// when the bus is dropped.
    pub fn subscribe_stream(&self) -> impl Stream<Item = TelemetryEvent> + Send + 'static {
        BroadcastStream::new(self.sender.subscribe()).filter_map(|item| match item {
            Ok(event) => Some(event),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Telemetry stream subscriber lagged");
                None
            }
        })
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
