//! Bus-to-socket relay.
//!
//! Every WebSocket connection owns a [`TelemetryRelay`]: a subscription to
//! the [`EventBus`](fleet_events::EventBus) taken when the viewer connects,
//! plus the sender half of that connection's outbound queue. Events
//! published before the subscription are never seen. A viewer that falls
//! behind skips ahead on its own cursor and never holds up the simulator or
//! other viewers.

use axum::extract::ws::Message;
use fleet_events::TelemetryEvent;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::sync::mpsc::error::TrySendError;

use crate::ws::manager::WsSender;

/// Wire format of server-to-client frames.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsFrame<'a> {
    Telemetry(&'a TelemetryEvent),
}

/// Encode a telemetry event as a text frame:
/// `{"type":"telemetry","machine_id":..,"status":..,"rpm":..,"timestamp":..}`.
pub fn telemetry_frame(event: &TelemetryEvent) -> Result<Message, serde_json::Error> {
    let json = serde_json::to_string(&WsFrame::Telemetry(event))?;
    Ok(Message::Text(json.into()))
}

/// Forwards bus events to a single WebSocket connection.
pub struct TelemetryRelay {
    conn_id: String,
    events: broadcast::Receiver<TelemetryEvent>,
    sender: WsSender,
}

impl TelemetryRelay {
    /// Build a relay over a bus subscription. Only events published after
    /// `events` was obtained from
    /// [`EventBus::subscribe`](fleet_events::EventBus::subscribe) are forwarded.
    pub fn new(
        conn_id: impl Into<String>,
        events: broadcast::Receiver<TelemetryEvent>,
        sender: WsSender,
    ) -> Self {
        Self {
            conn_id: conn_id.into(),
            events,
            sender,
        }
    }

    /// Run the relay loop.
    ///
    /// Exits when the connection's queue is closed or the
    /// [`EventBus`](fleet_events::EventBus) is dropped.
    pub async fn run(mut self) {
        loop {
            let received = tokio::select! {
                _ = self.sender.closed() => {
                    tracing::debug!(conn_id = %self.conn_id, "Connection closed, relay stopping");
                    break;
                }
                received = self.events.recv() => received,
            };

            match received {
                Ok(event) => {
                    if !self.forward(&event) {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(conn_id = %self.conn_id, skipped = n, "Telemetry relay lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!(conn_id = %self.conn_id, "Event bus closed, relay stopping");
                    break;
                }
            }
        }
    }

    /// Queue one event. Returns `false` once the connection is gone.
    fn forward(&self, event: &TelemetryEvent) -> bool {
        let frame = match telemetry_frame(event) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(
                    machine_id = %event.machine_id,
                    error = %e,
                    "Failed to encode telemetry frame"
                );
                return true;
            }
        };

        match self.sender.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    conn_id = %self.conn_id,
                    machine_id = %event.machine_id,
                    "WebSocket queue full, telemetry frame dropped"
                );
                true
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}
