use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use fleet_events::EventBus;
use futures::{SinkExt, StreamExt};

use crate::state::AppState;
use crate::ws::manager::WsManager;
use crate::ws::relay::TelemetryRelay;

/// HTTP handler that upgrades the connection to WebSocket.
///
/// After the upgrade the connection subscribes to the event bus and receives
/// every telemetry event published from then on.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.ws_manager, state.event_bus))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Subscribes to the event bus and registers with `WsManager`.
///   2. Spawns the relay feeding this connection's queue.
///   3. Spawns a sender task that forwards queued frames in order.
///   4. Drains inbound messages on the current task until the peer leaves.
///   5. Cleans up on disconnect.
async fn handle_socket(socket: WebSocket, ws_manager: Arc<WsManager>, event_bus: Arc<EventBus>) {
    let conn_id = uuid::Uuid::new_v4().to_string();

    // Subscribe before registering: a connection the manager can see already
    // receives every event published from then on.
    let events = event_bus.subscribe();
    drop(event_bus);

    let (tx, mut rx) = ws_manager.add_with_sender(conn_id.clone()).await;
    let relay = TelemetryRelay::new(conn_id.clone(), events, tx);
    let relay_task = tokio::spawn(relay.run());
    tracing::info!(conn_id = %conn_id, "WebSocket connected");

    let (mut sink, mut stream) = socket.split();

    // Sender task: forward queued frames to the WebSocket sink.
    let sender_conn_id = conn_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
            if closing {
                break;
            }
        }
    });

    // Receiver loop: viewers only listen, so inbound frames are drained.
    loop {
        tokio::select! {
            _ = &mut send_task => break,
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(Message::Pong(_))) => {
                    tracing::trace!(conn_id = %conn_id, "Pong received");
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                    break;
                }
            },
        }
    }

    // Clean up: remove connection and stop both tasks.
    ws_manager.remove(&conn_id).await;
    relay_task.abort();
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}
