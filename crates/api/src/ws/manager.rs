use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::ws::Message;
use fleet_core::types::Timestamp;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, RwLock};

/// Default outbound queue depth per connection.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 64;

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::Sender<Message>;

/// Metadata for a single WebSocket connection.
pub struct WsConnection {
    /// Bounded queue feeding this connection's socket writer.
    pub sender: WsSender,
    /// When this connection was established.
    pub connected_at: Timestamp,
}

/// Per-call delivery summary returned by [`WsManager::broadcast`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections the message was queued for.
    pub delivered: usize,
    /// Connections whose queue was full; they miss this message.
    pub skipped: usize,
    /// Connections whose writer had gone away; removed from the manager.
    pub pruned: usize,
}

/// Manages all active WebSocket connections.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application. Delivery never waits on a connection: each
/// one has a bounded queue and a full queue drops the message for that
/// connection only.
pub struct WsManager {
    connections: RwLock<HashMap<String, WsConnection>>,
    buffer: usize,
}

impl WsManager {
    /// Create a new, empty connection manager.
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_SUBSCRIBER_BUFFER)
    }

    /// Create a manager whose connections queue at most `buffer` messages.
    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            buffer: buffer.max(1),
        }
    }

    /// Register a new connection.
    ///
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink.
    pub async fn add(&self, conn_id: String) -> mpsc::Receiver<Message> {
        self.add_with_sender(conn_id).await.1
    }

    /// Register a new connection and also hand back a sender for its queue,
    /// so a per-connection producer can feed the same socket writer.
    pub async fn add_with_sender(&self, conn_id: String) -> (WsSender, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(self.buffer);
        let conn = WsConnection {
            sender: tx.clone(),
            connected_at: chrono::Utc::now(),
        };
        self.connections.write().await.insert(conn_id, conn);
        (tx, rx)
    }

    /// Remove a connection by its ID. Returns `true` if it was registered.
    pub async fn remove(&self, conn_id: &str) -> bool {
        let removed = self.connections.write().await.remove(conn_id);
        match removed {
            Some(conn) => {
                let connected_secs = (chrono::Utc::now() - conn.connected_at).num_seconds();
                tracing::debug!(conn_id, connected_secs, "WebSocket connection removed");
                true
            }
            None => false,
        }
    }

    /// Queue a message for every connected client.
    ///
    /// Connections whose receiver is gone are pruned; connections with a
    /// full queue are skipped for this message.
    pub async fn broadcast(&self, message: Message) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let mut closed = Vec::new();

        {
            let conns = self.connections.read().await;
            for (conn_id, conn) in conns.iter() {
                match conn.sender.try_send(message.clone()) {
                    Ok(()) => report.delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        tracing::warn!(conn_id = %conn_id, "WebSocket queue full, message dropped");
                        report.skipped += 1;
                    }
                    Err(TrySendError::Closed(_)) => closed.push(conn_id.clone()),
                }
            }
        }

        if !closed.is_empty() {
            let mut conns = self.connections.write().await;
            for conn_id in &closed {
                // Re-check: the id may have been replaced since the read lock.
                if conns.get(conn_id).is_some_and(|c| c.sender.is_closed()) {
                    conns.remove(conn_id);
                    report.pruned += 1;
                }
            }
            tracing::debug!(pruned = report.pruned, "Pruned closed WebSocket connections");
        }

        report
    }

    /// Return the current number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send a Close frame to every connection, then clear the map.
    ///
    /// Used during graceful shutdown to notify all clients before the
    /// server stops accepting new connections.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for conn in conns.values() {
            let _ = conn.sender.try_send(Message::Close(None));
        }
        conns.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }

    /// Send a Ping frame to every connected client, pruning dead ones.
    ///
    /// Used by the heartbeat task to keep connections alive and detect
    /// stale ones.
    pub async fn ping_all(&self) -> BroadcastReport {
        self.broadcast(Message::Ping(Bytes::new())).await
    }
}

impl Default for WsManager {
    fn default() -> Self {
        Self::new()
    }
}
