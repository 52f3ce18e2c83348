use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::ws::manager::WsManager;

/// Interval between heartbeat pings (in seconds).
const HEARTBEAT_INTERVAL_SECS: u64 = 30;

/// Spawn a background task that sends periodic Ping frames to all connected
/// WebSocket clients and prunes connections whose writer has gone away.
///
/// The task runs until `cancel` fires.
pub fn start_heartbeat(
    ws_manager: Arc<WsManager>,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS));
        // The first tick completes immediately; skip it.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("WebSocket heartbeat stopping");
                    break;
                }
                _ = interval.tick() => {
                    let report = ws_manager.ping_all().await;
                    tracing::debug!(
                        delivered = report.delivered,
                        pruned = report.pruned,
                        "WebSocket heartbeat ping"
                    );
                }
            }
        }
    })
}
