//! Real-time notification bridge.
//!
//! Staff displays listen on a WebSocket channel at the backend origin. The
//! gateway only emits; nothing is consumed. Delivery is best-effort:
//! [`Notifier::emit`] never blocks, events are dropped when the queue is
//! full or the channel is down, and no acknowledgment is awaited.
//!
//! A single background worker owns the connection, reconnecting with capped
//! exponential backoff and shutting down with the server.

use futures::SinkExt;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::models::Order;

const EVENT_BUFFER: usize = 256;
const INITIAL_RECONNECT_DELAY_SECS: u64 = 1;
const MAX_RECONNECT_DELAY_SECS: u64 = 60;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum StaffEvent {
    NewOrder(Order),
    CallWaiter(WaiterCall),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WaiterCall {
    pub table_id: i64,
    pub establishment_id: i64,
}

#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::Sender<StaffEvent>,
}

impl Notifier {
    /// Build a notifier and the receiving end of its queue. Used by
    /// [`spawn`] and directly by tests.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<StaffEvent>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, rx)
    }

    /// Queue an event for publication. Never blocks; a full queue or a
    /// stopped worker drops the event.
    pub fn emit(&self, event: StaffEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::warn!(?event, "realtime queue full, event dropped");
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                tracing::warn!(?event, "realtime worker stopped, event dropped");
            }
        }
    }
}

/// Start the bridge: returns the notifier handle and the worker task.
pub fn spawn(url: String, shutdown: CancellationToken) -> (Notifier, JoinHandle<()>) {
    let (notifier, rx) = Notifier::channel(EVENT_BUFFER);
    let task = tokio::spawn(run(url, rx, shutdown));
    (notifier, task)
}

enum SessionEnd {
    Shutdown,
    Disconnected,
}

async fn run(url: String, mut rx: mpsc::Receiver<StaffEvent>, shutdown: CancellationToken) {
    tracing::info!(%url, "realtime worker started");
    let mut delay = Duration::from_secs(INITIAL_RECONNECT_DELAY_SECS);

    loop {
        if shutdown.is_cancelled() {
            break;
        }

        match connect_async(url.as_str()).await {
            Ok((mut ws, _)) => {
                delay = Duration::from_secs(INITIAL_RECONNECT_DELAY_SECS);
                if let SessionEnd::Shutdown = forward_events(&mut ws, &mut rx, &shutdown).await {
                    let _ = ws.close(None).await;
                    break;
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, delay_secs = delay.as_secs(), "realtime connect failed");
            }
        }

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
        delay = (delay * 2).min(Duration::from_secs(MAX_RECONNECT_DELAY_SECS));
    }

    tracing::info!("realtime worker stopped");
}

/// Forward queued events over one connection until it drops or we shut down.
async fn forward_events<S>(
    ws: &mut S,
    rx: &mut mpsc::Receiver<StaffEvent>,
    shutdown: &CancellationToken,
) -> SessionEnd
where
    S: futures::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return SessionEnd::Shutdown,
            event = rx.recv() => {
                let Some(event) = event else {
                    return SessionEnd::Shutdown;
                };
                let frame = match serde_json::to_string(&event) {
                    Ok(frame) => frame,
                    Err(err) => {
                        tracing::error!(error = %err, "unserializable event dropped");
                        continue;
                    }
                };
                if let Err(err) = ws.send(Message::text(frame)).await {
                    tracing::warn!(error = %err, "realtime send failed, event dropped");
                    return SessionEnd::Disconnected;
                }
            }
        }
    }
}
