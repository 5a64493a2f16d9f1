//! WebSocket feed of wallet notifications.
//!
//! Connects to a wallet bridge that forwards EIP-1193 `accountsChanged` and
//! `chainChanged` events as JSON-RPC notification frames, and republishes
//! them on the provider's broadcast channel.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::GuardError;
use crate::provider::events::parse_notification;
use crate::provider::ProviderEvent;

/// Delay before reconnecting after the bridge drops.
const RECONNECT_DELAY: Duration = Duration::from_secs(3);
const PING_INTERVAL: Duration = Duration::from_secs(30);
const PONG_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the wallet bridge's notification socket.
///
/// Keeps a persistent connection with auto-reconnect and heartbeat.
#[derive(Debug)]
pub struct ProviderEventStream {
    url: String,
    events_tx: broadcast::Sender<ProviderEvent>,
}

impl ProviderEventStream {
    /// Create a new stream client (does not connect yet).
    pub fn new(url: String, events_tx: broadcast::Sender<ProviderEvent>) -> Self {
        Self { url, events_tx }
    }

    /// Connect and forward notifications until `cancel` fires.
    pub fn connect(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match Self::run_connection(&self.url, &self.events_tx, &cancel).await {
                    Ok(()) => {
                        info!("wallet event stream closed");
                        break;
                    }
                    Err(e) => {
                        warn!("wallet event stream error: {e}, reconnecting in 3s...");
                        tokio::select! {
                            _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                            _ = cancel.cancelled() => break,
                        }
                    }
                }
            }
        })
    }

    async fn run_connection(
        url: &str,
        events_tx: &broadcast::Sender<ProviderEvent>,
        cancel: &CancellationToken,
    ) -> std::result::Result<(), GuardError> {
        let (ws_stream, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| GuardError::WebSocket(format!("connect failed: {e}")))?;

        info!("wallet event stream connected to {url}");

        let (mut write, mut read) = ws_stream.split();

        let mut ping_interval = tokio::time::interval(PING_INTERVAL);
        let mut pong_timeout: Option<tokio::time::Instant> = None;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("wallet event stream shutdown requested");
                    let _ = write.close().await;
                    return Ok(());
                }
                _ = ping_interval.tick() => {
                    if let Some(deadline) = pong_timeout {
                        if tokio::time::Instant::now() > deadline {
                            return Err(GuardError::WebSocket("pong timeout".into()));
                        }
                    }
                    let _ = write.send(Message::Ping(vec![])).await;
                    pong_timeout = Some(tokio::time::Instant::now() + PONG_TIMEOUT);
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(event) = parse_notification(&text) {
                                debug!(?event, "wallet notification");
                                // No receivers just means nobody is listening yet.
                                let _ = events_tx.send(event);
                            }
                        }
                        Some(Ok(Message::Pong(_))) => {
                            pong_timeout = None;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            let _ = write.send(Message::Pong(data)).await;
                        }
                        Some(Ok(Message::Close(_))) => {
                            return Err(GuardError::WebSocket("bridge closed connection".into()));
                        }
                        Some(Err(e)) => {
                            return Err(GuardError::WebSocket(format!("read error: {e}")));
                        }
                        None => {
                            return Err(GuardError::WebSocket("stream ended".into()));
                        }
                        _ => {}
                    }
                }
            }
        }
    }
}
