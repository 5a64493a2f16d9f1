use serde_json::{json, Value};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::EventSource;
use crate::error::Result;
use crate::provider::{poll, ProviderEvent, WalletProvider, EVENT_CHANNEL_CAPACITY};
use crate::rpc::JsonRpcClient;
use crate::ws::ProviderEventStream;

/// Wallet reached over JSON-RPC/HTTP: a wallet bridge, or a development
/// node with unlocked accounts.
#[derive(Debug)]
pub struct HttpWalletProvider {
    rpc: JsonRpcClient,
    events: EventSource,
    events_tx: broadcast::Sender<ProviderEvent>,
    cancel: CancellationToken,
}

impl HttpWalletProvider {
    /// Create a provider (no background tasks until [`Self::start`]).
    pub fn new(url: &str, events: EventSource) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            rpc: JsonRpcClient::new(url),
            events,
            events_tx,
            cancel: CancellationToken::new(),
        }
    }

    /// Start the notification source in the background.
    pub fn start(&self) {
        match &self.events {
            EventSource::WebSocket(url) => {
                info!(url = %url, "listening for wallet notifications");
                ProviderEventStream::new(url.clone(), self.events_tx.clone())
                    .connect(self.cancel.child_token());
            }
            EventSource::Poll(interval) => {
                info!(interval_ms = interval.as_millis() as u64, "polling wallet for changes");
                poll::spawn_poller(
                    self.rpc.clone(),
                    self.events_tx.clone(),
                    *interval,
                    self.cancel.child_token(),
                );
            }
            EventSource::Disabled => {
                debug!("wallet notifications disabled");
            }
        }
    }

    /// Stop background notification tasks.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn rpc(&self) -> &JsonRpcClient {
        &self.rpc
    }
}

impl Drop for HttpWalletProvider {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl WalletProvider for HttpWalletProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        self.rpc.request_raw(method, params).await
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events_tx.subscribe()
    }

    async fn detect(&self) -> bool {
        match self.rpc.request_raw("eth_chainId", json!([])).await {
            Ok(_) => true,
            Err(e) => {
                debug!(url = self.rpc.url(), error = %e, "wallet not reachable");
                false
            }
        }
    }
}
