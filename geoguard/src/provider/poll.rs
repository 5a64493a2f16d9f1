//! Notification emulation for wallets that cannot push events.
//!
//! Polls `eth_accounts` and `eth_chainId` on an interval and emits
//! [`ProviderEvent`]s when either changes.

use serde_json::{json, Value};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::provider::ProviderEvent;
use crate::rpc::JsonRpcClient;
use crate::utils::parse_chain_id;

/// Accounts and chain id observed at one poll.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WalletSnapshot {
    pub accounts: Vec<String>,
    pub chain_id: Option<u64>,
    /// Chain id exactly as the wallet returned it.
    pub raw_chain_id: Value,
}

/// Events implied by moving from `prev` to `next`.
///
/// Account comparison ignores address case.
pub fn diff_snapshots(prev: &WalletSnapshot, next: &WalletSnapshot) -> Vec<ProviderEvent> {
    let mut events = Vec::new();
    let same_accounts = prev.accounts.len() == next.accounts.len()
        && prev
            .accounts
            .iter()
            .zip(&next.accounts)
            .all(|(a, b)| a.eq_ignore_ascii_case(b));
    if !same_accounts {
        events.push(ProviderEvent::AccountsChanged(next.accounts.clone()));
    }
    if next.chain_id.is_some() && prev.chain_id != next.chain_id {
        events.push(ProviderEvent::ChainChanged(next.raw_chain_id.clone()));
    }
    events
}

async fn take_snapshot(rpc: &JsonRpcClient) -> crate::error::Result<WalletSnapshot> {
    let accounts: Vec<String> = rpc.request("eth_accounts", json!([])).await?;
    let raw_chain_id = rpc.request_raw("eth_chainId", json!([])).await?;
    let chain_id = parse_chain_id(&raw_chain_id).ok();
    Ok(WalletSnapshot {
        accounts,
        chain_id,
        raw_chain_id,
    })
}

/// Spawn the polling task. The first successful poll only records a
/// baseline; events are emitted for later changes.
pub fn spawn_poller(
    rpc: JsonRpcClient,
    events_tx: broadcast::Sender<ProviderEvent>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last: Option<WalletSnapshot> = None;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let next = match take_snapshot(&rpc).await {
                        Ok(s) => s,
                        Err(e) => {
                            debug!(error = %e, "wallet poll failed");
                            continue;
                        }
                    };
                    if let Some(prev) = &last {
                        for event in diff_snapshots(prev, &next) {
                            debug!(?event, "wallet state changed");
                            let _ = events_tx.send(event);
                        }
                    }
                    last = Some(next);
                }
                _ = cancel.cancelled() => {
                    debug!("wallet poller stopped");
                    return;
                }
            }
        }
    })
}
