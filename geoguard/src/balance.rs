//! Periodic native balance refresh.
//!
//! A single background task watches the session. While the session is active
//! it refreshes all three balances immediately and then on every tick of a
//! fixed interval. When the session disconnects the timer is dropped before
//! anything else happens, so a reconnect always starts from a fresh timer.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::{BalanceSource, BalanceSources, ChainEndpoint};
use crate::error::Result;
use crate::provider::{self, WalletProvider};
use crate::rpc::JsonRpcClient;
use crate::session::Session;
use crate::utils::from_base_units;

/// Decimals of a native EVM token.
const NATIVE_DECIMALS: u32 = 18;

/// The three balances shown for a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BalanceSet {
    pub primary: Decimal,
    pub secondary: Decimal,
    pub default: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceSlot {
    Primary,
    Secondary,
    Default,
}

impl BalanceSet {
    pub fn get(&self, slot: BalanceSlot) -> Decimal {
        match slot {
            BalanceSlot::Primary => self.primary,
            BalanceSlot::Secondary => self.secondary,
            BalanceSlot::Default => self.default,
        }
    }

    fn set(&mut self, slot: BalanceSlot, value: Decimal) {
        match slot {
            BalanceSlot::Primary => self.primary = value,
            BalanceSlot::Secondary => self.secondary = value,
            BalanceSlot::Default => self.default = value,
        }
    }
}

/// The parts of a session that decide which balances are read.
fn refresh_target(session: &Session) -> (Option<Address>, Option<u64>, bool) {
    (session.address, session.chain_id, session.is_testnet)
}

/// Keeps a [`BalanceSet`] current while a session is active.
#[derive(Debug)]
pub struct BalanceRefresher<P> {
    provider: Arc<P>,
    sources: BalanceSources,
    interval: Duration,
    http: reqwest::Client,
    balances: watch::Sender<BalanceSet>,
}

impl<P: WalletProvider> BalanceRefresher<P> {
    pub fn new(provider: Arc<P>, sources: BalanceSources, interval: Duration) -> Self {
        let (balances, _) = watch::channel(BalanceSet::default());
        Self {
            provider,
            sources,
            interval,
            http: reqwest::Client::new(),
            balances,
        }
    }

    /// Current balances.
    pub fn balances(&self) -> BalanceSet {
        *self.balances.borrow()
    }

    /// Watch balance updates.
    pub fn subscribe(&self) -> watch::Receiver<BalanceSet> {
        self.balances.subscribe()
    }

    /// Refresh all three balances for `session`.
    ///
    /// Does nothing when the session has no address or chain id. A failed
    /// read is logged and leaves the previous value in place.
    pub async fn refresh(&self, session: &Session) -> BalanceSet {
        let Some(address) = session.address else {
            return self.balances();
        };
        if session.chain_id.is_none() {
            return self.balances();
        }

        let (primary, secondary, default) = tokio::join!(
            self.fetch(&self.sources.primary, address, session),
            self.fetch(&self.sources.secondary, address, session),
            self.fetch(&self.sources.default, address, session),
        );

        self.balances.send_modify(|set| {
            for (slot, result) in [
                (BalanceSlot::Primary, primary),
                (BalanceSlot::Secondary, secondary),
                (BalanceSlot::Default, default),
            ] {
                match result {
                    Ok(value) => set.set(slot, value),
                    Err(e) => warn!(?slot, error = %e, "balance refresh failed"),
                }
            }
        });
        let set = self.balances();
        debug!(
            primary = %set.primary,
            secondary = %set.secondary,
            default = %set.default,
            "balances refreshed"
        );
        set
    }

    /// Refresh one balance on demand.
    pub async fn refresh_slot(&self, slot: BalanceSlot, session: &Session) -> Result<Decimal> {
        let (Some(address), Some(_)) = (session.address, session.chain_id) else {
            return Ok(self.balances().get(slot));
        };
        let source = match slot {
            BalanceSlot::Primary => &self.sources.primary,
            BalanceSlot::Secondary => &self.sources.secondary,
            BalanceSlot::Default => &self.sources.default,
        };
        let value = self.fetch(source, address, session).await?;
        self.balances.send_modify(|set| set.set(slot, value));
        Ok(value)
    }

    async fn fetch(
        &self,
        source: &BalanceSource,
        address: Address,
        session: &Session,
    ) -> Result<Decimal> {
        match source {
            BalanceSource::Wallet => {
                let wei = provider::balance(self.provider.as_ref(), address).await?;
                from_base_units(wei, NATIVE_DECIMALS)
            }
            BalanceSource::Endpoint(endpoint) => self.fetch_endpoint(endpoint, address).await,
            BalanceSource::ByNetwork { mainnet, testnet } => {
                let endpoint = if session.is_testnet { testnet } else { mainnet };
                self.fetch_endpoint(endpoint, address).await
            }
        }
    }

    async fn fetch_endpoint(&self, endpoint: &ChainEndpoint, address: Address) -> Result<Decimal> {
        let rpc = JsonRpcClient::with_client(self.http.clone(), &endpoint.rpc_url);
        let wei: U256 = rpc
            .request("eth_getBalance", json!([address, "latest"]))
            .await?;
        from_base_units(wei, endpoint.decimals)
    }

    /// Run the refresh loop in the background until `cancel` fires.
    pub fn spawn(
        self: Arc<Self>,
        session_rx: watch::Receiver<Session>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(session_rx, cancel).await })
    }

    async fn run(&self, mut session_rx: watch::Receiver<Session>, cancel: CancellationToken) {
        loop {
            let active = session_rx.borrow_and_update().is_active();
            if !active {
                tokio::select! {
                    changed = session_rx.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        continue;
                    }
                    _ = cancel.cancelled() => return,
                }
            }

            let mut target = refresh_target(&session_rx.borrow());
            // First tick fires immediately.
            let mut ticker = time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            debug!(interval_secs = self.interval.as_secs(), "balance timer started");

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("balance refresher stopped");
                        return;
                    }
                    changed = session_rx.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        let session = session_rx.borrow_and_update().clone();
                        if !session.is_active() {
                            drop(ticker);
                            self.balances.send_replace(BalanceSet::default());
                            debug!("balance timer cleared");
                            break;
                        }
                        let next = refresh_target(&session);
                        if next == target {
                            continue;
                        }
                        target = next;
                        // Address or chain moved: restart the cycle with an immediate refresh.
                        ticker = time::interval(self.interval);
                        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    }
                    _ = ticker.tick() => {
                        let session = session_rx.borrow().clone();
                        self.refresh(&session).await;
                    }
                }
            }
        }
    }
}
