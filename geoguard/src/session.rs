//! Wallet session lifecycle.
//!
//! [`SessionManager`] owns the single-account [`Session`] and publishes it on
//! a `watch` channel. A background listener applies `accountsChanged` and
//! `chainChanged` notifications from the provider; attaching and detaching
//! it is idempotent, so reconnecting never doubles notifications.

use std::sync::{Arc, Mutex};

use alloy_primitives::Address;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{GuardError, Result};
use crate::provider::{self, ProviderEvent, WalletProvider};
use crate::rpc::types::ChainInfo;
use crate::utils::{parse_address, parse_chain_id};

/// In-memory record of the wallet connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub connected: bool,
    pub address: Option<Address>,
    pub chain_id: Option<u64>,
    pub is_testnet: bool,
    pub chain_name: Option<String>,
    /// Avalanche network id (1 mainnet, 5 Fuji).
    pub network_id: Option<u32>,
}

impl Session {
    /// Connected with both an address and a chain id.
    pub fn is_active(&self) -> bool {
        self.connected && self.address.is_some() && self.chain_id.is_some()
    }
}

/// Running notification listener.
#[derive(Debug)]
struct Listener {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Connects, disconnects and tracks the wallet session.
#[derive(Debug)]
pub struct SessionManager<P> {
    provider: Arc<P>,
    state: Arc<watch::Sender<Session>>,
    listener: Mutex<Option<Listener>>,
}

impl<P: WalletProvider> SessionManager<P> {
    pub fn new(provider: Arc<P>) -> Self {
        let (state, _) = watch::channel(Session::default());
        Self {
            provider,
            state: Arc::new(state),
            listener: Mutex::new(None),
        }
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Watch session changes.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Detect the wallet, start listening, and pick up an account the wallet
    /// already authorized without prompting.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::NoWallet`] if no wallet answers.
    pub async fn init(&self) -> Result<Session> {
        if !self.provider.detect().await {
            return Err(GuardError::NoWallet);
        }
        self.attach_listener();

        match provider::accounts(self.provider.as_ref()).await {
            Ok(accounts) => {
                if let Err(e) = apply_accounts(&self.provider, &self.state, accounts).await {
                    error!(error = %e, "failed to restore wallet session");
                    return Err(e);
                }
            }
            // Expected while the user has not authorized this client yet.
            Err(e) => debug!(error = %e, "no authorized accounts"),
        }
        Ok(self.session())
    }

    /// Request account access and populate the session.
    ///
    /// Zero accounts leaves the session disconnected. More than one account
    /// is rejected with [`GuardError::MultipleAccounts`] and the session is
    /// left as it was. If the chain id cannot be read, the error is returned
    /// and the session is restored to what it was before the call.
    pub async fn connect(&self) -> Result<Session> {
        if !self.provider.detect().await {
            return Err(GuardError::NoWallet);
        }
        info!("connecting wallet");

        let accounts = provider::request_accounts(self.provider.as_ref()).await?;
        apply_accounts(&self.provider, &self.state, accounts).await?;
        self.attach_listener();

        let session = self.session();
        if let Some(address) = session.address {
            info!(%address, chain_id = ?session.chain_id, "wallet connected");
        }
        Ok(session)
    }

    /// Clear the session and stop listening for notifications.
    pub fn disconnect(&self) {
        self.detach_listener();
        self.state.send_replace(Session::default());
        info!("wallet disconnected");
    }

    /// Fail with [`GuardError::WrongChain`] unless the session is on `expected`.
    pub fn ensure_chain(&self, expected: u64) -> Result<()> {
        match self.session().chain_id {
            Some(actual) if actual == expected => Ok(()),
            Some(actual) => Err(GuardError::WrongChain { expected, actual }),
            None => Err(GuardError::NotConnected),
        }
    }

    /// The connected address, or [`GuardError::NotConnected`].
    pub fn require_address(&self) -> Result<Address> {
        let session = self.session();
        match session.address {
            Some(address) if session.connected => Ok(address),
            _ => Err(GuardError::NotConnected),
        }
    }

    /// Whether a notification listener is running.
    pub fn is_listening(&self) -> bool {
        self.lock_listener()
            .as_ref()
            .is_some_and(|l| !l.handle.is_finished())
    }

    fn lock_listener(&self) -> std::sync::MutexGuard<'_, Option<Listener>> {
        self.listener.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start the listener unless one is already running.
    fn attach_listener(&self) {
        let mut slot = self.lock_listener();
        if slot.as_ref().is_some_and(|l| !l.handle.is_finished()) {
            return;
        }

        let cancel = CancellationToken::new();
        let events = self.provider.subscribe();
        let handle = tokio::spawn(run_listener(
            Arc::clone(&self.provider),
            Arc::clone(&self.state),
            events,
            cancel.clone(),
        ));
        debug!("wallet listener attached");
        *slot = Some(Listener { cancel, handle });
    }

    /// Stop the listener if one is running. Safe to call repeatedly.
    fn detach_listener(&self) {
        if let Some(listener) = self.lock_listener().take() {
            listener.cancel.cancel();
            listener.handle.abort();
            debug!("wallet listener removed");
        }
    }
}

impl<P> Drop for SessionManager<P> {
    fn drop(&mut self) {
        let slot = self.listener.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(listener) = slot.take() {
            listener.cancel.cancel();
            listener.handle.abort();
        }
    }
}

async fn run_listener<P: WalletProvider>(
    provider: Arc<P>,
    state: Arc<watch::Sender<Session>>,
    mut events: broadcast::Receiver<ProviderEvent>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => return,
            event = events.recv() => event,
        };
        let result = match event {
            Ok(ProviderEvent::AccountsChanged(accounts)) => {
                apply_accounts(&provider, &state, accounts).await
            }
            Ok(ProviderEvent::ChainChanged(raw)) => apply_chain(&provider, &state, &raw).await,
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("wallet listener lagged by {n} notifications");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => return,
        };
        if let Err(e) = result {
            error!(error = %e, "failed to apply wallet notification");
        }
    }
}

/// Apply an account list reported by the wallet.
async fn apply_accounts<P: WalletProvider>(
    provider: &Arc<P>,
    state: &watch::Sender<Session>,
    accounts: Vec<String>,
) -> Result<()> {
    let address = match accounts.as_slice() {
        [] => {
            state.send_replace(Session::default());
            debug!("wallet exposed no accounts");
            return Ok(());
        }
        [account] => parse_address(account)?,
        many => return Err(GuardError::MultipleAccounts(many.len())),
    };

    let previous = state.borrow().clone();
    state.send_modify(|s| {
        s.connected = true;
        s.address = Some(address);
    });

    if previous.chain_id.is_none() {
        let applied = async {
            let raw = provider::chain_id(provider.as_ref()).await?;
            apply_chain(provider, state, &raw).await
        }
        .await;
        if let Err(e) = applied {
            // Never leave a connected session without a chain.
            state.send_replace(previous);
            return Err(e);
        }
    }
    Ok(())
}

/// Apply a chain id reported by the wallet and refresh network metadata.
async fn apply_chain<P: WalletProvider>(
    provider: &Arc<P>,
    state: &watch::Sender<Session>,
    raw: &Value,
) -> Result<()> {
    let chain_id = parse_chain_id(raw)?;
    state.send_modify(|s| s.chain_id = Some(chain_id));

    let info = match provider::ethereum_chain(provider.as_ref()).await {
        Ok(info) => Some(info),
        Err(e) => {
            debug!(chain_id, error = %e, "wallet has no chain metadata, using built-in table");
            ChainInfo::known(chain_id)
        }
    };

    state.send_modify(|s| {
        // A disconnect may have landed while the metadata call was in flight.
        if s.chain_id != Some(chain_id) {
            return;
        }
        match &info {
            Some(info) => {
                s.is_testnet = info.is_testnet;
                s.chain_name = Some(info.chain_name.clone());
                s.network_id = Some(info.network_id());
            }
            None => {
                s.is_testnet = false;
                s.chain_name = None;
                s.network_id = None;
            }
        }
    });
    debug!(chain_id, testnet = ?info.as_ref().map(|i| i.is_testnet), "chain updated");
    Ok(())
}
