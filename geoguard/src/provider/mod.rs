//! Wallet provider abstraction.
//!
//! A wallet provider is anything that answers EIP-1193 style
//! `request(method, params)` calls for an account it controls and pushes
//! `accountsChanged`/`chainChanged` notifications. The session manager,
//! balance refresher and contract facade are generic over [`WalletProvider`].

pub mod events;
pub mod http;
pub mod mock;
pub mod poll;

use std::future::Future;

use alloy_primitives::{Address, U256};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::broadcast;

use crate::error::{GuardError, Result};
use crate::rpc::types::ChainInfo;

pub use events::ProviderEvent;
pub use http::HttpWalletProvider;
pub use mock::MockProvider;

/// Capacity of the provider notification channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Request/notification interface of a wallet.
pub trait WalletProvider: Send + Sync + 'static {
    /// Issue a JSON-RPC request and return the raw result.
    fn request(&self, method: &str, params: Value) -> impl Future<Output = Result<Value>> + Send;

    /// Subscribe to account/chain notifications.
    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;

    /// Whether a wallet is reachable at all.
    fn detect(&self) -> impl Future<Output = bool> + Send;
}

/// Issue a request and deserialize its result.
pub async fn request<P, T>(provider: &P, method: &str, params: Value) -> Result<T>
where
    P: WalletProvider,
    T: DeserializeOwned,
{
    let value = provider.request(method, params).await?;
    serde_json::from_value(value).map_err(GuardError::Json)
}

/// `eth_accounts`: accounts already authorized, without prompting.
pub async fn accounts<P: WalletProvider>(provider: &P) -> Result<Vec<String>> {
    request(provider, "eth_accounts", json!([])).await
}

/// `eth_requestAccounts`: ask the wallet for account access.
pub async fn request_accounts<P: WalletProvider>(provider: &P) -> Result<Vec<String>> {
    let value = provider.request("eth_requestAccounts", json!([])).await?;
    if value.is_null() {
        return Err(GuardError::Validation(
            "No accounts returned from wallet".into(),
        ));
    }
    serde_json::from_value(value).map_err(GuardError::Json)
}

/// `eth_chainId`, in whatever shape the wallet returns it.
pub async fn chain_id<P: WalletProvider>(provider: &P) -> Result<Value> {
    provider.request("eth_chainId", json!([])).await
}

/// `wallet_getEthereumChain`: metadata for the wallet's active chain.
pub async fn ethereum_chain<P: WalletProvider>(provider: &P) -> Result<ChainInfo> {
    request(provider, "wallet_getEthereumChain", json!([])).await
}

/// `eth_getBalance` at the latest block, in the smallest unit.
pub async fn balance<P: WalletProvider>(provider: &P, address: Address) -> Result<U256> {
    request(provider, "eth_getBalance", json!([address, "latest"])).await
}
