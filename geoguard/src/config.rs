use std::time::Duration;

use alloy_primitives::{address, Address};
use url::Url;

use crate::error::{GuardError, Result};

/// Address of the GeoGuard node registry contract.
pub const CONTRACT_ADDRESS: Address = address!("0x18a87471c520008f3187947efef644c7e66091b4");

/// Interval between balance refreshes while a session is active.
pub const BALANCE_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

pub const AVALANCHE_MAINNET_RPC: &str = "https://api.avax.network/ext/bc/C/rpc";
pub const AVALANCHE_FUJI_RPC: &str = "https://api.avax-test.network/ext/bc/C/rpc";

/// A JSON-RPC endpoint serving a chain's native token balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainEndpoint {
    /// Human-readable label used in logs and output.
    pub label: String,
    pub rpc_url: String,
    /// Decimals of the native token (18 for EVM chains).
    pub decimals: u32,
}

impl ChainEndpoint {
    pub fn new(label: impl Into<String>, rpc_url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            rpc_url: rpc_url.into(),
            decimals: 18,
        }
    }

    pub fn c_chain_mainnet() -> Self {
        Self::new("C-Chain", AVALANCHE_MAINNET_RPC)
    }

    pub fn c_chain_fuji() -> Self {
        Self::new("C-Chain (Fuji)", AVALANCHE_FUJI_RPC)
    }
}

/// Where one of the three balances is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BalanceSource {
    /// `eth_getBalance` through the wallet provider, on its active chain.
    Wallet,
    /// A fixed endpoint.
    Endpoint(ChainEndpoint),
    /// Mainnet or testnet endpoint, picked by the session's testnet flag.
    ByNetwork {
        mainnet: ChainEndpoint,
        testnet: ChainEndpoint,
    },
}

/// The three balance sources shown while a session is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceSources {
    /// Native token of the selected chain.
    pub primary: BalanceSource,
    /// Secondary chain (C-Chain of the session's network by default).
    pub secondary: BalanceSource,
    /// Default chain.
    pub default: BalanceSource,
}

/// How the wallet provider pushes account/chain notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventSource {
    /// WebSocket bridge sending JSON-RPC notifications.
    WebSocket(String),
    /// Poll `eth_accounts`/`eth_chainId` and emit events on change.
    Poll(Duration),
    /// No notifications; the session only changes on connect/disconnect.
    Disabled,
}

/// Configuration for the GeoGuard client.
#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// JSON-RPC URL of the wallet provider.
    pub wallet_url: String,
    /// Source of account/chain notifications.
    pub events: EventSource,
    /// Node registry contract.
    pub contract_address: Address,
    pub balances: BalanceSources,
    /// Balance refresh interval; 30 seconds unless overridden.
    pub refresh_interval: Duration,
    /// Interval between `eth_getTransactionReceipt` polls while waiting on a mint.
    pub receipt_poll_interval: Duration,
    /// Confirmations required before a mint resolves.
    pub confirmations: u64,
}

impl GuardConfig {
    /// Fuji testnet configuration against the given wallet endpoint.
    pub fn fuji(wallet_url: impl Into<String>) -> Self {
        Self {
            wallet_url: wallet_url.into(),
            events: EventSource::Poll(Duration::from_secs(2)),
            contract_address: CONTRACT_ADDRESS,
            balances: BalanceSources {
                primary: BalanceSource::Wallet,
                secondary: BalanceSource::ByNetwork {
                    mainnet: ChainEndpoint::c_chain_mainnet(),
                    testnet: ChainEndpoint::c_chain_fuji(),
                },
                default: BalanceSource::Endpoint(ChainEndpoint::c_chain_fuji()),
            },
            refresh_interval: BALANCE_REFRESH_INTERVAL,
            receipt_poll_interval: Duration::from_secs(1),
            confirmations: 1,
        }
    }

    /// Mainnet configuration against the given wallet endpoint.
    pub fn mainnet(wallet_url: impl Into<String>) -> Self {
        let mut config = Self::fuji(wallet_url);
        config.balances.default = BalanceSource::Endpoint(ChainEndpoint::c_chain_mainnet());
        config
    }

    /// Check that the configured endpoints are usable URLs.
    pub fn validate(&self) -> Result<()> {
        check_url(&self.wallet_url, &["http", "https"])?;
        if let EventSource::WebSocket(url) = &self.events {
            check_url(url, &["ws", "wss"])?;
        }
        Ok(())
    }
}

fn check_url(raw: &str, schemes: &[&str]) -> Result<()> {
    let url = Url::parse(raw)
        .map_err(|e| GuardError::Validation(format!("invalid URL {raw}: {e}")))?;
    if !schemes.contains(&url.scheme()) {
        return Err(GuardError::Validation(format!(
            "unsupported URL scheme {} in {raw}",
            url.scheme()
        )));
    }
    Ok(())
}
