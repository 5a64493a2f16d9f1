//! Deterministic in-memory wallet for tests and offline runs.

use std::collections::HashMap;
use std::sync::Mutex;

use alloy_primitives::U256;
use serde_json::{json, Value};
use tokio::sync::broadcast;

use crate::error::{GuardError, Result};
use crate::provider::{ProviderEvent, WalletProvider, EVENT_CHANNEL_CAPACITY};
use crate::rpc::types::ChainInfo;

/// JSON-RPC "method not found".
const METHOD_NOT_FOUND: i64 = -32601;

#[derive(Debug)]
struct MockState {
    available: bool,
    accounts: Vec<String>,
    chain_id: u64,
    chain_info: Option<ChainInfo>,
    balance: U256,
    responses: HashMap<String, std::result::Result<Value, (i64, String)>>,
    calls: Vec<(String, Value)>,
}

/// Scriptable wallet provider.
///
/// Answers `eth_accounts`, `eth_requestAccounts`, `eth_chainId`,
/// `wallet_getEthereumChain` and `eth_getBalance` from its state; any other
/// method must be scripted with [`MockProvider::respond`] or
/// [`MockProvider::fail`].
#[derive(Debug)]
pub struct MockProvider {
    state: Mutex<MockState>,
    events_tx: broadcast::Sender<ProviderEvent>,
}

impl MockProvider {
    pub fn new(accounts: &[&str], chain_id: u64) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: Mutex::new(MockState {
                available: true,
                accounts: accounts.iter().map(|a| a.to_string()).collect(),
                chain_id,
                chain_info: ChainInfo::known(chain_id),
                balance: U256::from(1_000_000_000_000_000_000u128),
                responses: HashMap::new(),
                calls: Vec::new(),
            }),
            events_tx,
        }
    }

    /// A provider that reports no wallet present.
    pub fn unavailable() -> Self {
        let provider = Self::new(&[], 0);
        provider.lock().available = false;
        provider
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        // A panic in another test thread must not cascade.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_accounts(&self, accounts: &[&str]) {
        self.lock().accounts = accounts.iter().map(|a| a.to_string()).collect();
    }

    pub fn set_chain_id(&self, chain_id: u64) {
        let mut state = self.lock();
        state.chain_id = chain_id;
        state.chain_info = ChainInfo::known(chain_id);
    }

    /// Override the `wallet_getEthereumChain` answer; `None` makes the call fail.
    pub fn set_chain_info(&self, info: Option<ChainInfo>) {
        self.lock().chain_info = info;
    }

    /// Balance returned by `eth_getBalance`, in wei.
    pub fn set_balance(&self, wei: U256) {
        self.lock().balance = wei;
    }

    /// Script a successful result for `method`.
    pub fn respond(&self, method: &str, result: Value) {
        self.lock().responses.insert(method.to_string(), Ok(result));
    }

    /// Script an RPC error for `method`.
    pub fn fail(&self, method: &str, code: i64, message: &str) {
        self.lock()
            .responses
            .insert(method.to_string(), Err((code, message.to_string())));
    }

    /// Push a notification to subscribers.
    pub fn emit(&self, event: ProviderEvent) {
        let _ = self.events_tx.send(event);
    }

    /// Every request received so far, in order.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.lock().calls.iter().filter(|(m, _)| m == method).count()
    }

    fn answer(&self, method: &str, params: Value) -> Result<Value> {
        let mut state = self.lock();
        state.calls.push((method.to_string(), params));

        if let Some(scripted) = state.responses.get(method) {
            return scripted.clone().map_err(|(code, message)| GuardError::Rpc {
                code,
                message,
                data: None,
            });
        }

        match method {
            "eth_accounts" | "eth_requestAccounts" => Ok(json!(state.accounts)),
            "eth_chainId" => Ok(json!(format!("0x{:x}", state.chain_id))),
            "wallet_getEthereumChain" => match &state.chain_info {
                Some(info) => Ok(serde_json::to_value(info)?),
                None => Err(method_not_found(method)),
            },
            "eth_getBalance" => Ok(json!(state.balance)),
            _ => Err(method_not_found(method)),
        }
    }
}

fn method_not_found(method: &str) -> GuardError {
    GuardError::Rpc {
        code: METHOD_NOT_FOUND,
        message: format!("the method {method} does not exist/is not available"),
        data: None,
    }
}

impl WalletProvider for MockProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        self.answer(method, params)
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events_tx.subscribe()
    }

    async fn detect(&self) -> bool {
        self.lock().available
    }
}
