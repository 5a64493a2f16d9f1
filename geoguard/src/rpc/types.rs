use alloy_primitives::{Address, Bytes, B256, U256, U64};
use serde::{Deserialize, Serialize};

/// JSON-RPC 2.0 request envelope.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: serde_json::Value,
}

/// JSON-RPC 2.0 response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub id: serde_json::Value,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<JsonRpcErrorObject>,
}

/// JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Parameters of `eth_sendTransaction` / `eth_call`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    pub to: Address,
    pub data: Bytes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
}

/// Subset of an Ethereum transaction receipt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    #[serde(default)]
    pub block_hash: Option<B256>,
    #[serde(default)]
    pub block_number: Option<U64>,
    #[serde(default)]
    pub from: Option<Address>,
    #[serde(default)]
    pub to: Option<Address>,
    #[serde(default)]
    pub gas_used: Option<U256>,
    /// `0x1` success, `0x0` revert. Absent on pre-Byzantium chains.
    #[serde(default)]
    pub status: Option<U64>,
}

impl TransactionReceipt {
    pub fn succeeded(&self) -> bool {
        self.status.map_or(true, |s| s == U64::from(1))
    }
}

/// Chain metadata returned by `wallet_getEthereumChain`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChainInfo {
    #[serde(default)]
    pub is_testnet: bool,
    pub chain_name: String,
    #[serde(default)]
    pub rpc_urls: Vec<String>,
}

/// Avalanche chains this client knows without asking the wallet.
pub const KNOWN_CHAINS: &[(u64, &str, bool)] = &[
    (43114, "Avalanche C-Chain", false),
    (43113, "Avalanche Fuji C-Chain", true),
];

/// Avalanche network ids (`networkID` in avalanchejs).
pub const MAINNET_NETWORK_ID: u32 = 1;
pub const FUJI_NETWORK_ID: u32 = 5;

impl ChainInfo {
    /// Look up a chain in [`KNOWN_CHAINS`].
    pub fn known(chain_id: u64) -> Option<Self> {
        KNOWN_CHAINS
            .iter()
            .find(|(id, _, _)| *id == chain_id)
            .map(|(_, name, is_testnet)| Self {
                is_testnet: *is_testnet,
                chain_name: (*name).to_string(),
                rpc_urls: Vec::new(),
            })
    }

    pub fn network_id(&self) -> u32 {
        if self.is_testnet {
            FUJI_NETWORK_ID
        } else {
            MAINNET_NETWORK_ID
        }
    }
}
