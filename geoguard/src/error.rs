use alloy_primitives::B256;
use alloy_sol_types::{Revert, SolError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GuardError {
    #[error("no wallet detected")]
    NoWallet,

    #[error("Multiple accounts found, we don't support that yet ({0} accounts)")]
    MultipleAccounts(usize),

    #[error("wallet not connected")]
    NotConnected,

    #[error("wrong chain: expected {expected}, connected to {actual}")]
    WrongChain { expected: u64, actual: u64 },

    /// JSON-RPC error object returned by the wallet or node. Displays the
    /// provider's message verbatim.
    #[error("{message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<serde_json::Value>,
    },

    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("ABI error: {0}")]
    Abi(#[from] alloy_sol_types::Error),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid chain id: {0}")]
    InvalidChainId(String),

    #[error("transaction {0} reverted")]
    TransactionReverted(B256),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("overflow: {0}")]
    Overflow(String),

    #[error("{0}")]
    Validation(String),
}

impl GuardError {
    /// Decode a Solidity `Error(string)` payload carried in an RPC error's
    /// `data` field, if there is one.
    pub fn revert_reason(&self) -> Option<String> {
        let GuardError::Rpc {
            data: Some(data), ..
        } = self
        else {
            return None;
        };
        // Nodes put the revert bytes either directly in `data` or under `data.data`.
        let raw = data
            .as_str()
            .or_else(|| data.get("data").and_then(|d| d.as_str()))?;
        let bytes = crate::utils::decode_hex(raw).ok()?;
        Revert::abi_decode(&bytes).ok().map(|r| r.reason)
    }
}

pub type Result<T> = std::result::Result<T, GuardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_error_displays_message_verbatim() {
        let err = GuardError::Rpc {
            code: 3,
            message: "execution reverted: token does not exist".into(),
            data: None,
        };
        assert_eq!(err.to_string(), "execution reverted: token does not exist");
    }

    #[test]
    fn test_revert_reason_decodes_error_string() {
        let encoded = Revert::from("token does not exist").abi_encode();
        let err = GuardError::Rpc {
            code: 3,
            message: "execution reverted".into(),
            data: Some(serde_json::Value::String(format!(
                "0x{}",
                hex::encode(encoded)
            ))),
        };
        assert_eq!(err.revert_reason().as_deref(), Some("token does not exist"));
    }

    #[test]
    fn test_revert_reason_absent_for_other_errors() {
        assert!(GuardError::NotConnected.revert_reason().is_none());
        let err = GuardError::Rpc {
            code: -32000,
            message: "boom".into(),
            data: None,
        };
        assert!(err.revert_reason().is_none());
    }
}
