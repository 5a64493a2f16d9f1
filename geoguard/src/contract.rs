//! Calls against the GeoGuard node registry contract.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256, U256, U64};
use alloy_sol_types::{sol, SolCall};
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::error::{GuardError, Result};
use crate::forms::next_token_id;
use crate::provider::{self, WalletProvider};
use crate::rpc::types::{TransactionReceipt, TransactionRequest};
use crate::utils::parse_address;

sol! {
    interface INodeRegistry {
        function mint(address to, uint256 tokenId, string nodeId) external;
        function getNodeId(uint256 tokenId, address account) external view returns (string);
        function lastTokenId() external view returns (uint256);
    }
}

/// Result of [`NodeRegistry::mint_token`].
#[derive(Debug, Clone)]
pub struct MintOutcome {
    /// Token id that was minted.
    pub token_id: u64,
    pub receipt: TransactionReceipt,
}

/// Facade over the node registry contract, issuing calls through the wallet.
#[derive(Debug)]
pub struct NodeRegistry<P> {
    provider: Arc<P>,
    address: Address,
    receipt_poll_interval: Duration,
    confirmations: u64,
}

impl<P: WalletProvider> NodeRegistry<P> {
    pub fn new(provider: Arc<P>, address: Address) -> Self {
        Self {
            provider,
            address,
            receipt_poll_interval: Duration::from_secs(1),
            confirmations: 1,
        }
    }

    /// How often to poll for the mint receipt.
    pub fn with_receipt_poll_interval(mut self, interval: Duration) -> Self {
        self.receipt_poll_interval = interval;
        self
    }

    /// Blocks that must include the mint before it resolves (at least 1).
    pub fn with_confirmations(mut self, confirmations: u64) -> Self {
        self.confirmations = confirmations.max(1);
        self
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Mint `token_id` to `to`, tying it to `node_id`.
    ///
    /// Sends the transaction from the wallet's account and waits until it is
    /// confirmed. `to = None` mints to that same account. There is no timeout.
    pub async fn mint(
        &self,
        token_id: u64,
        node_id: &str,
        to: Option<Address>,
    ) -> Result<TransactionReceipt> {
        let from = self.signer().await?;
        let recipient = to.unwrap_or(from);

        let call = INodeRegistry::mintCall {
            to: recipient,
            tokenId: U256::from(token_id),
            nodeId: node_id.to_string(),
        };
        let tx = TransactionRequest {
            from: Some(from),
            to: self.address,
            data: Bytes::from(call.abi_encode()),
            value: None,
        };

        info!(token_id, node_id, to = %recipient, "submitting mint");
        let hash: B256 =
            provider::request(self.provider.as_ref(), "eth_sendTransaction", json!([tx]))
                .await
                .inspect_err(|e| error!(error = %e, "Error minting token"))?;

        let receipt = self.wait_for_receipt(hash).await?;
        if !receipt.succeeded() {
            return Err(GuardError::TransactionReverted(hash));
        }
        info!(%hash, block = ?receipt.block_number, "mint confirmed");
        Ok(receipt)
    }

    /// Mint with `last_token_id() + 1` when no id is given, or 1 when the
    /// last id cannot be read.
    pub async fn mint_token(
        &self,
        token_id: Option<u64>,
        node_id: &str,
        to: Option<Address>,
    ) -> Result<MintOutcome> {
        let token_id = match token_id {
            Some(id) => id,
            None => {
                let last = self
                    .last_token_id()
                    .await
                    .inspect_err(|e| {
                        warn!(error = %e, "last token id unavailable, minting from 1")
                    })
                    .ok();
                next_token_id(last)
            }
        };
        let receipt = self.mint(token_id, node_id, to).await?;
        Ok(MintOutcome { token_id, receipt })
    }

    /// Node id stored for `token_id` under `account`.
    ///
    /// A revert (e.g. unknown token) surfaces with the node's message as is.
    pub async fn get_node_id(&self, token_id: u64, account: Address) -> Result<String> {
        let call = INodeRegistry::getNodeIdCall {
            tokenId: U256::from(token_id),
            account,
        };
        let output = self
            .call(Bytes::from(call.abi_encode()))
            .await
            .inspect_err(|e| error!(error = %e, "Error getting nodeId"))?;
        Ok(INodeRegistry::getNodeIdCall::abi_decode_returns(&output)?)
    }

    /// Highest token id minted so far.
    pub async fn last_token_id(&self) -> Result<u64> {
        let output = self
            .call(Bytes::from(INodeRegistry::lastTokenIdCall {}.abi_encode()))
            .await
            .inspect_err(|e| error!(error = %e, "Error getting last token ID"))?;
        let last = INodeRegistry::lastTokenIdCall::abi_decode_returns(&output)?;
        u64::try_from(last).map_err(|_| GuardError::Overflow(format!("last token id {last}")))
    }

    /// The wallet account that signs transactions.
    async fn signer(&self) -> Result<Address> {
        let accounts = provider::request_accounts(self.provider.as_ref()).await?;
        match accounts.as_slice() {
            [] => Err(GuardError::NotConnected),
            [account] => parse_address(account),
            many => Err(GuardError::MultipleAccounts(many.len())),
        }
    }

    async fn call(&self, data: Bytes) -> Result<Bytes> {
        let tx = TransactionRequest {
            from: None,
            to: self.address,
            data,
            value: None,
        };
        provider::request(self.provider.as_ref(), "eth_call", json!([tx, "latest"])).await
    }

    async fn wait_for_receipt(&self, hash: B256) -> Result<TransactionReceipt> {
        let mut ticker = tokio::time::interval(self.receipt_poll_interval);
        loop {
            ticker.tick().await;
            let receipt: Option<TransactionReceipt> = provider::request(
                self.provider.as_ref(),
                "eth_getTransactionReceipt",
                json!([hash]),
            )
            .await?;

            let Some(receipt) = receipt else {
                debug!(%hash, "transaction pending");
                continue;
            };
            if self.confirmations <= 1 {
                return Ok(receipt);
            }
            let Some(mined_at) = receipt.block_number else {
                continue;
            };
            let head: U64 =
                provider::request(self.provider.as_ref(), "eth_blockNumber", json!([])).await?;
            let depth = head.saturating_sub(mined_at).to::<u64>() + 1;
            if depth >= self.confirmations {
                return Ok(receipt);
            }
            debug!(%hash, depth, needed = self.confirmations, "waiting for confirmations");
        }
    }
}
