//! Input handling for the mint and lookup forms.
//!
//! Turns the raw strings a user typed into validated requests for
//! [`crate::contract::NodeRegistry`], with the same messages the forms show.

use alloy_primitives::Address;

use crate::error::{GuardError, Result};
use crate::utils::{parse_address, short_address};

/// Raw mint form input.
#[derive(Debug, Clone, Default)]
pub struct MintForm {
    /// Recipient; pre-filled with the connected address.
    pub to: String,
    /// Optional; empty means "next available id".
    pub token_id: String,
    pub node_id: String,
}

/// Validated mint request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintRequest {
    pub to: Address,
    pub token_id: Option<u64>,
    pub node_id: String,
}

impl MintForm {
    /// Pre-fill the recipient with the connected address.
    pub fn for_account(address: Option<Address>) -> Self {
        Self {
            to: address.map(|a| a.to_string()).unwrap_or_default(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<MintRequest> {
        let node_id = self.node_id.trim();
        if node_id.is_empty() {
            return Err(GuardError::Validation("Node ID is required".into()));
        }
        let to = self.to.trim();
        if to.is_empty() {
            return Err(GuardError::Validation(
                "Recipient address is required".into(),
            ));
        }
        Ok(MintRequest {
            to: parse_address(to)?,
            token_id: parse_optional_token_id(&self.token_id)?,
            node_id: node_id.to_string(),
        })
    }
}

/// Id for the next mint: `last + 1`, or 1 when the last id is unknown.
pub fn next_token_id(last_token_id: Option<u64>) -> u64 {
    last_token_id.map_or(1, |last| last.saturating_add(1))
}

/// Raw lookup form input.
#[derive(Debug, Clone, Default)]
pub struct LookupForm {
    pub token_id: String,
    /// Pre-filled with the connected address.
    pub account: String,
}

/// Validated lookup request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
    pub token_id: u64,
    pub account: Address,
}

impl LookupForm {
    pub fn for_account(address: Option<Address>) -> Self {
        Self {
            account: address.map(|a| a.to_string()).unwrap_or_default(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<LookupRequest> {
        let token_id = parse_optional_token_id(&self.token_id)?
            .ok_or_else(|| GuardError::Validation("Token ID is required".into()))?;
        let account = self.account.trim();
        if account.is_empty() {
            return Err(GuardError::Validation("Account address is required".into()));
        }
        Ok(LookupRequest {
            token_id,
            account: parse_address(account)?,
        })
    }
}

fn parse_optional_token_id(raw: &str) -> Result<Option<u64>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<u64>()
        .map(Some)
        .map_err(|_| GuardError::Validation(format!("Invalid token ID: {raw}")))
}

/// Confirmation line shown after a successful mint.
pub fn mint_success_message(token_id: u64, to: &Address, node_id: &str) -> String {
    format!(
        "Token #{token_id} minted successfully to {} with Node ID: {node_id}",
        short_address(&to.to_string())
    )
}
