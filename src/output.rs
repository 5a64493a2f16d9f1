//! Text and JSON rendering for command results.
//!
//! Everything goes through a `Write` so the formats can be tested without a
//! terminal. JSON output is one object per line.

use std::io::Write;

use alloy_primitives::Address;
use geoguard::forms::mint_success_message;
use geoguard::utils::short_address;
use geoguard::{BalanceSet, MintOutcome, Session};
use serde_json::json;

use crate::error::CliError;

fn write_json<W: Write>(writer: &mut W, value: &serde_json::Value) -> Result<(), CliError> {
    serde_json::to_writer(&mut *writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Session line(s): account and chain, or `not connected`.
pub fn write_session<W: Write>(
    writer: &mut W,
    session: &Session,
    json_mode: bool,
) -> Result<(), CliError> {
    if json_mode {
        return write_json(writer, &json!({ "session": session }));
    }
    let Some(address) = session.address.filter(|_| session.connected) else {
        writeln!(writer, "not connected")?;
        return Ok(());
    };
    writeln!(writer, "account  {}", short_address(&address.to_string()))?;
    match session.chain_id {
        Some(chain_id) => {
            let name = session.chain_name.as_deref().unwrap_or("unknown chain");
            let kind = if session.is_testnet { "testnet" } else { "mainnet" };
            writeln!(writer, "chain    {chain_id} {name} ({kind})")?;
        }
        None => writeln!(writer, "chain    unknown")?,
    }
    writer.flush()?;
    Ok(())
}

pub fn write_balances<W: Write>(
    writer: &mut W,
    balances: &BalanceSet,
    json_mode: bool,
) -> Result<(), CliError> {
    if json_mode {
        return write_json(writer, &json!({ "balances": balances }));
    }
    writeln!(
        writer,
        "balance  primary={} secondary={} default={}",
        balances.primary, balances.secondary, balances.default
    )?;
    writer.flush()?;
    Ok(())
}

/// Session and balances as one record.
pub fn write_status<W: Write>(
    writer: &mut W,
    session: &Session,
    balances: &BalanceSet,
    json_mode: bool,
) -> Result<(), CliError> {
    if json_mode {
        return write_json(writer, &json!({ "session": session, "balances": balances }));
    }
    write_session(writer, session, false)?;
    if session.is_active() {
        write_balances(writer, balances, false)?;
    }
    Ok(())
}

pub fn write_mint<W: Write>(
    writer: &mut W,
    outcome: &MintOutcome,
    to: &Address,
    node_id: &str,
    json_mode: bool,
) -> Result<(), CliError> {
    let block = outcome.receipt.block_number.map(|b| b.to::<u64>());
    if json_mode {
        return write_json(
            writer,
            &json!({
                "tokenId": outcome.token_id,
                "to": to,
                "nodeId": node_id,
                "transactionHash": outcome.receipt.transaction_hash,
                "blockNumber": block,
            }),
        );
    }
    writeln!(writer, "{}", mint_success_message(outcome.token_id, to, node_id))?;
    writeln!(writer, "tx       {:#x}", outcome.receipt.transaction_hash)?;
    writer.flush()?;
    Ok(())
}

pub fn write_node_id<W: Write>(
    writer: &mut W,
    token_id: u64,
    account: &Address,
    node_id: &str,
    json_mode: bool,
) -> Result<(), CliError> {
    if json_mode {
        return write_json(
            writer,
            &json!({ "tokenId": token_id, "account": account, "nodeId": node_id }),
        );
    }
    writeln!(writer, "Node ID: {node_id}")?;
    writer.flush()?;
    Ok(())
}

pub fn write_last_token_id<W: Write>(
    writer: &mut W,
    last: u64,
    json_mode: bool,
) -> Result<(), CliError> {
    if json_mode {
        return write_json(writer, &json!({ "lastTokenId": last }));
    }
    writeln!(writer, "{last}")?;
    writer.flush()?;
    Ok(())
}
