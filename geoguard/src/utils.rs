use alloy_primitives::{Address, U256};
use rust_decimal::Decimal;

use crate::error::{GuardError, Result};

/// Largest scale `rust_decimal` can represent.
const MAX_DECIMAL_SCALE: u32 = 28;

/// Convert an integer amount in the token's smallest unit to a Decimal.
///
/// # Errors
///
/// Returns `GuardError::Overflow` if the amount does not fit in a Decimal
/// mantissa (96 bits) or `decimals` exceeds the supported scale.
pub fn from_base_units(amount: U256, decimals: u32) -> Result<Decimal> {
    if decimals > MAX_DECIMAL_SCALE {
        return Err(GuardError::Overflow(format!(
            "from_base_units: scale {decimals} exceeds {MAX_DECIMAL_SCALE}"
        )));
    }
    let raw = i128::try_from(amount)
        .map_err(|_| GuardError::Overflow(format!("from_base_units: {amount}")))?;
    Decimal::try_from_i128_with_scale(raw, decimals)
        .map(|d| d.normalize())
        .map_err(|e| GuardError::Overflow(format!("from_base_units: {amount}: {e}")))
}

/// Decode a chain id the way wallets report it: a JSON number, or a hex
/// string with or without the `0x` prefix. Strings are always hex, so
/// `"43113"` is `0x43113`.
pub fn parse_chain_id(value: &serde_json::Value) -> Result<u64> {
    match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| GuardError::InvalidChainId(n.to_string())),
        serde_json::Value::String(s) => {
            let s = s.trim();
            let digits = s
                .strip_prefix("0x")
                .or_else(|| s.strip_prefix("0X"))
                .unwrap_or(s);
            if digits.is_empty() {
                return Err(GuardError::InvalidChainId(s.to_string()));
            }
            u64::from_str_radix(digits, 16).map_err(|_| GuardError::InvalidChainId(s.to_string()))
        }
        other => Err(GuardError::InvalidChainId(other.to_string())),
    }
}

/// Parse an account address (`0x` + 40 hex chars, any case).
pub fn parse_address(value: &str) -> Result<Address> {
    value
        .trim()
        .parse::<Address>()
        .map_err(|_| GuardError::InvalidAddress(value.to_string()))
}

/// Shorten an address for display: `0x1234...abcd`.
pub fn short_address(value: &str) -> String {
    if value.len() <= 10 {
        return value.to_string();
    }
    format!("{}...{}", &value[..6], &value[value.len() - 4..])
}

/// Decode a hex string (with optional `0x` prefix) to bytes.
///
/// # Errors
///
/// Returns `GuardError::Validation` if the hex string is invalid.
pub fn decode_hex(value: &str) -> Result<Vec<u8>> {
    let stripped = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(stripped).map_err(|e| GuardError::Validation(format!("invalid hex string: {e}")))
}
