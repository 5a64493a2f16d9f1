use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Notification pushed by a wallet provider.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    /// The set of exposed accounts changed. Empty means the wallet locked or
    /// revoked access.
    AccountsChanged(Vec<String>),
    /// The active chain changed. Carries the raw chain id (hex string or number).
    ChainChanged(Value),
}

/// JSON-RPC notification frame: `{"jsonrpc":"2.0","method":..,"params":..}`.
#[derive(Debug, Deserialize)]
struct Notification {
    method: String,
    #[serde(default)]
    params: Value,
}

/// Parse a notification frame from the event bridge.
///
/// Returns `None` for frames that are not account/chain notifications.
pub fn parse_notification(text: &str) -> Option<ProviderEvent> {
    let frame: Notification = match serde_json::from_str(text) {
        Ok(f) => f,
        Err(e) => {
            debug!(error = %e, "ignoring non-notification frame");
            return None;
        }
    };

    match frame.method.as_str() {
        "accountsChanged" => accounts_from_params(frame.params).map(ProviderEvent::AccountsChanged),
        "chainChanged" => chain_from_params(frame.params).map(ProviderEvent::ChainChanged),
        other => {
            debug!(method = other, "ignoring unknown notification");
            None
        }
    }
}

/// Accepts `["0x.."]` or `[["0x.."]]`.
fn accounts_from_params(params: Value) -> Option<Vec<String>> {
    let mut items = match params {
        Value::Array(items) => items,
        Value::Null => return Some(Vec::new()),
        _ => return None,
    };
    if items.len() == 1 && items[0].is_array() {
        return accounts_from_params(items.remove(0));
    }
    items
        .into_iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}

/// Accepts `"0xa869"`, `43113` or a one-element array of either.
fn chain_from_params(params: Value) -> Option<Value> {
    match params {
        Value::String(_) | Value::Number(_) => Some(params),
        Value::Array(mut items) if items.len() == 1 => chain_from_params(items.remove(0)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_accounts_changed() {
        let text = r#"{"jsonrpc":"2.0","method":"accountsChanged","params":["0x1000000000000000000000000000000000000001"]}"#;
        assert_eq!(
            parse_notification(text),
            Some(ProviderEvent::AccountsChanged(vec![
                "0x1000000000000000000000000000000000000001".to_string()
            ]))
        );
    }

    #[test]
    fn test_parse_accounts_changed_nested_and_empty() {
        let nested = r#"{"method":"accountsChanged","params":[["0xabc","0xdef"]]}"#;
        assert_eq!(
            parse_notification(nested),
            Some(ProviderEvent::AccountsChanged(vec![
                "0xabc".to_string(),
                "0xdef".to_string()
            ]))
        );

        let empty = r#"{"method":"accountsChanged","params":[]}"#;
        assert_eq!(
            parse_notification(empty),
            Some(ProviderEvent::AccountsChanged(vec![]))
        );
    }

    #[test]
    fn test_parse_chain_changed_shapes() {
        let hex = r#"{"method":"chainChanged","params":"0xa869"}"#;
        assert_eq!(
            parse_notification(hex),
            Some(ProviderEvent::ChainChanged(json!("0xa869")))
        );

        let wrapped = r#"{"method":"chainChanged","params":[43114]}"#;
        assert_eq!(
            parse_notification(wrapped),
            Some(ProviderEvent::ChainChanged(json!(43114)))
        );
    }

    #[test]
    fn test_parse_ignores_other_frames() {
        assert_eq!(parse_notification("not json"), None);
        assert_eq!(
            parse_notification(r#"{"method":"message","params":{"type":"x"}}"#),
            None
        );
        assert_eq!(
            parse_notification(r#"{"method":"accountsChanged","params":[1,2]}"#),
            None
        );
    }
}
