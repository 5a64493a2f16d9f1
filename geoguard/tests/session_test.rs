//! Session lifecycle tests against the in-memory wallet.
//!
//! Covers connect/disconnect outcomes for zero, one and several accounts,
//! and the handling of pushed `accountsChanged`/`chainChanged` notifications.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Address;
use geoguard::{GuardError, MockProvider, ProviderEvent, Session, SessionManager};
use serde_json::json;
use tokio::sync::watch;

const ALICE: &str = "0x1000000000000000000000000000000000000001";
const BOB: &str = "0x2000000000000000000000000000000000000002";

fn manager(accounts: &[&str], chain_id: u64) -> (Arc<MockProvider>, SessionManager<MockProvider>) {
    let provider = Arc::new(MockProvider::new(accounts, chain_id));
    let manager = SessionManager::new(Arc::clone(&provider));
    (provider, manager)
}

fn addr(s: &str) -> Address {
    s.parse().unwrap()
}

/// Wait until the published session satisfies `pred`.
async fn wait_for(rx: &mut watch::Receiver<Session>, pred: impl FnMut(&Session) -> bool) -> Session {
    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(pred))
        .await
        .expect("timed out waiting for session update")
        .expect("session channel closed")
        .clone()
}

// ---------------------------------------------------------------------------
// connect
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_connect_with_zero_accounts_stays_disconnected() {
    let (_provider, manager) = manager(&[], 43113);

    let session = manager.connect().await.unwrap();

    assert!(!session.connected);
    assert_eq!(session.address, None);
    assert_eq!(session.chain_id, None);
    assert_eq!(manager.session(), Session::default());
}

#[tokio::test]
async fn test_connect_with_one_account_populates_session() {
    let (provider, manager) = manager(&[ALICE], 43113);

    let session = manager.connect().await.unwrap();

    assert!(session.connected);
    assert_eq!(session.address, Some(addr(ALICE)));
    assert_eq!(session.chain_id, Some(43113));
    assert!(session.is_testnet);
    assert_eq!(session.network_id, Some(5));
    assert_eq!(session.chain_name.as_deref(), Some("Avalanche Fuji C-Chain"));
    assert!(manager.is_listening());
    assert_eq!(provider.call_count("eth_requestAccounts"), 1);
}

#[tokio::test]
async fn test_connect_with_multiple_accounts_is_rejected_and_session_unchanged() {
    let (provider, manager) = manager(&[ALICE], 43114);
    let before = manager.connect().await.unwrap();

    provider.set_accounts(&[ALICE, BOB]);
    let err = manager.connect().await.unwrap_err();

    assert!(matches!(err, GuardError::MultipleAccounts(2)));
    assert!(err.to_string().contains("Multiple accounts found"));
    assert_eq!(manager.session(), before);
}

#[tokio::test]
async fn test_connect_from_fresh_with_multiple_accounts_leaves_default_session() {
    let (_provider, manager) = manager(&[ALICE, BOB], 43114);

    assert!(matches!(
        manager.connect().await,
        Err(GuardError::MultipleAccounts(2))
    ));
    assert_eq!(manager.session(), Session::default());
}

#[tokio::test]
async fn test_connect_without_wallet_fails() {
    let provider = Arc::new(MockProvider::unavailable());
    let manager = SessionManager::new(provider);

    assert!(matches!(manager.connect().await, Err(GuardError::NoWallet)));
    assert!(matches!(manager.init().await, Err(GuardError::NoWallet)));
    assert!(!manager.is_listening());
}

#[tokio::test]
async fn test_connect_restores_session_when_chain_read_fails() {
    let (provider, manager) = manager(&[ALICE], 43113);
    provider.fail("eth_chainId", -32603, "boom");

    let err = manager.connect().await.unwrap_err();

    assert_eq!(err.to_string(), "boom");
    assert_eq!(manager.session(), Session::default());
    assert!(!manager.session().connected);
}

#[tokio::test]
async fn test_connect_rejects_malformed_account() {
    let (_provider, manager) = manager(&["0xnot-an-address"], 43114);

    assert!(matches!(
        manager.connect().await,
        Err(GuardError::InvalidAddress(_))
    ));
    assert_eq!(manager.session(), Session::default());
}

// ---------------------------------------------------------------------------
// init
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_init_restores_authorized_account_without_prompting() {
    let (provider, manager) = manager(&[ALICE], 43114);

    let session = manager.init().await.unwrap();

    assert!(session.connected);
    assert_eq!(session.chain_id, Some(43114));
    assert!(!session.is_testnet);
    assert_eq!(provider.call_count("eth_requestAccounts"), 0);
    assert_eq!(provider.call_count("eth_accounts"), 1);
}

#[tokio::test]
async fn test_init_ignores_unauthorized_accounts_error() {
    let (provider, manager) = manager(&[ALICE], 43114);
    provider.fail("eth_accounts", 4100, "The requested account has not been authorized");

    let session = manager.init().await.unwrap();

    assert!(!session.connected);
    assert!(manager.is_listening());
}

// ---------------------------------------------------------------------------
// disconnect
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_disconnect_clears_session_and_is_idempotent() {
    let (_provider, manager) = manager(&[ALICE], 43113);
    manager.connect().await.unwrap();

    manager.disconnect();
    assert_eq!(manager.session(), Session::default());
    assert!(!manager.is_listening());

    manager.disconnect();
    assert_eq!(manager.session(), Session::default());
}

#[tokio::test]
async fn test_disconnect_stops_applying_notifications() {
    let (provider, manager) = manager(&[ALICE], 43113);
    manager.connect().await.unwrap();
    manager.disconnect();

    provider.emit(ProviderEvent::AccountsChanged(vec![BOB.to_string()]));
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(manager.session(), Session::default());
}

// ---------------------------------------------------------------------------
// notifications
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_chain_changed_hex_updates_chain_and_testnet_flag() {
    let (provider, manager) = manager(&[ALICE], 43113);
    manager.connect().await.unwrap();
    let mut rx = manager.subscribe();

    provider.set_chain_id(43114);
    provider.emit(ProviderEvent::ChainChanged(json!("0xa86a")));

    let session = wait_for(&mut rx, |s| s.chain_id == Some(43114) && !s.is_testnet).await;
    assert_eq!(session.network_id, Some(1));
    assert_eq!(session.address, Some(addr(ALICE)));
}

#[tokio::test]
async fn test_chain_changed_number_falls_back_to_known_chains() {
    let (provider, manager) = manager(&[ALICE], 43114);
    manager.connect().await.unwrap();
    let mut rx = manager.subscribe();

    // Wallet without chain metadata support.
    provider.set_chain_info(None);
    provider.emit(ProviderEvent::ChainChanged(json!(43113)));

    let session = wait_for(&mut rx, |s| s.chain_id == Some(43113)).await;
    assert!(session.is_testnet);
    assert_eq!(session.chain_name.as_deref(), Some("Avalanche Fuji C-Chain"));
}

#[tokio::test]
async fn test_chain_changed_bare_hex_string() {
    let (provider, manager) = manager(&[ALICE], 43114);
    manager.connect().await.unwrap();
    let mut rx = manager.subscribe();

    provider.set_chain_id(43113);
    provider.emit(ProviderEvent::ChainChanged(json!("a869")));

    let session = wait_for(&mut rx, |s| s.chain_id == Some(43113)).await;
    assert!(session.is_testnet);
}

#[tokio::test]
async fn test_accounts_changed_empty_resets_session() {
    let (provider, manager) = manager(&[ALICE], 43113);
    manager.connect().await.unwrap();
    let mut rx = manager.subscribe();

    provider.emit(ProviderEvent::AccountsChanged(vec![]));

    let session = wait_for(&mut rx, |s| !s.connected).await;
    assert_eq!(session, Session::default());
}

#[tokio::test]
async fn test_accounts_changed_replaces_address() {
    let (provider, manager) = manager(&[ALICE], 43113);
    manager.connect().await.unwrap();
    let mut rx = manager.subscribe();

    provider.emit(ProviderEvent::AccountsChanged(vec![BOB.to_string()]));

    let session = wait_for(&mut rx, |s| s.address == Some(addr(BOB))).await;
    assert_eq!(session.chain_id, Some(43113));
}

#[tokio::test]
async fn test_accounts_changed_with_multiple_accounts_is_ignored() {
    let (provider, manager) = manager(&[ALICE], 43113);
    manager.connect().await.unwrap();
    let mut rx = manager.subscribe();

    provider.emit(ProviderEvent::AccountsChanged(vec![
        ALICE.to_string(),
        BOB.to_string(),
    ]));
    // Notifications are applied in order; once this one lands the previous
    // one has been handled.
    provider.set_chain_id(43114);
    provider.emit(ProviderEvent::ChainChanged(json!("0xa86a")));

    let session = wait_for(&mut rx, |s| s.chain_id == Some(43114)).await;
    assert_eq!(session.address, Some(addr(ALICE)));
    assert!(session.connected);
}

#[tokio::test]
async fn test_reconnect_does_not_duplicate_listeners() {
    let (provider, manager) = manager(&[ALICE], 43113);

    manager.connect().await.unwrap();
    manager.connect().await.unwrap();
    manager.disconnect();
    manager.connect().await.unwrap();
    assert_eq!(provider.call_count("wallet_getEthereumChain"), 2);

    let mut rx = manager.subscribe();
    provider.set_chain_id(43114);
    provider.emit(ProviderEvent::ChainChanged(json!("0xa86a")));
    wait_for(&mut rx, |s| s.chain_id == Some(43114) && !s.is_testnet).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(provider.call_count("wallet_getEthereumChain"), 3);
}

// ---------------------------------------------------------------------------
// guards
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_ensure_chain() {
    let (_provider, manager) = manager(&[ALICE], 43113);
    assert!(matches!(
        manager.ensure_chain(43113),
        Err(GuardError::NotConnected)
    ));

    manager.connect().await.unwrap();
    assert!(manager.ensure_chain(43113).is_ok());
    assert!(matches!(
        manager.ensure_chain(43114),
        Err(GuardError::WrongChain {
            expected: 43114,
            actual: 43113
        })
    ));
    assert_eq!(manager.require_address().unwrap(), addr(ALICE));
}
