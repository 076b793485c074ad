//! End-to-end transfer lifecycle with a fake wallet and a live status backend.

use alloy::primitives::U256;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use token_transfer::blockchain::parse_address;
use token_transfer::config::TransferConfig;
use token_transfer::status::HttpStatusClient;
use token_transfer::transfer::{LifecycleState, TransferEvent, TransferRecord, NETWORK_CHANGED_MESSAGE};
use token_transfer::wallet::WalletProvider;
use token_transfer::{TransferLifecycle, TransferRequest};

mod common;
use common::FakeWallet;

fn config(addr: std::net::SocketAddr) -> TransferConfig {
    let mut config = TransferConfig::default();
    config.token.contract_address = common::TOKEN.to_string();
    config.backend.base_url = format!("http://{}", addr);
    config.backend.poll_interval_ms = 50;
    config
}

fn build(config: TransferConfig, wallet: &Arc<FakeWallet>) -> Arc<TransferLifecycle> {
    let status = Arc::new(HttpStatusClient::from_config(&config.backend).unwrap());
    TransferLifecycle::new(
        Arc::new(config),
        Some(wallet.clone() as Arc<dyn WalletProvider>),
        status,
    )
    .unwrap()
}

async fn wait_terminal(lifecycle: &TransferLifecycle) -> TransferRecord {
    let mut rx = lifecycle.subscribe();
    let record = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|r| r.is_terminal()))
        .await
        .expect("transfer did not settle")
        .unwrap()
        .clone();
    record
}

#[tokio::test]
async fn test_send_and_follow_to_success() {
    let (addr, calls) = common::start_scripted_backend(vec![
        (200, r#"{"status":"pending"}"#),
        (200, r#"{"status":"pending"}"#),
        (200, r#"{"status":"success"}"#),
    ])
    .await;
    let wallet = Arc::new(FakeWallet::new(common::SEPOLIA, 6));
    let lifecycle = build(config(addr), &wallet);

    let connected = lifecycle.connect().await.unwrap();
    assert_eq!(connected.token.decimals, 6);
    assert_eq!(connected.session.account, Some(wallet.account));

    let mut events = lifecycle.events();
    let observer = tokio::spawn(async move {
        let mut seen = Vec::new();
        while let Ok(event) = events.recv().await {
            let done = matches!(event, TransferEvent::StateChanged { to, .. } if to.is_terminal());
            seen.push(event);
            if done {
                break;
            }
        }
        seen
    });

    let hash = lifecycle
        .submit(TransferRequest::new(common::RECIPIENT, "12.5"))
        .await
        .unwrap();

    let record = wait_terminal(&lifecycle).await;
    assert_eq!(record.state, LifecycleState::Success);
    assert_eq!(record.transaction_hash, Some(hash));
    assert_eq!(record.poll_checks, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let sends = wallet.sends();
    assert_eq!(sends.len(), 1);
    assert_eq!(sends[0].0, parse_address(common::TOKEN).unwrap());
    assert_eq!(sends[0].1, parse_address(common::RECIPIENT).unwrap());
    assert_eq!(sends[0].2, U256::from(12_500_000u64));

    let seen = tokio::time::timeout(Duration::from_secs(5), observer)
        .await
        .expect("observer did not finish")
        .unwrap();
    let id = record.id;
    let changed = |from, to| TransferEvent::StateChanged { record_id: id, from, to };
    let checked = |attempt, status: &str| TransferEvent::Checked {
        record_id: id,
        attempt,
        status: Some(status.to_string()),
    };
    assert_eq!(
        seen,
        vec![
            TransferEvent::Started { record_id: id },
            changed(LifecycleState::Idle, LifecycleState::AwaitingWalletConfirmation),
            TransferEvent::Broadcast { record_id: id, tx_hash: hash },
            changed(LifecycleState::AwaitingWalletConfirmation, LifecycleState::AwaitingReceipt),
            changed(LifecycleState::AwaitingReceipt, LifecycleState::Pending),
            checked(1, "pending"),
            checked(2, "pending"),
            checked(3, "success"),
            changed(LifecycleState::Pending, LifecycleState::Success),
        ]
    );
}

#[tokio::test]
async fn test_unknown_status_is_never_success() {
    let (addr, _) = common::start_scripted_backend(vec![
        (200, r#"{"status":"pending"}"#),
        (200, r#"{"status":"confirmed"}"#),
    ])
    .await;
    let wallet = Arc::new(FakeWallet::new(common::SEPOLIA, 18));
    let lifecycle = build(config(addr), &wallet);
    lifecycle.connect().await.unwrap();

    lifecycle.submit(TransferRequest::new(common::RECIPIENT, "1")).await.unwrap();
    let record = wait_terminal(&lifecycle).await;

    assert_eq!(record.state, LifecycleState::Error);
    assert!(record.last_error.unwrap().contains("confirmed"));
}

#[tokio::test]
async fn test_wrong_network_blocks_connection() {
    let (addr, calls) = common::start_scripted_backend(vec![(200, r#"{"status":"success"}"#)]).await;
    let wallet = Arc::new(FakeWallet::new(1, 18));
    let lifecycle = build(config(addr), &wallet);

    let err = lifecycle.connect().await.unwrap_err();
    assert!(err.to_string().contains("Sepolia"));
    assert!(!lifecycle.session().is_connected());

    let err = lifecycle
        .submit(TransferRequest::new(common::RECIPIENT, "1"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not connected"));
    assert!(wallet.sends().is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_network_switch_mid_poll() {
    let (addr, calls) = common::start_scripted_backend(vec![(200, r#"{"status":"pending"}"#)]).await;
    let wallet = Arc::new(FakeWallet::new(common::SEPOLIA, 18));
    let lifecycle = build(config(addr), &wallet);
    lifecycle.connect().await.unwrap();

    let mut changes = lifecycle.session_changes();
    lifecycle.submit(TransferRequest::new(common::RECIPIENT, "1")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(120)).await;

    wallet.switch_chain(1);
    tokio::time::timeout(Duration::from_secs(5), changes.recv())
        .await
        .unwrap()
        .unwrap();

    let record = lifecycle.record();
    assert_eq!(record.state, LifecycleState::Error);
    assert_eq!(record.last_error.as_deref(), Some(NETWORK_CHANGED_MESSAGE));
    assert!(!lifecycle.session().is_connected());

    let seen = calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(calls.load(Ordering::SeqCst), seen);
    lifecycle.shutdown();
}
