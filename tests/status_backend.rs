//! Status client and poller against a live HTTP backend.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use token_transfer::status::{
    HttpStatusClient, PollError, PollOutcome, StatusFetchError, StatusPoller, StatusSource,
};

mod common;

const HASH: &str = "0x00000000000000000000000000000000000000000000000000000000000000ab";

fn client(addr: std::net::SocketAddr) -> HttpStatusClient {
    HttpStatusClient::new(&format!("http://{}", addr), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_client_requests_status_path() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();
    let addr = common::start_programmable_backend(move |path| {
        recorder.lock().unwrap().push(path);
        async { (200, r#"{"status":"pending"}"#.to_string()) }
    })
    .await;

    let envelope = client(addr).fetch_status(HASH).await.unwrap();
    assert_eq!(envelope.status.as_deref(), Some("pending"));
    assert_eq!(seen.lock().unwrap().as_slice(), [format!("/tx_status/{}", HASH)]);
}

#[tokio::test]
async fn test_client_separates_failure_kinds() {
    let (addr, _) = common::start_scripted_backend(vec![(503, "busy")]).await;
    assert_eq!(
        client(addr).fetch_status(HASH).await.unwrap_err(),
        StatusFetchError::HttpStatus(503)
    );

    let (addr, _) = common::start_scripted_backend(vec![(200, "<html>oops</html>")]).await;
    assert!(matches!(
        client(addr).fetch_status(HASH).await.unwrap_err(),
        StatusFetchError::Parse(_)
    ));

    let (addr, _) = common::start_scripted_backend(vec![(200, "{}")]).await;
    let envelope = client(addr).fetch_status(HASH).await.unwrap();
    assert!(envelope.status.is_none());
}

#[tokio::test]
async fn test_poll_pending_then_success() {
    let (addr, calls) = common::start_scripted_backend(vec![
        (200, r#"{"status":"pending"}"#),
        (200, r#"{"status":"pending"}"#),
        (200, r#"{"status":"success"}"#),
    ])
    .await;
    let poller = StatusPoller::new(Arc::new(client(addr)), Duration::from_millis(50));

    let mut attempts = Vec::new();
    let outcome = poller
        .poll(HASH, &CancellationToken::new(), |check| attempts.push(check.attempt))
        .await;

    assert_eq!(outcome, Some(PollOutcome::Success));
    assert_eq!(attempts, vec![1, 2, 3]);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_poll_retries_non_success_after_first_check() {
    let (addr, calls) = common::start_scripted_backend(vec![
        (200, r#"{"status":"pending"}"#),
        (502, "bad gateway"),
        (500, "internal"),
        (200, r#"{"status":"failed"}"#),
    ])
    .await;
    let poller = StatusPoller::new(Arc::new(client(addr)), Duration::from_millis(50));

    let outcome = poller.poll(HASH, &CancellationToken::new(), |_| {}).await;
    assert_eq!(outcome, Some(PollOutcome::Failed));
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_first_check_non_success_is_fatal() {
    let (addr, calls) = common::start_scripted_backend(vec![(404, "not found"), (200, r#"{"status":"success"}"#)]).await;
    let poller = StatusPoller::new(Arc::new(client(addr)), Duration::from_millis(50));

    let outcome = poller.poll(HASH, &CancellationToken::new(), |_| {}).await;
    assert_eq!(outcome, Some(PollOutcome::Error(PollError::HttpStatus(404))));

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_backend_error_status_carries_message() {
    let (addr, _) = common::start_scripted_backend(vec![(
        200,
        r#"{"status":"error","message":"node unavailable"}"#,
    )])
    .await;
    let poller = StatusPoller::new(Arc::new(client(addr)), Duration::from_millis(50));

    let outcome = poller.poll(HASH, &CancellationToken::new(), |_| {}).await;
    match outcome {
        Some(PollOutcome::Error(e)) => assert!(e.to_string().contains("node unavailable")),
        other => panic!("expected backend error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_backend_ends_with_fetch_error() {
    // Bind then drop a listener so the port is known to be closed.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let poller = StatusPoller::new(Arc::new(client(addr)), Duration::from_millis(50));
    let outcome = poller.poll(HASH, &CancellationToken::new(), |_| {}).await;

    match outcome {
        Some(PollOutcome::Error(e @ PollError::Transport(_))) => {
            assert!(e.to_string().starts_with("Failed to fetch transaction status from backend"))
        }
        other => panic!("expected transport error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_cancel_stops_requests() {
    let (addr, calls) = common::start_scripted_backend(vec![(200, r#"{"status":"pending"}"#)]).await;
    let poller = StatusPoller::new(Arc::new(client(addr)), Duration::from_millis(50));
    let cancel = CancellationToken::new();

    let task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { poller.poll(HASH, &cancel, |_| {}).await })
    };

    tokio::time::sleep(Duration::from_millis(180)).await;
    cancel.cancel();
    assert_eq!(task.await.unwrap(), None);

    let seen = calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(calls.load(Ordering::SeqCst), seen);
}
