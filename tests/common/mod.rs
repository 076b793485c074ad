//! Shared utilities for integration testing.

#![allow(dead_code)]

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use token_transfer::blockchain::ChainId;
use token_transfer::wallet::{TransferReceipt, WalletError, WalletEvent, WalletProvider};

pub const SEPOLIA: u64 = 11_155_111;
pub const TOKEN: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";
pub const RECIPIENT: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

/// Start a programmable status backend on an ephemeral port.
///
/// `f` receives the request path and returns the status code and body.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let path = read_request_path(&mut socket).await.unwrap_or_default();
                        let (status, body) = f(path).await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Backend that answers each call with the next scripted response; the
/// last one repeats. Returns the address and a call counter.
pub async fn start_scripted_backend(script: Vec<(u16, &'static str)>) -> (SocketAddr, Arc<AtomicU32>) {
    assert!(!script.is_empty());
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let script = Arc::new(script);

    let addr = start_programmable_backend(move |_path| {
        let counter = counter.clone();
        let script = script.clone();
        async move {
            let n = counter.fetch_add(1, Ordering::SeqCst) as usize;
            let (status, body) = script[n.min(script.len() - 1)];
            (status, body.to_string())
        }
    })
    .await;

    (addr, calls)
}

async fn read_request_path(socket: &mut tokio::net::TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let head = String::from_utf8_lossy(&buf);
    let request_line = head.lines().next()?;
    request_line.split_whitespace().nth(1).map(str::to_string)
}

/// Wallet double for integration tests.
pub struct FakeWallet {
    pub account: Address,
    chain_id: AtomicU64,
    decimals: u8,
    sends: Mutex<Vec<(Address, Address, U256)>>,
    events: broadcast::Sender<WalletEvent>,
}

impl FakeWallet {
    pub fn new(chain_id: u64, decimals: u8) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            account: Address::repeat_byte(0x22),
            chain_id: AtomicU64::new(chain_id),
            decimals,
            sends: Mutex::new(Vec::new()),
            events,
        }
    }

    pub fn switch_chain(&self, chain_id: u64) {
        self.chain_id.store(chain_id, Ordering::SeqCst);
        let _ = self.events.send(WalletEvent::ChainChanged(ChainId(chain_id)));
    }

    pub fn sends(&self) -> Vec<(Address, Address, U256)> {
        self.sends.lock().unwrap().clone()
    }
}

#[async_trait]
impl WalletProvider for FakeWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        Ok(vec![self.account])
    }

    async fn signer_address(&self) -> Result<Address, WalletError> {
        Ok(self.account)
    }

    async fn chain_id(&self) -> Result<ChainId, WalletError> {
        Ok(ChainId(self.chain_id.load(Ordering::SeqCst)))
    }

    async fn token_decimals(&self, _token: Address) -> Result<u8, WalletError> {
        Ok(self.decimals)
    }

    async fn send_transfer(&self, token: Address, to: Address, amount: U256) -> Result<TxHash, WalletError> {
        let mut sends = self.sends.lock().unwrap();
        sends.push((token, to, amount));
        Ok(TxHash::with_last_byte(sends.len() as u8))
    }

    async fn wait_for_receipt(&self, _tx_hash: TxHash) -> Result<TransferReceipt, WalletError> {
        Ok(TransferReceipt {
            block_number: 1,
            succeeded: true,
        })
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}
