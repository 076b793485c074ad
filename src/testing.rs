//! Scripted fakes for the wallet and status capabilities.

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use tokio::sync::broadcast;

use crate::blockchain::types::ChainId;
use crate::status::client::StatusSource;
use crate::status::types::{StatusEnvelope, StatusFetchError};
use crate::wallet::provider::{TransferReceipt, WalletError, WalletEvent, WalletProvider, WalletResult};

struct WalletState {
    account: Address,
    chain_id: u64,
    decimals: Result<u8, WalletError>,
    accounts: Result<Vec<Address>, WalletError>,
    send: Option<WalletError>,
    receipt: Result<TransferReceipt, WalletError>,
    last_transfer: Option<(Address, Address, U256)>,
}

/// In-memory wallet with configurable answers.
pub struct MockWallet {
    state: Mutex<WalletState>,
    events: broadcast::Sender<WalletEvent>,
    decimals_calls: AtomicU32,
    send_calls: AtomicU32,
}

impl MockWallet {
    pub fn new(chain_id: u64) -> Self {
        let account = Address::repeat_byte(0x11);
        let (events, _) = broadcast::channel(16);
        Self {
            state: Mutex::new(WalletState {
                account,
                chain_id,
                decimals: Ok(18),
                accounts: Ok(vec![account]),
                send: None,
                receipt: Ok(TransferReceipt {
                    block_number: 100,
                    succeeded: true,
                }),
                last_transfer: None,
            }),
            events,
            decimals_calls: AtomicU32::new(0),
            send_calls: AtomicU32::new(0),
        }
    }

    pub fn with_decimals(self, decimals: u8) -> Self {
        self.state.lock().unwrap().decimals = Ok(decimals);
        self
    }

    pub fn account(&self) -> Address {
        self.state.lock().unwrap().account
    }

    pub fn set_account(&self, account: Address) {
        let mut state = self.state.lock().unwrap();
        state.account = account;
        state.accounts = Ok(vec![account]);
    }

    pub fn set_chain_id(&self, chain_id: u64) {
        self.state.lock().unwrap().chain_id = chain_id;
    }

    pub fn reject_accounts(&self, message: &str) {
        self.state.lock().unwrap().accounts = Err(WalletError::rejected(message));
    }

    pub fn fail_decimals(&self, message: &str) {
        self.state.lock().unwrap().decimals = Err(WalletError::new(message));
    }

    pub fn fail_send(&self, err: WalletError) {
        self.state.lock().unwrap().send = Some(err);
    }

    pub fn fail_receipt(&self, err: WalletError) {
        self.state.lock().unwrap().receipt = Err(err);
    }

    pub fn set_receipt_success(&self, succeeded: bool) {
        self.state.lock().unwrap().receipt = Ok(TransferReceipt {
            block_number: 100,
            succeeded,
        });
    }

    pub fn emit(&self, event: WalletEvent) {
        let _ = self.events.send(event);
    }

    pub fn decimals_calls(&self) -> u32 {
        self.decimals_calls.load(Ordering::SeqCst)
    }

    pub fn send_calls(&self) -> u32 {
        self.send_calls.load(Ordering::SeqCst)
    }

    pub fn last_transfer(&self) -> Option<(Address, Address, U256)> {
        self.state.lock().unwrap().last_transfer
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    async fn request_accounts(&self) -> WalletResult<Vec<Address>> {
        self.state.lock().unwrap().accounts.clone()
    }

    async fn signer_address(&self) -> WalletResult<Address> {
        Ok(self.account())
    }

    async fn chain_id(&self) -> WalletResult<ChainId> {
        Ok(ChainId(self.state.lock().unwrap().chain_id))
    }

    async fn token_decimals(&self, _token: Address) -> WalletResult<u8> {
        self.decimals_calls.fetch_add(1, Ordering::SeqCst);
        self.state.lock().unwrap().decimals.clone()
    }

    async fn send_transfer(&self, token: Address, to: Address, amount: U256) -> WalletResult<TxHash> {
        let count = self.send_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.send.clone() {
            return Err(err);
        }
        state.last_transfer = Some((token, to, amount));
        Ok(TxHash::with_last_byte(count as u8 + 1))
    }

    async fn wait_for_receipt(&self, _tx_hash: TxHash) -> WalletResult<TransferReceipt> {
        self.state.lock().unwrap().receipt.clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}

/// Status source that replays a script; the last entry repeats.
pub struct ScriptedStatus {
    script: Vec<Result<StatusEnvelope, StatusFetchError>>,
    calls: AtomicU32,
}

impl ScriptedStatus {
    pub fn new(script: Vec<Result<StatusEnvelope, StatusFetchError>>) -> Self {
        assert!(!script.is_empty(), "script needs at least one entry");
        Self {
            script,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusSource for ScriptedStatus {
    async fn fetch_status(&self, _tx_hash: &str) -> Result<StatusEnvelope, StatusFetchError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
        let idx = call.min(self.script.len() - 1);
        self.script[idx].clone()
    }
}
