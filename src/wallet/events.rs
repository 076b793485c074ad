//! Scoped registration for wallet notifications.

use std::future::Future;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::wallet::provider::WalletEvent;

/// A live listener for wallet notifications.
///
/// The listener task is aborted when the subscription is dropped, so a
/// handler can never outlive the session that registered it.
#[derive(Debug)]
pub struct EventSubscription {
    handle: JoinHandle<()>,
}

impl EventSubscription {
    /// Spawn a task that runs `handler` for every notification, one at a
    /// time and each to completion.
    pub fn spawn<F, Fut>(mut events: broadcast::Receiver<WalletEvent>, mut handler: F) -> Self
    where
        F: FnMut(WalletEvent) -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        tracing::debug!(?event, "Wallet notification received");
                        if !handler(event).await {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Wallet notifications dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            tracing::debug!("Wallet notification listener stopped");
        });

        Self { handle }
    }

    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Deregister explicitly.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
