//! Transaction-seen listener
//!
//! Consumes "transaction seen" events from the ledger and pins each
//! transaction's fiat value through the payments service.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::PaymentsConfig;
use crate::payments::PaymentsService;

/// A transaction appeared on the network or in a block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionSeen {
    /// Transaction hash
    pub hash: String,
    /// Net signed value relative to the wallet
    pub amount: i64,
}

/// Spawn the listener task.
///
/// The task runs until every sender is dropped.
pub fn spawn_seen_listener(
    service: Arc<PaymentsService>,
    capacity: usize,
) -> (mpsc::Sender<TransactionSeen>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<TransactionSeen>(capacity.max(1));

    let handle = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let created = service.on_transaction_seen(&event.hash, event.amount);
            debug!("Transaction {} seen (annotation created: {})", event.hash, created);
        }
        debug!("Transaction-seen listener stopped");
    });

    (tx, handle)
}

/// Spawn the listener with the channel capacity of `config`
pub fn spawn_configured_seen_listener(
    service: Arc<PaymentsService>,
    config: &PaymentsConfig,
) -> (mpsc::Sender<TransactionSeen>, JoinHandle<()>) {
    spawn_seen_listener(service, config.seen_channel_capacity)
}
