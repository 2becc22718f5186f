//! Contract of the transaction pool feeding the worker.

use std::collections::HashMap;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;
use sport_primitives::events::NewTxsEvent;
use sport_primitives::transaction::Transaction;
use sport_primitives::Address;
use tokio::sync::broadcast;

/// The injected pool. `pending` returns, per sender, the executable
/// transactions in ascending nonce order; the worker re-sorts them by
/// effective price across senders.
#[cfg_attr(test, automock)]
pub trait TransactionPool: Send + Sync {
    fn pending(&self) -> HashMap<Address, Vec<Arc<Transaction>>>;

    fn subscribe_new_txs(&self) -> broadcast::Receiver<NewTxsEvent>;
}
