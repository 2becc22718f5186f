use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::sync::Arc;

use alloy_primitives::Address;
use tracing::trace;

use crate::signer::Signer;
use crate::transaction::Transaction;

/// Head transaction of one account in the price heap.
struct TxHead {
    tx: Arc<Transaction>,
    sender: Address,
}

impl PartialEq for TxHead {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TxHead {}

impl PartialOrd for TxHead {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TxHead {
    fn cmp(&self, other: &Self) -> Ordering {
        // Highest gas price wins; the sender address breaks ties so the
        // order is deterministic across runs.
        self.tx
            .gas_price
            .cmp(&other.tx.gas_price)
            .then_with(|| other.sender.cmp(&self.sender))
    }
}

/// The price-and-nonce ordered view over the pool's pending transactions.
///
/// Among transactions of one sender the order is strictly ascending nonce;
/// across senders the highest effective gas price is served first. The
/// committer walks it with [`peek`](Self::peek) and then either
/// [`shift`](Self::shift) (advance within the account) or
/// [`pop`](Self::pop) (drop the whole account for this block).
pub struct TransactionsByPriceAndNonce {
    heads: BinaryHeap<TxHead>,
    txs: HashMap<Address, VecDeque<Arc<Transaction>>>,
}

impl TransactionsByPriceAndNonce {
    /// Build the ordered view. Accounts whose head transaction does not
    /// recover to the claimed sender are dropped wholesale.
    pub fn new(signer: &Signer, pending: HashMap<Address, Vec<Arc<Transaction>>>) -> Self {
        let mut heads = BinaryHeap::with_capacity(pending.len());
        let mut txs = HashMap::with_capacity(pending.len());
        for (sender, mut account_txs) in pending {
            account_txs.sort_by_key(|tx| tx.nonce);
            let mut queue: VecDeque<_> = account_txs.into();
            let Some(head) = queue.pop_front() else {
                continue;
            };
            match signer.sender(&head) {
                Ok(recovered) if recovered == sender => {
                    heads.push(TxHead { tx: head, sender });
                    txs.insert(sender, queue);
                }
                _ => {
                    trace!(%sender, "dropping account with unrecoverable head transaction");
                }
            }
        }
        Self { heads, txs }
    }

    /// The best transaction, or `None` when exhausted.
    pub fn peek(&self) -> Option<&Arc<Transaction>> {
        self.heads.peek().map(|head| &head.tx)
    }

    /// Replace the current best with the next transaction from the same
    /// account, if any.
    pub fn shift(&mut self) {
        let Some(head) = self.heads.pop() else {
            return;
        };
        if let Some(next) = self.txs.get_mut(&head.sender).and_then(VecDeque::pop_front) {
            self.heads.push(TxHead { tx: next, sender: head.sender });
        } else {
            self.txs.remove(&head.sender);
        }
    }

    /// Remove the current best and everything else from its account.
    pub fn pop(&mut self) {
        if let Some(head) = self.heads.pop() {
            self.txs.remove(&head.sender);
        }
    }
}
