//! Application of pending transactions onto the cycle's dual states.

use std::sync::Arc;

use metrics::counter;
use sport_primitives::events::{PendingLogsEvent, PendingStateEvent};
use sport_primitives::execution::{ExecutionError, TX_GAS};
use sport_primitives::receipt::Log;
use sport_primitives::state::AccountState;
use sport_primitives::transaction::Transaction;
use sport_primitives::tx_ordering::TransactionsByPriceAndNonce;
use sport_primitives::{Address, B256};
use tracing::{debug, trace};

use crate::event_mux::EventMux;
use crate::metrics::{SPORT_MINER_FULL_BLOCKS, SPORT_MINER_TXS_INCLUDED};
use crate::transaction_executor::{TransactionExecutor, TxOutput};
use crate::work::Work;

impl Work {
    /// Walk the price/nonce-ordered pending set and commit what fits.
    ///
    /// Every iteration either pops or shifts the iterator, so the loop
    /// terminates. On any executor error both states are reverted to their
    /// pre-transaction snapshots; the error decides whether the
    /// transaction alone or its whole account is skipped for this block.
    /// Unknown errors shift rather than pop, so a transaction that fails
    /// deterministically for the same sender can come back next cycle.
    pub fn commit_transactions(
        &mut self,
        mux: &Arc<EventMux>,
        txs: &mut TransactionsByPriceAndNonce,
        executor: &dyn TransactionExecutor,
        coinbase: Address,
    ) {
        let mut coalesced_logs: Vec<Log> = Vec::new();

        loop {
            // If we don't have enough gas for any further transactions
            // then we're done.
            if self.gas_pool.gas() < TX_GAS {
                trace!(have = self.gas_pool.gas(), want = TX_GAS, "not enough gas for further transactions");
                counter!(SPORT_MINER_FULL_BLOCKS).increment(1);
                break;
            }
            // Retrieve the next transaction and abort if all done.
            let Some(tx) = txs.peek().cloned() else {
                break;
            };
            // Recovery may fail here; the sender is only used for logging
            // and the executor re-derives it under its own rules.
            let from = self.signer.sender(&tx).unwrap_or_default();

            // If the transaction is replay protected before the replay
            // protection fork, start ignoring the sender until we reach
            // the fork. Vault transactions are exempt.
            if tx.protected() && !self.chain_config.is_eip155(self.header.number) && !tx.is_vault {
                trace!(hash = %tx.hash(), "ignoring replay protected transaction");
                txs.pop();
                continue;
            }

            self.state.prepare(tx.hash(), B256::ZERO, self.tcount);
            self.vault_state.prepare(tx.hash(), B256::ZERO, self.tcount);

            match self.commit_transaction(&tx, executor, coinbase) {
                Err(ExecutionError::GasLimitReached) => {
                    // Pop the out-of-gas transaction without shifting in
                    // the next from the account; the pool keeps them for
                    // a later block.
                    trace!(sender = %from, "gas limit exceeded for current block");
                    txs.pop();
                }
                Err(ExecutionError::NonceTooLow) => {
                    // Head notification race between pool and miner.
                    trace!(sender = %from, nonce = tx.nonce, "skipping transaction with low nonce");
                    txs.shift();
                }
                Err(ExecutionError::NonceTooHigh) => {
                    // Reorg race; the account cannot progress this block.
                    trace!(sender = %from, nonce = tx.nonce, "skipping account with high nonce");
                    txs.pop();
                }
                Ok(logs) => {
                    coalesced_logs.extend(logs);
                    self.tcount += 1;
                    txs.shift();
                }
                Err(err) => {
                    debug!(hash = %tx.hash(), %err, "transaction failed, account skipped");
                    txs.shift();
                }
            }
        }

        counter!(SPORT_MINER_TXS_INCLUDED).increment(self.tcount as u64);

        if !coalesced_logs.is_empty() || self.tcount > 0 {
            // Copy the logs before publishing: the state retains the
            // originals and upgrades them in place once the block seals,
            // which must not race the subscribers of the pending feed.
            let logs = coalesced_logs.clone();
            let tcount = self.tcount;
            let mux = mux.clone();
            tokio::spawn(async move {
                if !logs.is_empty() {
                    mux.post_pending_logs(PendingLogsEvent { logs });
                }
                if tcount > 0 {
                    mux.post_pending_state(PendingStateEvent);
                }
            });
        }
    }

    /// Apply one transaction, reverting both states on failure. Returns
    /// the logs the transaction produced across both ledgers.
    fn commit_transaction(
        &mut self,
        tx: &Arc<Transaction>,
        executor: &dyn TransactionExecutor,
        coinbase: Address,
    ) -> Result<Vec<Log>, ExecutionError> {
        let snapshot = self.state.snapshot();
        let vault_snapshot = self.vault_state.snapshot();

        let output = executor.apply_transaction(
            &self.chain_config,
            coinbase,
            &mut self.gas_pool,
            self.state.as_mut(),
            self.vault_state.as_mut(),
            &mut self.header,
            tx,
        );
        let TxOutput { receipt, vault_receipt, gas_used: _ } = match output {
            Ok(output) => output,
            Err(err) => {
                self.state.revert_to_snapshot(snapshot);
                self.vault_state.revert_to_snapshot(vault_snapshot);
                return Err(err);
            }
        };

        self.txs.push(tx.clone());
        let mut logs = receipt.logs.clone();
        self.receipts.push(receipt);
        if let Some(vault_receipt) = vault_receipt {
            logs.extend(vault_receipt.logs.iter().cloned());
            self.vault_receipts.push(vault_receipt);
        }
        Ok(logs)
    }
}
