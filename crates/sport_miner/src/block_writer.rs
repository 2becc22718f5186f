//! The result writer: lands sealed candidates on the chain.

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use metrics::{counter, gauge};
use sport_primitives::block::Block;
use sport_primitives::events::{ChainEvent, ChainHeadEvent, NewMinedBlockEvent};
use sport_primitives::receipt::Receipt;
use sport_primitives::state::AccountState;
use sport_primitives::B256;
use tokio::sync::mpsc;
use tracing::error;

use crate::agent::SealResult;
use crate::chain::{ChainFeedEvent, WriteStatus};
use crate::metrics::{SPORT_MINER_AT_WORK, SPORT_MINER_SEALED_BLOCKS_WRITTEN};
use crate::work::Work;
use crate::worker::Worker;

impl Worker {
    /// Drain the seal-result channel until every agent sender is gone.
    pub(crate) async fn wait(self: Arc<Self>, mut results: mpsc::Receiver<Option<SealResult>>) {
        while let Some(result) = results.recv().await {
            let outstanding = self.at_work.fetch_sub(1, Ordering::SeqCst) - 1;
            gauge!(SPORT_MINER_AT_WORK).set(outstanding as f64);

            let Some(SealResult { mut work, block }) = result else {
                continue;
            };
            self.write_sealed_block(&mut work, Arc::new(block));
        }
    }

    /// Finalize one sealed block: backfill its hash into every log, commit
    /// the vault state, merge the receipt sequences, write to the chain,
    /// and publish the insertion events.
    pub(crate) fn write_sealed_block(&self, work: &mut Work, block: Arc<Block>) {
        let block_hash = block.hash();

        // The block hash only exists now, after sealing; upgrade the logs
        // created while the receipts were pending.
        for receipt in work.receipts.iter_mut().chain(work.vault_receipts.iter_mut()) {
            for log in &mut receipt.logs {
                log.block_hash = Some(block_hash);
            }
        }
        for log in work.state.logs_mut().iter_mut() {
            log.block_hash = Some(block_hash);
        }
        for log in work.vault_state.logs_mut().iter_mut() {
            log.block_hash = Some(block_hash);
        }

        let vault_root = work.vault_state.commit(self.chain_config.is_eip158(block.number()));
        if let Err(err) = self.chain.write_vault_state_root(block.root(), vault_root) {
            error!(%err, "failed to persist vault state root");
        }

        let merged = merge_receipts(work.receipts(), work.vault_receipts());
        let status = match self.chain.write_block_with_state(&block, &merged, work.state.as_mut())
        {
            Ok(status) => status,
            Err(err) => {
                error!(%err, "failed writing sealed block to chain");
                return;
            }
        };
        counter!(SPORT_MINER_SEALED_BLOCKS_WRITTEN).increment(1);

        // Broadcast the block and announce the chain insertion.
        self.mux.post_new_mined_block(NewMinedBlockEvent { block: block.clone() });
        let mut logs = work.state.logs();
        logs.extend(work.vault_state.logs());
        let mut events = vec![ChainFeedEvent::Chain(ChainEvent {
            block: block.clone(),
            hash: block_hash,
            logs: logs.clone(),
        })];
        if status == WriteStatus::Canonical {
            events.push(ChainFeedEvent::Head(ChainHeadEvent { block: block.clone() }));
        }
        self.chain.post_chain_events(events, logs);

        self.unconfirmed
            .lock()
            .expect("unconfirmed lock poisoned")
            .insert(block.number(), block_hash);
    }
}

/// Merge the vault receipts into the public sequence.
///
/// The result has the public sequence's length and order; wherever a vault
/// receipt shares a transaction hash with a public one it replaces it.
/// Callers must ensure the vault hashes are a subset of the public ones;
/// an orphaned vault receipt is silently ignored.
pub fn merge_receipts(public: &[Receipt], vault: &[Receipt]) -> Vec<Receipt> {
    let by_hash: HashMap<B256, &Receipt> = vault.iter().map(|r| (r.tx_hash, r)).collect();
    public
        .iter()
        .map(|receipt| (*by_hash.get(&receipt.tx_hash).unwrap_or(&receipt)).clone())
        .collect()
}
