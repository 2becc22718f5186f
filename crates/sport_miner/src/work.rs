//! The per-cycle mutable environment.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use sport_primitives::block::{Block, Header};
use sport_primitives::chain_config::ChainConfig;
use sport_primitives::execution::GasPool;
use sport_primitives::receipt::Receipt;
use sport_primitives::signer::Signer;
use sport_primitives::state::AccountState;
use sport_primitives::transaction::Transaction;
use sport_primitives::B256;

/// Everything one assembly cycle mutates: the header under construction,
/// the pair of state handles, the uncle bookkeeping sets, and the
/// transactions committed so far. Exactly one of these is current per
/// cycle; the worker swaps it atomically.
pub struct Work {
    pub(crate) chain_config: Arc<ChainConfig>,
    pub(crate) signer: Signer,

    pub(crate) state: Box<dyn AccountState>,
    pub(crate) vault_state: Box<dyn AccountState>,

    /// Hashes of the 7 most recent ancestors, for uncle parent checks.
    pub(crate) ancestors: HashSet<B256>,
    /// Ancestors plus their uncles; anything here is already absorbed.
    pub(crate) family: HashSet<B256>,
    /// Uncles accepted this cycle.
    pub(crate) uncles: HashSet<B256>,

    pub(crate) header: Header,
    pub(crate) txs: Vec<Arc<Transaction>>,
    pub(crate) receipts: Vec<Receipt>,
    pub(crate) vault_receipts: Vec<Receipt>,

    pub(crate) gas_pool: GasPool,
    /// Number of transactions successfully included this cycle.
    pub(crate) tcount: usize,

    /// The finalized candidate, once the engine produced it.
    pub(crate) block: Option<Arc<Block>>,

    pub(crate) created_at: Instant,
}

impl Work {
    pub(crate) fn new(
        chain_config: Arc<ChainConfig>,
        header: Header,
        state: Box<dyn AccountState>,
        vault_state: Box<dyn AccountState>,
    ) -> Self {
        let signer = Signer::new(&chain_config, header.number);
        let gas_pool = GasPool::new(header.gas_limit);
        Self {
            chain_config,
            signer,
            state,
            vault_state,
            ancestors: HashSet::new(),
            family: HashSet::new(),
            uncles: HashSet::new(),
            header,
            txs: Vec::new(),
            receipts: Vec::new(),
            vault_receipts: Vec::new(),
            gas_pool,
            tcount: 0,
            block: None,
            created_at: Instant::now(),
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn block(&self) -> Option<&Arc<Block>> {
        self.block.as_ref()
    }

    pub fn txs(&self) -> &[Arc<Transaction>] {
        &self.txs
    }

    pub fn receipts(&self) -> &[Receipt] {
        &self.receipts
    }

    pub fn vault_receipts(&self) -> &[Receipt] {
        &self.vault_receipts
    }

    pub fn tx_count(&self) -> usize {
        self.tcount
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }
}

impl Clone for Work {
    fn clone(&self) -> Self {
        Self {
            chain_config: self.chain_config.clone(),
            signer: self.signer,
            state: self.state.boxed_copy(),
            vault_state: self.vault_state.boxed_copy(),
            ancestors: self.ancestors.clone(),
            family: self.family.clone(),
            uncles: self.uncles.clone(),
            header: self.header.clone(),
            txs: self.txs.clone(),
            receipts: self.receipts.clone(),
            vault_receipts: self.vault_receipts.clone(),
            gas_pool: self.gas_pool.clone(),
            tcount: self.tcount,
            block: self.block.clone(),
            created_at: self.created_at,
        }
    }
}
