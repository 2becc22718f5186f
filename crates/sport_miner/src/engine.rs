//! Contract of the injected consensus engine.

use std::sync::Arc;

#[cfg(test)]
use mockall::automock;
use sport_primitives::block::{Block, Header};
use sport_primitives::receipt::Receipt;
use sport_primitives::state::AccountState;
use sport_primitives::transaction::Transaction;
use thiserror::Error;

use crate::chain::Chain;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("failed to prepare header: {0}")]
    Prepare(String),
    #[error("failed to finalize block: {0}")]
    Finalize(String),
    #[error("failed to start engine: {0}")]
    Start(String),
}

/// Capability an engine may expose to be told about new chain heads before
/// the worker opens the next cycle.
pub trait ChainHeadHandler: Send + Sync {
    fn new_chain_head(&self);
}

/// The injected consensus engine.
///
/// `chain_head_handler` is optional: engines that drive their own round
/// state off head notifications return `Some`, others keep the default.
#[cfg_attr(test, automock)]
pub trait ConsensusEngine: Send + Sync {
    /// Fill the consensus fields of a header under construction.
    fn prepare(&self, chain: &dyn Chain, header: &mut Header) -> EngineResult<()>;

    /// Assemble the final candidate block for sealing.
    fn finalize(
        &self,
        chain: &dyn Chain,
        header: &Header,
        state: &mut dyn AccountState,
        txs: &[Arc<Transaction>],
        uncles: &[Header],
        receipts: &[Receipt],
    ) -> EngineResult<Block>;

    fn start(&self, chain: Arc<dyn Chain>) -> EngineResult<()>;

    fn stop(&self);

    fn chain_head_handler(&self) -> Option<Arc<dyn ChainHeadHandler>> {
        None
    }
}
