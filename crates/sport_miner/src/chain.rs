//! Contract of the blockchain the worker assembles on top of.

use std::sync::Arc;

#[cfg(test)]
use mockall::automock;
use sport_primitives::block::{Block, Header};
use sport_primitives::events::{ChainEvent, ChainHeadEvent, ChainSideEvent};
use sport_primitives::receipt::{Log, Receipt};
use sport_primitives::state::AccountState;
use sport_primitives::B256;
use thiserror::Error;
use tokio::sync::broadcast;

pub type ChainResult<T> = Result<T, ChainError>;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ChainError {
    #[error("state unavailable for root {0}")]
    StateUnavailable(B256),
    #[error("{0}")]
    Other(String),
}

/// Disposition of a written block relative to the canonical chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteStatus {
    Canonical,
    NonCanonical,
}

/// An event published through the chain's own feed after a sealed block is
/// written.
#[derive(Clone, Debug)]
pub enum ChainFeedEvent {
    Chain(ChainEvent),
    Head(ChainHeadEvent),
}

/// The injected chain. Reads serve cycle construction; writes land sealed
/// blocks. Subscription receivers close when the chain shuts down, which
/// the worker treats as a terminal subscription error.
#[cfg_attr(test, automock)]
pub trait Chain: Send + Sync {
    fn current_block(&self) -> Arc<Block>;

    /// Up to `max` blocks walking back from `hash` (inclusive).
    fn get_blocks_from_hash(&self, hash: B256, max: usize) -> Vec<Arc<Block>>;

    /// The canonical header at `number`, if any.
    fn header_by_number(&self, number: u64) -> Option<Header>;

    fn has_bad_block(&self, hash: B256) -> bool;

    /// The public and vault state handles at `root`.
    fn state_at(&self, root: B256)
        -> ChainResult<(Box<dyn AccountState>, Box<dyn AccountState>)>;

    fn write_block_with_state(
        &self,
        block: &Block,
        receipts: &[Receipt],
        state: &mut dyn AccountState,
    ) -> ChainResult<WriteStatus>;

    /// Persist the vault state root reached at `block_root`.
    fn write_vault_state_root(&self, block_root: B256, vault_root: B256) -> ChainResult<()>;

    fn post_chain_events(&self, events: Vec<ChainFeedEvent>, logs: Vec<Log>);

    fn subscribe_chain_head(&self) -> broadcast::Receiver<ChainHeadEvent>;
    fn subscribe_chain_side(&self) -> broadcast::Receiver<ChainSideEvent>;
}
