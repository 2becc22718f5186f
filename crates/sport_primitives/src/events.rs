use std::sync::Arc;

use alloy_primitives::B256;

use crate::block::Block;
use crate::receipt::Log;
use crate::transaction::Transaction;

/// New pending transactions entered the pool.
#[derive(Clone, Debug)]
pub struct NewTxsEvent {
    pub txs: Vec<Arc<Transaction>>,
}

/// The canonical head advanced.
#[derive(Clone, Debug)]
pub struct ChainHeadEvent {
    pub block: Arc<Block>,
}

/// A block was imported on a side chain.
#[derive(Clone, Debug)]
pub struct ChainSideEvent {
    pub block: Arc<Block>,
}

/// A block was written, canonical or not.
#[derive(Clone, Debug)]
pub struct ChainEvent {
    pub block: Arc<Block>,
    pub hash: B256,
    pub logs: Vec<Log>,
}

/// A block sealed by this node was written to the chain.
#[derive(Clone, Debug)]
pub struct NewMinedBlockEvent {
    pub block: Arc<Block>,
}

/// Logs produced while assembling the pending block.
#[derive(Clone, Debug)]
pub struct PendingLogsEvent {
    pub logs: Vec<Log>,
}

/// The pending state changed (at least one transaction was committed).
#[derive(Clone, Copy, Debug)]
pub struct PendingStateEvent;
