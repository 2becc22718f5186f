//! Tracking of locally sealed blocks until their canonical status is known.

use std::collections::VecDeque;
use std::sync::Arc;

use sport_primitives::B256;
use tracing::{info, warn};

use crate::chain::Chain;

/// How deep a block must be buried before its status is reported.
pub const MINING_LOG_AT_DEPTH: u64 = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
struct UnconfirmedBlock {
    number: u64,
    hash: B256,
}

/// A FIFO of blocks this node sealed, drained once the chain has advanced
/// far enough past them to check whether they made the canonical chain.
pub struct UnconfirmedBlocks {
    chain: Arc<dyn Chain>,
    depth: u64,
    blocks: VecDeque<UnconfirmedBlock>,
}

impl UnconfirmedBlocks {
    pub fn new(chain: Arc<dyn Chain>, depth: u64) -> Self {
        Self { chain, depth, blocks: VecDeque::new() }
    }

    /// Track a freshly sealed block.
    pub fn insert(&mut self, number: u64, hash: B256) {
        self.shift(number);
        info!(number, %hash, "mined potential block");
        self.blocks.push_back(UnconfirmedBlock { number, hash });
    }

    /// Report and drop every tracked block buried at least `depth` blocks
    /// below `height`.
    pub fn shift(&mut self, height: u64) {
        while let Some(next) = self.blocks.front() {
            if next.number + self.depth > height {
                break;
            }
            match self.chain.header_by_number(next.number) {
                Some(header) if header.hash() == next.hash => {
                    info!(number = next.number, hash = %next.hash, "block reached canonical chain");
                }
                Some(_) => {
                    warn!(number = next.number, hash = %next.hash, "block became a side fork");
                }
                None => {
                    warn!(number = next.number, hash = %next.hash, "failed to retrieve header of mined block");
                }
            }
            self.blocks.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
