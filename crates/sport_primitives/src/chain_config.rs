use alloy_primitives::Bytes;
use serde::{Deserialize, Serialize};

/// Number of blocks after the DAO fork during which the extra-data override
/// applies.
pub const DAO_FORK_EXTRA_RANGE: u64 = 10;

/// The reserved extra-data a pro-fork miner stamps into headers inside the
/// override window (the ASCII bytes of `dao-hard-fork`).
pub fn dao_fork_block_extra() -> Bytes {
    Bytes::from_static(b"dao-hard-fork")
}

/// Parameters of the SPORT (BFT) consensus flavor.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SportConfig {
    /// Minimum seconds between two consecutive blocks.
    pub block_period: u64,
    /// Milliseconds a proposal may remain unanswered before a round change.
    pub request_timeout: u64,
}

impl Default for SportConfig {
    fn default() -> Self {
        Self { block_period: 1, request_timeout: 10_000 }
    }
}

/// Chain-wide configuration: the chain id and the fork schedule the worker
/// consults while preparing headers and recovering senders.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    /// Height at which EIP-155 replay protection activates.
    pub eip155_block: Option<u64>,
    /// Height at which EIP-158 empty-account clearing activates.
    pub eip158_block: Option<u64>,
    pub dao_fork_block: Option<u64>,
    pub dao_fork_support: bool,
    /// Present when the chain runs the SPORT BFT engine.
    pub sport: Option<SportConfig>,
}

impl ChainConfig {
    pub fn is_eip155(&self, number: u64) -> bool {
        self.eip155_block.is_some_and(|block| block <= number)
    }

    pub fn is_eip158(&self, number: u64) -> bool {
        self.eip158_block.is_some_and(|block| block <= number)
    }

    pub fn is_sport(&self) -> bool {
        self.sport.is_some()
    }
}
