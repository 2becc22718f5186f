use alloy_primitives::Bytes;
use serde::{Deserialize, Serialize};

/// Configuration of the block-assembly worker.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct MinerConfig {
    /// Lower bound the block gas limit is steered towards.
    pub gas_floor: u64,
    /// Upper bound the block gas limit is steered towards.
    pub gas_ceil: u64,
    /// Extra data stamped into produced headers.
    pub extra: Bytes,
    /// Height below which a new-transaction event may not open a fresh
    /// cycle while mining; suppresses empty-block churn at chain genesis.
    pub min_blocks_empty_mining: u64,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            gas_floor: 8_000_000,
            gas_ceil: 8_000_000,
            extra: Bytes::new(),
            min_blocks_empty_mining: 10,
        }
    }
}
