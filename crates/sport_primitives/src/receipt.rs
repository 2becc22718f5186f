use alloy_primitives::{Address, Bytes, B256};

/// A log emitted during execution. `block_hash` stays unset until the
/// sealed block is known; the result writer backfills it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub tx_hash: B256,
    pub tx_index: usize,
    pub block_hash: Option<B256>,
}

/// Execution receipt of a single transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: B256,
    pub success: bool,
    pub gas_used: u64,
    pub cumulative_gas_used: u64,
    pub logs: Vec<Log>,
}
