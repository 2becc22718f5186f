//! Metric names recorded by the worker and the result writer.

use metrics::{describe_counter, describe_gauge};

pub const SPORT_MINER_CYCLES: &str = "sport_miner_cycles";
pub const SPORT_MINER_TXS_INCLUDED: &str = "sport_miner_txs_included";
pub const SPORT_MINER_FULL_BLOCKS: &str = "sport_miner_full_blocks";
pub const SPORT_MINER_UNCLES_INCLUDED: &str = "sport_miner_uncles_included";
pub const SPORT_MINER_SEALED_BLOCKS_WRITTEN: &str = "sport_miner_sealed_blocks_written";
pub const SPORT_MINER_AT_WORK: &str = "sport_miner_at_work";

pub(crate) fn register_metrics() {
    describe_counter!(SPORT_MINER_CYCLES, "The total number of assembly cycles committed");
    describe_counter!(
        SPORT_MINER_TXS_INCLUDED,
        "The total number of transactions included across cycles"
    );
    describe_counter!(
        SPORT_MINER_FULL_BLOCKS,
        "The number of cycles that ended because the gas pool was exhausted"
    );
    describe_counter!(SPORT_MINER_UNCLES_INCLUDED, "The total number of uncles committed");
    describe_counter!(
        SPORT_MINER_SEALED_BLOCKS_WRITTEN,
        "The number of sealed blocks written to the chain"
    );
    describe_gauge!(SPORT_MINER_AT_WORK, "The number of sealing tasks currently outstanding");
}
