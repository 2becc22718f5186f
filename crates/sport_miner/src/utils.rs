use sport_primitives::block::Block;

/// Absolute lower bound on any block gas limit.
pub const MIN_GAS_LIMIT: u64 = 5_000;

/// Divisor bounding how far the gas limit may move between blocks.
const GAS_LIMIT_BOUND_DIVISOR: u64 = 1_024;

/// Compute the gas limit of the child of `parent`, nudged towards the
/// `[floor, ceil]` corridor while never moving more than 1/1024th of the
/// parent limit per block.
pub fn calc_gas_limit(parent: &Block, gas_floor: u64, gas_ceil: u64) -> u64 {
    // contrib = (parent_gas_used * 3/2) / 1024; decay = parent_gas_limit
    // / 1024 - 1. Packing above two thirds raises the limit, below lowers
    // it.
    let contrib = (parent.gas_used() + parent.gas_used() / 2) / GAS_LIMIT_BOUND_DIVISOR;
    let decay = parent.gas_limit() / GAS_LIMIT_BOUND_DIVISOR - 1;

    let mut limit = (parent.gas_limit() - decay + contrib).max(MIN_GAS_LIMIT);
    // If we are outside our allowed corridor, strive to move towards it.
    if limit < gas_floor {
        limit = (parent.gas_limit() + decay).min(gas_floor);
    } else if limit > gas_ceil {
        limit = (parent.gas_limit() - decay).max(gas_ceil);
    }
    limit
}
