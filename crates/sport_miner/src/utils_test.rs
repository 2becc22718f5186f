use pretty_assertions::assert_eq;
use sport_primitives::block::{Block, Header};

use crate::utils::{calc_gas_limit, MIN_GAS_LIMIT};

fn parent(gas_limit: u64, gas_used: u64) -> Block {
    let header = Header { number: 1, gas_limit, gas_used, ..Default::default() };
    Block::new(header, Vec::new(), Vec::new())
}

#[test]
fn empty_parent_decays_towards_the_floor() {
    let limit = calc_gas_limit(&parent(8_000_000, 0), 4_000_000, 8_000_000);
    // No usage: the limit drops by parent/1024 - 1.
    assert_eq!(limit, 8_000_000 - (8_000_000 / 1024 - 1));
}

#[test]
fn full_parent_raises_the_limit() {
    let limit = calc_gas_limit(&parent(8_000_000, 8_000_000), 4_000_000, 10_000_000);
    assert!(limit > 8_000_000);
}

#[test]
fn limit_climbs_towards_a_higher_floor() {
    // Parent below the floor: move up by at most one decay step.
    let limit = calc_gas_limit(&parent(5_000_000, 0), 8_000_000, 8_000_000);
    assert_eq!(limit, 5_000_000 + (5_000_000 / 1024 - 1));
}

#[test]
fn limit_descends_towards_a_lower_ceiling() {
    let limit = calc_gas_limit(&parent(8_000_000, 8_000_000), 1_000_000, 5_000_000);
    assert_eq!(limit, 8_000_000 - (8_000_000 / 1024 - 1));
}

#[test]
fn floor_capping_does_not_overshoot() {
    // One decay step away from the floor: land exactly on it.
    let limit = calc_gas_limit(&parent(7_999_000, 0), 8_000_000, 8_000_000);
    assert_eq!(limit, 8_000_000);
}

#[test]
fn never_below_the_protocol_minimum() {
    let limit = calc_gas_limit(&parent(MIN_GAS_LIMIT, 0), 0, MIN_GAS_LIMIT);
    assert!(limit >= MIN_GAS_LIMIT);
}
