use pretty_assertions::assert_eq;
use sport_primitives::B256;

use crate::config::MinerConfig;
use crate::test_utils::worker_harness;
use crate::unconfirmed::UnconfirmedBlocks;

#[test]
fn blocks_stay_tracked_until_buried_deep_enough() {
    let harness = worker_harness(MinerConfig::default(), 12);
    let mut unconfirmed = UnconfirmedBlocks::new(harness.chain.clone(), 5);

    let canonical = harness.chain.blocks()[3].hash();
    unconfirmed.insert(3, canonical);
    assert_eq!(unconfirmed.len(), 1);

    // Depth not reached yet.
    unconfirmed.shift(7);
    assert_eq!(unconfirmed.len(), 1);

    // Buried five deep: confirmed against the canonical chain and dropped.
    unconfirmed.shift(8);
    assert!(unconfirmed.is_empty());
}

#[test]
fn side_forks_are_reported_and_dropped() {
    let harness = worker_harness(MinerConfig::default(), 12);
    let mut unconfirmed = UnconfirmedBlocks::new(harness.chain.clone(), 5);

    // A hash that never made the canonical chain.
    unconfirmed.insert(3, B256::repeat_byte(0xaa));
    unconfirmed.shift(8);
    assert!(unconfirmed.is_empty());
}

#[test]
fn insert_shifts_older_entries_first() {
    let harness = worker_harness(MinerConfig::default(), 12);
    let mut unconfirmed = UnconfirmedBlocks::new(harness.chain.clone(), 5);

    unconfirmed.insert(1, harness.chain.blocks()[1].hash());
    unconfirmed.insert(2, harness.chain.blocks()[2].hash());
    // Inserting at height 9 first drains everything buried 5 deep.
    unconfirmed.insert(9, harness.chain.blocks()[9].hash());
    assert_eq!(unconfirmed.len(), 1);
}
