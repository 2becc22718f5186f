use std::sync::atomic::Ordering;
use std::sync::Arc;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use rstest::rstest;
use sport_primitives::events::NewTxsEvent;
use sport_primitives::test_utils::{address_of, block_at, signed_tx, test_key};
use sport_primitives::U256;

use crate::chain::Chain;
use crate::config::MinerConfig;
use crate::test_utils::{worker_harness, TestAgent, TEST_CHAIN_ID};
use crate::worker::{commit_uncle, now_unix, UncleError};

#[tokio::test]
async fn cycle_builds_a_candidate_on_top_of_the_head() {
    let harness = worker_harness(MinerConfig::default(), 4);
    let head = harness.chain.current_block();

    harness.worker.commit_new_work(now_unix()).await;

    let current = harness.worker.current_mu().lock().unwrap();
    let work = current.as_ref().expect("cycle installed");
    let block = work.block().expect("candidate finalized");
    assert_eq!(block.number(), head.number() + 1);
    assert_eq!(block.parent_hash(), head.hash());
    assert!(block.time() > head.time());
}

#[tokio::test]
async fn cycle_packs_pending_transactions() {
    let harness = worker_harness(MinerConfig::default(), 4);
    let key = test_key(1);
    let sender = address_of(&key);
    harness.chain.seed_account(sender, U256::from(10_000_000_000u64), 0);
    harness.pool.add_pending(
        sender,
        vec![
            signed_tx(&key, 0, 10, 21_000, Some(TEST_CHAIN_ID)),
            signed_tx(&key, 1, 10, 21_000, Some(TEST_CHAIN_ID)),
        ],
    );

    harness.worker.commit_new_work(now_unix()).await;

    let current = harness.worker.current_mu().lock().unwrap();
    let work = current.as_ref().unwrap();
    assert_eq!(work.tx_count(), 2);
    assert_eq!(work.block().unwrap().transactions().len(), 2);
}

#[derive(Clone, Copy, Debug)]
enum CycleFailure {
    Prepare,
    StateAt,
    Finalize,
}

#[rstest]
#[case::prepare(CycleFailure::Prepare)]
#[case::missing_parent_state(CycleFailure::StateAt)]
#[case::finalize(CycleFailure::Finalize)]
#[tokio::test]
async fn collaborator_failure_aborts_the_cycle(#[case] failure: CycleFailure) {
    let harness = worker_harness(MinerConfig::default(), 4);
    match failure {
        CycleFailure::Prepare => harness.engine.fail_prepare.store(true, Ordering::SeqCst),
        CycleFailure::StateAt => harness.chain.fail_state_at.store(true, Ordering::SeqCst),
        CycleFailure::Finalize => harness.engine.fail_finalize.store(true, Ordering::SeqCst),
    }

    harness.worker.commit_new_work(now_unix()).await;

    assert!(harness.worker.current_mu().lock().unwrap().is_none());
}

#[tokio::test]
async fn snapshot_serves_pending_reads_while_not_mining() {
    let harness = worker_harness(MinerConfig::default(), 4);
    assert!(harness.worker.pending_block().is_none());

    harness.worker.commit_new_work(now_unix()).await;

    let (block, _state, _vault) = harness.worker.pending().expect("snapshot available");
    assert_eq!(block.number(), harness.chain.current_block().number() + 1);
    // Not mining, so no reward recipient is stamped into the snapshot.
    assert_eq!(block.header().coinbase, sport_primitives::Address::ZERO);
}

/// Side blocks whose parent is a recent ancestor become uncles; duplicates
/// and unknown parents are rejected with matchable reasons.
#[tokio::test]
async fn uncle_validation_follows_ancestry_rules() {
    let harness = worker_harness(MinerConfig::default(), 4);
    let blocks = harness.chain.blocks();
    // Side block at the parent height, descending from an ancestor.
    let uncle = block_at(3, blocks[2].hash());
    let unknown_parent = block_at(3, sport_primitives::B256::repeat_byte(0xee));

    harness.worker.commit_new_work(now_unix()).await;
    let mut current = harness.worker.current_mu().lock().unwrap();
    let work = current.as_mut().unwrap();

    assert_matches!(commit_uncle(work, uncle.header()), Ok(()));
    assert_matches!(commit_uncle(work, uncle.header()), Err(UncleError::NotUnique));
    assert_matches!(
        commit_uncle(work, unknown_parent.header()),
        Err(UncleError::ParentUnknown(hash)) if hash == unknown_parent.parent_hash()
    );
}

#[tokio::test]
async fn ancestors_are_rejected_as_uncles() {
    let harness = worker_harness(MinerConfig::default(), 4);
    let blocks = harness.chain.blocks();

    harness.worker.commit_new_work(now_unix()).await;
    let mut current = harness.worker.current_mu().lock().unwrap();
    let work = current.as_mut().unwrap();

    // A canonical ancestor is already family.
    assert_matches!(
        commit_uncle(work, blocks[2].header()),
        Err(UncleError::AlreadyInFamily(_))
    );
}

#[tokio::test]
async fn at_most_two_uncles_enter_a_block() {
    let harness = worker_harness(MinerConfig::default(), 4);
    let blocks = harness.chain.blocks();
    {
        let mut uncles = harness.worker.possible_uncles().lock().unwrap();
        for seed in 1u64..=3 {
            // Vary the time so the three siblings hash differently.
            let mut header = sport_primitives::test_utils::header_at(3, blocks[2].hash());
            header.time += seed;
            let side = Arc::new(sport_primitives::block::Block::new(header, Vec::new(), Vec::new()));
            uncles.insert(side.hash(), side);
        }
    }

    harness.worker.commit_new_work(now_unix()).await;

    let current = harness.worker.current_mu().lock().unwrap();
    let block = current.as_ref().unwrap().block().unwrap().clone();
    assert_eq!(block.uncles().len(), 2);
}

#[tokio::test]
async fn stale_side_blocks_are_evicted_from_the_uncle_map() {
    let harness = worker_harness(MinerConfig::default(), 12);
    {
        let mut uncles = harness.worker.possible_uncles().lock().unwrap();
        let stale = Arc::new(block_at(1, sport_primitives::B256::repeat_byte(1)));
        uncles.insert(stale.hash(), stale);
    }

    harness.worker.commit_new_work(now_unix()).await;

    assert!(harness.worker.possible_uncles().lock().unwrap().is_empty());
}

/// With the SPORT flavor and mining on, a new-transaction event opens a
/// fresh cycle only once the candidate height reaches the empty-mining
/// floor.
#[tokio::test]
async fn new_txs_respect_the_empty_mining_floor() {
    let config = MinerConfig { min_blocks_empty_mining: 10, ..Default::default() };
    // Head 4: the candidate is block 5, below the floor.
    let harness = worker_harness(config, 5);
    harness.worker.start();
    harness.worker.commit_new_work(now_unix()).await;
    let cycles_before = harness.engine.prepare_calls.load(Ordering::SeqCst);

    harness.worker.handle_new_txs(NewTxsEvent { txs: Vec::new() }).await;
    assert_eq!(harness.engine.prepare_calls.load(Ordering::SeqCst), cycles_before);

    // Head 9: the candidate is block 10, at the floor.
    harness.chain.extend_to(10);
    harness.worker.commit_new_work(now_unix()).await;
    let cycles_before = harness.engine.prepare_calls.load(Ordering::SeqCst);

    harness.worker.handle_new_txs(NewTxsEvent { txs: Vec::new() }).await;
    assert_eq!(harness.engine.prepare_calls.load(Ordering::SeqCst), cycles_before + 1);
}

#[tokio::test]
async fn new_txs_extend_the_idle_cycle_when_not_mining() {
    let harness = worker_harness(MinerConfig::default(), 4);
    let key = test_key(1);
    let sender = address_of(&key);
    harness.chain.seed_account(sender, U256::from(10_000_000_000u64), 0);

    harness.worker.commit_new_work(now_unix()).await;
    harness
        .worker
        .handle_new_txs(NewTxsEvent {
            txs: vec![signed_tx(&key, 0, 10, 21_000, Some(TEST_CHAIN_ID))],
        })
        .await;

    let current = harness.worker.current_mu().lock().unwrap();
    assert_eq!(current.as_ref().unwrap().tx_count(), 1);
}

#[tokio::test]
async fn start_brings_up_engine_and_agents() {
    let harness = worker_harness(MinerConfig::default(), 4);
    let agent = TestAgent::new();
    harness.worker.register(agent.clone());

    harness.worker.start();
    assert!(harness.worker.is_mining());
    assert!(harness.engine.started.load(Ordering::SeqCst));
    assert!(agent.started.load(Ordering::SeqCst));
    assert!(agent.results.lock().unwrap().is_some());

    harness.worker.stop();
    assert!(!harness.worker.is_mining());
    assert!(harness.engine.stopped.load(Ordering::SeqCst));
    assert!(agent.stopped.load(Ordering::SeqCst));
}

#[tokio::test]
#[should_panic(expected = "could not start SPORT consensus engine")]
async fn start_panics_when_the_engine_refuses() {
    let harness = worker_harness(MinerConfig::default(), 4);
    harness.engine.fail_start.store(true, Ordering::SeqCst);
    harness.worker.start();
}

#[tokio::test]
async fn mining_cycle_fans_work_out_to_agents() {
    let harness = worker_harness(MinerConfig::default(), 4);
    let agent = TestAgent::new();
    harness.worker.register(agent.clone());
    harness.worker.start();

    harness.worker.commit_new_work(now_unix()).await;

    let delivered = agent.try_recv_work().expect("work delivered");
    assert!(delivered.block().is_some());
    assert_eq!(harness.worker.at_work.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn update_loop_reacts_to_head_and_side_events() {
    let harness = worker_harness(MinerConfig::default(), 4);
    harness.worker.run().await;
    let cycles = harness.engine.prepare_calls.load(Ordering::SeqCst);

    harness.chain.extend_to(5);
    harness.chain.publish_head(harness.chain.current_block());
    let side = Arc::new(block_at(4, harness.chain.blocks()[3].hash()));
    harness.chain.publish_side(side.clone());

    // Wait for the update task to absorb both events.
    tokio::time::timeout(std::time::Duration::from_secs(1), async {
        loop {
            let advanced = harness.engine.prepare_calls.load(Ordering::SeqCst) > cycles
                && harness.worker.possible_uncles().lock().unwrap().contains_key(&side.hash());
            if advanced {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("update loop handled the events");
}
