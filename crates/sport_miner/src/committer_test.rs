use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use mockall::Sequence;
use pretty_assertions::assert_eq;
use sport_primitives::chain_config::ChainConfig;
use sport_primitives::execution::ExecutionError;
use sport_primitives::receipt::Receipt;
use sport_primitives::state::AccountState;
use sport_primitives::test_utils::{address_of, sign_tx, signed_tx, test_key};
use sport_primitives::transaction::Transaction;
use sport_primitives::tx_ordering::TransactionsByPriceAndNonce;
use sport_primitives::{Address, U256};

use crate::event_mux::EventMux;
use crate::test_utils::{test_chain_config, test_work, SimpleExecutor, TEST_CHAIN_ID};
use crate::transaction_executor::{MockTransactionExecutor, TxOutput};

const COINBASE: Address = Address::repeat_byte(0xc0);
const GAS_LIMIT: u64 = 8_000_000;

fn ordered(
    work: &crate::work::Work,
    pending: HashMap<Address, Vec<Arc<Transaction>>>,
) -> TransactionsByPriceAndNonce {
    TransactionsByPriceAndNonce::new(&work.signer, pending)
}

/// Nonce ladder: account nonce 8 sees nonces {7, 8, 9}. The stale one is
/// shifted past, the other two commit.
#[tokio::test]
async fn stale_nonce_is_skipped_and_rest_commit() {
    let key = test_key(1);
    let sender = address_of(&key);
    let executor = SimpleExecutor::default();
    let mux = Arc::new(EventMux::new());

    let mut work = test_work(test_chain_config(), GAS_LIMIT, 1);
    work.state.set_nonce(sender, 8);
    work.state.add_balance(sender, U256::from(10_000_000_000u64));

    let pending = HashMap::from([(
        sender,
        vec![
            signed_tx(&key, 7, 10, 21_000, Some(TEST_CHAIN_ID)),
            signed_tx(&key, 9, 10, 21_000, Some(TEST_CHAIN_ID)),
            signed_tx(&key, 8, 10, 21_000, Some(TEST_CHAIN_ID)),
        ],
    )]);
    let mut txs = ordered(&work, pending);

    work.commit_transactions(&mux, &mut txs, &executor, COINBASE);

    assert_eq!(work.tx_count(), 2);
    let nonces: Vec<_> = work.txs().iter().map(|tx| tx.nonce).collect();
    assert_eq!(nonces, vec![8, 9]);
    assert_eq!(work.receipts().len(), 2);
}

/// Gas cap: limit 100k, three 60k transactions. Only the first fits; the
/// loop keeps going while the pool still covers an intrinsic transfer.
#[tokio::test]
async fn gas_exhaustion_pops_oversized_transactions() {
    let keys = [test_key(1), test_key(2), test_key(3)];
    let executor = SimpleExecutor::default();
    let mux = Arc::new(EventMux::new());

    let mut work = test_work(test_chain_config(), 100_000, 1);
    let mut pending = HashMap::new();
    for (i, key) in keys.iter().enumerate() {
        let sender = address_of(key);
        work.state.add_balance(sender, U256::from(10_000_000_000u64));
        // Distinct prices give a deterministic order across the senders.
        pending.insert(
            sender,
            vec![signed_tx(key, 0, 30 - i as u64 * 10, 60_000, Some(TEST_CHAIN_ID))],
        );
    }
    let mut txs = ordered(&work, pending);

    work.commit_transactions(&mux, &mut txs, &executor, COINBASE);

    assert_eq!(work.tx_count(), 1);
    assert_eq!(work.txs().len(), 1);
    let gas_total: u64 = work.receipts().iter().map(|r| r.gas_used).sum();
    assert!(gas_total <= work.header().gas_limit);
    assert_eq!(work.header().gas_used, 60_000);
}

/// Any executor error must leave both states byte-identical to their
/// pre-transaction contents.
#[tokio::test]
async fn failed_transaction_reverts_both_states() {
    let good = test_key(1);
    let bad = test_key(2);
    let executor = SimpleExecutor::default();
    let mux = Arc::new(EventMux::new());

    let mut work = test_work(test_chain_config(), GAS_LIMIT, 1);
    for key in [&good, &bad] {
        work.state.add_balance(address_of(key), U256::from(10_000_000_000u64));
    }

    // The poisoned transaction mutates both states before failing.
    let poisoned_tx = signed_tx(&bad, 0, 50, 21_000, Some(TEST_CHAIN_ID));
    executor.poison(poisoned_tx.hash());

    let pending = HashMap::from([
        (address_of(&good), vec![signed_tx(&good, 0, 10, 21_000, Some(TEST_CHAIN_ID))]),
        (address_of(&bad), vec![poisoned_tx]),
    ]);
    let mut txs = ordered(&work, pending);

    let state_before = work.state.dump();
    let vault_before = work.vault_state.dump();

    work.commit_transactions(&mux, &mut txs, &executor, COINBASE);

    // The poisoned sender's mutation is gone; the good transaction's
    // effects are the only difference from the initial dumps.
    assert_eq!(work.tx_count(), 1);
    assert_eq!(work.txs()[0].gas_price, U256::from(10));
    assert_eq!(work.vault_state.dump(), vault_before);
    assert_ne!(work.state.dump(), state_before);
    assert_eq!(work.state.get_balance(address_of(&bad)), U256::from(10_000_000_000u64));
}

#[tokio::test]
async fn revert_restores_exact_pre_call_bytes() {
    let bad = test_key(7);
    let executor = SimpleExecutor::default();
    let mux = Arc::new(EventMux::new());

    let mut work = test_work(test_chain_config(), GAS_LIMIT, 1);
    work.state.add_balance(address_of(&bad), U256::from(1_000_000_000u64));

    let poisoned_tx = signed_tx(&bad, 0, 50, 21_000, Some(TEST_CHAIN_ID));
    executor.poison(poisoned_tx.hash());
    let pending = HashMap::from([(address_of(&bad), vec![poisoned_tx])]);
    let mut txs = ordered(&work, pending);

    let state_before = work.state.dump();
    let vault_before = work.vault_state.dump();

    work.commit_transactions(&mux, &mut txs, &executor, COINBASE);

    assert_eq!(work.tx_count(), 0);
    assert_eq!(work.state.dump(), state_before);
    assert_eq!(work.vault_state.dump(), vault_before);
    assert!(work.receipts().is_empty());
}

/// Replay-protected transactions are dropped whole-account before the
/// EIP-155 height, unless they are vault transactions.
#[tokio::test]
async fn replay_protected_tx_is_dropped_before_eip155() {
    let key = test_key(1);
    let sender = address_of(&key);
    let executor = SimpleExecutor::default();
    let mux = Arc::new(EventMux::new());

    let config = ChainConfig {
        chain_id: TEST_CHAIN_ID,
        eip155_block: Some(100),
        ..test_chain_config()
    };
    // Header height 1 is before the activation at 100; a protected
    // signature there is a replay-protection mismatch.
    let mut work = test_work(config, GAS_LIMIT, 1);
    work.state.add_balance(sender, U256::from(10_000_000_000u64));

    let pending =
        HashMap::from([(sender, vec![signed_tx(&key, 0, 10, 21_000, Some(TEST_CHAIN_ID))])]);
    let mut txs = ordered(&work, pending);

    work.commit_transactions(&mux, &mut txs, &executor, COINBASE);

    assert_eq!(work.tx_count(), 0);
    assert!(work.txs().is_empty());
}

#[tokio::test]
async fn vault_tx_is_exempt_from_the_replay_gate() {
    let key = test_key(1);
    let sender = address_of(&key);
    let executor = SimpleExecutor::default();
    let mux = Arc::new(EventMux::new());

    let config = ChainConfig {
        chain_id: TEST_CHAIN_ID,
        eip155_block: Some(100),
        ..test_chain_config()
    };
    let mut work = test_work(config, GAS_LIMIT, 1);
    work.state.add_balance(sender, U256::from(10_000_000_000u64));

    let mut tx = Transaction {
        nonce: 0,
        gas_price: U256::from(10),
        gas: 21_000,
        to: Some(Address::repeat_byte(0x11)),
        is_vault: true,
        ..Default::default()
    };
    sign_tx(&mut tx, &key, Some(TEST_CHAIN_ID));
    let pending = HashMap::from([(sender, vec![Arc::new(tx)])]);
    let mut txs = ordered(&work, pending);

    work.commit_transactions(&mux, &mut txs, &executor, COINBASE);

    assert_eq!(work.tx_count(), 1);
    assert_eq!(work.vault_receipts().len(), 1);
    assert_eq!(work.receipts().len(), 1);
}

#[tokio::test]
async fn committed_work_publishes_pending_events() {
    let key = test_key(1);
    let sender = address_of(&key);
    let executor = SimpleExecutor { emit_logs: true, ..Default::default() };
    let mux = Arc::new(EventMux::new());
    let mut pending_logs = mux.subscribe_pending_logs();
    let mut pending_state = mux.subscribe_pending_state();

    let mut work = test_work(test_chain_config(), GAS_LIMIT, 1);
    work.state.add_balance(sender, U256::from(10_000_000_000u64));
    let pending =
        HashMap::from([(sender, vec![signed_tx(&key, 0, 10, 21_000, Some(TEST_CHAIN_ID))])]);
    let mut txs = ordered(&work, pending);

    work.commit_transactions(&mux, &mut txs, &executor, COINBASE);

    let logs_event = tokio::time::timeout(Duration::from_secs(1), pending_logs.recv())
        .await
        .expect("pending logs published")
        .unwrap();
    assert_eq!(logs_event.logs.len(), 1);
    tokio::time::timeout(Duration::from_secs(1), pending_state.recv())
        .await
        .expect("pending state published")
        .unwrap();
}

/// An unrecognized executor error shifts within the account rather than
/// dropping it, so the sender's next transaction is still attempted.
#[tokio::test]
async fn unknown_executor_error_skips_only_that_transaction() {
    let key = test_key(9);
    let sender = address_of(&key);
    let mux = Arc::new(EventMux::new());

    let mut executor = MockTransactionExecutor::new();
    let mut seq = Sequence::new();
    executor
        .expect_apply_transaction()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _, _, _, _, _| {
            Err(ExecutionError::Other("execution reverted".to_string()))
        });
    executor
        .expect_apply_transaction()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _, _, _, header, tx| {
            header.gas_used += tx.gas;
            Ok(TxOutput {
                receipt: Receipt { tx_hash: tx.hash(), success: true, gas_used: tx.gas, ..Default::default() },
                vault_receipt: None,
                gas_used: tx.gas,
            })
        });

    let mut work = test_work(test_chain_config(), GAS_LIMIT, 1);
    let pending = HashMap::from([(
        sender,
        vec![
            signed_tx(&key, 0, 10, 21_000, Some(TEST_CHAIN_ID)),
            signed_tx(&key, 1, 10, 21_000, Some(TEST_CHAIN_ID)),
        ],
    )]);
    let mut txs = ordered(&work, pending);

    work.commit_transactions(&mux, &mut txs, &executor, COINBASE);

    assert_eq!(work.tx_count(), 1);
    let nonces: Vec<_> = work.txs().iter().map(|tx| tx.nonce).collect();
    assert_eq!(nonces, vec![1]);
}

/// The included sequence is exactly the iterator-order successes, and an
/// exhausted iterator ends the loop.
#[tokio::test]
async fn included_txs_follow_iterator_order() {
    let fast = test_key(1);
    let slow = test_key(2);
    let executor = SimpleExecutor::default();
    let mux = Arc::new(EventMux::new());

    let mut work = test_work(test_chain_config(), GAS_LIMIT, 1);
    for key in [&fast, &slow] {
        work.state.add_balance(address_of(key), U256::from(100_000_000_000u64));
    }

    let pending = HashMap::from([
        (
            address_of(&fast),
            vec![
                signed_tx(&fast, 0, 100, 21_000, Some(TEST_CHAIN_ID)),
                signed_tx(&fast, 1, 100, 21_000, Some(TEST_CHAIN_ID)),
            ],
        ),
        (address_of(&slow), vec![signed_tx(&slow, 0, 1, 21_000, Some(TEST_CHAIN_ID))]),
    ]);
    let mut txs = ordered(&work, pending);

    work.commit_transactions(&mux, &mut txs, &executor, COINBASE);

    assert_eq!(work.tx_count(), 3);
    let prices: Vec<_> = work.txs().iter().map(|tx| tx.gas_price.to::<u64>()).collect();
    assert_eq!(prices, vec![100, 100, 1]);
    assert_eq!(work.receipts().len(), work.txs().len());
}
