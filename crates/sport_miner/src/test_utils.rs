use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use sport_primitives::block::{Block, Header};
use sport_primitives::chain_config::{ChainConfig, SportConfig};
use sport_primitives::events::{ChainHeadEvent, ChainSideEvent, NewTxsEvent};
use sport_primitives::execution::{ExecutionError, GasPool};
use sport_primitives::receipt::{Log, Receipt};
use sport_primitives::signer::Signer;
use sport_primitives::state::{AccountState, InMemoryState};
use sport_primitives::test_utils::block_chain;
use sport_primitives::transaction::Transaction;
use sport_primitives::{Address, B256, U256};
use tokio::sync::{broadcast, mpsc};

use crate::agent::{Agent, SealResult};
use crate::chain::{Chain, ChainError, ChainFeedEvent, ChainResult, WriteStatus};
use crate::config::MinerConfig;
use crate::engine::{ConsensusEngine, EngineError, EngineResult};
use crate::pool::TransactionPool;
use crate::transaction_executor::{TransactionExecutor, TxOutput};
use crate::work::Work;
use crate::worker::Worker;

pub(crate) const TEST_CHAIN_ID: u64 = 51;

pub(crate) fn test_chain_config() -> ChainConfig {
    ChainConfig {
        chain_id: TEST_CHAIN_ID,
        eip155_block: Some(0),
        eip158_block: Some(0),
        sport: Some(SportConfig::default()),
        ..Default::default()
    }
}

/// In-memory canonical chain with recorded writes and live subscriptions.
pub(crate) struct TestChain {
    blocks: Mutex<Vec<Arc<Block>>>,
    seeds: Mutex<Vec<(Address, U256, u64)>>,
    pub(crate) written: Mutex<Vec<(B256, Vec<Receipt>)>>,
    pub(crate) vault_roots: Mutex<HashMap<B256, B256>>,
    pub(crate) posted: Mutex<Vec<ChainFeedEvent>>,
    pub(crate) fail_state_at: AtomicBool,
    pub(crate) fail_write: AtomicBool,
    pub(crate) write_status: Mutex<WriteStatus>,
    head_tx: broadcast::Sender<ChainHeadEvent>,
    side_tx: broadcast::Sender<ChainSideEvent>,
}

impl TestChain {
    /// A canonical chain of `len` empty blocks.
    pub(crate) fn with_len(len: usize) -> Arc<Self> {
        let (head_tx, _) = broadcast::channel(16);
        let (side_tx, _) = broadcast::channel(16);
        Arc::new(Self {
            blocks: Mutex::new(block_chain(len)),
            seeds: Mutex::new(Vec::new()),
            written: Mutex::new(Vec::new()),
            vault_roots: Mutex::new(HashMap::new()),
            posted: Mutex::new(Vec::new()),
            fail_state_at: AtomicBool::new(false),
            fail_write: AtomicBool::new(false),
            write_status: Mutex::new(WriteStatus::Canonical),
            head_tx,
            side_tx,
        })
    }

    /// Give `address` a balance and nonce in every state handed out.
    pub(crate) fn seed_account(&self, address: Address, balance: U256, nonce: u64) {
        self.seeds.lock().unwrap().push((address, balance, nonce));
    }

    pub(crate) fn extend_to(&self, len: usize) {
        *self.blocks.lock().unwrap() = block_chain(len);
    }

    pub(crate) fn blocks(&self) -> Vec<Arc<Block>> {
        self.blocks.lock().unwrap().clone()
    }

    pub(crate) fn publish_head(&self, block: Arc<Block>) {
        let _ = self.head_tx.send(ChainHeadEvent { block });
    }

    pub(crate) fn publish_side(&self, block: Arc<Block>) {
        let _ = self.side_tx.send(ChainSideEvent { block });
    }

    fn seeded_state(&self) -> Box<dyn AccountState> {
        let mut state = InMemoryState::new();
        for (address, balance, nonce) in self.seeds.lock().unwrap().iter() {
            state.add_balance(*address, *balance);
            state.set_nonce(*address, *nonce);
        }
        Box::new(state)
    }
}

impl Chain for TestChain {
    fn current_block(&self) -> Arc<Block> {
        self.blocks.lock().unwrap().last().expect("test chain is never empty").clone()
    }

    fn get_blocks_from_hash(&self, hash: B256, max: usize) -> Vec<Arc<Block>> {
        let blocks = self.blocks.lock().unwrap();
        let mut out = Vec::new();
        let mut cursor = blocks.iter().rev().find(|b| b.hash() == hash).cloned();
        while let Some(block) = cursor {
            if out.len() == max {
                break;
            }
            cursor = blocks.iter().find(|b| b.hash() == block.parent_hash()).cloned();
            out.push(block);
        }
        out
    }

    fn header_by_number(&self, number: u64) -> Option<Header> {
        self.blocks.lock().unwrap().get(number as usize).map(|b| b.header().clone())
    }

    fn has_bad_block(&self, _hash: B256) -> bool {
        false
    }

    fn state_at(
        &self,
        root: B256,
    ) -> ChainResult<(Box<dyn AccountState>, Box<dyn AccountState>)> {
        if self.fail_state_at.load(Ordering::SeqCst) {
            return Err(ChainError::StateUnavailable(root));
        }
        Ok((self.seeded_state(), self.seeded_state()))
    }

    fn write_block_with_state(
        &self,
        block: &Block,
        receipts: &[Receipt],
        _state: &mut dyn AccountState,
    ) -> ChainResult<WriteStatus> {
        if self.fail_write.load(Ordering::SeqCst) {
            return Err(ChainError::Other("write refused".to_string()));
        }
        self.written.lock().unwrap().push((block.hash(), receipts.to_vec()));
        Ok(*self.write_status.lock().unwrap())
    }

    fn write_vault_state_root(&self, block_root: B256, vault_root: B256) -> ChainResult<()> {
        self.vault_roots.lock().unwrap().insert(block_root, vault_root);
        Ok(())
    }

    fn post_chain_events(&self, events: Vec<ChainFeedEvent>, _logs: Vec<Log>) {
        self.posted.lock().unwrap().extend(events);
    }

    fn subscribe_chain_head(&self) -> broadcast::Receiver<ChainHeadEvent> {
        self.head_tx.subscribe()
    }

    fn subscribe_chain_side(&self) -> broadcast::Receiver<ChainSideEvent> {
        self.side_tx.subscribe()
    }
}

/// Engine that finalizes by bundling the inputs into a block.
#[derive(Default)]
pub(crate) struct TestEngine {
    pub(crate) fail_prepare: AtomicBool,
    pub(crate) fail_finalize: AtomicBool,
    pub(crate) fail_start: AtomicBool,
    pub(crate) prepare_calls: AtomicUsize,
    pub(crate) started: AtomicBool,
    pub(crate) stopped: AtomicBool,
}

impl ConsensusEngine for TestEngine {
    fn prepare(&self, _chain: &dyn Chain, _header: &mut Header) -> EngineResult<()> {
        self.prepare_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_prepare.load(Ordering::SeqCst) {
            return Err(EngineError::Prepare("refused".to_string()));
        }
        Ok(())
    }

    fn finalize(
        &self,
        _chain: &dyn Chain,
        header: &Header,
        _state: &mut dyn AccountState,
        txs: &[Arc<Transaction>],
        uncles: &[Header],
        _receipts: &[Receipt],
    ) -> EngineResult<Block> {
        if self.fail_finalize.load(Ordering::SeqCst) {
            return Err(EngineError::Finalize("refused".to_string()));
        }
        Ok(Block::new(header.clone(), txs.to_vec(), uncles.to_vec()))
    }

    fn start(&self, _chain: Arc<dyn Chain>) -> EngineResult<()> {
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(EngineError::Start("refused".to_string()));
        }
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

/// Pool over a fixed pending map.
pub(crate) struct TestPool {
    pending: Mutex<HashMap<Address, Vec<Arc<Transaction>>>>,
    txs_tx: broadcast::Sender<NewTxsEvent>,
}

impl TestPool {
    pub(crate) fn new() -> Arc<Self> {
        let (txs_tx, _) = broadcast::channel(64);
        Arc::new(Self { pending: Mutex::new(HashMap::new()), txs_tx })
    }

    pub(crate) fn add_pending(&self, sender: Address, txs: Vec<Arc<Transaction>>) {
        self.pending.lock().unwrap().entry(sender).or_default().extend(txs);
    }

    pub(crate) fn publish_txs(&self, txs: Vec<Arc<Transaction>>) {
        let _ = self.txs_tx.send(NewTxsEvent { txs });
    }
}

impl TransactionPool for TestPool {
    fn pending(&self) -> HashMap<Address, Vec<Arc<Transaction>>> {
        self.pending.lock().unwrap().clone()
    }

    fn subscribe_new_txs(&self) -> broadcast::Receiver<NewTxsEvent> {
        self.txs_tx.subscribe()
    }
}

/// Value-transfer executor with nonce and gas-pool enforcement.
#[derive(Default)]
pub(crate) struct SimpleExecutor {
    pub(crate) emit_logs: bool,
    /// Transactions that mutate both states and then fail, for exercising
    /// the committer's revert path.
    pub(crate) poisoned: Mutex<Vec<B256>>,
}

impl SimpleExecutor {
    pub(crate) fn poison(&self, tx_hash: B256) {
        self.poisoned.lock().unwrap().push(tx_hash);
    }
}

impl TransactionExecutor for SimpleExecutor {
    fn apply_transaction(
        &self,
        config: &ChainConfig,
        coinbase: Address,
        gas_pool: &mut GasPool,
        state: &mut dyn AccountState,
        vault_state: &mut dyn AccountState,
        header: &mut Header,
        tx: &Arc<Transaction>,
    ) -> Result<TxOutput, ExecutionError> {
        let signer = Signer::new(config, header.number);
        let sender =
            signer.sender(tx).map_err(|err| ExecutionError::Other(err.to_string()))?;

        let account_nonce = state.get_nonce(sender);
        if tx.nonce < account_nonce {
            return Err(ExecutionError::NonceTooLow);
        }
        if tx.nonce > account_nonce {
            return Err(ExecutionError::NonceTooHigh);
        }

        if self.poisoned.lock().unwrap().contains(&tx.hash()) {
            state.add_balance(sender, U256::from(1));
            vault_state.add_balance(sender, U256::from(1));
            return Err(ExecutionError::Other("poisoned".to_string()));
        }

        gas_pool.sub_gas(tx.gas)?;

        state.set_nonce(sender, account_nonce + 1);
        let fee = U256::from(tx.gas) * tx.gas_price;
        state.sub_balance(sender, tx.value + fee);
        state.add_balance(coinbase, fee);
        if let Some(to) = tx.to {
            state.add_balance(to, tx.value);
        }

        header.gas_used += tx.gas;

        let mut logs = Vec::new();
        if self.emit_logs {
            let log = Log { address: sender, tx_hash: tx.hash(), ..Default::default() };
            state.add_log(log.clone());
            logs.push(log);
        }
        let receipt = Receipt {
            tx_hash: tx.hash(),
            success: true,
            gas_used: tx.gas,
            cumulative_gas_used: header.gas_used,
            logs,
        };

        let vault_receipt = tx.is_vault.then(|| {
            vault_state.set_nonce(sender, account_nonce + 1);
            Receipt { tx_hash: tx.hash(), success: true, gas_used: 0, ..Default::default() }
        });

        Ok(TxOutput { gas_used: tx.gas, receipt, vault_receipt })
    }
}

/// Agent that records delivered work and lets tests answer on the return
/// channel.
pub(crate) struct TestAgent {
    work_tx: mpsc::UnboundedSender<Work>,
    pub(crate) work_rx: Mutex<mpsc::UnboundedReceiver<Work>>,
    pub(crate) results: Mutex<Option<mpsc::Sender<Option<SealResult>>>>,
    pub(crate) started: AtomicBool,
    pub(crate) stopped: AtomicBool,
}

impl TestAgent {
    pub(crate) fn new() -> Arc<Self> {
        let (work_tx, work_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            work_tx,
            work_rx: Mutex::new(work_rx),
            results: Mutex::new(None),
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        })
    }

    pub(crate) fn try_recv_work(&self) -> Option<Work> {
        self.work_rx.lock().unwrap().try_recv().ok()
    }
}

impl Agent for TestAgent {
    fn work_channel(&self) -> mpsc::UnboundedSender<Work> {
        self.work_tx.clone()
    }

    fn set_return_channel(&self, results: mpsc::Sender<Option<SealResult>>) {
        *self.results.lock().unwrap() = Some(results);
    }

    fn start(&self) {
        self.started.store(true, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn hash_rate(&self) -> i64 {
        1
    }
}

/// A bare cycle environment over fresh in-memory states.
pub(crate) fn test_work(config: ChainConfig, gas_limit: u64, number: u64) -> Work {
    let header = Header { number, gas_limit, time: 1, ..Default::default() };
    Work::new(
        Arc::new(config),
        header,
        Box::new(InMemoryState::new()),
        Box::new(InMemoryState::new()),
    )
}

pub(crate) struct WorkerHarness {
    pub(crate) worker: Arc<Worker>,
    pub(crate) chain: Arc<TestChain>,
    pub(crate) engine: Arc<TestEngine>,
    pub(crate) pool: Arc<TestPool>,
    pub(crate) executor: Arc<SimpleExecutor>,
}

/// A worker wired to in-memory collaborators over a chain of `chain_len`
/// blocks.
pub(crate) fn worker_harness(config: MinerConfig, chain_len: usize) -> WorkerHarness {
    let chain = TestChain::with_len(chain_len);
    let engine = Arc::new(TestEngine::default());
    let pool = TestPool::new();
    let executor = Arc::new(SimpleExecutor::default());
    let worker = Worker::new(
        config,
        test_chain_config(),
        engine.clone(),
        chain.clone(),
        pool.clone(),
        executor.clone(),
        Address::repeat_byte(0xc0),
    );
    WorkerHarness { worker, chain, engine, pool, executor }
}
