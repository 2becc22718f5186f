//! The block-assembly worker: event loop and cycle construction.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use metrics::{counter, gauge};
use sport_primitives::block::{Block, Header};
use sport_primitives::chain_config::{dao_fork_block_extra, ChainConfig, DAO_FORK_EXTRA_RANGE};
use sport_primitives::events::{ChainHeadEvent, ChainSideEvent, NewTxsEvent};
use sport_primitives::state::AccountState;
use sport_primitives::transaction::Transaction;
use sport_primitives::tx_ordering::TransactionsByPriceAndNonce;
use sport_primitives::{Address, Bytes, B256};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::agent::{Agent, SealResult};
use crate::chain::{Chain, ChainResult};
use crate::config::MinerConfig;
use crate::engine::ConsensusEngine;
use crate::event_mux::EventMux;
use crate::metrics::{
    register_metrics,
    SPORT_MINER_AT_WORK,
    SPORT_MINER_CYCLES,
    SPORT_MINER_UNCLES_INCLUDED,
};
use crate::pool::TransactionPool;
use crate::transaction_executor::TransactionExecutor;
use crate::unconfirmed::{UnconfirmedBlocks, MINING_LOG_AT_DEPTH};
use crate::utils::calc_gas_limit;
use crate::work::Work;

/// Capacity of the seal-result return channel.
pub const RESULT_QUEUE_SIZE: usize = 10;
/// Depth of the ancestor window consulted for uncle validity.
pub const ANCESTOR_WINDOW: u64 = 7;
/// Most uncles a block may absorb.
pub const MAX_UNCLES: usize = 2;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum UncleError {
    #[error("uncle not unique")]
    NotUnique,
    #[error("uncle's parent unknown ({0})")]
    ParentUnknown(B256),
    #[error("uncle already in family ({0})")]
    AlreadyInFamily(B256),
}

/// Fields guarded by the worker's general mutex.
struct Shared {
    coinbase: Address,
    extra: Bytes,
    agents: Vec<Arc<dyn Agent>>,
}

/// Read-only view handed out while mining is off.
pub(crate) struct Snapshot {
    pub(crate) block: Arc<Block>,
    pub(crate) state: Box<dyn AccountState>,
    pub(crate) vault_state: Box<dyn AccountState>,
}

/// The worker owns one assembly cycle at a time and reacts to chain-head,
/// chain-side, and new-transaction events.
///
/// Lock order when several are held: `mu` → `uncle_mu` → `current_mu` →
/// `snapshot_mu`. No lock is held across an await point or an agent
/// channel send that could block.
pub struct Worker {
    pub(crate) config: MinerConfig,
    pub(crate) chain_config: Arc<ChainConfig>,
    pub(crate) engine: Arc<dyn ConsensusEngine>,
    pub(crate) chain: Arc<dyn Chain>,
    pub(crate) pool: Arc<dyn TransactionPool>,
    pub(crate) executor: Arc<dyn TransactionExecutor>,
    pub(crate) mux: Arc<EventMux>,

    mu: Mutex<Shared>,
    uncle_mu: Mutex<HashMap<B256, Arc<Block>>>,
    current_mu: Mutex<Option<Work>>,
    snapshot_mu: RwLock<Option<Snapshot>>,
    pub(crate) unconfirmed: Mutex<UnconfirmedBlocks>,

    results_tx: mpsc::Sender<Option<SealResult>>,
    results_rx: Mutex<Option<mpsc::Receiver<Option<SealResult>>>>,

    pub(crate) mining: AtomicBool,
    pub(crate) at_work: AtomicI64,
}

impl Worker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: MinerConfig,
        chain_config: ChainConfig,
        engine: Arc<dyn ConsensusEngine>,
        chain: Arc<dyn Chain>,
        pool: Arc<dyn TransactionPool>,
        executor: Arc<dyn TransactionExecutor>,
        coinbase: Address,
    ) -> Arc<Self> {
        register_metrics();
        let (results_tx, results_rx) = mpsc::channel(RESULT_QUEUE_SIZE);
        let extra = config.extra.clone();
        Arc::new(Self {
            config,
            chain_config: Arc::new(chain_config),
            engine,
            chain: chain.clone(),
            pool,
            executor,
            mux: Arc::new(EventMux::new()),
            mu: Mutex::new(Shared { coinbase, extra, agents: Vec::new() }),
            uncle_mu: Mutex::new(HashMap::new()),
            current_mu: Mutex::new(None),
            snapshot_mu: RwLock::new(None),
            unconfirmed: Mutex::new(UnconfirmedBlocks::new(chain, MINING_LOG_AT_DEPTH)),
            results_tx,
            results_rx: Mutex::new(Some(results_rx)),
            mining: AtomicBool::new(false),
            at_work: AtomicI64::new(0),
        })
    }

    /// Subscribe to the chain and pool feeds, spawn the update and result
    /// loops, and open the first cycle.
    pub async fn run(self: &Arc<Self>) {
        let Some(results_rx) = self.results_rx.lock().expect("results lock poisoned").take()
        else {
            warn!("worker loops already running");
            return;
        };
        let head_rx = self.chain.subscribe_chain_head();
        let side_rx = self.chain.subscribe_chain_side();
        let txs_rx = self.pool.subscribe_new_txs();
        tokio::spawn(self.clone().update(head_rx, side_rx, txs_rx));
        tokio::spawn(self.clone().wait(results_rx));
        self.commit_new_work(now_unix()).await;
    }

    pub fn event_mux(&self) -> Arc<EventMux> {
        self.mux.clone()
    }

    pub fn set_coinbase(&self, coinbase: Address) {
        self.mu.lock().expect("mu poisoned").coinbase = coinbase;
    }

    pub fn set_extra(&self, extra: Bytes) {
        self.mu.lock().expect("mu poisoned").extra = extra;
    }

    pub fn is_mining(&self) -> bool {
        self.mining.load(Ordering::SeqCst)
    }

    /// Aggregate hash rate of the registered agents.
    pub fn hash_rate(&self) -> i64 {
        self.mu.lock().expect("mu poisoned").agents.iter().map(|a| a.hash_rate()).sum()
    }

    /// Start mining: bring the engine up (panicking if it refuses while
    /// mining was explicitly requested) and spin up the agents.
    pub fn start(&self) {
        let shared = self.mu.lock().expect("mu poisoned");
        self.mining.store(true, Ordering::SeqCst);
        if self.chain_config.is_sport() {
            info!("SPORT consensus engine starting");
            if let Err(err) = self.engine.start(self.chain.clone()) {
                panic!("could not start SPORT consensus engine: {err}");
            }
        }
        for agent in &shared.agents {
            agent.start();
        }
    }

    pub fn stop(&self) {
        let shared = self.mu.lock().expect("mu poisoned");
        if self.mining.load(Ordering::SeqCst) {
            for agent in &shared.agents {
                agent.stop();
            }
        }
        if self.chain_config.is_sport() {
            self.engine.stop();
        }
        self.mining.store(false, Ordering::SeqCst);
        self.at_work.store(0, Ordering::SeqCst);
        gauge!(SPORT_MINER_AT_WORK).set(0.0);
    }

    pub fn register(&self, agent: Arc<dyn Agent>) {
        let mut shared = self.mu.lock().expect("mu poisoned");
        agent.set_return_channel(self.results_tx.clone());
        shared.agents.push(agent);
    }

    pub fn unregister(&self, agent: &Arc<dyn Agent>) {
        let mut shared = self.mu.lock().expect("mu poisoned");
        shared.agents.retain(|existing| !Arc::ptr_eq(existing, agent));
        agent.stop();
    }

    /// The pending block plus copies of both pending states: the live
    /// cycle when mining, the last snapshot otherwise.
    pub fn pending(&self) -> Option<(Arc<Block>, Box<dyn AccountState>, Box<dyn AccountState>)> {
        if !self.mining.load(Ordering::SeqCst) {
            let snapshot = self.snapshot_mu.read().expect("snapshot lock poisoned");
            return snapshot
                .as_ref()
                .map(|s| (s.block.clone(), s.state.boxed_copy(), s.vault_state.boxed_copy()));
        }
        let current = self.current_mu.lock().expect("current lock poisoned");
        current.as_ref().and_then(|work| {
            work.block
                .as_ref()
                .map(|block| (block.clone(), work.state.boxed_copy(), work.vault_state.boxed_copy()))
        })
    }

    pub fn pending_block(&self) -> Option<Arc<Block>> {
        if !self.mining.load(Ordering::SeqCst) {
            let snapshot = self.snapshot_mu.read().expect("snapshot lock poisoned");
            return snapshot.as_ref().map(|s| s.block.clone());
        }
        let current = self.current_mu.lock().expect("current lock poisoned");
        current.as_ref().and_then(|work| work.block.clone())
    }

    async fn update(
        self: Arc<Self>,
        mut head_rx: broadcast::Receiver<ChainHeadEvent>,
        mut side_rx: broadcast::Receiver<ChainSideEvent>,
        mut txs_rx: broadcast::Receiver<NewTxsEvent>,
    ) {
        loop {
            tokio::select! {
                head = head_rx.recv() => match head {
                    Ok(_) => {
                        if let Some(handler) = self.engine.chain_head_handler() {
                            handler.new_chain_head();
                        }
                        self.commit_new_work(now_unix()).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "chain head subscription lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                },
                side = side_rx.recv() => match side {
                    Ok(event) => {
                        let mut uncles = self.uncle_mu.lock().expect("uncle lock poisoned");
                        uncles.insert(event.block.hash(), event.block);
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "chain side subscription lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                },
                txs = txs_rx.recv() => match txs {
                    Ok(event) => self.handle_new_txs(event).await,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "transaction subscription lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                },
            }
        }
    }

    /// New pending transactions: apply onto the idle cycle when not
    /// mining, otherwise consider opening a fresh cycle once past the
    /// empty-mining floor.
    pub(crate) async fn handle_new_txs(&self, event: NewTxsEvent) {
        if !self.mining.load(Ordering::SeqCst) {
            let coinbase = self.mu.lock().expect("mu poisoned").coinbase;
            let mut current = self.current_mu.lock().expect("current lock poisoned");
            let Some(work) = current.as_mut() else {
                return;
            };
            // The new transactions may not be continuous with the ones
            // already included; the nonce checks weed those out.
            let mut pending: HashMap<Address, Vec<Arc<Transaction>>> = HashMap::new();
            for tx in event.txs {
                let Ok(sender) = work.signer.sender(&tx) else {
                    continue;
                };
                pending.entry(sender).or_default().push(tx);
            }
            let mut txset = TransactionsByPriceAndNonce::new(&work.signer, pending);
            work.commit_transactions(&self.mux, &mut txset, self.executor.as_ref(), coinbase);
            self.update_snapshot(work);
        } else {
            let candidate_number = {
                let current = self.current_mu.lock().expect("current lock poisoned");
                current.as_ref().and_then(|work| work.block.as_ref().map(|b| b.number()))
            };
            trace!(
                ?candidate_number,
                floor = self.config.min_blocks_empty_mining,
                sport = self.chain_config.is_sport(),
                "woken by new transactions while mining"
            );
            if self.chain_config.is_sport()
                && candidate_number
                    .is_some_and(|number| number >= self.config.min_blocks_empty_mining)
            {
                self.commit_new_work(now_unix()).await;
            }
        }
    }

    /// Open a new assembly cycle on top of the current chain head.
    #[instrument(skip(self), level = "debug")]
    pub async fn commit_new_work(&self, timestamp: u64) {
        let tstart = Instant::now();
        let parent = self.chain.current_block();

        let timestamp = timestamp.max(parent.time() + 1);
        // Ensure we're not sealing off too far in the future.
        let now = now_unix();
        if timestamp > now + 1 {
            let wait = Duration::from_secs(timestamp - now);
            info!(wait_secs = wait.as_secs(), "mining too far in the future, waiting");
            tokio::time::sleep(wait).await;
        }

        let shared = self.mu.lock().expect("mu poisoned");
        let mut possible_uncles = self.uncle_mu.lock().expect("uncle lock poisoned");
        let mut current = self.current_mu.lock().expect("current lock poisoned");

        let mut header = Header {
            parent_hash: parent.hash(),
            number: parent.number() + 1,
            gas_limit: calc_gas_limit(&parent, self.config.gas_floor, self.config.gas_ceil),
            extra: shared.extra.clone(),
            time: timestamp,
            ..Default::default()
        };
        // Only set the coinbase if we are mining (avoid spurious block
        // rewards for snapshot builds).
        if self.mining.load(Ordering::SeqCst) {
            header.coinbase = shared.coinbase;
        }
        if let Err(err) = self.engine.prepare(self.chain.as_ref(), &mut header) {
            error!(%err, "failed to prepare header for mining");
            return;
        }
        self.apply_dao_extra_override(&mut header);

        let mut work = match self.make_current(&parent, header) {
            Ok(work) => work,
            Err(err) => {
                error!(%err, "failed to create mining context");
                return;
            }
        };

        // Side blocks that fell out of the ancestor window can never
        // validate as uncles again; drop them so the map stays bounded.
        possible_uncles
            .retain(|_, block| block.number() + ANCESTOR_WINDOW >= work.header().number);

        let pending = self.pool.pending();
        let mut txset = TransactionsByPriceAndNonce::new(&work.signer, pending);
        work.commit_transactions(&self.mux, &mut txset, self.executor.as_ref(), shared.coinbase);

        let mut uncles: Vec<Header> = Vec::new();
        let mut bad_uncles: Vec<B256> = Vec::new();
        for (hash, uncle) in possible_uncles.iter() {
            if uncles.len() == MAX_UNCLES {
                break;
            }
            match commit_uncle(&mut work, uncle.header()) {
                Ok(()) => {
                    debug!(%hash, "committing new uncle to block");
                    uncles.push(uncle.header().clone());
                }
                Err(err) => {
                    trace!(%hash, %err, "bad uncle found and will be removed");
                    bad_uncles.push(*hash);
                }
            }
        }
        for hash in bad_uncles {
            possible_uncles.remove(&hash);
        }
        counter!(SPORT_MINER_UNCLES_INCLUDED).increment(uncles.len() as u64);

        let block = match self.engine.finalize(
            self.chain.as_ref(),
            &work.header,
            work.state.as_mut(),
            &work.txs,
            &uncles,
            &work.receipts,
        ) {
            Ok(block) => block,
            Err(err) => {
                error!(%err, "failed to finalize block for sealing");
                return;
            }
        };
        work.block = Some(Arc::new(block));
        counter!(SPORT_MINER_CYCLES).increment(1);

        if self.mining.load(Ordering::SeqCst) {
            let number = work.block.as_ref().expect("just finalized").number();
            info!(
                number,
                txs = work.tcount,
                uncles = uncles.len(),
                elapsed = ?tstart.elapsed(),
                "commit new mining work"
            );
            self.unconfirmed.lock().expect("unconfirmed lock poisoned").shift(number - 1);
        }
        self.update_snapshot(&work);

        let agents = shared.agents.clone();
        let work_for_agents = self.mining.load(Ordering::SeqCst).then(|| work.clone());
        *current = Some(work);
        // Release every cycle lock before touching the agent channels.
        drop(current);
        drop(possible_uncles);
        drop(shared);

        if let Some(work) = work_for_agents {
            self.push(&agents, &work);
        }
    }

    /// Build the fresh cycle environment on top of `parent`.
    fn make_current(&self, parent: &Arc<Block>, header: Header) -> ChainResult<Work> {
        let (state, vault_state) = self.chain.state_at(parent.root())?;
        let mut work = Work::new(self.chain_config.clone(), header, state, vault_state);

        for ancestor in self.chain.get_blocks_from_hash(parent.hash(), ANCESTOR_WINDOW as usize) {
            for uncle in ancestor.uncles() {
                work.family.insert(uncle.hash());
            }
            work.family.insert(ancestor.hash());
            work.ancestors.insert(ancestor.hash());
        }
        Ok(work)
    }

    fn apply_dao_extra_override(&self, header: &mut Header) {
        let Some(dao_block) = self.chain_config.dao_fork_block else {
            return;
        };
        let limit = dao_block + DAO_FORK_EXTRA_RANGE;
        if header.number >= dao_block && header.number < limit {
            if self.chain_config.dao_fork_support {
                header.extra = dao_fork_block_extra();
            } else if header.extra == dao_fork_block_extra() {
                // An opposing miner may not use the reserved extra-data.
                header.extra = Bytes::new();
            }
        }
    }

    /// Deliver the cycle to every live agent. Callers hold no worker lock
    /// here; the agent list is a clone taken before release.
    fn push(&self, agents: &[Arc<dyn Agent>], work: &Work) {
        if !self.mining.load(Ordering::SeqCst) {
            return;
        }
        for agent in agents {
            let outstanding = self.at_work.fetch_add(1, Ordering::SeqCst) + 1;
            gauge!(SPORT_MINER_AT_WORK).set(outstanding as f64);
            if agent.work_channel().send(work.clone()).is_err() {
                warn!("sealing agent dropped its work channel");
            }
        }
    }

    /// Refresh the read-only view served while mining is off.
    pub(crate) fn update_snapshot(&self, work: &Work) {
        let mut snapshot = self.snapshot_mu.write().expect("snapshot lock poisoned");
        *snapshot = Some(Snapshot {
            block: Arc::new(Block::new(work.header.clone(), work.txs.clone(), Vec::new())),
            state: work.state.boxed_copy(),
            vault_state: work.vault_state.boxed_copy(),
        });
    }

    pub(crate) fn current_mu(&self) -> &Mutex<Option<Work>> {
        &self.current_mu
    }

    pub(crate) fn possible_uncles(&self) -> &Mutex<HashMap<B256, Arc<Block>>> {
        &self.uncle_mu
    }

    #[cfg(test)]
    pub(crate) fn results_tx(&self) -> mpsc::Sender<Option<SealResult>> {
        self.results_tx.clone()
    }

    #[cfg(test)]
    pub(crate) fn take_results_rx(&self) -> Option<mpsc::Receiver<Option<SealResult>>> {
        self.results_rx.lock().expect("results lock poisoned").take()
    }
}

/// Validate and record `uncle` against the cycle's bookkeeping sets.
pub(crate) fn commit_uncle(work: &mut Work, uncle: &Header) -> Result<(), UncleError> {
    let hash = uncle.hash();
    if work.uncles.contains(&hash) {
        return Err(UncleError::NotUnique);
    }
    if !work.ancestors.contains(&uncle.parent_hash) {
        return Err(UncleError::ParentUnknown(uncle.parent_hash));
    }
    if work.family.contains(&hash) {
        return Err(UncleError::AlreadyInFamily(hash));
    }
    work.uncles.insert(hash);
    Ok(())
}

pub(crate) fn now_unix() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}
