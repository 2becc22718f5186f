//! Contract of the transaction executor the committer drives.

use std::sync::Arc;

#[cfg(test)]
use mockall::automock;
use sport_primitives::block::Header;
use sport_primitives::chain_config::ChainConfig;
use sport_primitives::execution::{ExecutionError, GasPool};
use sport_primitives::receipt::Receipt;
use sport_primitives::state::AccountState;
use sport_primitives::transaction::Transaction;
use sport_primitives::Address;

/// Outcome of a successfully applied transaction. The vault receipt is
/// present only for confidential transactions.
#[derive(Debug)]
pub struct TxOutput {
    pub receipt: Receipt,
    pub vault_receipt: Option<Receipt>,
    pub gas_used: u64,
}

/// Applies one transaction against the pair of state handles.
///
/// On success the implementation mutates both states, debits `gas_pool`,
/// and accumulates `header.gas_used`. On error it may leave partial
/// mutations behind; the committer reverts both states to its own
/// pre-call snapshots.
#[cfg_attr(test, automock)]
pub trait TransactionExecutor: Send + Sync {
    #[allow(clippy::too_many_arguments)]
    fn apply_transaction(
        &self,
        config: &ChainConfig,
        coinbase: Address,
        gas_pool: &mut GasPool,
        state: &mut dyn AccountState,
        vault_state: &mut dyn AccountState,
        header: &mut Header,
        tx: &Arc<Transaction>,
    ) -> Result<TxOutput, ExecutionError>;
}
