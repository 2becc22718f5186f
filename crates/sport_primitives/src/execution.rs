use thiserror::Error;

/// Intrinsic gas of a plain value transfer; no transaction costs less.
pub const TX_GAS: u64 = 21_000;

/// Errors surfaced by transaction execution. The committer dispatches on
/// these to decide whether to drop a transaction or a whole account for
/// the remainder of the block.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ExecutionError {
    #[error("gas limit reached")]
    GasLimitReached,
    #[error("nonce too low")]
    NonceTooLow,
    #[error("nonce too high")]
    NonceTooHigh,
    #[error("{0}")]
    Other(String),
}

/// Remaining gas budget of the block under assembly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GasPool(u64);

impl GasPool {
    pub fn new(gas: u64) -> Self {
        Self(gas)
    }

    pub fn gas(&self) -> u64 {
        self.0
    }

    pub fn add_gas(&mut self, amount: u64) -> &mut Self {
        self.0 += amount;
        self
    }

    /// Deduct `amount` from the pool, failing with `GasLimitReached` when
    /// the pool cannot cover it.
    pub fn sub_gas(&mut self, amount: u64) -> Result<(), ExecutionError> {
        if self.0 < amount {
            return Err(ExecutionError::GasLimitReached);
        }
        self.0 -= amount;
        Ok(())
    }
}
