//! Core types shared by the SPORT consensus core and the block-assembly
//! worker: headers and blocks, signed transactions with price/nonce
//! ordering, execution receipts and logs, the chain configuration with its
//! fork schedule, sender recovery, and the dual-state contract every
//! executor call is threaded through.
//!
//! The types here deliberately stop short of wire encoding; hashing uses a
//! deterministic internal byte encoding, and serialization of blocks for
//! gossip lives outside this workspace.

pub mod block;
pub mod chain_config;
pub mod events;
pub mod execution;
pub mod receipt;
pub mod signer;
pub mod state;
pub mod transaction;
pub mod tx_ordering;

#[cfg(any(test, feature = "testing"))]
pub mod test_utils;

#[cfg(test)]
#[path = "signer_test.rs"]
mod signer_test;

pub use alloy_primitives::{Address, Bytes, B256, U256};
