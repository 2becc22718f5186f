use std::sync::Arc;

use alloy_primitives::{keccak256, Address, Bytes, B256};

use crate::transaction::Transaction;

/// A partially or fully filled block header.
///
/// `gas_used` and `root` start at their defaults and are filled in by the
/// executor and the state commit respectively.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Header {
    pub parent_hash: B256,
    pub number: u64,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub coinbase: Address,
    pub extra: Bytes,
    pub time: u64,
    /// State root the block commits to.
    pub root: B256,
}

impl Header {
    /// Content hash of the header. Two headers with equal fields hash
    /// equally; the encoding is internal and only needs determinism.
    pub fn hash(&self) -> B256 {
        keccak256(self.encode())
    }

    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(128 + self.extra.len());
        out.extend_from_slice(self.parent_hash.as_slice());
        out.extend_from_slice(&self.number.to_be_bytes());
        out.extend_from_slice(&self.gas_limit.to_be_bytes());
        out.extend_from_slice(&self.gas_used.to_be_bytes());
        out.extend_from_slice(self.coinbase.as_slice());
        out.extend_from_slice(&(self.extra.len() as u64).to_be_bytes());
        out.extend_from_slice(&self.extra);
        out.extend_from_slice(&self.time.to_be_bytes());
        out.extend_from_slice(self.root.as_slice());
        out
    }
}

/// A sealed or candidate block: a header plus the transactions and uncle
/// headers it carries.
#[derive(Clone, Debug, Default)]
pub struct Block {
    header: Header,
    transactions: Vec<Arc<Transaction>>,
    uncles: Vec<Header>,
}

impl Block {
    pub fn new(header: Header, transactions: Vec<Arc<Transaction>>, uncles: Vec<Header>) -> Self {
        Self { header, transactions, uncles }
    }

    pub fn hash(&self) -> B256 {
        self.header.hash()
    }

    pub fn number(&self) -> u64 {
        self.header.number
    }

    pub fn parent_hash(&self) -> B256 {
        self.header.parent_hash
    }

    pub fn root(&self) -> B256 {
        self.header.root
    }

    pub fn time(&self) -> u64 {
        self.header.time
    }

    pub fn gas_limit(&self) -> u64 {
        self.header.gas_limit
    }

    pub fn gas_used(&self) -> u64 {
        self.header.gas_used
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn transactions(&self) -> &[Arc<Transaction>] {
        &self.transactions
    }

    pub fn uncles(&self) -> &[Header] {
        &self.uncles
    }
}
