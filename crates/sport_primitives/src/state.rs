use std::collections::BTreeMap;

use alloy_primitives::{keccak256, Address, B256, U256};

use crate::receipt::Log;

/// Contract of a mutable account-state handle as the worker drives it.
///
/// The public ledger and the vault ledger each expose one of these; the
/// two handles are carried side by side through every executor call.
/// Mutation always goes through `&mut`, so implementations need no
/// interior locking.
pub trait AccountState: Send + Sync {
    /// Take a revertable checkpoint and return its id.
    fn snapshot(&mut self) -> usize;
    /// Roll back to a checkpoint previously returned by [`Self::snapshot`].
    fn revert_to_snapshot(&mut self, id: usize);
    /// Reset the per-transaction log context.
    fn prepare(&mut self, tx_hash: B256, block_hash: B256, index: usize);

    fn get_balance(&self, address: Address) -> U256;
    fn add_balance(&mut self, address: Address, amount: U256);
    fn sub_balance(&mut self, address: Address, amount: U256);
    fn get_nonce(&self, address: Address) -> u64;
    fn set_nonce(&mut self, address: Address, nonce: u64);
    fn get_storage(&self, address: Address, key: B256) -> B256;
    fn set_storage(&mut self, address: Address, key: B256, value: B256);

    /// Append a log under the prepared transaction context.
    fn add_log(&mut self, log: Log);
    fn logs(&self) -> Vec<Log>;
    fn logs_mut(&mut self) -> &mut Vec<Log>;

    /// Flush to the backing store, optionally clearing empty accounts
    /// (EIP-158), and return the resulting state root.
    fn commit(&mut self, eip158: bool) -> B256;
    fn boxed_copy(&self) -> Box<dyn AccountState>;
    /// Canonical byte serialization of the account contents, usable for
    /// equality checks across snapshots.
    fn dump(&self) -> Vec<u8>;
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Account {
    balance: U256,
    nonce: u64,
    storage: BTreeMap<B256, B256>,
}

impl Account {
    fn is_empty(&self) -> bool {
        self.balance.is_zero() && self.nonce == 0 && self.storage.is_empty()
    }
}

#[derive(Clone, Debug, Default)]
struct Checkpoint {
    accounts: BTreeMap<Address, Account>,
    logs_len: usize,
}

/// In-memory journaled state: a map of accounts with a stack of whole-map
/// checkpoints. Suits the worker's snapshot/revert pattern, where at most
/// one checkpoint per transaction is outstanding.
#[derive(Default)]
pub struct InMemoryState {
    accounts: BTreeMap<Address, Account>,
    logs: Vec<Log>,
    checkpoints: Vec<Checkpoint>,
    tx_hash: B256,
    block_hash: B256,
    tx_index: usize,
}

impl InMemoryState {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AccountState for InMemoryState {
    fn snapshot(&mut self) -> usize {
        self.checkpoints
            .push(Checkpoint { accounts: self.accounts.clone(), logs_len: self.logs.len() });
        self.checkpoints.len() - 1
    }

    fn revert_to_snapshot(&mut self, id: usize) {
        assert!(id < self.checkpoints.len(), "unknown snapshot id {id}");
        self.checkpoints.truncate(id + 1);
        let checkpoint = self.checkpoints.pop().expect("checkpoint exists");
        self.accounts = checkpoint.accounts;
        self.logs.truncate(checkpoint.logs_len);
    }

    fn prepare(&mut self, tx_hash: B256, block_hash: B256, index: usize) {
        self.tx_hash = tx_hash;
        self.block_hash = block_hash;
        self.tx_index = index;
    }

    fn get_balance(&self, address: Address) -> U256 {
        self.accounts.get(&address).map(|a| a.balance).unwrap_or_default()
    }

    fn add_balance(&mut self, address: Address, amount: U256) {
        self.accounts.entry(address).or_default().balance += amount;
    }

    fn sub_balance(&mut self, address: Address, amount: U256) {
        let account = self.accounts.entry(address).or_default();
        account.balance = account.balance.saturating_sub(amount);
    }

    fn get_nonce(&self, address: Address) -> u64 {
        self.accounts.get(&address).map(|a| a.nonce).unwrap_or_default()
    }

    fn set_nonce(&mut self, address: Address, nonce: u64) {
        self.accounts.entry(address).or_default().nonce = nonce;
    }

    fn get_storage(&self, address: Address, key: B256) -> B256 {
        self.accounts
            .get(&address)
            .and_then(|a| a.storage.get(&key).copied())
            .unwrap_or_default()
    }

    fn set_storage(&mut self, address: Address, key: B256, value: B256) {
        self.accounts.entry(address).or_default().storage.insert(key, value);
    }

    fn add_log(&mut self, mut log: Log) {
        log.tx_hash = self.tx_hash;
        log.tx_index = self.tx_index;
        log.block_hash = (!self.block_hash.is_zero()).then_some(self.block_hash);
        self.logs.push(log);
    }

    fn logs(&self) -> Vec<Log> {
        self.logs.clone()
    }

    fn logs_mut(&mut self) -> &mut Vec<Log> {
        &mut self.logs
    }

    fn commit(&mut self, eip158: bool) -> B256 {
        if eip158 {
            self.accounts.retain(|_, account| !account.is_empty());
        }
        self.checkpoints.clear();
        keccak256(self.dump())
    }

    fn boxed_copy(&self) -> Box<dyn AccountState> {
        Box::new(Self {
            accounts: self.accounts.clone(),
            logs: self.logs.clone(),
            checkpoints: Vec::new(),
            tx_hash: self.tx_hash,
            block_hash: self.block_hash,
            tx_index: self.tx_index,
        })
    }

    fn dump(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (address, account) in &self.accounts {
            out.extend_from_slice(address.as_slice());
            out.extend_from_slice(&account.balance.to_be_bytes::<32>());
            out.extend_from_slice(&account.nonce.to_be_bytes());
            for (key, value) in &account.storage {
                out.extend_from_slice(key.as_slice());
                out.extend_from_slice(value.as_slice());
            }
        }
        out
    }
}
