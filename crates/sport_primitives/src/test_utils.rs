//! Fixtures shared by the workspace's tests: deterministic keys, signed
//! transactions, and small header/block builders.

use std::sync::Arc;

use alloy_primitives::{keccak256, Address, B256, U256};
use secp256k1::{Message, Secp256k1, SecretKey};

use crate::block::{Block, Header};
use crate::transaction::{Transaction, TxSignature};

/// A deterministic secret key derived from `seed`.
pub fn test_key(seed: u8) -> SecretKey {
    let mut bytes = [seed; 32];
    // Zero seeds are not valid scalars.
    bytes[31] = bytes[31].wrapping_add(1);
    SecretKey::from_slice(&bytes).expect("valid test key")
}

/// The address controlled by `key`.
pub fn address_of(key: &SecretKey) -> Address {
    let public_key = key.public_key(&Secp256k1::new());
    let hashed = keccak256(&public_key.serialize_uncompressed()[1..]);
    Address::from_slice(&hashed[12..])
}

/// Sign `tx` in place with `key`, committing to `chain_id` when given.
pub fn sign_tx(tx: &mut Transaction, key: &SecretKey, chain_id: Option<u64>) {
    tx.signature.chain_id = chain_id;
    let sighash = tx.sighash(chain_id);
    let signature = Secp256k1::new()
        .sign_ecdsa_recoverable(&Message::from_digest(sighash.0), key);
    let (recovery_id, compact) = signature.serialize_compact();
    tx.signature = TxSignature {
        chain_id,
        odd_y_parity: i32::from(recovery_id) == 1,
        r: U256::from_be_slice(&compact[..32]),
        s: U256::from_be_slice(&compact[32..]),
    };
}

/// A signed value-transfer transaction.
pub fn signed_tx(
    key: &SecretKey,
    nonce: u64,
    gas_price: u64,
    gas: u64,
    chain_id: Option<u64>,
) -> Arc<Transaction> {
    let mut tx = Transaction {
        nonce,
        gas_price: U256::from(gas_price),
        gas,
        to: Some(Address::repeat_byte(0x11)),
        value: U256::from(1),
        ..Default::default()
    };
    sign_tx(&mut tx, key, chain_id);
    Arc::new(tx)
}

/// A header at `number` descending from `parent_hash`.
pub fn header_at(number: u64, parent_hash: B256) -> Header {
    Header {
        parent_hash,
        number,
        gas_limit: 8_000_000,
        time: 1_600_000_000 + number,
        ..Default::default()
    }
}

/// An empty block at `number` descending from `parent_hash`.
pub fn block_at(number: u64, parent_hash: B256) -> Block {
    Block::new(header_at(number, parent_hash), Vec::new(), Vec::new())
}

/// A chain of `len` empty blocks starting at number 0.
pub fn block_chain(len: usize) -> Vec<Arc<Block>> {
    let mut chain = Vec::with_capacity(len);
    let mut parent_hash = B256::ZERO;
    for number in 0..len as u64 {
        let block = Arc::new(block_at(number, parent_hash));
        parent_hash = block.hash();
        chain.push(block);
    }
    chain
}
