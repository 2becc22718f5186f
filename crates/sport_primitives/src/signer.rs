use alloy_primitives::{keccak256, Address};
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, Secp256k1};
use thiserror::Error;

use crate::chain_config::ChainConfig;
use crate::transaction::Transaction;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum SignerError {
    #[error("transaction chain id does not match the signer")]
    InvalidChainId,
    #[error("replay protected transaction under a pre EIP-155 signer")]
    Protected,
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
}

/// Sender-recovery capability for one header height. Beyond the EIP-155
/// activation height the signing hash commits to the chain id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signer {
    Homestead,
    Eip155 { chain_id: u64 },
}

impl Signer {
    pub fn new(config: &ChainConfig, number: u64) -> Self {
        if config.is_eip155(number) {
            Signer::Eip155 { chain_id: config.chain_id }
        } else {
            Signer::Homestead
        }
    }

    /// Recover the sending address of `tx`.
    pub fn sender(&self, tx: &Transaction) -> Result<Address, SignerError> {
        let sighash = match (self, tx.signature.chain_id) {
            (Signer::Eip155 { chain_id }, Some(tx_chain_id)) => {
                if *chain_id != tx_chain_id {
                    return Err(SignerError::InvalidChainId);
                }
                tx.sighash(Some(tx_chain_id))
            }
            (Signer::Homestead, Some(_)) => return Err(SignerError::Protected),
            (_, None) => tx.sighash(None),
        };

        let mut compact = [0u8; 64];
        compact[..32].copy_from_slice(&tx.signature.r.to_be_bytes::<32>());
        compact[32..].copy_from_slice(&tx.signature.s.to_be_bytes::<32>());
        let recovery_id = RecoveryId::try_from(i32::from(tx.signature.odd_y_parity))
            .map_err(|e| SignerError::InvalidSignature(e.to_string()))?;
        let signature = RecoverableSignature::from_compact(&compact, recovery_id)
            .map_err(|e| SignerError::InvalidSignature(e.to_string()))?;
        let message = Message::from_digest(sighash.0);
        let public_key = Secp256k1::verification_only()
            .recover_ecdsa(&message, &signature)
            .map_err(|e| SignerError::InvalidSignature(e.to_string()))?;

        // An address is the low 20 bytes of the keccak of the uncompressed
        // public key, tag byte stripped.
        let hashed = keccak256(&public_key.serialize_uncompressed()[1..]);
        Ok(Address::from_slice(&hashed[12..]))
    }
}
