use alloy_primitives::{keccak256, Address, Bytes, B256, U256};

/// A recoverable ECDSA signature over a transaction, with the optional
/// chain id that EIP-155 folds into the signing hash.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TxSignature {
    /// Chain id the sender committed to, if any. `Some` marks the
    /// transaction as replay protected.
    pub chain_id: Option<u64>,
    /// Recovery id (0 or 1).
    pub odd_y_parity: bool,
    pub r: U256,
    pub s: U256,
}

/// A signed transaction as the worker sees it. Wire encoding and pool
/// validation happen upstream; here the fields are already decoded.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transaction {
    pub nonce: u64,
    pub gas_price: U256,
    pub gas: u64,
    /// `None` for contract creation.
    pub to: Option<Address>,
    pub value: U256,
    pub payload: Bytes,
    pub signature: TxSignature,
    /// Confidential transaction whose payload is a vault digest rather
    /// than call data.
    pub is_vault: bool,
}

impl Transaction {
    /// Whether the signature commits to a chain id (EIP-155).
    pub fn protected(&self) -> bool {
        self.signature.chain_id.is_some()
    }

    pub fn hash(&self) -> B256 {
        let mut out = self.encode_unsigned(self.signature.chain_id);
        out.push(self.signature.odd_y_parity as u8);
        out.extend_from_slice(&self.signature.r.to_be_bytes::<32>());
        out.extend_from_slice(&self.signature.s.to_be_bytes::<32>());
        keccak256(out)
    }

    /// The hash the sender signed. Folding in a chain id yields the
    /// EIP-155 variant; `None` yields the homestead variant.
    pub fn sighash(&self, chain_id: Option<u64>) -> B256 {
        keccak256(self.encode_unsigned(chain_id))
    }

    fn encode_unsigned(&self, chain_id: Option<u64>) -> Vec<u8> {
        let mut out = Vec::with_capacity(128 + self.payload.len());
        out.extend_from_slice(&self.nonce.to_be_bytes());
        out.extend_from_slice(&self.gas_price.to_be_bytes::<32>());
        out.extend_from_slice(&self.gas.to_be_bytes());
        match &self.to {
            Some(to) => {
                out.push(1);
                out.extend_from_slice(to.as_slice());
            }
            None => out.push(0),
        }
        out.extend_from_slice(&self.value.to_be_bytes::<32>());
        out.extend_from_slice(&(self.payload.len() as u64).to_be_bytes());
        out.extend_from_slice(&self.payload);
        out.push(self.is_vault as u8);
        if let Some(chain_id) = chain_id {
            out.extend_from_slice(&chain_id.to_be_bytes());
        }
        out
    }
}
