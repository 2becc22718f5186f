use std::fmt;

use alloy_primitives::B512;
use thiserror::Error;

/// Length in bytes of a relay digest (128 hex characters).
pub const DIGEST_LENGTH: usize = 64;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DigestError {
    #[error("digest is not valid hex")]
    InvalidHex,
    #[error("expected a digest of length {DIGEST_LENGTH}, but got {0}")]
    InvalidLength(usize),
}

/// The fixed 64-byte handle a posted payload is referenced by on-chain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct VaultDigest(pub B512);

impl VaultDigest {
    /// Parse from hex, tolerating an optional `0x` prefix on ingress.
    pub fn from_hex(digest_hex: &str) -> Result<Self, DigestError> {
        let stripped = digest_hex
            .strip_prefix("0x")
            .or_else(|| digest_hex.strip_prefix("0X"))
            .unwrap_or(digest_hex);
        let bytes = hex::decode(stripped).map_err(|_| DigestError::InvalidHex)?;
        if bytes.len() != DIGEST_LENGTH {
            return Err(DigestError::InvalidLength(bytes.len()));
        }
        Ok(Self(B512::from_slice(&bytes)))
    }

    /// Parse the raw bytes a relay handed back.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DigestError> {
        if bytes.len() != DIGEST_LENGTH {
            return Err(DigestError::InvalidLength(bytes.len()));
        }
        Ok(Self(B512::from_slice(bytes)))
    }

    pub fn as_slice(&self) -> &[u8] {
        self.0.as_slice()
    }

    /// `0x`-prefixed lowercase hex, the form RPC responses use.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for VaultDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
