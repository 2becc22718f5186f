use thiserror::Error;

use crate::digest::DigestError;

pub type VaultResult<T> = Result<T, VaultError>;

#[derive(Debug, Error)]
pub enum VaultError {
    /// The relay was configured away; every operation fails with this.
    #[error("blackbox relay is not started")]
    RelayNotStarted,
    #[error("payload was not shared with anyone")]
    NotShared,
    #[error(transparent)]
    Digest(#[from] DigestError),
    #[error("relay refused the request: {0}")]
    Relay(String),
    #[error("unexpected relay response")]
    UnexpectedResponse,
    #[error(transparent)]
    Config(#[from] toml::de::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
