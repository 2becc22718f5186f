use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::VaultResult;

/// Configuration file pointing at a running (or spawnable) relay. Accepted
/// wherever a socket path is, for operators who keep the relay's own
/// config around instead of its socket.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct BlackboxConfig {
    /// Directory the relay keeps its runtime files in.
    pub workdir: PathBuf,
    /// Socket file name, relative to `workdir`.
    pub socket: PathBuf,
    /// Relay executable to spawn when the socket is not live yet.
    #[serde(default)]
    pub command: Option<PathBuf>,
}

impl BlackboxConfig {
    pub fn load(path: impl AsRef<Path>) -> VaultResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    pub fn socket_path(&self) -> PathBuf {
        self.workdir.join(&self.socket)
    }
}
