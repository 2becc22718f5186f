//! The relay client proper.

use std::os::unix::fs::FileTypeExt;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use cached::{Cached, TimedCache};
use futures::{SinkExt, StreamExt};
#[cfg(test)]
use mockall::automock;
use tokio::net::UnixStream;
use tokio::sync::Mutex;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tracing::{debug, error, warn};

use crate::config::BlackboxConfig;
use crate::error::{VaultError, VaultResult};
use crate::protocol::{RelayRequest, RelayResponse};

/// Seconds a resolved payload stays in the client cache.
const PAYLOAD_CACHE_LIFESPAN_SECS: u64 = 60;
/// Relay executable spawned when the socket is not live yet.
const DEFAULT_RELAY_COMMAND: &str = "blackbox";
/// How often and how long to retry connecting after spawning the relay.
const CONNECT_RETRY_INTERVAL: Duration = Duration::from_millis(100);
const CONNECT_RETRIES: usize = 50;

/// Sentinel path that configures the relay away entirely.
pub const IGNORE_PATH: &str = "ignore";

/// Operations the rest of the node performs against the relay. Payloads
/// are opaque byte strings; digests are fixed 64-byte handles.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait VaultRelay: Send + Sync {
    /// Store `payload` for the `to` recipients; returns its digest.
    async fn post_raw(&self, payload: &[u8], from: &str, to: &[String]) -> VaultResult<Vec<u8>>;

    /// Store a raw transaction payload; returns its digest.
    async fn post_raw_transaction(&self, payload: &[u8], to: &[String]) -> VaultResult<Vec<u8>>;

    /// Resolve a digest. Not being a recipient of the payload is not an
    /// error; the payload comes back empty.
    async fn get(&self, digest: &[u8]) -> VaultResult<Vec<u8>>;
}

#[derive(Debug)]
struct RelayConn {
    framed: Mutex<Framed<UnixStream, LengthDelimitedCodec>>,
}

impl RelayConn {
    async fn round_trip(&self, request: RelayRequest) -> VaultResult<RelayResponse> {
        let mut framed = self.framed.lock().await;
        framed.send(serde_json::to_vec(&request)?.into()).await?;
        let Some(frame) = framed.next().await else {
            return Err(VaultError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "relay closed the connection",
            )));
        };
        Ok(serde_json::from_slice(&frame?)?)
    }
}

/// The blackbox relay client. One live socket connection, serialized
/// request/response, and a one-minute payload cache in front of `get`.
#[derive(Debug)]
pub struct Blackbox {
    conn: Option<RelayConn>,
    cache: Mutex<TimedCache<String, Vec<u8>>>,
}

impl Blackbox {
    /// Connect to the relay at `path`: either its stream socket directly,
    /// or a configuration file pointing at one. If nothing listens on the
    /// socket yet, the relay process is spawned first.
    pub async fn connect(path: impl AsRef<Path>) -> VaultResult<Self> {
        let path = path.as_ref();
        let metadata = std::fs::symlink_metadata(path).map_err(|err| {
            error!(path = %path.display(), %err, "could not stat relay path");
            VaultError::Io(err)
        })?;

        let (socket_path, command) = if metadata.file_type().is_socket() {
            (path.to_path_buf(), None)
        } else {
            let config = BlackboxConfig::load(path)?;
            (config.socket_path(), config.command.clone())
        };

        let stream = connect_or_spawn(&socket_path, command.as_deref()).await?;
        debug!(socket = %socket_path.display(), "connected to blackbox relay");
        Ok(Self {
            conn: Some(RelayConn {
                framed: Mutex::new(Framed::new(stream, LengthDelimitedCodec::new())),
            }),
            cache: payload_cache(),
        })
    }

    /// Like [`Self::connect`], but never fails: `"ignore"` or a connection
    /// problem yields a client whose operations report
    /// [`VaultError::RelayNotStarted`].
    pub async fn create(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if path.as_os_str().eq_ignore_ascii_case(IGNORE_PATH) {
            return Self::disabled();
        }
        match Self::connect(path).await {
            Ok(client) => client,
            Err(err) => {
                error!(path = %path.display(), %err, "failed to connect to blackbox relay");
                Self::disabled()
            }
        }
    }

    /// A client with the relay configured away.
    pub fn disabled() -> Self {
        Self { conn: None, cache: payload_cache() }
    }

    pub fn is_disabled(&self) -> bool {
        self.conn.is_none()
    }

    fn conn(&self) -> VaultResult<&RelayConn> {
        self.conn.as_ref().ok_or(VaultError::RelayNotStarted)
    }
}

#[async_trait]
impl VaultRelay for Blackbox {
    async fn post_raw(&self, payload: &[u8], from: &str, to: &[String]) -> VaultResult<Vec<u8>> {
        let conn = self.conn()?;
        let request = RelayRequest::PostRaw {
            payload: payload.to_vec(),
            from: from.to_string(),
            to: to.to_vec(),
        };
        match conn.round_trip(request).await? {
            RelayResponse::Digest { digest } => Ok(digest),
            RelayResponse::Error { message } => Err(VaultError::Relay(message)),
            RelayResponse::Payload { .. } => Err(VaultError::UnexpectedResponse),
        }
    }

    async fn post_raw_transaction(&self, payload: &[u8], to: &[String]) -> VaultResult<Vec<u8>> {
        let conn = self.conn()?;
        let request =
            RelayRequest::PostRawTransaction { payload: payload.to_vec(), to: to.to_vec() };
        match conn.round_trip(request).await? {
            RelayResponse::Digest { digest } => Ok(digest),
            RelayResponse::Error { message } => Err(VaultError::Relay(message)),
            RelayResponse::Payload { .. } => Err(VaultError::UnexpectedResponse),
        }
    }

    async fn get(&self, digest: &[u8]) -> VaultResult<Vec<u8>> {
        let conn = self.conn()?;
        if digest.is_empty() {
            return Ok(Vec::new());
        }
        let key = hex::encode(digest);
        if let Some(hit) = self.cache.lock().await.cache_get(&key) {
            return Ok(hit.clone());
        }
        let payload = match conn.round_trip(RelayRequest::Get { digest: digest.to_vec() }).await? {
            RelayResponse::Payload { payload } => payload.unwrap_or_default(),
            RelayResponse::Error { message } => return Err(VaultError::Relay(message)),
            RelayResponse::Digest { .. } => return Err(VaultError::UnexpectedResponse),
        };
        self.cache.lock().await.cache_set(key, payload.clone());
        Ok(payload)
    }
}

fn payload_cache() -> Mutex<TimedCache<String, Vec<u8>>> {
    Mutex::new(TimedCache::with_lifespan(PAYLOAD_CACHE_LIFESPAN_SECS))
}

async fn connect_or_spawn(socket_path: &Path, command: Option<&Path>) -> VaultResult<UnixStream> {
    if let Ok(stream) = UnixStream::connect(socket_path).await {
        return Ok(stream);
    }

    let command = command.unwrap_or_else(|| Path::new(DEFAULT_RELAY_COMMAND));
    warn!(
        socket = %socket_path.display(),
        command = %command.display(),
        "relay socket not live, spawning the relay"
    );
    tokio::process::Command::new(command)
        .arg("--socket")
        .arg(socket_path)
        .spawn()
        .map_err(|err| {
            error!(command = %command.display(), %err, "could not spawn the relay");
            VaultError::Io(err)
        })?;

    for _ in 0..CONNECT_RETRIES {
        tokio::time::sleep(CONNECT_RETRY_INTERVAL).await;
        if let Ok(stream) = UnixStream::connect(socket_path).await {
            return Ok(stream);
        }
    }
    Err(VaultError::Io(std::io::Error::new(
        std::io::ErrorKind::ConnectionRefused,
        format!("relay never came up on {}", socket_path.display()),
    )))
}
