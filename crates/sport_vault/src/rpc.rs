//! RPC-facing helpers over the relay.

use serde::Deserialize;
use tracing::info;

use crate::client::VaultRelay;
use crate::digest::VaultDigest;
use crate::error::{VaultError, VaultResult};

/// Arguments accompanying a shared vault payload. A missing `shared_with`
/// marks the payload as not vault-typed at all.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct VaultShareArgs {
    #[serde(rename = "sharedWith")]
    pub shared_with: Option<Vec<String>>,
}

/// Post `payload` to the relay for the named recipients and return the
/// digest as plain hex. An empty payload is not posted and yields an
/// empty string.
pub async fn share_raw_payload(
    relay: &dyn VaultRelay,
    payload: &[u8],
    from: &str,
    args: &VaultShareArgs,
) -> VaultResult<String> {
    let Some(shared_with) = &args.shared_with else {
        return Err(VaultError::NotShared);
    };
    if payload.is_empty() {
        return Ok(String::new());
    }
    info!(len = payload.len(), recipients = shared_with.len(), "sharing vault payload");
    let digest = relay.post_raw(payload, from, shared_with).await?;
    Ok(hex::encode(digest))
}

/// Resolve a digest delivered as hex (optionally `0x`-prefixed) and return
/// the payload as `0x`-prefixed lowercase hex.
pub async fn get_vault_payload(relay: &dyn VaultRelay, digest_hex: &str) -> VaultResult<String> {
    let digest = VaultDigest::from_hex(digest_hex)?;
    let payload = relay.get(digest.as_slice()).await?;
    Ok(format!("0x{}", hex::encode(payload)))
}
