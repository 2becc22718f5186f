//! Wire frames exchanged with the relay: length-delimited JSON over the
//! stream socket. The relay ships with this client, so the framing is not
//! subject to an external specification.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub(crate) enum RelayRequest {
    PostRaw { payload: Vec<u8>, from: String, to: Vec<String> },
    PostRawTransaction { payload: Vec<u8>, to: Vec<String> },
    Get { digest: Vec<u8> },
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub(crate) enum RelayResponse {
    /// Digest of a stored payload.
    Digest { digest: Vec<u8> },
    /// Resolved payload; `None` when this node is not a recipient.
    Payload { payload: Option<Vec<u8>> },
    Error { message: String },
}
