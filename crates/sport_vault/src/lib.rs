//! Client for the confidential-payload relay ("blackbox").
//!
//! Vault transactions carry a 64-byte digest on-chain; the payload behind
//! it is exchanged off-chain through a relay process reachable over a
//! local stream socket. This crate owns the client side: connecting (or
//! spawning) the relay, posting payloads, resolving digests with a short
//! payload cache, and the hex plumbing the RPC surface needs.

pub mod client;
pub mod config;
pub mod digest;
pub mod error;
pub mod rpc;

mod protocol;


pub use client::{Blackbox, VaultRelay};
pub use digest::VaultDigest;
pub use error::{VaultError, VaultResult};
