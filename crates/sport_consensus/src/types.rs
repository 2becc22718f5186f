//! Types exchanged between the request gate and the rest of the node.

use std::fmt::Debug;
use std::sync::Arc;

use sport_primitives::block::Block;
use sport_primitives::B256;
use thiserror::Error;

/// A candidate block proposal as the gate sees it: a chain height and a
/// content hash. Two proposals with the same number from the same honest
/// leader carry the same hash.
pub trait Proposal: Clone + Debug + Send + Sync + 'static {
    fn number(&self) -> u64;
    fn hash(&self) -> B256;
}

impl Proposal for Arc<Block> {
    fn number(&self) -> u64 {
        Block::number(self)
    }

    fn hash(&self) -> B256 {
        Block::hash(self)
    }
}

/// Envelope around a proposal. The proposal slot is optional so that a
/// malformed (empty) envelope from the wire can still be represented and
/// rejected with [`RequestError::InvalidMessage`].
#[derive(Clone, Debug, PartialEq)]
pub struct Request<P: Proposal> {
    pub proposal: Option<P>,
}

impl<P: Proposal> Request<P> {
    pub fn new(proposal: P) -> Self {
        Self { proposal: Some(proposal) }
    }
}

/// A buffered request that became current and is re-delivered to the
/// consensus event loop.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestEvent<P: Proposal> {
    pub proposal: P,
}

/// The `(sequence, round)` pair a pre-prepare is sent under.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct View {
    pub sequence: u64,
    pub round: u64,
}

/// First-phase broadcast of the leader's candidate proposal.
#[derive(Clone, Debug, PartialEq)]
pub struct PreprepareMsg<P: Proposal> {
    pub view: View,
    pub proposal: P,
}

/// Phase of the three-phase commit the core is in. Only `AcceptRequest`
/// changes the gate's behavior; in every other phase a current request is
/// merely parked on the view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CoreState {
    #[default]
    AcceptRequest,
    Preprepared,
    Prepared,
    Committed,
}

/// Dispositions of a rejected request. All three are non-fatal; callers
/// match them exactly to decide whether to buffer, drop, or report.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("invalid message")]
    InvalidMessage,
    #[error("old message")]
    OldMessage,
    #[error("future message")]
    FutureMessage,
}

pub type RequestResult<T> = Result<T, RequestError>;
