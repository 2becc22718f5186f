//! Contract of the sealing agents the worker fans work out to.

#[cfg(test)]
use mockall::automock;
use sport_primitives::block::Block;
use tokio::sync::mpsc;

use crate::work::Work;

/// A sealed candidate coming back from an agent. Agents send `None` when a
/// sealing attempt was abandoned.
pub struct SealResult {
    pub work: Work,
    pub block: Block,
}

/// A sealing agent. The worker clones the current cycle's environment into
/// the agent's work channel; the agent returns results on the shared
/// channel registered through [`Agent::set_return_channel`].
#[cfg_attr(test, automock)]
pub trait Agent: Send + Sync {
    /// Channel the worker delivers work on.
    fn work_channel(&self) -> mpsc::UnboundedSender<Work>;

    fn set_return_channel(&self, results: mpsc::Sender<Option<SealResult>>);

    fn start(&self);
    fn stop(&self);

    fn hash_rate(&self) -> i64;
}
