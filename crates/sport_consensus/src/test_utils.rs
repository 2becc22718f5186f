use sport_primitives::B256;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::request_gate::RequestGate;
use crate::types::{PreprepareMsg, Proposal, Request, RequestEvent};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct TestProposal {
    pub number: u64,
}

impl Proposal for TestProposal {
    fn number(&self) -> u64 {
        self.number
    }

    fn hash(&self) -> B256 {
        B256::with_last_byte(self.number as u8)
    }
}

pub(crate) fn request(number: u64) -> Request<TestProposal> {
    Request::new(TestProposal { number })
}

pub(crate) fn empty_request() -> Request<TestProposal> {
    Request { proposal: None }
}

type GateChannels = (
    RequestGate<TestProposal>,
    UnboundedReceiver<RequestEvent<TestProposal>>,
    UnboundedReceiver<PreprepareMsg<TestProposal>>,
);

pub(crate) fn gate_at(sequence: u64) -> GateChannels {
    let (request_events_tx, request_events_rx) = mpsc::unbounded_channel();
    let (preprepares_tx, preprepares_rx) = mpsc::unbounded_channel();
    (RequestGate::new(sequence, request_events_tx, preprepares_tx), request_events_rx, preprepares_rx)
}

/// Drain every event currently sitting in `receiver`.
pub(crate) fn drain<T>(receiver: &mut UnboundedReceiver<T>) -> Vec<T> {
    let mut out = Vec::new();
    while let Ok(item) = receiver.try_recv() {
        out.push(item);
    }
    out
}
