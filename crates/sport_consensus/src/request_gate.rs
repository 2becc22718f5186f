//! Validation, buffering, and promotion of block-proposal requests.

use std::sync::Mutex;

use metrics::{counter, gauge};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::classify::check_request;
use crate::metrics::{
    register_metrics,
    SPORT_MAX_BUFFERED_SEQUENCE,
    SPORT_REQUESTS_BUFFERED,
    SPORT_REQUESTS_PROMOTED,
    SPORT_REQUESTS_RECEIVED,
};
use crate::pending_requests::PendingRequests;
use crate::types::{
    CoreState,
    PreprepareMsg,
    Proposal,
    Request,
    RequestError,
    RequestEvent,
    RequestResult,
    View,
};

/// The view the core is running: the sequence expected for the next
/// committed block, the round within it, and the request attached to it.
#[derive(Clone, Debug)]
pub struct RoundState<P: Proposal> {
    sequence: u64,
    round: u64,
    pending_request: Option<Request<P>>,
}

impl<P: Proposal> RoundState<P> {
    fn new(sequence: u64) -> Self {
        Self { sequence, round: 0, pending_request: None }
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn pending_request(&self) -> Option<&Request<P>> {
        self.pending_request.as_ref()
    }
}

/// Ingests proposal requests for the core.
///
/// Requests at the current sequence are attached to the view and, while the
/// core still accepts requests, broadcast as pre-prepares. Future requests
/// are buffered and replayed when the view advances; everything else is
/// rejected with a matchable sentinel.
pub struct RequestGate<P: Proposal> {
    state: CoreState,
    current: RoundState<P>,
    pending_requests: Mutex<PendingRequests<P>>,
    max_buffered_sequence: Mutex<u64>,
    request_events: mpsc::UnboundedSender<RequestEvent<P>>,
    preprepares: mpsc::UnboundedSender<PreprepareMsg<P>>,
}

impl<P: Proposal> RequestGate<P> {
    /// A gate accepting requests at `sequence`. Promoted requests are
    /// re-delivered on `request_events`; pre-prepares are handed to the
    /// BFT message layer through `preprepares`.
    pub fn new(
        sequence: u64,
        request_events: mpsc::UnboundedSender<RequestEvent<P>>,
        preprepares: mpsc::UnboundedSender<PreprepareMsg<P>>,
    ) -> Self {
        register_metrics();
        Self {
            state: CoreState::AcceptRequest,
            current: RoundState::new(sequence),
            pending_requests: Mutex::new(PendingRequests::new()),
            max_buffered_sequence: Mutex::new(0),
            request_events,
            preprepares,
        }
    }

    pub fn state(&self) -> CoreState {
        self.state
    }

    pub fn set_state(&mut self, state: CoreState) {
        self.state = state;
    }

    pub fn current(&self) -> &RoundState<P> {
        &self.current
    }

    /// Handle a request delivered by the consensus event loop.
    ///
    /// On `FutureMessage` the caller is expected to route the request to
    /// [`Self::store_request_msg`]. The pre-prepare emission is fire and
    /// forget; its downstream failures belong to the message layer.
    pub fn handle_request(&mut self, request: Request<P>) -> RequestResult<()> {
        counter!(SPORT_REQUESTS_RECEIVED).increment(1);
        if let Err(err) = check_request(self.current.sequence, &request) {
            match (&err, &request.proposal) {
                (RequestError::InvalidMessage, _) | (_, None) => {
                    warn!(state = ?self.state, seq = self.current.sequence, "invalid request");
                }
                (_, Some(proposal)) => {
                    warn!(
                        %err,
                        number = proposal.number(),
                        hash = %proposal.hash(),
                        "unexpected request"
                    );
                }
            }
            return Err(err);
        }

        let proposal = request.proposal.clone().expect("checked request carries a proposal");
        trace!(number = proposal.number(), hash = %proposal.hash(), "handle request");

        self.current.pending_request = Some(request);
        if self.state == CoreState::AcceptRequest {
            debug!(
                number = proposal.number(),
                hash = %proposal.hash(),
                "accepting request, sending pre-prepare"
            );
            self.send_preprepare(proposal);
        }
        Ok(())
    }

    /// Buffer a future request unconditionally, keyed so the lowest
    /// sequence drains first. Callers holding a non-future request should
    /// not call this.
    pub fn store_request_msg(&self, request: Request<P>) {
        let Some(proposal) = &request.proposal else {
            warn!(state = ?self.state, "not storing malformed request");
            return;
        };
        let number = proposal.number();
        trace!(number, hash = %proposal.hash(), "store future request");

        let mut pending = self.pending_requests.lock().expect("pending requests lock poisoned");
        pending.push(request, -i128::from(number));
        gauge!(SPORT_REQUESTS_BUFFERED).set(pending.len() as f64);

        let mut max = self.max_buffered_sequence.lock().expect("metrics lock poisoned");
        if number > *max {
            *max = number;
            gauge!(SPORT_MAX_BUFFERED_SEQUENCE).set(number as f64);
        }
    }

    /// Drain the buffer: emit every request that became current, discard
    /// stale ones, and stop at the first request that is still in the
    /// future (the heap order guarantees nothing behind it is closer).
    pub fn process_pending_requests(&self) {
        let mut promoted = Vec::new();
        let mut pending = self.pending_requests.lock().expect("pending requests lock poisoned");
        while let Some((request, priority)) = pending.pop() {
            match check_request(self.current.sequence, &request) {
                Err(RequestError::InvalidMessage) => {
                    warn!("malformed pending request, skip");
                    continue;
                }
                Err(RequestError::FutureMessage) => {
                    let proposal = request.proposal.as_ref().expect("future request has proposal");
                    trace!(
                        number = proposal.number(),
                        hash = %proposal.hash(),
                        "stop processing pending requests"
                    );
                    pending.push(request, priority);
                    break;
                }
                Err(err) => {
                    let proposal = request.proposal.as_ref().expect("checked request");
                    trace!(
                        number = proposal.number(),
                        hash = %proposal.hash(),
                        %err,
                        "skip the pending request"
                    );
                    continue;
                }
                Ok(()) => {}
            }

            let proposal = request.proposal.expect("checked request carries a proposal");
            trace!(number = proposal.number(), hash = %proposal.hash(), "post pending request");
            promoted.push(proposal);
        }
        gauge!(SPORT_REQUESTS_BUFFERED).set(pending.len() as f64);
        drop(pending);

        // No send while the buffer mutex is held; the channel is drained
        // by the caller's event loop.
        for proposal in promoted {
            counter!(SPORT_REQUESTS_PROMOTED).increment(1);
            let _ = self.request_events.send(RequestEvent { proposal });
        }
    }

    /// Move the view to `sequence`, reset to `AcceptRequest`, and replay
    /// any buffered requests that became current.
    pub fn start_sequence(&mut self, sequence: u64) {
        self.current = RoundState::new(sequence);
        self.state = CoreState::AcceptRequest;
        self.process_pending_requests();
    }

    fn send_preprepare(&self, proposal: P) {
        let view = View { sequence: self.current.sequence, round: self.current.round };
        let _ = self.preprepares.send(PreprepareMsg { view, proposal });
    }
}
