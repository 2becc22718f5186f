//! Sequence classification of incoming requests.

use std::cmp::Ordering;

use crate::types::{Proposal, Request, RequestError, RequestResult};

/// Check `request` against the sequence currently being decided.
///
/// Returns `InvalidMessage` for an empty envelope, `OldMessage` when the
/// proposal is below `current_sequence`, `FutureMessage` when above, and
/// `Ok(())` when it is exactly the current sequence. Total and O(1).
pub fn check_request<P: Proposal>(
    current_sequence: u64,
    request: &Request<P>,
) -> RequestResult<()> {
    let Some(proposal) = &request.proposal else {
        return Err(RequestError::InvalidMessage);
    };
    match proposal.number().cmp(&current_sequence) {
        Ordering::Less => Err(RequestError::OldMessage),
        Ordering::Greater => Err(RequestError::FutureMessage),
        Ordering::Equal => Ok(()),
    }
}
