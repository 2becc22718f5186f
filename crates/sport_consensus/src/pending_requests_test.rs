use pretty_assertions::assert_eq;

use crate::pending_requests::PendingRequests;
use crate::test_utils::request;
use crate::types::Proposal;

fn priority_of(number: u64) -> i128 {
    -i128::from(number)
}

#[test]
fn lowest_number_drains_first() {
    let mut pending = PendingRequests::new();
    for number in [103, 101, 102] {
        pending.push(request(number), priority_of(number));
    }

    let mut drained = Vec::new();
    while let Some((req, _)) = pending.pop() {
        drained.push(req.proposal.unwrap().number());
    }
    assert_eq!(drained, vec![101, 102, 103]);
}

#[test]
fn equal_priorities_drain_in_insertion_order() {
    let mut pending = PendingRequests::new();
    // Two distinct requests for the same height, e.g. resent after a round
    // change; the first stored must come out first.
    pending.push(request(101), priority_of(101));
    pending.push(request(101), priority_of(101));
    pending.push(request(100), priority_of(100));

    let (first, _) = pending.pop().unwrap();
    assert_eq!(first.proposal.unwrap().number(), 100);
    let (second, priority) = pending.pop().unwrap();
    assert_eq!(second.proposal.unwrap().number(), 101);
    assert_eq!(priority, priority_of(101));
}

#[test]
fn push_back_with_original_priority_keeps_position() {
    let mut pending = PendingRequests::new();
    pending.push(request(102), priority_of(102));
    pending.push(request(105), priority_of(105));

    let (req, priority) = pending.pop().unwrap();
    pending.push(req, priority);

    let (again, _) = pending.pop().unwrap();
    assert_eq!(again.proposal.unwrap().number(), 102);
    assert_eq!(pending.len(), 1);
}

#[test]
fn empty_reports_empty() {
    let mut pending = PendingRequests::new();
    assert!(pending.is_empty());
    pending.push(request(1), priority_of(1));
    assert!(!pending.is_empty());
    pending.pop();
    assert!(pending.is_empty());
}
