//! Priority-ordered hold of requests for future sequences.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::types::{Proposal, Request};

struct Entry<P: Proposal> {
    priority: i128,
    /// Monotonic insertion counter; equal priorities drain in FIFO order.
    order: u64,
    request: Request<P>,
}

impl<P: Proposal> PartialEq for Entry<P> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<P: Proposal> Eq for Entry<P> {}

impl<P: Proposal> PartialOrd for Entry<P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<P: Proposal> Ord for Entry<P> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority.cmp(&other.priority).then_with(|| other.order.cmp(&self.order))
    }
}

/// Max-priority queue of buffered requests. Callers push with priority
/// `-(proposal number)`, so the smallest future sequence drains first and
/// the core never skips a height.
pub struct PendingRequests<P: Proposal> {
    heap: BinaryHeap<Entry<P>>,
    next_order: u64,
}

impl<P: Proposal> Default for PendingRequests<P> {
    fn default() -> Self {
        Self { heap: BinaryHeap::new(), next_order: 0 }
    }
}

impl<P: Proposal> PendingRequests<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, request: Request<P>, priority: i128) {
        self.heap.push(Entry { priority, order: self.next_order, request });
        self.next_order += 1;
    }

    /// Remove and return the highest-priority request with its priority.
    pub fn pop(&mut self) -> Option<(Request<P>, i128)> {
        self.heap.pop().map(|entry| (entry.request, entry.priority))
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }
}
