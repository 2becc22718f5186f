//! Metric names recorded by the request gate.

use metrics::{describe_counter, describe_gauge};

pub const SPORT_REQUESTS_RECEIVED: &str = "sport_consensus_requests_received";
pub const SPORT_REQUESTS_PROMOTED: &str = "sport_consensus_requests_promoted";
pub const SPORT_REQUESTS_BUFFERED: &str = "sport_consensus_requests_buffered";
pub const SPORT_MAX_BUFFERED_SEQUENCE: &str = "sport_consensus_max_buffered_sequence";

pub(crate) fn register_metrics() {
    describe_counter!(SPORT_REQUESTS_RECEIVED, "The total number of proposal requests received");
    describe_counter!(
        SPORT_REQUESTS_PROMOTED,
        "The total number of buffered requests promoted to the current sequence"
    );
    describe_gauge!(SPORT_REQUESTS_BUFFERED, "How many future requests are currently buffered");
    describe_gauge!(
        SPORT_MAX_BUFFERED_SEQUENCE,
        "The highest sequence number sitting in the pending-request buffer"
    );
}
