//! Broadcast bus for miner-originated events.

use sport_primitives::events::{NewMinedBlockEvent, PendingLogsEvent, PendingStateEvent};
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Fan-out bus the worker publishes on. Subscribers that fall behind lose
/// the oldest events; posting with no subscriber at all is a no-op.
pub struct EventMux {
    pending_logs: broadcast::Sender<PendingLogsEvent>,
    pending_state: broadcast::Sender<PendingStateEvent>,
    new_mined_block: broadcast::Sender<NewMinedBlockEvent>,
}

impl Default for EventMux {
    fn default() -> Self {
        Self::new()
    }
}

impl EventMux {
    pub fn new() -> Self {
        let (pending_logs, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (pending_state, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (new_mined_block, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { pending_logs, pending_state, new_mined_block }
    }

    pub fn post_pending_logs(&self, event: PendingLogsEvent) {
        let _ = self.pending_logs.send(event);
    }

    pub fn post_pending_state(&self, event: PendingStateEvent) {
        let _ = self.pending_state.send(event);
    }

    pub fn post_new_mined_block(&self, event: NewMinedBlockEvent) {
        let _ = self.new_mined_block.send(event);
    }

    pub fn subscribe_pending_logs(&self) -> broadcast::Receiver<PendingLogsEvent> {
        self.pending_logs.subscribe()
    }

    pub fn subscribe_pending_state(&self) -> broadcast::Receiver<PendingStateEvent> {
        self.pending_state.subscribe()
    }

    pub fn subscribe_new_mined_block(&self) -> broadcast::Receiver<NewMinedBlockEvent> {
        self.new_mined_block.subscribe()
    }
}
