//! In-process trigger bus backed by a tokio broadcast channel.

use tokio::sync::broadcast;

use vigil_domain::trigger_record::TriggerRecord;

/// In-process bus carrying a [`TriggerRecord`] for every new trigger.
///
/// Publishing succeeds even when there are no active subscribers
/// (the record is simply dropped).
#[derive(Debug, Clone)]
pub struct InProcessTriggerBus {
    sender: broadcast::Sender<TriggerRecord>,
}

impl InProcessTriggerBus {
    /// Create a new bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to records on this bus.
    ///
    /// Returns a receiver that will get all records published *after*
    /// the subscription is created.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TriggerRecord> {
        self.sender.subscribe()
    }

    pub fn publish(&self, record: TriggerRecord) {
        // broadcast::send fails only when there are zero receivers.
        let _ = self.sender.send(record);
    }
}
