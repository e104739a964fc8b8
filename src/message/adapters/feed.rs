//! Broadcast feed shared by the store adapters.

use tokio::sync::broadcast;
use tracing::trace;

use crate::message::{
    domain::ChatSet,
    ports::store::{ChangeKind, StoreChange},
};

/// Capacity of the change channel. Slow observers see `Lagged` and
/// recompute from the store, so a small buffer is enough.
const CHANGE_CAPACITY: usize = 256;

/// Publishes [`StoreChange`] notifications to any number of observers.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<StoreChange>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(CHANGE_CAPACITY);
        Self { sender }
    }
}

impl ChangeFeed {
    /// Creates a feed with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a change. Empty chat sets are skipped.
    pub fn publish(&self, chats: ChatSet, kind: ChangeKind) {
        if chats.is_empty() {
            return;
        }
        if let Err(unsent) = self.sender.send(StoreChange::new(chats, kind)) {
            trace!(chats = %unsent.0.chats, "store change published with no subscribers");
        }
    }

    /// Subscribes to future changes.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.sender.subscribe()
    }
}
