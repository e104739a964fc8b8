//! De-duplicating queue between the paging layer and the repair worker.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::message::domain::{ChatSet, MessageGuid};
use crate::paging::ports::RepairTrigger;
use crate::sync::domain::{RepairKey, RepairRequest};

/// Accepts repair requests without blocking and forwards each distinct one
/// to the worker once until it completes.
///
/// # Examples
///
/// ```
/// use scrollback::message::domain::{ChatId, ChatSet};
/// use scrollback::paging::ports::RepairTrigger;
/// use scrollback::sync::services::RepairQueue;
///
/// let (queue, mut requests) = RepairQueue::new();
/// let chats = ChatSet::single(ChatId::new("c"));
///
/// queue.request_sync_for_range(&chats, 10, 5);
/// queue.request_sync_for_range(&chats, 10, 5);
///
/// assert!(requests.try_recv().is_ok());
/// assert!(requests.try_recv().is_err());
/// ```
#[derive(Debug, Clone)]
pub struct RepairQueue {
    in_flight: Arc<Mutex<HashSet<RepairKey>>>,
    sender: mpsc::UnboundedSender<RepairRequest>,
}

impl RepairQueue {
    /// Creates a queue and the receiver the worker drains.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RepairRequest>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                in_flight: Arc::default(),
                sender,
            },
            receiver,
        )
    }

    /// Queues `request` unless an identical one is still in flight.
    ///
    /// Returns `true` if the request was queued.
    #[must_use]
    pub fn enqueue(&self, request: RepairRequest) -> bool {
        let key = request.key();
        let Some(mut in_flight) = self.lock() else {
            return false;
        };
        if !in_flight.insert(key.clone()) {
            debug!(%key, "repair already in flight");
            return false;
        }
        if self.sender.send(request).is_err() {
            warn!(%key, "repair worker stopped; request dropped");
            in_flight.remove(&key);
            return false;
        }
        true
    }

    /// Marks the repair identified by `key` as finished.
    pub fn complete(&self, key: &RepairKey) {
        if let Some(mut in_flight) = self.lock() {
            in_flight.remove(key);
        }
    }

    /// Returns the number of repairs in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.lock().map_or(0, |in_flight| in_flight.len())
    }

    fn lock(&self) -> Option<MutexGuard<'_, HashSet<RepairKey>>> {
        match self.in_flight.lock() {
            Ok(guard) => Some(guard),
            Err(err) => {
                warn!(error = %err, "repair queue lock poisoned");
                None
            }
        }
    }
}

impl RepairTrigger for RepairQueue {
    fn request_sync_for_range(&self, chats: &ChatSet, start: u64, count: u64) {
        if count == 0 {
            return;
        }
        let _queued = self.enqueue(RepairRequest::Range {
            chats: chats.clone(),
            start,
            count,
        });
    }

    fn request_sync_for_message(&self, chats: &ChatSet, guid: &MessageGuid) {
        let _queued = self.enqueue(RepairRequest::Message {
            chats: chats.clone(),
            guid: guid.clone(),
        });
    }
}
