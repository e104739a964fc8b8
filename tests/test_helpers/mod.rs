//! Shared fixtures for integration tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Local, Utc};
use mockable::Clock;
use scrollback::message::domain::{
    ChatId, ChatSet, ChatTotal, Message, MessageBatch, MessageGuid, Sender, Timestamp,
};
use scrollback::paging::ports::RepairTrigger;

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    /// Creates a clock reading `millis` since the epoch.
    pub const fn at(millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, millis: i64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
    }
}

/// A repair request seen by [`RecordingRepair`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Repair {
    /// A position range.
    Range { start: u64, count: u64 },
    /// One message.
    Message(MessageGuid),
}

/// Records repair requests instead of acting on them.
#[derive(Debug, Default)]
pub struct RecordingRepair {
    requests: Mutex<Vec<Repair>>,
}

impl RecordingRepair {
    /// Returns every request seen so far.
    pub fn requests(&self) -> Vec<Repair> {
        self.requests
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn push(&self, request: Repair) {
        if let Ok(mut guard) = self.requests.lock() {
            guard.push(request);
        }
    }
}

impl RepairTrigger for RecordingRepair {
    fn request_sync_for_range(&self, _chats: &ChatSet, start: u64, count: u64) {
        self.push(Repair::Range { start, count });
    }

    fn request_sync_for_message(&self, _chats: &ChatSet, guid: &MessageGuid) {
        self.push(Repair::Message(guid.clone()));
    }
}

/// A single-chat conversation identifier set.
pub fn chat(id: &str) -> ChatSet {
    ChatSet::single(ChatId::new(id))
}

/// A text message from a fixed sender.
pub fn message(guid: &str, chat_id: &str, millis: i64) -> Message {
    Message::builder(
        MessageGuid::new(guid),
        ChatId::new(chat_id),
        Timestamp::from_millis(millis),
    )
    .with_text(format!("text of {guid}"))
    .with_sender(Sender::address("+15550100"))
    .build()
}

/// `count` messages newest first, 10 ms apart, ending at `newest`.
pub fn conversation(chat_id: &str, count: i64, newest: i64) -> Vec<Message> {
    (0..count)
        .map(|index| message(&format!("{chat_id}-{index:04}"), chat_id, newest - index * 10))
        .collect()
}

/// The positions of `all` outside `missing`, plus the remote total, as the
/// store would hold them after an incomplete sync.
pub fn with_gap(chat_id: &str, all: &[Message], missing: std::ops::Range<usize>) -> MessageBatch {
    let present = all
        .iter()
        .enumerate()
        .filter(|(index, _)| !missing.contains(index))
        .map(|(_, message)| message.clone())
        .collect();
    MessageBatch::of_messages(present).with_total(ChatTotal::new(
        ChatId::new(chat_id),
        u64::try_from(all.len()).unwrap_or(u64::MAX),
    ))
}
