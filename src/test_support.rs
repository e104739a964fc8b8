//! Shared fixtures for unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Local, Utc};
use mockable::Clock;

use crate::message::domain::{
    ChatId, ChatSet, Message, MessageBatch, MessageGuid, Sender, Timestamp,
};
use crate::paging::ports::RepairTrigger;

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub(crate) struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub(crate) const fn at(millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
        }
    }

    pub(crate) fn advance(&self, millis: i64) {
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
pub(crate) enum Request {
    Range { start: u64, count: u64 },
    Message(MessageGuid),
}

/// Records repair requests instead of acting on them.
#[derive(Debug, Default)]
pub(crate) struct RecordingRepair {
    requests: Mutex<Vec<Request>>,
}

impl RecordingRepair {
    pub(crate) fn requests(&self) -> Vec<Request> {
        self.requests
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn push(&self, request: Request) {
        if let Ok(mut guard) = self.requests.lock() {
            guard.push(request);
        }
    }
}

impl RepairTrigger for RecordingRepair {
    fn request_sync_for_range(&self, _chats: &ChatSet, start: u64, count: u64) {
        self.push(Request::Range { start, count });
    }

    fn request_sync_for_message(&self, _chats: &ChatSet, guid: &MessageGuid) {
        self.push(Request::Message(guid.clone()));
    }
}

pub(crate) const fn at(millis: i64) -> Timestamp {
    Timestamp::from_millis(millis)
}

pub(crate) fn chat(id: &str) -> ChatSet {
    ChatSet::single(ChatId::new(id))
}

pub(crate) fn message(guid: &str, chat_id: &str, millis: i64) -> Message {
    Message::builder(MessageGuid::new(guid), ChatId::new(chat_id), at(millis))
        .with_text(format!("text of {guid}"))
        .with_sender(Sender::address("+15550100"))
        .build()
}

/// `count` messages in `chat_id`, newest first, 10 ms apart, ending at
/// `newest`.
pub(crate) fn conversation(chat_id: &str, count: i64, newest: i64) -> Vec<Message> {
    (0..count)
        .map(|index| message(&format!("{chat_id}-{index:04}"), chat_id, newest - index * 10))
        .collect()
}

pub(crate) fn batch(messages: Vec<Message>) -> MessageBatch {
    MessageBatch::of_messages(messages)
}
