//! In-memory implementation of the remote ports.
//!
//! Plays the server side in tests: rows are published into it, window and
//! message fetches answer from them, and failures can be scripted.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::message::domain::{
    Attachment, ChatId, ChatSet, ChatTotal, Message, MessageBatch, MessageGuid, Participant,
    SortKey,
};
use crate::sync::ports::{
    FetchBounds, RealtimeLink, RemoteError, RemoteResult, RemoteSource,
};

#[derive(Debug, Default)]
struct State {
    messages: HashMap<MessageGuid, Message>,
    attachments: HashMap<MessageGuid, Vec<Attachment>>,
    participants: BTreeMap<(ChatId, i64), Participant>,
    failures: u32,
}

impl State {
    /// Consumes one scripted failure, if any remain.
    fn take_failure(&mut self) -> RemoteResult<()> {
        if self.failures == 0 {
            return Ok(());
        }
        self.failures -= 1;
        Err(RemoteError::unavailable("scripted failure"))
    }

    fn attachments_of(&self, messages: &[Message]) -> Vec<Attachment> {
        messages
            .iter()
            .filter_map(|message| self.attachments.get(message.guid()))
            .flatten()
            .cloned()
            .collect()
    }
}

#[derive(Debug, Default)]
struct Counters {
    windows: AtomicUsize,
    messages: AtomicUsize,
    reconnects: AtomicUsize,
}

/// In-memory implementation of [`RemoteSource`] and [`RealtimeLink`].
///
/// # Example
///
/// ```
/// use scrollback::sync::adapters::memory::InMemoryRemote;
///
/// let remote = InMemoryRemote::new();
/// assert_eq!(remote.window_fetches(), 0);
/// ```
#[derive(Debug, Default, Clone)]
pub struct InMemoryRemote {
    state: Arc<RwLock<State>>,
    counters: Arc<Counters>,
}

impl InMemoryRemote {
    /// Creates an empty server.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes a batch known to the server.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the internal lock is poisoned.
    pub fn publish(&self, batch: MessageBatch) -> RemoteResult<()> {
        let mut state = self.write()?;
        for message in batch.messages {
            state.messages.insert(message.guid().clone(), message);
        }
        for attachment in batch.attachments {
            state
                .attachments
                .entry(attachment.message_guid.clone())
                .or_default()
                .push(attachment);
        }
        for participant in batch.participants {
            state
                .participants
                .insert((participant.chat_id.clone(), participant.handle_id), participant);
        }
        Ok(())
    }

    /// Makes the next `count` calls fail with [`RemoteError::Unavailable`].
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the internal lock is poisoned.
    pub fn fail_next(&self, count: u32) -> RemoteResult<()> {
        self.write()?.failures = count;
        Ok(())
    }

    /// Returns the number of window fetches served or refused.
    #[must_use]
    pub fn window_fetches(&self) -> usize {
        self.counters.windows.load(Ordering::SeqCst)
    }

    /// Returns the number of single-message fetches served or refused.
    #[must_use]
    pub fn message_fetches(&self) -> usize {
        self.counters.messages.load(Ordering::SeqCst)
    }

    /// Returns the number of reconnect attempts.
    #[must_use]
    pub fn reconnects(&self) -> usize {
        self.counters.reconnects.load(Ordering::SeqCst)
    }

    fn read(&self) -> RemoteResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|e| RemoteError::Protocol(format!("lock poisoned: {e}")))
    }

    fn write(&self) -> RemoteResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|e| RemoteError::Protocol(format!("lock poisoned: {e}")))
    }
}

#[async_trait]
impl RemoteSource for InMemoryRemote {
    async fn fetch_window(
        &self,
        chats: &ChatSet,
        bounds: FetchBounds,
        limit: u64,
    ) -> RemoteResult<MessageBatch> {
        self.counters.windows.fetch_add(1, Ordering::SeqCst);
        self.write()?.take_failure()?;
        let state = self.read()?;

        let mut window: Vec<Message> = state
            .messages
            .values()
            .filter(|message| {
                message.is_visible()
                    && chats.contains(message.chat_id())
                    && bounds.contains(message.created_at())
            })
            .cloned()
            .collect();
        window.sort_by_key(SortKey::of);
        window.truncate(usize::try_from(limit).unwrap_or(usize::MAX));

        let mut totals: BTreeMap<ChatId, u64> =
            chats.iter().map(|chat| (chat.clone(), 0)).collect();
        for message in state.messages.values().filter(|message| message.is_visible()) {
            if let Some(total) = totals.get_mut(message.chat_id()) {
                *total = total.saturating_add(1);
            }
        }

        Ok(MessageBatch {
            attachments: state.attachments_of(&window),
            participants: state
                .participants
                .values()
                .filter(|participant| chats.contains(&participant.chat_id))
                .cloned()
                .collect(),
            totals: totals
                .into_iter()
                .map(|(chat, visible)| ChatTotal::new(chat, visible))
                .collect(),
            messages: window,
        })
    }

    async fn fetch_message(&self, guid: &MessageGuid) -> RemoteResult<Option<MessageBatch>> {
        self.counters.messages.fetch_add(1, Ordering::SeqCst);
        self.write()?.take_failure()?;
        let state = self.read()?;
        Ok(state.messages.get(guid).map(|message| {
            let found = vec![message.clone()];
            MessageBatch {
                attachments: state.attachments_of(&found),
                messages: found,
                ..MessageBatch::default()
            }
        }))
    }
}

#[async_trait]
impl RealtimeLink for InMemoryRemote {
    async fn reconnect(&self) -> RemoteResult<()> {
        self.counters.reconnects.fetch_add(1, Ordering::SeqCst);
        self.write()?.take_failure()
    }
}
