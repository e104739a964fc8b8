//! The local message mirror.
//!
//! This module holds the message model, the ordering rule every other part
//! of the crate relies on, and the store port through which sync channels
//! write and the paging layer reads.
//!
//! # Architecture
//!
//! - **Domain**: pure value types ([`domain::Message`], [`domain::SortKey`],
//!   [`domain::SyncRange`], ...)
//! - **Ports**: the [`ports::store::MessageStore`] trait
//! - **Adapters**: [`adapters::memory::InMemoryMessageStore`] and
//!   [`adapters::sqlite::SqliteMessageStore`]
//!
//! # Example
//!
//! ```
//! use scrollback::message::adapters::memory::InMemoryMessageStore;
//! use scrollback::message::domain::{ChatId, ChatSet, Message, MessageBatch, MessageGuid, Timestamp};
//! use scrollback::message::ports::MessageStore;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let store = InMemoryMessageStore::new();
//! let chat = ChatId::new("chat-a");
//! let message = Message::builder(MessageGuid::new("m1"), chat.clone(), Timestamp::from_millis(5))
//!     .with_text("hi")
//!     .build();
//!
//! store.merge(MessageBatch::of_messages(vec![message])).await.unwrap();
//! let page = store.page(&ChatSet::single(chat), 0, 10).await.unwrap();
//! assert_eq!(page.len(), 1);
//! # });
//! ```

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;

#[cfg(test)]
mod tests;
