//! The ordered collection contract consumed by the paging controller.

use std::sync::Arc;

use async_trait::async_trait;

use crate::message::domain::{ChatSet, MessageGuid};
use crate::message::error::StoreResult;
use crate::paging::domain::{Availability, MessageView};

/// A lazy, restartable sequence of declared sizes.
#[async_trait]
pub trait SizeStream: Send {
    /// Waits for the next size.
    ///
    /// The first call yields the current size. Later calls yield after a
    /// change that may have altered it; bursts of changes are coalesced.
    /// Returns `None` once the underlying store has shut down.
    async fn next(&mut self) -> Option<u64>;
}

/// Positional access to one conversation, ordered
/// `(created_at DESC, guid DESC)`.
///
/// Position 0 is the newest visible message. Reactions and deleted messages
/// have no position.
#[async_trait]
pub trait OrderedCollection: Send + Sync {
    /// Stream type returned by [`OrderedCollection::observe_size`].
    type Sizes: SizeStream + 'static;

    /// Chats the collection spans.
    fn chats(&self) -> &ChatSet;

    /// Returns the declared number of positions.
    ///
    /// # Errors
    ///
    /// Returns a store error when the count query fails.
    async fn size(&self) -> StoreResult<u64>;

    /// Starts observing the declared size.
    fn observe_size(&self) -> Self::Sizes;

    /// Returns the items at `[start, start + count)`, newest first, each
    /// paired with its position.
    ///
    /// Positions without a stored message are skipped: past the end of the
    /// conversation, or inside a gap in local data. For a gap a repair has
    /// been requested before returning.
    ///
    /// # Errors
    ///
    /// Returns a store error when a query fails.
    async fn load(&self, start: u64, count: u64) -> StoreResult<Vec<(u64, Arc<MessageView>)>>;

    /// Returns the item with `guid`, or `None` when it is not known locally.
    ///
    /// # Errors
    ///
    /// Returns a store error when a query fails.
    async fn load_by_key(&self, guid: &MessageGuid) -> StoreResult<Option<Arc<MessageView>>>;

    /// Returns the GUID at `position`, or `None` when out of bounds or
    /// inside a gap.
    ///
    /// # Errors
    ///
    /// Returns a store error when a query fails.
    async fn get_key(&self, position: u64) -> StoreResult<Option<MessageGuid>>;

    /// Returns the position of `guid`.
    ///
    /// `None` means the message is unknown, deleted, or belongs to another
    /// conversation.
    ///
    /// # Errors
    ///
    /// Returns a store error when a query fails.
    async fn message_position(&self, guid: &MessageGuid) -> StoreResult<Option<u64>>;

    /// Reports whether a message asked for by GUID is loaded, still being
    /// repaired, or unavailable.
    ///
    /// # Errors
    ///
    /// Returns a store error when a query fails.
    async fn availability(&self, guid: &MessageGuid) -> StoreResult<Availability>;
}
