//! Notification and search deep links into an open conversation.

use std::sync::Arc;

use tracing::debug;

use super::driver::{DriverStopped, PagingCommands};
use crate::message::domain::{ChatSet, MessageGuid};
use crate::message::error::StoreError;
use crate::paging::domain::Availability;
use crate::paging::ports::OrderedCollection;

/// Outcome of resolving a deep link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeepLinkOutcome {
    /// The message was found and the viewport is jumping to it.
    Resolved {
        /// Position of the message.
        position: u64,
    },
    /// The message is being repaired; retry once the window refreshes.
    Pending,
    /// The message was deleted or could not be recovered.
    Unavailable,
    /// The link targets a different conversation than the open one.
    WrongConversation,
}

/// Errors raised while resolving a deep link.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DeepLinkError {
    /// A store query failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The paging driver is gone.
    #[error(transparent)]
    Stopped(#[from] DriverStopped),
}

/// Resolves `(chats, guid)` targets against the open conversation.
#[derive(Debug)]
pub struct DeepLinkResolver<O: ?Sized> {
    collection: Arc<O>,
    commands: PagingCommands,
}

impl<O> DeepLinkResolver<O>
where
    O: OrderedCollection + ?Sized,
{
    /// Creates a resolver for the conversation `collection` spans.
    #[must_use]
    pub const fn new(collection: Arc<O>, commands: PagingCommands) -> Self {
        Self {
            collection,
            commands,
        }
    }

    /// Resolves a link and, when the target is local, jumps to it.
    ///
    /// # Errors
    ///
    /// Returns [`DeepLinkError`] when a store query fails or the driver
    /// has stopped.
    pub async fn resolve(
        &self,
        chats: &ChatSet,
        guid: &MessageGuid,
    ) -> Result<DeepLinkOutcome, DeepLinkError> {
        if chats != self.collection.chats() {
            return Ok(DeepLinkOutcome::WrongConversation);
        }
        if let Some(position) = self.collection.message_position(guid).await? {
            debug!(%guid, position, "deep link resolved");
            self.commands.jump_to(position).await?;
            return Ok(DeepLinkOutcome::Resolved { position });
        }
        Ok(match self.collection.availability(guid).await? {
            Availability::Available => DeepLinkOutcome::WrongConversation,
            Availability::Loading { .. } => DeepLinkOutcome::Pending,
            Availability::Unavailable => DeepLinkOutcome::Unavailable,
        })
    }
}
