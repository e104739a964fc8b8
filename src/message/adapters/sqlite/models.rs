//! Diesel row types for the `SQLite` mirror.
//!
//! These types sit at the boundary between the database and the domain and
//! own the conversions in both directions.

use diesel::prelude::*;

use super::schema::{attachments, chat_summaries, messages, participants, sync_ranges, tombstones};
use crate::message::{
    domain::{
        Attachment, ChatId, ChatSummary, Message, MessageGuid, Participant, ReactionKind,
        ReactionRef, Sender, SyncChannel, SyncRange, Timestamp, Tombstone,
    },
    error::{StoreError, StoreResult},
};

/// Converts an unsigned count into a database integer.
pub(super) fn to_db_count(value: u64) -> StoreResult<i64> {
    i64::try_from(value).map_err(|e| StoreError::serialization(e.to_string()))
}

/// Converts a database integer into an unsigned count.
pub(super) fn from_db_count(value: i64) -> StoreResult<u64> {
    u64::try_from(value).map_err(|e| StoreError::serialization(e.to_string()))
}

// ============================================================================
// Messages
// ============================================================================

/// Database row representation of a message.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = messages)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MessageRow {
    /// Remote-assigned GUID.
    pub guid: String,
    /// Owning chat.
    pub chat_id: String,
    /// Creation time in epoch milliseconds.
    pub created_at: i64,
    /// Sender address.
    pub sender_address: Option<String>,
    /// Sender handle id.
    pub sender_handle: Option<i64>,
    /// Whether the local user sent the message.
    pub is_from_me: bool,
    /// Text payload.
    pub text: Option<String>,
    /// Whether the row is a reaction.
    pub is_reaction: bool,
    /// Reaction target as delivered.
    pub reaction_raw: Option<String>,
    /// Reaction target without its part prefix.
    pub reaction_target: Option<String>,
    /// Reaction kind code.
    pub reaction_kind: Option<String>,
    /// Whether the reaction withdraws an earlier one.
    pub reaction_removed: bool,
    /// Replied-to GUID.
    pub thread_originator: Option<String>,
    /// Last local edit time.
    pub edited_at: Option<i64>,
    /// Soft-deletion time.
    pub deleted_at: Option<i64>,
}

impl MessageRow {
    /// Builds a row from a domain message.
    #[must_use]
    pub fn from_domain(message: &Message) -> Self {
        let reaction = message.reaction();
        Self {
            guid: message.guid().as_str().to_owned(),
            chat_id: message.chat_id().as_str().to_owned(),
            created_at: message.created_at().as_millis(),
            sender_address: message.sender().address.clone(),
            sender_handle: message.sender().handle_id,
            is_from_me: message.sender().is_from_me,
            text: message.text().map(ToOwned::to_owned),
            is_reaction: reaction.is_some(),
            reaction_raw: reaction.map(|r| r.raw_target.clone()),
            reaction_target: reaction.map(|r| r.target_guid().into_inner()),
            reaction_kind: reaction.map(|r| r.kind.code()),
            reaction_removed: reaction.is_some_and(|r| r.removed),
            thread_originator: message
                .thread_originator()
                .map(|guid| guid.as_str().to_owned()),
            edited_at: message.edited_at().map(Timestamp::as_millis),
            deleted_at: message.deleted_at().map(Timestamp::as_millis),
        }
    }

    /// Converts the row back into a domain message.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Serialization` if a reaction row lacks its target.
    pub fn into_domain(self) -> StoreResult<Message> {
        let mut builder = Message::builder(
            MessageGuid::new(self.guid),
            ChatId::new(self.chat_id),
            Timestamp::from_millis(self.created_at),
        )
        .with_sender(Sender {
            address: self.sender_address,
            handle_id: self.sender_handle,
            is_from_me: self.is_from_me,
        });
        if let Some(text) = self.text {
            builder = builder.with_text(text);
        }
        if self.is_reaction {
            let raw = self
                .reaction_raw
                .ok_or_else(|| StoreError::serialization("reaction row without target"))?;
            let kind = ReactionKind::from_code(self.reaction_kind.as_deref().unwrap_or_default());
            let reaction = ReactionRef::new(raw, kind);
            builder = builder.with_reaction(if self.reaction_removed {
                reaction.withdrawn()
            } else {
                reaction
            });
        }
        if let Some(originator) = self.thread_originator {
            builder = builder.replying_to(MessageGuid::new(originator));
        }
        if let Some(edited_at) = self.edited_at {
            builder = builder.edited_at(Timestamp::from_millis(edited_at));
        }
        if let Some(deleted_at) = self.deleted_at {
            builder = builder.deleted_at(Timestamp::from_millis(deleted_at));
        }
        Ok(builder.build())
    }
}

// ============================================================================
// Attachments and participants
// ============================================================================

/// Database row representation of an attachment.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = attachments)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AttachmentRow {
    /// Attachment GUID.
    pub guid: String,
    /// Owning message.
    pub message_guid: String,
    /// MIME type.
    pub mime_type: Option<String>,
    /// Original file name.
    pub transfer_name: String,
    /// Size in bytes.
    pub total_bytes: i64,
}

impl AttachmentRow {
    /// Builds a row from attachment metadata.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Serialization` if the size exceeds `i64::MAX`.
    pub fn from_domain(attachment: &Attachment) -> StoreResult<Self> {
        Ok(Self {
            guid: attachment.guid.clone(),
            message_guid: attachment.message_guid.as_str().to_owned(),
            mime_type: attachment.mime_type.clone(),
            transfer_name: attachment.transfer_name.clone(),
            total_bytes: to_db_count(attachment.total_bytes)?,
        })
    }

    /// Converts the row back into attachment metadata.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Serialization` if the stored size is negative.
    pub fn into_domain(self) -> StoreResult<Attachment> {
        Ok(Attachment {
            guid: self.guid,
            message_guid: MessageGuid::new(self.message_guid),
            mime_type: self.mime_type,
            transfer_name: self.transfer_name,
            total_bytes: from_db_count(self.total_bytes)?,
        })
    }
}

/// Database row representation of a roster entry.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = participants)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ParticipantRow {
    /// Chat the participant belongs to.
    pub chat_id: String,
    /// Remote handle id.
    pub handle_id: i64,
    /// Address.
    pub address: String,
    /// Display name.
    pub display_name: Option<String>,
}

impl From<&Participant> for ParticipantRow {
    fn from(participant: &Participant) -> Self {
        Self {
            chat_id: participant.chat_id.as_str().to_owned(),
            handle_id: participant.handle_id,
            address: participant.address.clone(),
            display_name: participant.display_name.clone(),
        }
    }
}

impl From<ParticipantRow> for Participant {
    fn from(row: ParticipantRow) -> Self {
        Self {
            chat_id: ChatId::new(row.chat_id),
            handle_id: row.handle_id,
            address: row.address,
            display_name: row.display_name,
        }
    }
}

// ============================================================================
// Summaries, sync ranges and tombstones
// ============================================================================

/// Database row representation of a chat summary.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = chat_summaries)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SummaryRow {
    /// Chat described.
    pub chat_id: String,
    /// Newest visible message GUID.
    pub latest_guid: Option<String>,
    /// Newest visible message time.
    pub latest_at: Option<i64>,
    /// Newest visible message text.
    pub latest_text: Option<String>,
    /// Remote visible count.
    pub remote_total: Option<i64>,
}

impl SummaryRow {
    /// Builds a row from a summary.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Serialization` if the remote total exceeds `i64::MAX`.
    pub fn from_domain(summary: &ChatSummary) -> StoreResult<Self> {
        Ok(Self {
            chat_id: summary.chat_id.as_str().to_owned(),
            latest_guid: summary
                .latest_guid
                .as_ref()
                .map(|guid| guid.as_str().to_owned()),
            latest_at: summary.latest_at.map(Timestamp::as_millis),
            latest_text: summary.latest_text.clone(),
            remote_total: summary.remote_total.map(to_db_count).transpose()?,
        })
    }

    /// Converts the row back into a summary.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Serialization` if the stored total is negative.
    pub fn into_domain(self) -> StoreResult<ChatSummary> {
        Ok(ChatSummary {
            chat_id: ChatId::new(self.chat_id),
            latest_guid: self.latest_guid.map(MessageGuid::new),
            latest_at: self.latest_at.map(Timestamp::from_millis),
            latest_text: self.latest_text,
            remote_total: self.remote_total.map(from_db_count).transpose()?,
        })
    }
}

/// Database row representation of a sync range.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = sync_ranges)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SyncRangeRow {
    /// Row id.
    pub id: i32,
    /// Chat the range belongs to.
    pub chat_id: String,
    /// Oldest covered instant.
    pub start_at: i64,
    /// Newest covered instant.
    pub end_at: i64,
    /// Confirmation time.
    pub synced_at: i64,
    /// Confirming channel code.
    pub source: String,
}

impl SyncRangeRow {
    /// Converts the row back into a sync range.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Serialization` for an unknown channel code.
    pub fn into_domain(self) -> StoreResult<SyncRange> {
        let source = SyncChannel::parse(&self.source).ok_or_else(|| {
            StoreError::serialization(format!("unknown sync channel '{}'", self.source))
        })?;
        Ok(SyncRange::new(
            ChatId::new(self.chat_id),
            Timestamp::from_millis(self.start_at),
            Timestamp::from_millis(self.end_at),
            Timestamp::from_millis(self.synced_at),
            source,
        ))
    }
}

/// Data for inserting a sync range.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = sync_ranges)]
pub struct NewSyncRange {
    /// Chat the range belongs to.
    pub chat_id: String,
    /// Oldest covered instant.
    pub start_at: i64,
    /// Newest covered instant.
    pub end_at: i64,
    /// Confirmation time.
    pub synced_at: i64,
    /// Confirming channel code.
    pub source: String,
}

impl From<&SyncRange> for NewSyncRange {
    fn from(range: &SyncRange) -> Self {
        Self {
            chat_id: range.chat_id.as_str().to_owned(),
            start_at: range.start.as_millis(),
            end_at: range.end.as_millis(),
            synced_at: range.synced_at.as_millis(),
            source: range.source.as_str().to_owned(),
        }
    }
}

/// Database row representation of a tombstone.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = tombstones)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TombstoneRow {
    /// Deleted message GUID.
    pub guid: String,
    /// Deletion time.
    pub deleted_at: i64,
}

impl From<&Tombstone> for TombstoneRow {
    fn from(tombstone: &Tombstone) -> Self {
        Self {
            guid: tombstone.guid.as_str().to_owned(),
            deleted_at: tombstone.deleted_at.as_millis(),
        }
    }
}
