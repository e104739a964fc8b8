//! Diesel schema for the local `SQLite` mirror.

diesel::table! {
    /// Mirrored messages, reactions included.
    messages (guid) {
        /// Remote-assigned GUID.
        guid -> Text,
        /// Owning chat.
        chat_id -> Text,
        /// Creation time in epoch milliseconds.
        created_at -> BigInt,
        /// Sender address, if reported.
        sender_address -> Nullable<Text>,
        /// Sender handle id, if reported.
        sender_handle -> Nullable<BigInt>,
        /// Whether the local user sent the message.
        is_from_me -> Bool,
        /// Text payload.
        text -> Nullable<Text>,
        /// Whether the row is a reaction.
        is_reaction -> Bool,
        /// Reaction target as delivered, prefix included.
        reaction_raw -> Nullable<Text>,
        /// Reaction target with the part prefix stripped.
        reaction_target -> Nullable<Text>,
        /// Reaction kind code.
        reaction_kind -> Nullable<Text>,
        /// Whether the reaction withdraws an earlier one.
        reaction_removed -> Bool,
        /// GUID of the message this one replies to.
        thread_originator -> Nullable<Text>,
        /// Last local edit time.
        edited_at -> Nullable<BigInt>,
        /// Soft-deletion time.
        deleted_at -> Nullable<BigInt>,
    }
}

diesel::table! {
    /// Attachment metadata.
    attachments (guid) {
        /// Attachment GUID.
        guid -> Text,
        /// Owning message.
        message_guid -> Text,
        /// MIME type.
        mime_type -> Nullable<Text>,
        /// Original file name.
        transfer_name -> Text,
        /// Size in bytes.
        total_bytes -> BigInt,
    }
}

diesel::table! {
    /// Chat participant roster.
    participants (chat_id, handle_id) {
        /// Chat the participant belongs to.
        chat_id -> Text,
        /// Remote handle id.
        handle_id -> BigInt,
        /// Address.
        address -> Text,
        /// Resolved display name.
        display_name -> Nullable<Text>,
    }
}

diesel::table! {
    /// Cached per-chat summary fields.
    chat_summaries (chat_id) {
        /// Chat described.
        chat_id -> Text,
        /// Newest visible message GUID.
        latest_guid -> Nullable<Text>,
        /// Newest visible message time.
        latest_at -> Nullable<BigInt>,
        /// Newest visible message text.
        latest_text -> Nullable<Text>,
        /// Visible count last reported by the remote.
        remote_total -> Nullable<BigInt>,
    }
}

diesel::table! {
    /// Time intervals confirmed complete.
    sync_ranges (id) {
        /// Row id.
        id -> Integer,
        /// Chat the range belongs to.
        chat_id -> Text,
        /// Oldest covered instant.
        start_at -> BigInt,
        /// Newest covered instant.
        end_at -> BigInt,
        /// Confirmation time.
        synced_at -> BigInt,
        /// Confirming channel code.
        source -> Text,
    }
}

diesel::table! {
    /// Deletion markers.
    tombstones (guid) {
        /// Deleted message GUID.
        guid -> Text,
        /// Deletion time.
        deleted_at -> BigInt,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    messages,
    attachments,
    participants,
    chat_summaries,
    sync_ranges,
    tombstones,
);

/// DDL run when a store is opened. Idempotent.
pub const SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS messages (
    guid TEXT PRIMARY KEY NOT NULL,
    chat_id TEXT NOT NULL,
    created_at BIGINT NOT NULL,
    sender_address TEXT,
    sender_handle BIGINT,
    is_from_me BOOLEAN NOT NULL DEFAULT 0,
    text TEXT,
    is_reaction BOOLEAN NOT NULL DEFAULT 0,
    reaction_raw TEXT,
    reaction_target TEXT,
    reaction_kind TEXT,
    reaction_removed BOOLEAN NOT NULL DEFAULT 0,
    thread_originator TEXT,
    edited_at BIGINT,
    deleted_at BIGINT
);
CREATE INDEX IF NOT EXISTS messages_position_idx
    ON messages (chat_id, is_reaction, deleted_at, created_at DESC, guid DESC);
CREATE INDEX IF NOT EXISTS messages_reaction_target_idx
    ON messages (reaction_target);
CREATE TABLE IF NOT EXISTS attachments (
    guid TEXT PRIMARY KEY NOT NULL,
    message_guid TEXT NOT NULL,
    mime_type TEXT,
    transfer_name TEXT NOT NULL,
    total_bytes BIGINT NOT NULL
);
CREATE INDEX IF NOT EXISTS attachments_message_idx ON attachments (message_guid);
CREATE TABLE IF NOT EXISTS participants (
    chat_id TEXT NOT NULL,
    handle_id BIGINT NOT NULL,
    address TEXT NOT NULL,
    display_name TEXT,
    PRIMARY KEY (chat_id, handle_id)
);
CREATE TABLE IF NOT EXISTS chat_summaries (
    chat_id TEXT PRIMARY KEY NOT NULL,
    latest_guid TEXT,
    latest_at BIGINT,
    latest_text TEXT,
    remote_total BIGINT
);
CREATE TABLE IF NOT EXISTS sync_ranges (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    chat_id TEXT NOT NULL,
    start_at BIGINT NOT NULL,
    end_at BIGINT NOT NULL,
    synced_at BIGINT NOT NULL,
    source TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS sync_ranges_chat_idx ON sync_ranges (chat_id);
CREATE TABLE IF NOT EXISTS tombstones (
    guid TEXT PRIMARY KEY NOT NULL,
    deleted_at BIGINT NOT NULL
);
";
