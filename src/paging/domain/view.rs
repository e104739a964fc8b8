//! Hydrated view items handed to the rendering layer.
//!
//! A [`MessageView`] bundles a message with everything needed to draw it:
//! its live reactions, attachment metadata, reply preview and the sender's
//! display name. Each view carries a content fingerprint so unchanged rows
//! can be recognised across window rebuilds.

use sha2::{Digest, Sha256};

use crate::message::domain::{Attachment, Message, MessageGuid, ReactionKind, Sender};

/// One live reaction on a message: the latest reaction of one sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedReaction {
    /// GUID of the reaction record.
    pub reaction_guid: MessageGuid,
    /// Reaction kind.
    pub kind: ReactionKind,
    /// Who reacted.
    pub sender: Sender,
    /// Display name of the reacting sender, if resolved.
    pub sender_name: Option<String>,
}

/// The quoted part of a reply preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplySnippet {
    /// Originator GUID.
    pub guid: MessageGuid,
    /// Originator sender display name.
    pub sender_name: Option<String>,
    /// Originator text.
    pub text: Option<String>,
}

/// Reply preview state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyPreview {
    /// The originator is present locally.
    Loaded(ReplySnippet),
    /// The originator is expected to exist but is not local yet; a repair
    /// has been requested.
    NotLoaded {
        /// Originator GUID.
        guid: MessageGuid,
    },
    /// The originator was deleted or could not be recovered in time.
    Missing {
        /// Originator GUID.
        guid: MessageGuid,
    },
}

impl ReplyPreview {
    /// Returns the originator GUID.
    #[must_use]
    pub const fn guid(&self) -> &MessageGuid {
        match self {
            Self::Loaded(snippet) => &snippet.guid,
            Self::NotLoaded { guid } | Self::Missing { guid } => guid,
        }
    }
}

/// A fully hydrated message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageView {
    message: Message,
    reactions: Vec<AppliedReaction>,
    attachments: Vec<Attachment>,
    reply: Option<ReplyPreview>,
    sender_name: Option<String>,
    fingerprint: [u8; 32],
}

impl MessageView {
    /// Assembles a view and computes its fingerprint.
    #[must_use]
    pub fn new(
        message: Message,
        reactions: Vec<AppliedReaction>,
        attachments: Vec<Attachment>,
        reply: Option<ReplyPreview>,
        sender_name: Option<String>,
    ) -> Self {
        let fingerprint = fingerprint(
            &message,
            &reactions,
            &attachments,
            reply.as_ref(),
            sender_name.as_deref(),
        );
        Self {
            message,
            reactions,
            attachments,
            reply,
            sender_name,
            fingerprint,
        }
    }

    /// Returns the underlying message.
    #[must_use]
    pub const fn message(&self) -> &Message {
        &self.message
    }

    /// Returns the GUID.
    #[must_use]
    pub const fn guid(&self) -> &MessageGuid {
        self.message.guid()
    }

    /// Returns live reactions, oldest first.
    #[must_use]
    pub fn reactions(&self) -> &[AppliedReaction] {
        &self.reactions
    }

    /// Returns attachment metadata.
    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Returns the reply preview, if the message is a reply.
    #[must_use]
    pub const fn reply(&self) -> Option<&ReplyPreview> {
        self.reply.as_ref()
    }

    /// Returns the sender's display name; `None` for the local user.
    #[must_use]
    pub fn sender_name(&self) -> Option<&str> {
        self.sender_name.as_deref()
    }

    /// Returns the content fingerprint.
    #[must_use]
    pub const fn fingerprint(&self) -> &[u8; 32] {
        &self.fingerprint
    }
}

fn put(hasher: &mut Sha256, field: Option<&str>) {
    match field {
        Some(value) => {
            hasher.update(format!("{}:", value.len()));
            hasher.update(value.as_bytes());
        }
        None => hasher.update([0_u8]),
    }
}

fn fingerprint(
    message: &Message,
    reactions: &[AppliedReaction],
    attachments: &[Attachment],
    reply: Option<&ReplyPreview>,
    sender_name: Option<&str>,
) -> [u8; 32] {
    let mut hasher = Sha256::new();
    put(&mut hasher, Some(message.guid().as_str()));
    put(&mut hasher, message.text());
    put(&mut hasher, message.edited_at().map(|at| at.to_string()).as_deref());
    put(&mut hasher, message.deleted_at().map(|at| at.to_string()).as_deref());
    put(&mut hasher, sender_name);
    for reaction in reactions {
        put(&mut hasher, Some(reaction.reaction_guid.as_str()));
        put(&mut hasher, Some(&reaction.kind.code()));
        put(&mut hasher, reaction.sender_name.as_deref());
    }
    hasher.update([0xff_u8]);
    for attachment in attachments {
        put(&mut hasher, Some(&attachment.guid));
        put(&mut hasher, attachment.mime_type.as_deref());
    }
    hasher.update([0xff_u8]);
    match reply {
        Some(ReplyPreview::Loaded(snippet)) => {
            hasher.update([1_u8]);
            put(&mut hasher, Some(snippet.guid.as_str()));
            put(&mut hasher, snippet.sender_name.as_deref());
            put(&mut hasher, snippet.text.as_deref());
        }
        Some(ReplyPreview::NotLoaded { guid }) => {
            hasher.update([2_u8]);
            put(&mut hasher, Some(guid.as_str()));
        }
        Some(ReplyPreview::Missing { guid }) => {
            hasher.update([3_u8]);
            put(&mut hasher, Some(guid.as_str()));
        }
        None => hasher.update([0_u8]),
    }
    hasher.finalize().into()
}
