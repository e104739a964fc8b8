//! Domain types for the local message mirror.
//!
//! Pure value types with no infrastructure dependencies: identifiers, the
//! message record and its sort key, per-chat summaries, roster entries,
//! tombstones and sync ranges.

mod attachment;
mod batch;
mod ids;
mod message;
mod order;
mod participant;
mod summary;
mod sync_range;
mod timestamp;
mod tombstone;

pub use attachment::Attachment;
pub use batch::{ChatTotal, MessageBatch};
pub use ids::{ChatId, ChatSet, MessageGuid};
pub use message::{
    Message, MessageBuilder, ReactionKind, ReactionRef, Sender, strip_target_prefix,
};
pub use order::SortKey;
pub use participant::Participant;
pub use summary::ChatSummary;
pub use sync_range::{SyncChannel, SyncCoverage, SyncRange};
pub use timestamp::Timestamp;
pub use tombstone::Tombstone;
