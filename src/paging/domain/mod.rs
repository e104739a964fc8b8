//! Domain types for the paging layer.

mod availability;
mod generation;
mod layout;
pub(crate) mod range;
mod view;
mod window;

pub use availability::{Availability, AvailabilityTracker};
pub use generation::Generation;
pub use layout::PositionLayout;
pub use range::PositionRange;
pub use view::{AppliedReaction, MessageView, ReplyPreview, ReplySnippet};
pub use window::{Slot, SparseWindow};
