//! Domain types for the sync layer.

mod backoff;
mod event;
mod health;
mod repair;

pub use backoff::Backoff;
pub use event::RealtimeEvent;
pub use health::RealtimeHealth;
pub use repair::{RepairKey, RepairRequest};
