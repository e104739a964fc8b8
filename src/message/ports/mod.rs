//! Port trait definitions for the message mirror.

pub mod store;

pub use store::{ChangeKind, LocalEdit, MergeOutcome, MessageStore, StoreChange};
