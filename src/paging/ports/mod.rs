//! Ports for the paging layer.

pub mod collection;
pub mod repair;

pub use collection::{OrderedCollection, SizeStream};
pub use repair::RepairTrigger;

#[cfg(test)]
pub use repair::MockRepairTrigger;
