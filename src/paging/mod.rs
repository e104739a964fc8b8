//! Positional paging over the local message mirror.
//!
//! A conversation (one chat or a unified set of chats) is exposed as an
//! ordered collection: position 0 is the newest visible message. The
//! controller keeps a sparse window of hydrated items around the viewport
//! and asks the sync layer for repairs when local rows fall short.
//!
//! # Architecture
//!
//! - **Domain**: [`domain::SparseWindow`], [`domain::MessageView`],
//!   [`domain::PositionRange`], [`domain::Generation`]
//! - **Ports**: [`ports::OrderedCollection`] and [`ports::RepairTrigger`]
//! - **Services**: [`services::StoreSource`], [`services::PagingController`],
//!   the driver task and [`services::DeepLinkResolver`]

pub mod config;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
