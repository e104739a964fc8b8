//! Scrollback: paged, self-repairing message history for chat clients.
//!
//! A conversation of any length is presented as a positional list whose
//! rows are loaded lazily around the viewport. The list reads from a local
//! mirror of the server's messages, which five independent sync channels
//! keep current. When the mirror turns out to be short, the paging layer
//! asks the sync layer to repair it and shows placeholders meanwhile.
//!
//! # Architecture
//!
//! Scrollback follows hexagonal architecture principles:
//!
//! - **Domain**: Pure value types with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (`SQLite`, in-memory)
//!
//! # Modules
//!
//! - [`message`]: The message model, ordering rule and local store
//! - [`paging`]: Ordered collection, sparse window and paging controller
//! - [`sync`]: Write path, repair queue and the multi-channel orchestrator
//! - [`config`]: Engine configuration file

pub mod config;
pub mod message;
pub mod paging;
pub mod sync;

#[cfg(test)]
pub(crate) mod test_support;
