//! Storage adapters for the message mirror.
//!
//! # Available Adapters
//!
//! - [`memory::InMemoryMessageStore`]: thread-safe in-memory storage for tests
//! - [`sqlite::SqliteMessageStore`]: the on-device `SQLite` mirror, using
//!   Diesel ORM
//!
//! Both publish change notifications through a shared [`feed::ChangeFeed`].

pub mod feed;
pub mod memory;
pub mod sqlite;
