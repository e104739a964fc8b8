//! Adapters for the sync ports.
//!
//! - [`memory::InMemoryRemote`]: a scriptable in-process server for tests
//!   and demos

pub mod memory;
