//! Multi-channel synchronisation into the local mirror.
//!
//! Five channels keep the store current: realtime push, backup push, an
//! adaptive poll, resume-on-foreground and a periodic sweep. Gap and
//! message repairs raised by the paging layer arrive through the
//! [`services::RepairQueue`], which de-duplicates them before the
//! [`services::RepairWorker`] fetches anything.
//!
//! # Architecture
//!
//! - **Domain**: repair requests, backoff schedule, realtime health
//! - **Ports**: [`ports::RemoteSource`] and [`ports::RealtimeLink`]
//! - **Adapters**: [`adapters::memory::InMemoryRemote`]
//! - **Services**: [`services::WritePath`], [`services::SyncOrchestrator`],
//!   [`services::SyncRuntime`]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
