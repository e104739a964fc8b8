//! Port trait definitions for the sync layer.

pub mod link;
pub mod remote;

pub use link::RealtimeLink;
pub use remote::{FetchBounds, RemoteError, RemoteResult, RemoteSource};

#[cfg(test)]
pub use link::MockRealtimeLink;
#[cfg(test)]
pub use remote::MockRemoteSource;
