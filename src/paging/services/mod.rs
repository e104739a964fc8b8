//! Paging services: the store-backed source, the controller and its
//! driver.

pub mod controller;
pub mod deep_link;
pub mod driver;
mod hydrate;
pub mod layout;
pub mod source;

pub use controller::{LoadPlan, LoadResult, PagingController, Phase, load_plan};
pub use deep_link::{DeepLinkError, DeepLinkOutcome, DeepLinkResolver};
pub use driver::{DriverStopped, PagingCommand, PagingCommands, PagingHandle, spawn};
pub use hydrate::Hydrated;
pub use layout::ChatCount;
pub use source::{SizeObserver, StoreSource};
