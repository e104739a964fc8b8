//! Shared world state for pagination BDD scenarios.

use std::sync::Arc;

use rstest::fixture;
use scrollback::message::adapters::memory::InMemoryMessageStore;
use scrollback::paging::{
    config::PagingConfig,
    domain::{Availability, MessageView},
    services::StoreSource,
};

use crate::test_helpers::{ManualClock, RecordingRepair, chat};

/// Collection type used by the BDD world.
pub type TestSource = StoreSource<InMemoryMessageStore, RecordingRepair, ManualClock>;

/// Chat every scenario conversation lives in.
pub const CHAT: &str = "c";

/// Scenario world for pagination behaviour tests.
pub struct PaginationWorld {
    pub store: Arc<InMemoryMessageStore>,
    pub repair: Arc<RecordingRepair>,
    pub clock: Arc<ManualClock>,
    pub source: TestSource,
    pub first_page: Vec<(u64, Arc<MessageView>)>,
    pub second_page: Vec<(u64, Arc<MessageView>)>,
    pub position: Option<Option<u64>>,
    pub availability: Option<Availability>,
}

impl PaginationWorld {
    /// Creates a world over an empty store.
    #[must_use]
    pub fn new() -> Self {
        let store = Arc::new(InMemoryMessageStore::new());
        let repair = Arc::new(RecordingRepair::default());
        let clock = Arc::new(ManualClock::at(1_000_000));
        let source = StoreSource::new(
            Arc::clone(&store),
            Arc::clone(&repair),
            Arc::clone(&clock),
            chat(CHAT),
            &PagingConfig::default(),
        );
        Self {
            store,
            repair,
            clock,
            source,
            first_page: Vec::new(),
            second_page: Vec::new(),
            position: None,
            availability: None,
        }
    }
}

impl Default for PaginationWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> PaginationWorld {
    PaginationWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
