//! Sync services: the write path, repairs, the channel orchestrator and
//! the runtime that schedules them.

mod fetch;
pub mod orchestrator;
pub mod repair;
pub mod repair_queue;
pub mod retry;
pub mod runner;
pub mod writer;

pub use orchestrator::SyncOrchestrator;
pub use repair::RepairWorker;
pub use repair_queue::RepairQueue;
pub use retry::with_retry;
pub use runner::SyncRuntime;
pub use writer::WritePath;
