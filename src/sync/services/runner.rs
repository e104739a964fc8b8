//! Wires the sync services onto tokio tasks.

use std::sync::Arc;
use std::time::Duration;

use mockable::Clock;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::message::ports::store::MessageStore;
use crate::sync::config::SyncConfig;
use crate::sync::ports::{RealtimeLink, RemoteSource};

use super::orchestrator::SyncOrchestrator;
use super::repair::RepairWorker;
use super::repair_queue::RepairQueue;
use super::writer::WritePath;

/// Running sync services: the writer, the repair worker and the two timer
/// loops.
///
/// Dropping the runtime leaves the tasks running; call
/// [`Self::shutdown`] to stop them.
pub struct SyncRuntime<S: ?Sized, R: ?Sized, L: ?Sized, C> {
    orchestrator: Arc<SyncOrchestrator<S, R, L, C>>,
    repairs: RepairQueue,
    tasks: Vec<JoinHandle<()>>,
}

impl<S, R, L, C> SyncRuntime<S, R, L, C>
where
    S: MessageStore + ?Sized + 'static,
    R: RemoteSource + ?Sized + 'static,
    L: RealtimeLink + ?Sized + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Spawns every sync task.
    #[must_use]
    pub fn start(
        store: Arc<S>,
        remote: Arc<R>,
        link: Arc<L>,
        clock: Arc<C>,
        config: SyncConfig,
    ) -> Self {
        let (writer, writer_task) = WritePath::spawn(Arc::clone(&store));
        let (repairs, requests) = RepairQueue::new();

        let worker = RepairWorker::new(
            Arc::clone(&store),
            Arc::clone(&remote),
            writer.clone(),
            repairs.clone(),
            Arc::clone(&clock),
            config.retry,
        );
        let poll_interval = config.poll_interval();
        let periodic_interval = config.periodic_interval();
        let orchestrator = Arc::new(SyncOrchestrator::new(
            store, remote, link, writer, clock, config,
        ));

        let tasks = vec![
            writer_task,
            tokio::spawn(worker.run(requests)),
            tokio::spawn(poll_loop(Arc::clone(&orchestrator), poll_interval)),
            tokio::spawn(periodic_loop(Arc::clone(&orchestrator), periodic_interval)),
        ];
        info!("sync runtime started");
        Self {
            orchestrator,
            repairs,
            tasks,
        }
    }

    /// Returns the orchestrator for host-driven channels.
    #[must_use]
    pub fn orchestrator(&self) -> Arc<SyncOrchestrator<S, R, L, C>> {
        Arc::clone(&self.orchestrator)
    }

    /// Returns the repair trigger to hand to the paging layer.
    #[must_use]
    pub fn repair_trigger(&self) -> RepairQueue {
        self.repairs.clone()
    }

    /// Stops every task and waits for them to finish.
    pub async fn shutdown(self) {
        for task in &self.tasks {
            task.abort();
        }
        for task in self.tasks {
            if let Err(err) = task.await
                && !err.is_cancelled()
            {
                warn!(error = %err, "sync task ended abnormally");
            }
        }
        info!("sync runtime stopped");
    }
}

fn ticker(period: Duration) -> time::Interval {
    let mut interval = time::interval_at(time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn poll_loop<S, R, L, C>(orchestrator: Arc<SyncOrchestrator<S, R, L, C>>, period: Duration)
where
    S: MessageStore + ?Sized,
    R: RemoteSource + ?Sized,
    L: RealtimeLink + ?Sized,
    C: Clock,
{
    let mut interval = ticker(period);
    loop {
        interval.tick().await;
        match orchestrator.poll_tick().await {
            Ok(Some(outcome)) => debug!(inserted = outcome.inserted.len(), "poll tick"),
            Ok(None) => {}
            Err(err) => warn!(error = %err, "poll failed"),
        }
    }
}

async fn periodic_loop<S, R, L, C>(
    orchestrator: Arc<SyncOrchestrator<S, R, L, C>>,
    period: Duration,
) where
    S: MessageStore + ?Sized,
    R: RemoteSource + ?Sized,
    L: RealtimeLink + ?Sized,
    C: Clock,
{
    let mut interval = ticker(period);
    loop {
        interval.tick().await;
        if let Err(err) = orchestrator.periodic_sweep().await {
            warn!(error = %err, "periodic sweep failed");
        }
    }
}
