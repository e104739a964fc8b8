//! Runs a [`PagingController`] on a tokio task.
//!
//! The driver owns the refresh loop: size emissions, debounced viewport
//! updates, jump commands and completed loads all arrive through one
//! `select!`. Loads run concurrently on a `JoinSet`; their results are
//! applied in completion order and stale ones are dropped by the
//! controller.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, warn};

use super::controller::{LoadPlan, LoadResult, PagingController, load_plan};
use crate::paging::config::PagingConfig;
use crate::paging::domain::{PositionRange, SparseWindow};
use crate::paging::ports::{OrderedCollection, SizeStream};

const COMMAND_CAPACITY: usize = 16;

/// Commands accepted by a running driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagingCommand {
    /// Re-centre on a position and reload around it.
    JumpTo {
        /// Target position.
        position: u64,
    },
    /// Reload the materialised range at the current size.
    Refresh,
}

/// Error returned when the driver has stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("paging driver has stopped")]
pub struct DriverStopped;

/// Cloneable command sender for a running driver.
#[derive(Debug, Clone)]
pub struct PagingCommands {
    sender: mpsc::Sender<PagingCommand>,
}

impl PagingCommands {
    /// Asks the driver to jump to `position`.
    ///
    /// # Errors
    ///
    /// Returns [`DriverStopped`] when the driver task has exited.
    pub async fn jump_to(&self, position: u64) -> Result<(), DriverStopped> {
        self.send(PagingCommand::JumpTo { position }).await
    }

    /// Asks the driver to reload the current range.
    ///
    /// # Errors
    ///
    /// Returns [`DriverStopped`] when the driver task has exited.
    pub async fn refresh(&self) -> Result<(), DriverStopped> {
        self.send(PagingCommand::Refresh).await
    }

    async fn send(&self, command: PagingCommand) -> Result<(), DriverStopped> {
        self.sender.send(command).await.map_err(|_| DriverStopped)
    }
}

/// Handle to a running driver.
///
/// Dropping the handle stops the driver.
#[derive(Debug)]
pub struct PagingHandle {
    visible: watch::Sender<PositionRange>,
    commands: PagingCommands,
    windows: watch::Receiver<Arc<SparseWindow>>,
    task: JoinHandle<()>,
}

impl PagingHandle {
    /// Reports the viewport. Rapid updates are coalesced.
    pub fn scroll_to(&self, visible: PositionRange) {
        self.visible.send_modify(|current| *current = visible);
    }

    /// Returns a command sender.
    #[must_use]
    pub fn commands(&self) -> PagingCommands {
        self.commands.clone()
    }

    /// Subscribes to published windows.
    #[must_use]
    pub fn windows(&self) -> watch::Receiver<Arc<SparseWindow>> {
        self.windows.clone()
    }

    /// Returns the last published window.
    #[must_use]
    pub fn current(&self) -> Arc<SparseWindow> {
        Arc::clone(&self.windows.borrow())
    }

    /// Stops the driver and waits for it to exit.
    pub async fn shutdown(self) {
        let Self {
            visible,
            commands,
            windows,
            task,
        } = self;
        drop((visible, commands, windows));
        if let Err(err) = task.await {
            warn!(error = %err, "paging driver ended abnormally");
        }
    }
}

/// Spawns a driver for `collection`.
///
/// Must be called from within a tokio runtime.
#[must_use]
pub fn spawn<O>(collection: Arc<O>, config: PagingConfig) -> PagingHandle
where
    O: OrderedCollection + 'static,
{
    let controller = PagingController::new(config.clone());
    let windows = controller.subscribe();
    let (visible, visible_rx) = watch::channel(controller.visible());
    let (sender, command_rx) = mpsc::channel(COMMAND_CAPACITY);
    let driver = Driver {
        controller,
        collection,
        debounce: config.debounce(),
        loads: JoinSet::new(),
    };
    let task = tokio::spawn(driver.run(visible_rx, command_rx));
    PagingHandle {
        visible,
        commands: PagingCommands { sender },
        windows,
        task,
    }
}

struct Driver<O: ?Sized> {
    controller: PagingController,
    collection: Arc<O>,
    debounce: std::time::Duration,
    loads: JoinSet<LoadResult>,
}

impl<O> Driver<O>
where
    O: OrderedCollection + 'static,
{
    async fn run(
        mut self,
        mut visible_rx: watch::Receiver<PositionRange>,
        mut command_rx: mpsc::Receiver<PagingCommand>,
    ) {
        let (size_tx, mut size_rx) = watch::channel(None::<u64>);
        let mut sizes = self.collection.observe_size();
        let forwarder = tokio::spawn(async move {
            while let Some(size) = sizes.next().await {
                if size_tx.send(Some(size)).is_err() {
                    break;
                }
            }
        });

        let mut deadline: Option<Instant> = None;
        loop {
            tokio::select! {
                changed = size_rx.changed() => {
                    if changed.is_err() {
                        debug!("size stream ended; stopping paging driver");
                        break;
                    }
                    let latest = *size_rx.borrow_and_update();
                    if let Some(total) = latest {
                        let plan = self.controller.on_size(total);
                        self.dispatch(plan);
                    }
                }
                changed = visible_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    deadline = Some(Instant::now() + self.debounce);
                }
                () = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    deadline = None;
                    let visible = *visible_rx.borrow_and_update();
                    let plan = self.controller.set_visible(visible);
                    self.dispatch(plan);
                }
                command = command_rx.recv() => {
                    let plan = match command {
                        Some(PagingCommand::JumpTo { position }) => self.controller.jump_to(position),
                        Some(PagingCommand::Refresh) => self.controller.refresh(),
                        None => break,
                    };
                    self.dispatch(plan);
                }
                Some(joined) = self.loads.join_next(), if !self.loads.is_empty() => {
                    match joined {
                        Ok(result) => {
                            self.controller.apply(result);
                        }
                        Err(err) => warn!(error = %err, "load task failed"),
                    }
                }
            }
        }
        forwarder.abort();
        self.loads.abort_all();
    }

    fn dispatch(&mut self, plan: LoadPlan) {
        if plan.is_empty() {
            self.controller.apply(LoadResult::empty(&plan));
            return;
        }
        self.loads
            .spawn(load_plan(Arc::clone(&self.collection), plan));
    }
}
