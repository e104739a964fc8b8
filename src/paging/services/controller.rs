//! The paging controller: visible range, generation and window rebuilds.
//!
//! The controller is a plain state machine. It never awaits: callers feed
//! it size emissions and visible-range changes, run the [`LoadPlan`]s it
//! returns with [`load_plan`], and hand the results back to
//! [`PagingController::apply`]. The driver does this on a tokio task; tests
//! can do it step by step.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::paging::config::{Eviction, PagingConfig};
use crate::paging::domain::range::union_of;
use crate::paging::domain::{Generation, MessageView, PositionRange, SparseWindow};
use crate::paging::ports::OrderedCollection;

/// Where the controller is in its refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Nothing in flight.
    #[default]
    Idle,
    /// A new size was recorded.
    Sizing,
    /// Loads were issued and have not all been applied.
    Loading,
    /// A result is being merged into the window.
    Applying,
}

/// Position ranges to load, tagged with the generation they were planned
/// for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadPlan {
    /// Generation current when the plan was made.
    pub generation: Generation,
    /// Disjoint ranges to load, sorted.
    pub ranges: Vec<PositionRange>,
}

impl LoadPlan {
    /// Returns `true` when there is nothing to load.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// Items loaded for a plan.
#[derive(Debug, Clone)]
pub struct LoadResult {
    /// Generation the plan was made for.
    pub generation: Generation,
    /// Ranges that were requested.
    pub requested: Vec<PositionRange>,
    /// Loaded items by position.
    pub entries: Vec<(u64, Arc<MessageView>)>,
}

impl LoadResult {
    /// A result carrying no items for `plan`.
    #[must_use]
    pub fn empty(plan: &LoadPlan) -> Self {
        Self {
            generation: plan.generation,
            requested: plan.ranges.clone(),
            entries: Vec::new(),
        }
    }
}

/// Runs a plan against a collection.
///
/// Store failures are logged and the affected range is left as holes.
pub async fn load_plan<O>(collection: Arc<O>, plan: LoadPlan) -> LoadResult
where
    O: OrderedCollection + ?Sized,
{
    let mut entries = Vec::new();
    for range in &plan.ranges {
        match collection.load(range.start(), range.len()).await {
            Ok(views) => entries.extend(views),
            Err(err) => warn!(%range, error = %err, "load failed; leaving placeholders"),
        }
    }
    LoadResult {
        generation: plan.generation,
        requested: plan.ranges,
        entries,
    }
}

/// Owns the visible range and publishes rebuilt windows.
#[derive(Debug)]
pub struct PagingController {
    config: PagingConfig,
    phase: Phase,
    total: u64,
    generation: Generation,
    visible: PositionRange,
    in_flight: Vec<PositionRange>,
    window: Arc<SparseWindow>,
    windows: watch::Sender<Arc<SparseWindow>>,
}

impl PagingController {
    /// Creates a controller whose viewport starts at the newest page.
    #[must_use]
    pub fn new(config: PagingConfig) -> Self {
        let window = Arc::new(SparseWindow::empty());
        let (windows, _) = watch::channel(Arc::clone(&window));
        Self {
            visible: PositionRange::with_len(0, config.page_size),
            config,
            phase: Phase::Idle,
            total: 0,
            generation: Generation::default(),
            in_flight: Vec::new(),
            window,
            windows,
        }
    }

    /// Subscribes to published windows.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<SparseWindow>> {
        self.windows.subscribe()
    }

    /// Returns the last published window.
    #[must_use]
    pub fn window(&self) -> Arc<SparseWindow> {
        Arc::clone(&self.window)
    }

    /// Returns the current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns the last recorded size.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Returns the current generation.
    #[must_use]
    pub const fn generation(&self) -> Generation {
        self.generation
    }

    /// Returns the visible range.
    #[must_use]
    pub const fn visible(&self) -> PositionRange {
        self.visible
    }

    /// Records a size emission and plans a full reload.
    pub fn on_size(&mut self, total: u64) -> LoadPlan {
        self.phase = Phase::Sizing;
        self.total = total;
        self.generation = self.generation.next();
        self.in_flight.clear();
        debug!(total, generation = %self.generation, "size changed");
        self.plan()
    }

    /// Moves the viewport and plans whatever it now lacks.
    pub fn set_visible(&mut self, visible: PositionRange) -> LoadPlan {
        self.visible = visible;
        self.plan()
    }

    /// Centres the viewport on `position` and plans a discontinuous load.
    pub fn jump_to(&mut self, position: u64) -> LoadPlan {
        let len = if self.visible.is_empty() {
            self.config.page_size
        } else {
            self.visible.len()
        };
        self.visible = PositionRange::centred_on(position, len, self.total);
        debug!(position, visible = %self.visible, "jumping");
        self.plan()
    }

    /// Forces a full reload at the current size.
    pub fn refresh(&mut self) -> LoadPlan {
        self.on_size(self.total)
    }

    /// Visible range plus prefetch, clamped to the size.
    #[must_use]
    pub const fn materialize_range(&self) -> PositionRange {
        self.visible
            .expand(self.config.prefetch_distance)
            .clamp(self.total)
    }

    /// Materialize range plus the buffer margin.
    #[must_use]
    pub const fn retention_range(&self) -> PositionRange {
        self.materialize_range()
            .expand(self.config.retention_margin())
            .clamp(self.total)
    }

    fn plan(&mut self) -> LoadPlan {
        let materialize = self.materialize_range();
        let ranges = if self.window.generation() == self.generation {
            let mut covered = self.window.loaded_ranges().to_vec();
            covered.extend(self.in_flight.iter().copied());
            materialize.subtract(&union_of(covered))
        } else if self.config.eviction == Eviction::Disabled {
            let mut wanted: Vec<PositionRange> = self
                .window
                .loaded_ranges()
                .iter()
                .map(|range| range.clamp(self.total))
                .collect();
            wanted.push(materialize);
            let covered = union_of(self.in_flight.clone());
            union_of(wanted)
                .into_iter()
                .flat_map(|range| range.subtract(&covered))
                .collect()
        } else {
            let covered = union_of(self.in_flight.clone());
            materialize.subtract(&covered)
        };
        self.in_flight.extend(ranges.iter().copied());
        self.in_flight = union_of(std::mem::take(&mut self.in_flight));
        self.phase = Phase::Loading;
        LoadPlan {
            generation: self.generation,
            ranges,
        }
    }

    /// Merges a load result and publishes the rebuilt window.
    ///
    /// Returns `None` when the result belongs to an older generation.
    pub fn apply(&mut self, result: LoadResult) -> Option<Arc<SparseWindow>> {
        if result.generation != self.generation {
            debug!(
                stale = %result.generation,
                current = %self.generation,
                "discarding stale load result"
            );
            return None;
        }
        self.phase = Phase::Applying;
        for done in &result.requested {
            self.in_flight = self
                .in_flight
                .iter()
                .flat_map(|range| range.subtract(std::slice::from_ref(done)))
                .collect();
        }

        let keep_all = self.config.eviction == Eviction::Disabled;
        let retention = self.retention_range();
        let retained = |position: u64| keep_all || retention.contains(position);
        let previous: Vec<(u64, Arc<MessageView>)> = if self.window.generation() == self.generation {
            self.window
                .iter()
                .filter(|(position, _)| retained(*position))
                .map(|(position, view)| (position, Arc::clone(view)))
                .collect()
        } else {
            Vec::new()
        };
        let fresh = result
            .entries
            .into_iter()
            .filter(|(position, _)| retained(*position));
        let window = Arc::new(SparseWindow::build(
            self.total,
            self.generation,
            self.visible,
            previous.into_iter().chain(fresh),
        ));
        self.window = Arc::clone(&window);
        self.windows
            .send_modify(|published| *published = Arc::clone(&window));
        self.phase = if self.in_flight.is_empty() {
            Phase::Idle
        } else {
            Phase::Loading
        };
        Some(window)
    }
}
