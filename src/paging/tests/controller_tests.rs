//! Controller state machine tests, driven step by step.

use std::sync::Arc;

use crate::paging::{
    config::{Eviction, PagingConfig},
    domain::{MessageView, PositionRange, Slot, SparseWindow},
    services::{LoadPlan, LoadResult, PagingController, Phase},
};
use crate::test_support::message;
use rstest::{fixture, rstest};

fn view(position: u64) -> Arc<MessageView> {
    let millis = 1_000_000 - i64::try_from(position).expect("position fits") * 10;
    Arc::new(MessageView::new(
        message(&format!("m{position:05}"), "c", millis),
        Vec::new(),
        Vec::new(),
        None,
        None,
    ))
}

/// Completes a plan as if every requested position were present.
fn fulfil(plan: &LoadPlan) -> LoadResult {
    LoadResult {
        generation: plan.generation,
        requested: plan.ranges.clone(),
        entries: plan
            .ranges
            .iter()
            .flat_map(|range| range.positions())
            .map(|position| (position, view(position)))
            .collect(),
    }
}

fn small_config(eviction: Eviction) -> PagingConfig {
    PagingConfig {
        page_size: 10,
        prefetch_distance: 5,
        buffer_pages: 1,
        eviction,
        ..PagingConfig::default()
    }
}

#[fixture]
fn controller() -> PagingController {
    PagingController::new(small_config(Eviction::Enabled))
}

#[rstest]
fn size_emission_bumps_generation_and_plans_materialize_range(mut controller: PagingController) {
    let before = controller.generation();

    let plan = controller.on_size(100);

    assert!(controller.generation() > before);
    assert_eq!(plan.generation, controller.generation());
    assert_eq!(plan.ranges, vec![PositionRange::new(0, 15)]);
    assert_eq!(controller.phase(), Phase::Loading);
}

#[rstest]
fn materialize_range_is_clamped_to_size(mut controller: PagingController) {
    let plan = controller.on_size(7);

    assert_eq!(plan.ranges, vec![PositionRange::new(0, 7)]);
}

#[rstest]
fn applying_publishes_a_rebuilt_window(mut controller: PagingController) {
    let mut windows = controller.subscribe();
    let plan = controller.on_size(100);

    let published = controller.apply(fulfil(&plan)).expect("result is current");

    assert_eq!(published.total_size(), 100);
    assert!(published.is_loaded(14));
    assert!(matches!(published.get(15), Slot::Pending));
    assert!(matches!(published.get(100), Slot::OutOfBounds));
    assert!(windows.has_changed().expect("sender alive"));
    assert!(Arc::ptr_eq(&windows.borrow_and_update(), &published));
    assert_eq!(controller.phase(), Phase::Idle);
}

#[rstest]
fn stale_results_are_discarded(mut controller: PagingController) {
    let stale_plan = controller.on_size(100);
    let current_plan = controller.on_size(103);

    let stale = controller.apply(fulfil(&stale_plan));
    let current = controller.apply(fulfil(&current_plan));

    assert!(stale.is_none());
    let window = current.expect("current result applies");
    assert_eq!(window.total_size(), 103);
    assert_eq!(window.generation(), current_plan.generation);
}

#[rstest]
fn scrolling_plans_only_missing_positions(mut controller: PagingController) {
    let plan = controller.on_size(100);
    controller.apply(fulfil(&plan));

    let scrolled = controller.set_visible(PositionRange::new(10, 20));

    assert_eq!(scrolled.ranges, vec![PositionRange::new(15, 25)]);
}

#[rstest]
fn in_flight_ranges_are_not_planned_twice(mut controller: PagingController) {
    let first = controller.on_size(100);

    let again = controller.set_visible(PositionRange::new(0, 10));

    assert_eq!(first.ranges, vec![PositionRange::new(0, 15)]);
    assert!(again.is_empty());
}

#[rstest]
fn far_positions_are_evicted(mut controller: PagingController) {
    let plan = controller.on_size(200);
    controller.apply(fulfil(&plan));

    let far = controller.set_visible(PositionRange::new(100, 110));
    let window = controller.apply(fulfil(&far)).expect("result is current");

    assert!(!window.is_loaded(0));
    assert!(window.is_loaded(100));
    assert_eq!(window.loaded_ranges(), &[PositionRange::new(95, 115)]);
}

#[rstest]
fn positions_inside_the_buffer_survive_eviction(mut controller: PagingController) {
    let plan = controller.on_size(200);
    controller.apply(fulfil(&plan));

    let near = controller.set_visible(PositionRange::new(20, 30));
    let window = controller.apply(fulfil(&near)).expect("result is current");

    // retention is 15..35 expanded by one page: 5..45
    assert!(!window.is_loaded(4));
    assert!(window.is_loaded(5));
    assert!(window.is_loaded(34));
}

#[rstest]
fn disabled_eviction_keeps_everything_resident() {
    let mut controller = PagingController::new(small_config(Eviction::Disabled));
    let plan = controller.on_size(200);
    controller.apply(fulfil(&plan));

    let far = controller.set_visible(PositionRange::new(100, 110));
    let window = controller.apply(fulfil(&far)).expect("result is current");

    assert!(window.is_loaded(0));
    assert!(window.is_loaded(100));
}

#[rstest]
fn disabled_eviction_reloads_resident_ranges_after_resize() {
    let mut controller = PagingController::new(small_config(Eviction::Disabled));
    let plan = controller.on_size(200);
    controller.apply(fulfil(&plan));
    let far = controller.set_visible(PositionRange::new(100, 110));
    controller.apply(fulfil(&far));

    let resized = controller.on_size(201);

    assert_eq!(
        resized.ranges,
        vec![PositionRange::new(0, 15), PositionRange::new(95, 115)]
    );
}

#[rstest]
fn jump_recentres_without_loading_intervening_pages(mut controller: PagingController) {
    let plan = controller.on_size(10_000);
    controller.apply(fulfil(&plan));

    let jump = controller.jump_to(5_000);

    assert_eq!(controller.visible(), PositionRange::new(4_995, 5_005));
    assert_eq!(jump.ranges, vec![PositionRange::new(4_990, 5_010)]);
}

#[rstest]
fn jump_near_the_end_stays_in_bounds(mut controller: PagingController) {
    controller.on_size(40);

    controller.jump_to(39);

    assert_eq!(controller.visible(), PositionRange::new(30, 40));
}

#[rstest]
fn empty_plan_still_publishes_the_new_size(mut controller: PagingController) {
    let plan = controller.on_size(0);
    assert!(plan.is_empty());

    let window = controller
        .apply(LoadResult::empty(&plan))
        .expect("result is current");

    assert_eq!(window.total_size(), 0);
    assert_eq!(*window, SparseWindow::build(0, plan.generation, PositionRange::empty(), Vec::new()));
}

#[rstest]
fn shrinking_drops_entries_past_the_end(mut controller: PagingController) {
    let plan = controller.on_size(12);
    controller.apply(fulfil(&plan));

    let shrunk = controller.on_size(8);
    let window = controller.apply(fulfil(&shrunk)).expect("result is current");

    assert_eq!(window.loaded_ranges(), &[PositionRange::new(0, 8)]);
    assert!(matches!(window.get(9), Slot::OutOfBounds));
}
