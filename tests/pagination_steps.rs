//! Behaviour tests for paging a conversation from the local mirror.

#[path = "pagination_steps/mod.rs"]
mod pagination_steps;
mod test_helpers;

use pagination_steps::world::{PaginationWorld, world};
use rstest_bdd_macros::scenario;

#[scenario(
    path = "tests/features/pagination.feature",
    name = "Consecutive pages do not overlap"
)]
#[tokio::test(flavor = "multi_thread")]
async fn consecutive_pages(world: PaginationWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/pagination.feature",
    name = "Equal timestamps are ordered by GUID descending"
)]
#[tokio::test(flavor = "multi_thread")]
async fn equal_timestamps(world: PaginationWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/pagination.feature",
    name = "A message of another conversation has no position"
)]
#[tokio::test(flavor = "multi_thread")]
async fn other_conversation(world: PaginationWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/pagination.feature",
    name = "A known message round-trips through its position"
)]
#[tokio::test(flavor = "multi_thread")]
async fn position_round_trip(world: PaginationWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/pagination.feature",
    name = "A gap in the middle requests exactly the missing range"
)]
#[tokio::test(flavor = "multi_thread")]
async fn middle_gap(world: PaginationWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/pagination.feature",
    name = "A tombstoned message is never resurrected"
)]
#[tokio::test(flavor = "multi_thread")]
async fn tombstone(world: PaginationWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/pagination.feature",
    name = "Duplicate delivery counts a message once"
)]
#[tokio::test(flavor = "multi_thread")]
async fn duplicate_delivery(world: PaginationWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/pagination.feature",
    name = "An unknown message is repaired once and times out as unavailable"
)]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_message_times_out(world: PaginationWorld) {
    let _ = world;
}
