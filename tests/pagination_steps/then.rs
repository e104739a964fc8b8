//! Then steps for pagination BDD scenarios.

use std::collections::HashSet;

use eyre::{WrapErr, eyre};
use rstest_bdd_macros::then;
use scrollback::message::domain::MessageGuid;
use scrollback::paging::{domain::Availability, ports::OrderedCollection};

use super::world::{PaginationWorld, run_async};
use crate::test_helpers::Repair;

#[then("the first page holds {count:usize} messages")]
fn first_page_holds(world: &PaginationWorld, count: usize) {
    assert_eq!(world.first_page.len(), count);
}

#[then("the second page holds {count:usize} messages")]
fn second_page_holds(world: &PaginationWorld, count: usize) {
    assert_eq!(world.second_page.len(), count);
}

#[then(r#"the first page places "{guid}" at position {position:u64}"#)]
fn page_places(world: &PaginationWorld, guid: String, position: u64) {
    let placed = world
        .first_page
        .iter()
        .find(|(_, view)| view.guid().as_str() == guid)
        .map(|(at, _)| *at);
    assert_eq!(placed, Some(position));
}

#[then("no message appears in both pages")]
fn pages_disjoint(world: &PaginationWorld) {
    let first: HashSet<&MessageGuid> = world.first_page.iter().map(|(_, view)| view.guid()).collect();
    assert!(world.second_page.iter().all(|(_, view)| !first.contains(view.guid())));
}

#[then(r#"the first page lists "{newer}" before "{older}""#)]
fn page_order(world: &PaginationWorld, newer: String, older: String) {
    let guids: Vec<&str> = world
        .first_page
        .iter()
        .map(|(_, view)| view.guid().as_str())
        .collect();
    assert_eq!(guids, vec![newer.as_str(), older.as_str()]);
}

#[then("no position is found")]
fn no_position(world: &PaginationWorld) {
    assert_eq!(world.position, Some(None));
}

#[then("no repair is requested")]
fn no_repair(world: &PaginationWorld) {
    assert!(world.repair.requests().is_empty());
}

#[then("the position is {position:u64}")]
fn position_is(world: &PaginationWorld, position: u64) {
    assert_eq!(world.position, Some(Some(position)));
}

#[then(r#"the key at that position is "{guid}""#)]
fn key_at_position(world: &PaginationWorld, guid: String) -> Result<(), eyre::Report> {
    let position = world
        .position
        .flatten()
        .ok_or_else(|| eyre!("expected a resolved position"))?;
    let key = run_async(world.source.get_key(position)).wrap_err("read key")?;
    assert_eq!(key, Some(MessageGuid::new(guid)));
    Ok(())
}

#[then("exactly one range repair covers positions {first:u64} to {last:u64}")]
fn one_range_repair(world: &PaginationWorld, first: u64, last: u64) {
    assert_eq!(
        world.repair.requests(),
        vec![Repair::Range {
            start: first,
            count: last - first + 1,
        }]
    );
}

#[then(r#""{guid}" cannot be loaded by key"#)]
fn not_loadable(world: &PaginationWorld, guid: String) -> Result<(), eyre::Report> {
    let loaded = run_async(world.source.load_by_key(&MessageGuid::new(guid))).wrap_err("load")?;
    assert!(loaded.is_none());
    Ok(())
}

#[then("the size is {size:u64}")]
fn size_is(world: &PaginationWorld, size: u64) -> Result<(), eyre::Report> {
    let actual = run_async(world.source.size()).wrap_err("size")?;
    assert_eq!(actual, size);
    Ok(())
}

#[then(r#""{guid}" is reported as loading"#)]
fn reported_loading(world: &PaginationWorld, guid: String) {
    assert!(
        matches!(world.availability, Some(Availability::Loading { .. })),
        "{guid} should still be loading"
    );
}

#[then(r#""{guid}" is reported as unavailable"#)]
fn reported_unavailable(world: &PaginationWorld, guid: String) {
    assert_eq!(
        world.availability,
        Some(Availability::Unavailable),
        "{guid} should have timed out"
    );
}

#[then(r#"exactly one message repair was requested for "{guid}""#)]
fn one_message_repair(world: &PaginationWorld, guid: String) {
    assert_eq!(
        world.repair.requests(),
        vec![Repair::Message(MessageGuid::new(guid))]
    );
}
