//! When steps for pagination BDD scenarios.

use eyre::WrapErr;
use rstest_bdd_macros::when;
use scrollback::message::{
    domain::{MessageBatch, MessageGuid, Timestamp, Tombstone},
    ports::store::MessageStore,
};
use scrollback::paging::ports::OrderedCollection;

use super::world::{CHAT, PaginationWorld, run_async};
use crate::test_helpers::message;

#[when("positions {first:u64} to {last:u64} are loaded as the first page")]
fn load_first_page(world: &mut PaginationWorld, first: u64, last: u64) -> Result<(), eyre::Report> {
    world.first_page = run_async(world.source.load(first, last - first + 1))
        .wrap_err("load first page")?;
    Ok(())
}

#[when("positions {first:u64} to {last:u64} are loaded as the second page")]
fn load_second_page(
    world: &mut PaginationWorld,
    first: u64,
    last: u64,
) -> Result<(), eyre::Report> {
    world.second_page = run_async(world.source.load(first, last - first + 1))
        .wrap_err("load second page")?;
    Ok(())
}

#[when(r#"the position of "{guid}" is requested"#)]
fn request_position(world: &mut PaginationWorld, guid: String) -> Result<(), eyre::Report> {
    let position = run_async(world.source.message_position(&MessageGuid::new(guid)))
        .wrap_err("resolve position")?;
    world.position = Some(position);
    Ok(())
}

#[when(r#"message "{guid}" is deleted"#)]
fn delete_message(world: &mut PaginationWorld, guid: String) -> Result<(), eyre::Report> {
    let tombstone = Tombstone::new(MessageGuid::new(guid), Timestamp::from_millis(200_000));
    run_async(world.store.record_tombstone(tombstone)).wrap_err("record tombstone")?;
    Ok(())
}

#[when(r#"message "{guid}" is delivered again"#)]
fn redeliver(world: &mut PaginationWorld, guid: String) -> Result<(), eyre::Report> {
    deliver(world, &guid, 1)
}

#[when(r#"message "{guid}" is delivered twice"#)]
fn deliver_twice(world: &mut PaginationWorld, guid: String) -> Result<(), eyre::Report> {
    deliver(world, &guid, 2)
}

fn deliver(world: &PaginationWorld, guid: &str, times: usize) -> Result<(), eyre::Report> {
    for _ in 0..times {
        let batch = MessageBatch::of_messages(vec![message(guid, CHAT, 99_970)]);
        run_async(world.store.merge(batch)).wrap_err("deliver message")?;
    }
    Ok(())
}

#[when(r#"the availability of "{guid}" is checked"#)]
fn check_availability(world: &mut PaginationWorld, guid: String) -> Result<(), eyre::Report> {
    let availability = run_async(world.source.availability(&MessageGuid::new(guid)))
        .wrap_err("check availability")?;
    world.availability = Some(availability);
    Ok(())
}

#[when("{seconds:i64} seconds pass")]
fn time_passes(world: &mut PaginationWorld, seconds: i64) {
    world.clock.advance(seconds.saturating_mul(1_000));
}
