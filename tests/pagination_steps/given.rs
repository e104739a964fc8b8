//! Given steps for pagination BDD scenarios.

use eyre::WrapErr;
use rstest_bdd_macros::given;
use scrollback::message::{
    domain::{ChatId, MessageBatch, SyncChannel, SyncRange, Timestamp},
    ports::store::MessageStore,
};

use super::world::{CHAT, PaginationWorld, run_async};
use crate::test_helpers::{conversation, message, with_gap};

const NEWEST: i64 = 100_000;

fn length(count: u64) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

#[given("a conversation of {count:u64} messages")]
fn conversation_of(world: &mut PaginationWorld, count: u64) -> Result<(), eyre::Report> {
    let rows = conversation(CHAT, length(count), NEWEST);
    run_async(world.store.merge(MessageBatch::of_messages(rows)))
        .wrap_err("seed conversation")?;
    Ok(())
}

#[given("a conversation of {count:u64} messages missing positions {first:usize} to {last:usize}")]
fn conversation_with_gap(
    world: &mut PaginationWorld,
    count: u64,
    first: usize,
    last: usize,
) -> Result<(), eyre::Report> {
    let all = conversation(CHAT, length(count), NEWEST);
    run_async(world.store.merge(with_gap(CHAT, &all, first..last + 1)))
        .wrap_err("seed gapped conversation")?;
    let segments = [(0, first.saturating_sub(1)), (last + 1, all.len().saturating_sub(1))];
    for (newest, oldest) in segments {
        let (Some(newest), Some(oldest)) = (all.get(newest), all.get(oldest)) else {
            continue;
        };
        let range = SyncRange::new(
            ChatId::new(CHAT),
            oldest.created_at(),
            newest.created_at(),
            Timestamp::from_millis(NEWEST),
            SyncChannel::Periodic,
        );
        run_async(world.store.record_sync_range(range)).wrap_err("record synced segment")?;
    }
    Ok(())
}

#[given(r#"messages "{older}" and "{newer}" sent at the same instant"#)]
fn same_instant(
    world: &mut PaginationWorld,
    older: String,
    newer: String,
) -> Result<(), eyre::Report> {
    let rows = vec![message(&older, CHAT, NEWEST), message(&newer, CHAT, NEWEST)];
    run_async(world.store.merge(MessageBatch::of_messages(rows))).wrap_err("seed pair")?;
    Ok(())
}

#[given(r#"a message "{guid}" in another conversation"#)]
fn stray_message(world: &mut PaginationWorld, guid: String) -> Result<(), eyre::Report> {
    let rows = vec![message(&guid, "elsewhere", NEWEST)];
    run_async(world.store.merge(MessageBatch::of_messages(rows))).wrap_err("seed stray")?;
    Ok(())
}
