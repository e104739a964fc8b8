//! The ordered collection and sync channels over the `SQLite` mirror.

use std::collections::HashSet;
use std::sync::Arc;

use scrollback::message::{
    adapters::sqlite::SqliteMessageStore,
    domain::{MessageBatch, MessageGuid, SyncChannel, Timestamp, Tombstone},
    ports::store::MessageStore,
};
use scrollback::paging::{config::PagingConfig, ports::OrderedCollection, services::StoreSource};
use scrollback::sync::{
    adapters::memory::InMemoryRemote,
    config::SyncConfig,
    domain::RealtimeEvent,
    services::{SyncOrchestrator, WritePath},
};

use crate::test_helpers::{
    ManualClock, RecordingRepair, Repair, chat, conversation, message, with_gap,
};

type SqliteSource = StoreSource<SqliteMessageStore, RecordingRepair, ManualClock>;

fn open() -> Arc<SqliteMessageStore> {
    Arc::new(SqliteMessageStore::open_in_memory().expect("sqlite should open"))
}

fn source(store: &Arc<SqliteMessageStore>, repair: &Arc<RecordingRepair>) -> SqliteSource {
    StoreSource::new(
        Arc::clone(store),
        Arc::clone(repair),
        Arc::new(ManualClock::at(1_000_000)),
        chat("c"),
        &PagingConfig::default(),
    )
}

#[tokio::test]
async fn consecutive_pages_do_not_overlap() {
    let store = open();
    let repair = Arc::new(RecordingRepair::default());
    store
        .merge(MessageBatch::of_messages(conversation("c", 120, 100_000)))
        .await
        .expect("seed");
    let collection = source(&store, &repair);

    let first = collection.load(0, 100).await.expect("first page");
    let second = collection.load(100, 20).await.expect("second page");

    let first_guids: HashSet<MessageGuid> = first.iter().map(|(_, v)| v.guid().clone()).collect();
    let second_guids: HashSet<MessageGuid> = second.iter().map(|(_, v)| v.guid().clone()).collect();
    assert_eq!(first.len(), 100);
    assert_eq!(second.len(), 20);
    assert!(first_guids.is_disjoint(&second_guids));
    assert!(repair.requests().is_empty());
}

#[tokio::test]
async fn equal_timestamps_order_by_guid_descending() {
    let store = open();
    let repair = Arc::new(RecordingRepair::default());
    store
        .merge(MessageBatch::of_messages(vec![
            message("a", "c", 500),
            message("b", "c", 500),
        ]))
        .await
        .expect("seed");
    let collection = source(&store, &repair);

    let rows = collection.load(0, 2).await.expect("load");
    let guids: Vec<&str> = rows.iter().map(|(_, v)| v.guid().as_str()).collect();

    assert_eq!(guids, vec!["b", "a"]);
    for (position, view) in &rows {
        assert_eq!(
            collection
                .message_position(view.guid())
                .await
                .expect("position"),
            Some(*position)
        );
        assert_eq!(
            collection.get_key(*position).await.expect("key").as_ref(),
            Some(view.guid())
        );
    }
}

#[tokio::test]
async fn unknown_messages_raise_one_repair_request() {
    let store = open();
    let repair = Arc::new(RecordingRepair::default());
    let collection = source(&store, &repair);

    let position = collection
        .message_position(&MessageGuid::new("elsewhere"))
        .await
        .expect("position");

    assert_eq!(position, None);
    assert_eq!(
        repair.requests(),
        vec![Repair::Message(MessageGuid::new("elsewhere"))]
    );
}

#[tokio::test]
async fn short_tail_requests_the_missing_positions() {
    let store = open();
    let repair = Arc::new(RecordingRepair::default());
    store
        .merge(with_gap("c", &conversation("c", 12, 5_000), 8..12))
        .await
        .expect("seed");
    let collection = source(&store, &repair);

    assert_eq!(collection.size().await.expect("size"), 12);
    let rows = collection.load(0, 12).await.expect("load");

    assert_eq!(rows.len(), 8);
    assert_eq!(repair.requests(), vec![Repair::Range { start: 8, count: 4 }]);
}

#[tokio::test]
async fn sync_channels_write_through_one_path() {
    let store = open();
    let remote = Arc::new(InMemoryRemote::new());
    remote
        .publish(MessageBatch::of_messages(conversation("c", 8, 50_000)))
        .expect("publish");
    let (writer, _task) = WritePath::spawn(Arc::clone(&store));
    let clock = Arc::new(ManualClock::at(1_000_000));
    let orchestrator = SyncOrchestrator::new(
        Arc::clone(&store),
        Arc::clone(&remote),
        Arc::clone(&remote),
        writer,
        Arc::clone(&clock),
        SyncConfig::default(),
    );
    orchestrator.view_opened(chat("c")).await;

    let resumed = orchestrator
        .resume()
        .await
        .expect("resume")
        .expect("view is open");
    let redelivered = orchestrator
        .on_realtime(RealtimeEvent::Messages(MessageBatch::of_messages(
            conversation("c", 2, 50_000),
        )))
        .await
        .expect("realtime");
    orchestrator
        .on_realtime(RealtimeEvent::Deleted(Tombstone::new(
            MessageGuid::new("c-0000"),
            Timestamp::from_millis(60_000),
        )))
        .await
        .expect("delete");
    clock.advance(1_000);
    let late = orchestrator
        .on_realtime(RealtimeEvent::Messages(MessageBatch::of_messages(vec![
            message("c-0000", "c", 50_000),
        ])))
        .await
        .expect("late delivery");

    assert_eq!(resumed.inserted.len(), 8);
    assert!(redelivered.inserted.is_empty());
    assert!(late.inserted.is_empty());
    let page = store.page(&chat("c"), 0, 10).await.expect("page");
    assert_eq!(page.len(), 7);
    let ranges = store.sync_ranges(&chat("c")).await.expect("ranges");
    assert!(ranges.iter().any(|range| range.source == SyncChannel::Resume));
}
