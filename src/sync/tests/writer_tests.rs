//! Tests for the serialized write path.

use std::sync::Arc;

use crate::message::{
    adapters::memory::InMemoryMessageStore,
    domain::{MessageGuid, SyncChannel, SyncRange, Tombstone},
    ports::store::{LocalEdit, MessageStore},
};
use crate::sync::{error::SyncError, services::WritePath};
use crate::test_support::{at, batch, chat, message};

#[tokio::test]
async fn concurrent_channels_insert_a_message_once() {
    let store = Arc::new(InMemoryMessageStore::new());
    let (writer, _task) = WritePath::spawn(Arc::clone(&store));
    let realtime = writer.clone();
    let periodic = writer.clone();

    let (first, second) = tokio::join!(
        realtime.merge(batch(vec![message("m1", "c", 100)])),
        periodic.merge(batch(vec![message("m1", "c", 100), message("m2", "c", 90)])),
    );
    let first = first.expect("realtime merge");
    let second = second.expect("periodic merge");

    assert_eq!(first.inserted.len() + second.inserted.len(), 2);
    assert_eq!(first.ignored + second.ignored, 1);
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn tombstones_block_later_deliveries() {
    let store = Arc::new(InMemoryMessageStore::new());
    let (writer, _task) = WritePath::spawn(Arc::clone(&store));

    writer
        .merge(batch(vec![message("m1", "c", 100)]))
        .await
        .expect("merge");
    assert!(
        writer
            .tombstone(Tombstone::new(MessageGuid::new("m1"), at(200)))
            .await
            .expect("tombstone")
    );
    let replay = writer
        .merge(batch(vec![message("m1", "c", 100)]))
        .await
        .expect("replay");

    assert!(replay.inserted.is_empty());
    assert!(
        store
            .page(&chat("c"), 0, 10)
            .await
            .expect("page")
            .is_empty()
    );
}

#[tokio::test]
async fn local_edits_and_ranges_go_through_the_writer() {
    let store = Arc::new(InMemoryMessageStore::new());
    let (writer, _task) = WritePath::spawn(Arc::clone(&store));
    writer
        .merge(batch(vec![message("m1", "c", 100)]))
        .await
        .expect("merge");

    let edited = writer
        .local_edit(LocalEdit {
            guid: MessageGuid::new("m1"),
            text: "edited".to_owned(),
            edited_at: at(150),
        })
        .await
        .expect("edit");
    writer
        .record_range(SyncRange::new(
            crate::message::domain::ChatId::new("c"),
            at(0),
            at(100),
            at(150),
            SyncChannel::Resume,
        ))
        .await
        .expect("range");
    let cleared = writer.clear_ranges(chat("c")).await.expect("clear");

    assert!(edited);
    let stored = store
        .message(&MessageGuid::new("m1"))
        .await
        .expect("read")
        .expect("present");
    assert_eq!(stored.text(), Some("edited"));
    assert_eq!(cleared, 1);
}

#[tokio::test]
async fn writes_fail_once_the_writer_stops() {
    let store = Arc::new(InMemoryMessageStore::new());
    let (writer, task) = WritePath::spawn(store);
    task.abort();
    assert!(task.await.is_err());

    let result = writer.merge(batch(vec![message("m1", "c", 100)])).await;

    assert!(matches!(result, Err(SyncError::WriterClosed)));
}
