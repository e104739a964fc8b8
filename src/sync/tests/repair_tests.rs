//! Tests for the repair queue and worker.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::message::{
    adapters::memory::InMemoryMessageStore,
    domain::{ChatId, ChatTotal, MessageBatch, MessageGuid, SyncChannel, SyncRange},
    ports::store::MessageStore,
};
use crate::paging::ports::RepairTrigger;
use crate::sync::{
    adapters::memory::InMemoryRemote,
    config::RetryPolicy,
    domain::RepairRequest,
    ports::{MockRemoteSource, RemoteError},
    services::{RepairQueue, RepairWorker, WritePath},
};
use crate::test_support::{ManualClock, at, batch, chat, conversation, message};
use rstest::rstest;

#[rstest]
fn queue_forwards_each_repair_once_until_completed() {
    let (queue, mut requests) = RepairQueue::new();
    let chats = chat("c");
    let guid = MessageGuid::new("m");

    queue.request_sync_for_range(&chats, 10, 5);
    queue.request_sync_for_range(&chats, 10, 5);
    queue.request_sync_for_message(&chats, &guid);
    queue.request_sync_for_message(&chat("other"), &guid);

    assert_eq!(queue.in_flight(), 2);
    let first = requests.try_recv().expect("range request");
    assert!(matches!(
        first,
        RepairRequest::Range {
            start: 10,
            count: 5,
            ..
        }
    ));
    assert!(requests.try_recv().is_ok());
    assert!(requests.try_recv().is_err());

    queue.complete(&first.key());
    queue.request_sync_for_range(&chats, 10, 5);
    assert!(requests.try_recv().is_ok());
}

#[rstest]
fn empty_ranges_are_not_queued() {
    let (queue, mut requests) = RepairQueue::new();

    queue.request_sync_for_range(&chat("c"), 3, 0);

    assert!(requests.try_recv().is_err());
    assert_eq!(queue.in_flight(), 0);
}

struct Harness {
    store: Arc<InMemoryMessageStore>,
    remote: Arc<InMemoryRemote>,
    worker: RepairWorker<InMemoryMessageStore, InMemoryRemote, ManualClock>,
}

/// Remote holds 20 messages; the store misses positions 10 to 14 and knows
/// the remote total. Both stored segments are synced.
async fn gapped() -> Harness {
    let store = Arc::new(InMemoryMessageStore::new());
    let remote = Arc::new(InMemoryRemote::new());
    let all = conversation("c", 20, 10_000);
    remote.publish(batch(all.clone())).expect("publish");
    let local: Vec<_> = all
        .into_iter()
        .enumerate()
        .filter(|(index, _)| !(10..15).contains(index))
        .map(|(_, message)| message)
        .collect();
    store
        .merge(batch(local).with_total(ChatTotal::new(ChatId::new("c"), 20)))
        .await
        .expect("seed");
    for (oldest, newest) in [(9_910, 10_000), (9_810, 9_850)] {
        store
            .record_sync_range(SyncRange::new(
                ChatId::new("c"),
                at(oldest),
                at(newest),
                at(900_000),
                SyncChannel::Periodic,
            ))
            .await
            .expect("range");
    }

    let (writer, _task) = WritePath::spawn(Arc::clone(&store));
    let (queue, _requests) = RepairQueue::new();
    let worker = RepairWorker::new(
        Arc::clone(&store),
        Arc::clone(&remote),
        writer,
        queue,
        Arc::new(ManualClock::at(1_000_000)),
        RetryPolicy::no_retry(),
    );
    Harness {
        store,
        remote,
        worker,
    }
}

fn gap() -> RepairRequest {
    RepairRequest::Range {
        chats: chat("c"),
        start: 10,
        count: 5,
    }
}

#[tokio::test]
async fn range_repair_fills_the_gap_between_neighbours() {
    let harness = gapped().await;

    harness.worker.handle(&gap()).await.expect("repair");

    let page = harness.store.page(&chat("c"), 10, 5).await.expect("page");
    let guids: Vec<&str> = page.iter().map(|m| m.guid().as_str()).collect();
    assert_eq!(guids, vec!["c-0010", "c-0011", "c-0012", "c-0013", "c-0014"]);
    assert_eq!(harness.remote.window_fetches(), 1);

    let ranges = harness.store.sync_ranges(&chat("c")).await.expect("ranges");
    let repaired: Vec<&SyncRange> = ranges
        .iter()
        .filter(|range| range.source == SyncChannel::Repair)
        .collect();
    assert_eq!(repaired.len(), 1);
    assert_eq!(
        repaired.first().map(|range| (range.start, range.end)),
        Some((at(9_851), at(9_910)))
    );
}

#[tokio::test]
async fn ranges_between_synced_neighbours_are_not_fetched_again() {
    let harness = gapped().await;
    let stale = RepairRequest::Range {
        chats: chat("c"),
        start: 3,
        count: 2,
    };

    harness.worker.handle(&stale).await.expect("repair");

    assert_eq!(harness.remote.window_fetches(), 0);
}

#[tokio::test]
async fn message_repair_fetches_only_unknown_messages() {
    let harness = gapped().await;
    harness
        .remote
        .publish(batch(vec![message("reply-target", "c", 500)]))
        .expect("publish");
    let request = RepairRequest::Message {
        chats: chat("c"),
        guid: MessageGuid::new("reply-target"),
    };

    harness.worker.handle(&request).await.expect("first");
    harness.worker.handle(&request).await.expect("second");

    assert_eq!(harness.remote.message_fetches(), 1);
    assert!(
        harness
            .store
            .message(&MessageGuid::new("reply-target"))
            .await
            .expect("read")
            .is_some()
    );
}

#[tokio::test(start_paused = true)]
async fn message_repair_retries_transient_failures() {
    let store = Arc::new(InMemoryMessageStore::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let mut remote = MockRemoteSource::new();
    let counter = Arc::clone(&calls);
    remote.expect_fetch_message().returning(move |guid| {
        if counter.fetch_add(1, Ordering::SeqCst) < 2 {
            Err(RemoteError::Timeout)
        } else {
            Ok(Some(MessageBatch::of_messages(vec![message(
                guid.as_str(),
                "c",
                500,
            )])))
        }
    });
    let (writer, _task) = WritePath::spawn(Arc::clone(&store));
    let (queue, _requests) = RepairQueue::new();
    let worker = RepairWorker::new(
        Arc::clone(&store),
        Arc::new(remote),
        writer,
        queue,
        Arc::new(ManualClock::at(0)),
        RetryPolicy::default(),
    );

    worker
        .handle(&RepairRequest::Message {
            chats: chat("c"),
            guid: MessageGuid::new("late"),
        })
        .await
        .expect("repair");

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn worker_releases_the_key_after_each_request() {
    let store = Arc::new(InMemoryMessageStore::new());
    let remote = Arc::new(InMemoryRemote::new());
    remote.fail_next(1).expect("script");
    let (writer, _task) = WritePath::spawn(Arc::clone(&store));
    let (queue, requests) = RepairQueue::new();
    let worker = RepairWorker::new(
        Arc::clone(&store),
        Arc::clone(&remote),
        writer,
        queue.clone(),
        Arc::new(ManualClock::at(0)),
        RetryPolicy::no_retry(),
    );
    let running = tokio::spawn(worker.run(requests));

    queue.request_sync_for_message(&chat("c"), &MessageGuid::new("m"));
    while queue.in_flight() > 0 {
        tokio::task::yield_now().await;
    }
    queue.request_sync_for_message(&chat("c"), &MessageGuid::new("m"));
    while queue.in_flight() > 0 {
        tokio::task::yield_now().await;
    }

    assert_eq!(remote.message_fetches(), 2);
    running.abort();
}
