//! End-to-end flows from a short load to a repaired window.

use std::sync::Arc;
use std::time::Duration;

use scrollback::message::{
    adapters::memory::InMemoryMessageStore,
    domain::{ChatId, MessageBatch, MessageGuid, SyncChannel, SyncRange, Timestamp},
    ports::store::MessageStore,
};
use scrollback::paging::{
    config::PagingConfig,
    domain::{Slot, SparseWindow},
    services::{self, DeepLinkOutcome, DeepLinkResolver, PagingHandle, StoreSource},
};
use scrollback::sync::{
    adapters::memory::InMemoryRemote,
    config::SyncConfig,
    domain::RealtimeEvent,
    services::SyncRuntime,
};

use crate::test_helpers::{
    ManualClock, RecordingRepair, Repair, chat, conversation, message, with_gap,
};

const NOW: i64 = 1_000_000;

async fn window_where(
    handle: &PagingHandle,
    predicate: impl FnMut(&Arc<SparseWindow>) -> bool,
) -> Arc<SparseWindow> {
    let mut windows = handle.windows();
    let waited = tokio::time::timeout(Duration::from_secs(5), windows.wait_for(predicate))
        .await
        .expect("window should settle in time")
        .expect("driver should keep publishing");
    Arc::clone(&waited)
}

fn synced(chat_id: &str, oldest: i64, newest: i64) -> SyncRange {
    SyncRange::new(
        ChatId::new(chat_id),
        Timestamp::from_millis(oldest),
        Timestamp::from_millis(newest),
        Timestamp::from_millis(NOW),
        SyncChannel::Periodic,
    )
}

#[tokio::test]
async fn middle_gap_shows_placeholders_until_repaired() {
    let store = Arc::new(InMemoryMessageStore::new());
    let all = conversation("c", 20, 10_000);
    store
        .merge(with_gap("c", &all, 10..15))
        .await
        .expect("seed");
    for (oldest, newest) in [(9_910, 10_000), (9_810, 9_850)] {
        store
            .record_sync_range(synced("c", oldest, newest))
            .await
            .expect("range");
    }
    let repair = Arc::new(RecordingRepair::default());
    let config = PagingConfig::default();
    let source = StoreSource::new(
        Arc::clone(&store),
        Arc::clone(&repair),
        Arc::new(ManualClock::at(NOW)),
        chat("c"),
        &config,
    );
    let handle = services::spawn(Arc::new(source), config);

    let window = window_where(&handle, |w| w.total_size() == 20 && w.is_loaded(19)).await;

    assert!((10..15).all(|position| window.get(position) == Slot::Pending));
    assert!(matches!(
        window.get(15),
        Slot::Loaded(view) if view.guid().as_str() == "c-0015"
    ));
    assert!(matches!(
        window.get(9),
        Slot::Loaded(view) if view.guid().as_str() == "c-0009"
    ));
    assert_eq!(repair.requests(), vec![Repair::Range { start: 10, count: 5 }]);

    handle.shutdown().await;
}

#[tokio::test]
async fn middle_gap_is_repaired_and_the_window_refills() {
    let store = Arc::new(InMemoryMessageStore::new());
    let remote = Arc::new(InMemoryRemote::new());
    let all = conversation("c", 20, 10_000);
    remote
        .publish(MessageBatch::of_messages(all.clone()))
        .expect("publish");
    store
        .merge(with_gap("c", &all, 10..15))
        .await
        .expect("seed");
    for (oldest, newest) in [(9_910, 10_000), (9_810, 9_850)] {
        store
            .record_sync_range(synced("c", oldest, newest))
            .await
            .expect("range");
    }

    let clock = Arc::new(ManualClock::at(NOW));
    let runtime = SyncRuntime::start(
        Arc::clone(&store),
        Arc::clone(&remote),
        Arc::clone(&remote),
        Arc::clone(&clock),
        SyncConfig::default(),
    );
    let config = PagingConfig::default();
    let source = StoreSource::new(
        Arc::clone(&store),
        Arc::new(runtime.repair_trigger()),
        clock,
        chat("c"),
        &config,
    );
    let handle = services::spawn(Arc::new(source), config);

    let window = window_where(&handle, |w| {
        w.total_size() == 20 && (0..20).all(|position| w.is_loaded(position))
    })
    .await;

    let guids: Vec<String> = window
        .iter()
        .map(|(_, view)| view.guid().as_str().to_owned())
        .collect();
    let expected: Vec<String> = all.iter().map(|m| m.guid().as_str().to_owned()).collect();
    assert_eq!(guids, expected);
    assert_eq!(remote.window_fetches(), 1);

    handle.shutdown().await;
    runtime.shutdown().await;
}

#[tokio::test]
async fn realtime_arrivals_grow_the_window() {
    let store = Arc::new(InMemoryMessageStore::new());
    let remote = Arc::new(InMemoryRemote::new());
    let clock = Arc::new(ManualClock::at(NOW));
    store
        .merge(MessageBatch::of_messages(
            conversation("c", 5, 1_000),
        ))
        .await
        .expect("seed");
    let runtime = SyncRuntime::start(
        Arc::clone(&store),
        Arc::clone(&remote),
        Arc::clone(&remote),
        Arc::clone(&clock),
        SyncConfig::default(),
    );
    let config = PagingConfig::default();
    let source = StoreSource::new(
        Arc::clone(&store),
        Arc::new(runtime.repair_trigger()),
        clock,
        chat("c"),
        &config,
    );
    let handle = services::spawn(Arc::new(source), config);
    window_where(&handle, |w| w.total_size() == 5 && w.is_loaded(4)).await;

    runtime
        .orchestrator()
        .on_realtime(RealtimeEvent::Messages(
            MessageBatch::of_messages(vec![message(
                "fresh", "c", 2_000,
            )]),
        ))
        .await
        .expect("realtime");

    let window = window_where(&handle, |w| w.total_size() == 6 && w.is_loaded(5)).await;
    let newest = window.iter().next().map(|(_, view)| view.guid().clone());
    assert_eq!(newest, Some(MessageGuid::new("fresh")));

    handle.shutdown().await;
    runtime.shutdown().await;
}

#[tokio::test]
async fn deep_link_to_an_unknown_message_resolves_after_repair() {
    let store = Arc::new(InMemoryMessageStore::new());
    let remote = Arc::new(InMemoryRemote::new());
    let clock = Arc::new(ManualClock::at(NOW));
    let history = conversation("c", 30, 10_000);
    store
        .merge(MessageBatch::of_messages(
            history.clone(),
        ))
        .await
        .expect("seed");
    remote
        .publish(MessageBatch::of_messages(vec![
            message("linked", "c", 9_855),
        ]))
        .expect("publish");
    let runtime = SyncRuntime::start(
        Arc::clone(&store),
        Arc::clone(&remote),
        Arc::clone(&remote),
        Arc::clone(&clock),
        SyncConfig::default(),
    );
    let config = PagingConfig::default();
    let collection = Arc::new(StoreSource::new(
        Arc::clone(&store),
        Arc::new(runtime.repair_trigger()),
        clock,
        chat("c"),
        &config,
    ));
    let handle = services::spawn(Arc::clone(&collection), config);
    let resolver = DeepLinkResolver::new(Arc::clone(&collection), handle.commands());
    let target = MessageGuid::new("linked");

    let first = resolver.resolve(&chat("c"), &target).await.expect("resolve");
    assert_eq!(first, DeepLinkOutcome::Pending);

    let mut resolved = None;
    for _ in 0..100 {
        if let DeepLinkOutcome::Resolved { position } =
            resolver.resolve(&chat("c"), &target).await.expect("resolve")
        {
            resolved = Some(position);
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(resolved, Some(15));
    let window = window_where(&handle, |w| w.is_loaded(15)).await;
    let linked = match window.get(15) {
        Slot::Loaded(view) => Some(view.guid().clone()),
        Slot::Pending | Slot::OutOfBounds => None,
    };
    assert_eq!(linked, Some(target));
    assert_eq!(remote.message_fetches(), 1);

    handle.shutdown().await;
    runtime.shutdown().await;
}
