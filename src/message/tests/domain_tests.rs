//! Unit tests for message domain types.

use crate::message::domain::{
    ChatId, ChatSet, ChatSummary, Message, MessageGuid, ReactionKind, ReactionRef, Sender,
    SortKey, SyncChannel, SyncCoverage, SyncRange, Timestamp, strip_target_prefix,
};
use rstest::rstest;

fn at(millis: i64) -> Timestamp {
    Timestamp::from_millis(millis)
}

fn message(guid: &str, chat: &str, millis: i64) -> Message {
    Message::builder(MessageGuid::new(guid), ChatId::new(chat), at(millis)).build()
}

fn range(chat: &str, start: i64, end: i64) -> SyncRange {
    SyncRange::new(ChatId::new(chat), at(start), at(end), at(0), SyncChannel::Periodic)
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn identical_timestamps_order_by_guid_descending() {
    let b = SortKey::new(at(100), MessageGuid::new("b"));
    let a = SortKey::new(at(100), MessageGuid::new("a"));

    let mut keys = vec![a.clone(), b.clone()];
    keys.sort();

    assert_eq!(keys, vec![b, a]);
}

#[test]
fn newer_timestamp_sorts_first_regardless_of_guid() {
    let newer = SortKey::new(at(200), MessageGuid::new("a"));
    let older = SortKey::new(at(100), MessageGuid::new("z"));

    assert!(newer.is_newer_than(&older));
    assert!(!older.is_newer_than(&newer));
}

#[test]
fn sort_key_of_message_uses_timestamp_and_guid() {
    let key = SortKey::of(&message("m", "c", 42));

    assert_eq!(key.created_at(), at(42));
    assert_eq!(key.guid().as_str(), "m");
}

// ============================================================================
// Reactions and visibility
// ============================================================================

#[rstest]
#[case::part_prefix("p:0/GUID-1", "GUID-1")]
#[case::second_part("p:12/GUID-1", "GUID-1")]
#[case::balloon_prefix("bp:GUID-1", "GUID-1")]
#[case::bare("GUID-1", "GUID-1")]
#[case::malformed_part("p:GUID-1", "p:GUID-1")]
fn reaction_targets_lose_their_part_prefix(#[case] raw: &str, #[case] expected: &str) {
    assert_eq!(strip_target_prefix(raw), expected);
    assert_eq!(
        ReactionRef::new(raw, ReactionKind::Love).target_guid().as_str(),
        expected
    );
}

#[rstest]
#[case(ReactionKind::Love)]
#[case(ReactionKind::Question)]
#[case(ReactionKind::Emoji("🎉".to_owned()))]
fn reaction_kind_codes_parse_back(#[case] kind: ReactionKind) {
    assert_eq!(ReactionKind::from_code(&kind.code()), kind);
}

#[test]
fn reactions_and_deleted_messages_are_not_visible() {
    let reaction = Message::builder(MessageGuid::new("r"), ChatId::new("c"), at(1))
        .with_reaction(ReactionRef::new("p:0/m", ReactionKind::Like))
        .build();
    let mut deleted = message("d", "c", 2);
    deleted.mark_deleted(at(3));

    assert!(reaction.is_reaction());
    assert!(!reaction.is_visible());
    assert!(deleted.is_deleted());
    assert!(!deleted.is_visible());
    assert!(message("m", "c", 1).is_visible());
}

#[test]
fn local_edit_replaces_text_and_records_time() {
    let mut edited = Message::builder(MessageGuid::new("m"), ChatId::new("c"), at(1))
        .with_text("before")
        .with_sender(Sender::me())
        .build();

    edited.apply_edit("after", at(9));

    assert_eq!(edited.text(), Some("after"));
    assert_eq!(edited.edited_at(), Some(at(9)));
    assert!(edited.sender().is_from_me);
}

// ============================================================================
// Chat summaries
// ============================================================================

#[test]
fn summary_only_moves_forward() {
    let mut summary = ChatSummary::empty(ChatId::new("c"));

    assert!(summary.absorb(&message("new", "c", 20)));
    assert!(!summary.absorb(&message("old", "c", 10)));
    assert!(summary.absorb(&message("newer", "c", 30)));

    assert_eq!(summary.latest_at, Some(at(30)));
    assert_eq!(summary.latest_guid, Some(MessageGuid::new("newer")));
}

#[test]
fn summary_ignores_reactions_and_other_chats() {
    let mut summary = ChatSummary::empty(ChatId::new("c"));
    let reaction = Message::builder(MessageGuid::new("r"), ChatId::new("c"), at(50))
        .with_reaction(ReactionRef::new("m", ReactionKind::Like))
        .build();

    assert!(!summary.absorb(&reaction));
    assert!(!summary.absorb(&message("x", "other", 60)));
    assert_eq!(summary.latest_guid, None);
}

#[rstest]
#[case(None, 15, 15)]
#[case(Some(20), 15, 20)]
#[case(Some(10), 15, 15)]
fn declared_total_is_the_larger_count(
    #[case] remote: Option<u64>,
    #[case] local: u64,
    #[case] expected: u64,
) {
    let mut summary = ChatSummary::empty(ChatId::new("c"));
    summary.remote_total = remote;

    assert_eq!(summary.declared_total(local), expected);
}

// ============================================================================
// Sync coverage
// ============================================================================

#[test]
fn overlapping_and_touching_ranges_merge() {
    let ranges = [range("c", 10, 20), range("c", 21, 30), range("c", 25, 40)];
    let coverage = SyncCoverage::from_ranges(&ranges);

    assert_eq!(coverage.interval_count(&ChatId::new("c")), 1);
    assert!(coverage.covers(&ChatId::new("c"), at(10), at(40)));
}

#[test]
fn disjoint_ranges_stay_separate() {
    let ranges = [range("c", 50, 60), range("c", 10, 20)];
    let coverage = SyncCoverage::from_ranges(&ranges);
    let chat = ChatId::new("c");

    assert_eq!(coverage.interval_count(&chat), 2);
    assert_eq!(coverage.interval_of(&chat, at(15)), Some(0));
    assert_eq!(coverage.interval_of(&chat, at(55)), Some(1));
    assert_eq!(coverage.interval_of(&chat, at(35)), None);
    assert!(!coverage.covers(&chat, at(15), at(55)));
}

#[test]
fn newest_gap_floor_is_the_end_of_the_second_newest_interval() {
    let ranges = [range("a", 90, 100), range("a", 50, 60), range("a", 10, 20), range("b", 10, 20)];
    let coverage = SyncCoverage::from_ranges(&ranges);

    assert_eq!(coverage.newest_gap_floor(&ChatId::new("a")), Some(at(60)));
    assert_eq!(coverage.newest_gap_floor(&ChatId::new("b")), None);
    assert_eq!(coverage.newest_gap_floor(&ChatId::new("unknown")), None);
}

#[test]
fn reversed_bounds_are_normalised() {
    let reversed = range("c", 30, 10);

    assert_eq!(reversed.start, at(10));
    assert_eq!(reversed.end, at(30));
}

#[test]
fn sync_channel_codes_parse_back() {
    for channel in [
        SyncChannel::Realtime,
        SyncChannel::BackupPush,
        SyncChannel::Poll,
        SyncChannel::Resume,
        SyncChannel::Periodic,
        SyncChannel::Repair,
    ] {
        assert_eq!(SyncChannel::parse(channel.as_str()), Some(channel));
    }
    assert_eq!(SyncChannel::parse("carrier-pigeon"), None);
}

#[test]
fn chat_sets_intersect_on_any_member() {
    let chats: ChatSet = [ChatId::new("a"), ChatId::new("b")].into_iter().collect();

    assert!(chats.intersects(&ChatSet::single(ChatId::new("b"))));
    assert!(!chats.intersects(&ChatSet::single(ChatId::new("z"))));
}
