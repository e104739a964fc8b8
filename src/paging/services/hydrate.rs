//! Batch hydration of stored rows into view items.
//!
//! Every step works on the whole batch so a page costs a fixed number of
//! store queries regardless of its length:
//!
//! 1. duplicate GUIDs are dropped with a warning
//! 2. reactions are fetched once and grouped by their stripped target GUID
//! 3. attachments are fetched once
//! 4. reply originators are taken from the batch, then fetched once
//! 5. sender names come from the cached roster, with one supplemental
//!    fetch for unknown handles
//! 6. rows whose fingerprint is unchanged reuse the cached view

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::message::domain::{
    Attachment, ChatSet, Message, MessageGuid, Participant, Sender, Timestamp,
};
use crate::message::error::StoreResult;
use crate::message::ports::store::MessageStore;
use crate::paging::domain::{
    AppliedReaction, Availability, AvailabilityTracker, MessageView, ReplyPreview, ReplySnippet,
};
use crate::paging::ports::RepairTrigger;

/// Cached views kept before the cache is pruned to the current batch.
const VIEW_CACHE_LIMIT: usize = 4_096;

/// Result of hydrating a batch.
#[derive(Debug, Clone, Default)]
pub struct Hydrated {
    /// Views in input order, duplicates removed.
    pub views: Vec<Arc<MessageView>>,
    /// GUIDs whose view differs from the previously hydrated one.
    pub changed: Vec<MessageGuid>,
}

/// Borrowed collaborators for one hydration pass.
pub(crate) struct Context<'a, S: ?Sized, R: ?Sized> {
    pub(crate) store: &'a S,
    pub(crate) repair: &'a R,
    pub(crate) chats: &'a ChatSet,
    pub(crate) now: Timestamp,
}

#[derive(Debug, Default)]
struct Roster {
    loaded: bool,
    by_address: HashMap<String, String>,
    by_handle: HashMap<i64, String>,
    unknown_handles: HashSet<i64>,
}

impl Roster {
    fn absorb(&mut self, participants: Vec<Participant>) {
        for participant in participants {
            let label = participant.label().to_owned();
            self.by_address
                .insert(participant.address.clone(), label.clone());
            self.by_handle.insert(participant.handle_id, label);
        }
    }

    fn name_of(&self, sender: &Sender) -> Option<String> {
        if sender.is_from_me {
            return None;
        }
        sender
            .address
            .as_ref()
            .and_then(|address| self.by_address.get(address))
            .or_else(|| {
                sender
                    .handle_id
                    .and_then(|handle| self.by_handle.get(&handle))
            })
            .cloned()
            .or_else(|| sender.address.clone())
    }

    fn is_unresolved(&self, sender: &Sender) -> bool {
        if sender.is_from_me {
            return false;
        }
        if sender
            .address
            .as_ref()
            .is_some_and(|address| self.by_address.contains_key(address))
        {
            return false;
        }
        sender.handle_id.is_some_and(|handle| {
            !self.by_handle.contains_key(&handle) && !self.unknown_handles.contains(&handle)
        })
    }
}

/// Hydration caches owned by one source.
#[derive(Debug)]
pub(crate) struct Hydrator {
    roster: Roster,
    views: HashMap<MessageGuid, Arc<MessageView>>,
    tracker: AvailabilityTracker,
}

impl Hydrator {
    pub(crate) fn new(unavailable_timeout: Duration) -> Self {
        Self {
            roster: Roster::default(),
            views: HashMap::new(),
            tracker: AvailabilityTracker::new(unavailable_timeout),
        }
    }

    /// Drops the roster and view caches.
    pub(crate) fn invalidate(&mut self) {
        debug!(cached = self.views.len(), "invalidating hydration caches");
        self.roster = Roster::default();
        self.views.clear();
    }

    /// Records that `guid` is missing and asks for it once.
    pub(crate) fn note_missing<S, R>(&mut self, ctx: &Context<'_, S, R>, guid: &MessageGuid)
    where
        S: ?Sized,
        R: RepairTrigger + ?Sized,
    {
        if self.tracker.begin(guid, ctx.now) {
            ctx.repair.request_sync_for_message(ctx.chats, guid);
        }
    }

    /// Marks `guid` as present.
    pub(crate) fn note_present(&mut self, guid: &MessageGuid) {
        self.tracker.resolve(guid);
    }

    /// Returns the tracked state of a missing GUID.
    pub(crate) fn status(&self, guid: &MessageGuid, now: Timestamp) -> Option<Availability> {
        self.tracker.status(guid, now)
    }

    /// Hydrates a batch of rows.
    pub(crate) async fn hydrate<S, R>(
        &mut self,
        ctx: &Context<'_, S, R>,
        batch: Vec<Message>,
    ) -> StoreResult<Hydrated>
    where
        S: MessageStore + ?Sized,
        R: RepairTrigger + ?Sized,
    {
        let rows = dedup(batch);
        if rows.is_empty() {
            return Ok(Hydrated::default());
        }
        let guids: Vec<MessageGuid> = rows.iter().map(|row| row.guid().clone()).collect();

        let reaction_rows = ctx.store.reactions_for(&guids).await?;
        let mut attachments = group_attachments(ctx.store.attachments_for(&guids).await?);
        let originators = fetch_originators(ctx, &rows).await?;

        let mut senders: Vec<&Sender> = rows.iter().map(Message::sender).collect();
        senders.extend(reaction_rows.iter().map(Message::sender));
        senders.extend(originators.values().filter_map(|found| match found {
            Originator::Found(message) => Some(message.sender()),
            Originator::Missing => None,
        }));
        self.resolve_names(ctx, &senders).await?;

        let mut reactions = group_reactions(reaction_rows, &self.roster);
        let mut hydrated = Hydrated::default();
        let mut seen: HashSet<MessageGuid> = HashSet::with_capacity(rows.len());
        for row in rows {
            let guid = row.guid().clone();
            let reply = row.thread_originator().map(|originator| {
                self.reply_preview(ctx, originator, originators.get(originator))
            });
            let sender_name = self.roster.name_of(row.sender());
            let candidate = MessageView::new(
                row,
                reactions.remove(&guid).unwrap_or_default(),
                attachments.remove(&guid).unwrap_or_default(),
                reply,
                sender_name,
            );
            let view = match self.views.get(&guid) {
                Some(cached) if cached.fingerprint() == candidate.fingerprint() => {
                    Arc::clone(cached)
                }
                _ => {
                    let fresh = Arc::new(candidate);
                    self.views.insert(guid.clone(), Arc::clone(&fresh));
                    hydrated.changed.push(guid.clone());
                    fresh
                }
            };
            self.tracker.resolve(&guid);
            seen.insert(guid);
            hydrated.views.push(view);
        }
        if self.views.len() > VIEW_CACHE_LIMIT {
            self.views.retain(|guid, _| seen.contains(guid));
        }
        Ok(hydrated)
    }

    fn reply_preview<S, R>(
        &mut self,
        ctx: &Context<'_, S, R>,
        originator: &MessageGuid,
        found: Option<&Originator>,
    ) -> ReplyPreview
    where
        S: ?Sized,
        R: RepairTrigger + ?Sized,
    {
        match found {
            Some(Originator::Found(message)) if !message.is_deleted() => {
                self.tracker.resolve(originator);
                ReplyPreview::Loaded(ReplySnippet {
                    guid: originator.clone(),
                    sender_name: self.roster.name_of(message.sender()),
                    text: message.text().map(ToOwned::to_owned),
                })
            }
            Some(_) => ReplyPreview::Missing {
                guid: originator.clone(),
            },
            None => {
                if matches!(
                    self.tracker.status(originator, ctx.now),
                    Some(Availability::Unavailable)
                ) {
                    return ReplyPreview::Missing {
                        guid: originator.clone(),
                    };
                }
                self.note_missing(ctx, originator);
                ReplyPreview::NotLoaded {
                    guid: originator.clone(),
                }
            }
        }
    }

    async fn resolve_names<S, R>(
        &mut self,
        ctx: &Context<'_, S, R>,
        senders: &[&Sender],
    ) -> StoreResult<()>
    where
        S: MessageStore + ?Sized,
        R: ?Sized,
    {
        if !self.roster.loaded {
            let participants = ctx.store.participants(ctx.chats).await?;
            self.roster.absorb(participants);
            self.roster.loaded = true;
        }
        let mut handles: Vec<i64> = senders
            .iter()
            .filter(|sender| self.roster.is_unresolved(sender))
            .filter_map(|sender| sender.handle_id)
            .collect();
        handles.sort_unstable();
        handles.dedup();
        if handles.is_empty() {
            return Ok(());
        }
        debug!(count = handles.len(), "fetching roster entries for unknown handles");
        self.roster
            .absorb(ctx.store.participants_by_handle(&handles).await?);
        for handle in handles {
            if !self.roster.by_handle.contains_key(&handle) {
                self.roster.unknown_handles.insert(handle);
            }
        }
        Ok(())
    }
}

async fn fetch_originators<S, R>(
    ctx: &Context<'_, S, R>,
    rows: &[Message],
) -> StoreResult<HashMap<MessageGuid, Originator>>
where
    S: MessageStore + ?Sized,
    R: ?Sized,
{
    let in_batch: HashMap<&MessageGuid, &Message> =
        rows.iter().map(|row| (row.guid(), row)).collect();
    let mut found: HashMap<MessageGuid, Originator> = HashMap::new();
    let mut missing: Vec<MessageGuid> = Vec::new();
    for originator in rows.iter().filter_map(Message::thread_originator) {
        if found.contains_key(originator) || missing.contains(originator) {
            continue;
        }
        match in_batch.get(originator) {
            Some(message) => {
                found.insert(originator.clone(), Originator::Found((*message).clone()));
            }
            None => missing.push(originator.clone()),
        }
    }
    if missing.is_empty() {
        return Ok(found);
    }
    for message in ctx.store.messages(&missing).await? {
        found.insert(message.guid().clone(), Originator::Found(message));
    }
    let unresolved: Vec<MessageGuid> = missing
        .into_iter()
        .filter(|guid| !found.contains_key(guid))
        .collect();
    if !unresolved.is_empty() {
        for guid in ctx.store.tombstoned(&unresolved).await? {
            found.insert(guid, Originator::Missing);
        }
    }
    Ok(found)
}

enum Originator {
    Found(Message),
    Missing,
}

fn dedup(rows: Vec<Message>) -> Vec<Message> {
    let mut seen: HashSet<MessageGuid> = HashSet::with_capacity(rows.len());
    rows.into_iter()
        .filter(|row| {
            let fresh = seen.insert(row.guid().clone());
            if !fresh {
                warn!(guid = %row.guid(), "dropping duplicate row during hydration");
            }
            fresh
        })
        .collect()
}

fn group_attachments(attachments: Vec<Attachment>) -> HashMap<MessageGuid, Vec<Attachment>> {
    let mut grouped: HashMap<MessageGuid, Vec<Attachment>> = HashMap::new();
    for attachment in attachments {
        grouped
            .entry(attachment.message_guid.clone())
            .or_default()
            .push(attachment);
    }
    grouped
}

/// Groups reaction rows (oldest first) by target. Each sender keeps only
/// their latest reaction; a withdrawal removes it.
fn group_reactions(
    reaction_rows: Vec<Message>,
    roster: &Roster,
) -> HashMap<MessageGuid, Vec<AppliedReaction>> {
    let mut grouped: HashMap<MessageGuid, Vec<AppliedReaction>> = HashMap::new();
    for row in reaction_rows {
        let Some(reaction) = row.reaction() else {
            continue;
        };
        let applied = grouped.entry(reaction.target_guid()).or_default();
        applied.retain(|existing| existing.sender != *row.sender());
        if reaction.removed {
            continue;
        }
        applied.push(AppliedReaction {
            reaction_guid: row.guid().clone(),
            kind: reaction.kind.clone(),
            sender: row.sender().clone(),
            sender_name: roster.name_of(row.sender()),
        });
    }
    grouped
}
