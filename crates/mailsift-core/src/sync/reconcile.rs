//! History reconciliation.
//!
//! Replays the provider's change log from a watermark. Classification and
//! remote fetches happen up front; every write, including the watermark
//! advance, lands in one transaction. A failed run therefore leaves the
//! watermark where it was and the next call replays the same range, which
//! the conflict-ignored writes absorb.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, info, warn};

use super::provider::MailProvider;
use crate::history::HistoryRepository;
use crate::label::{LabelRepository, StoredLabel};
use crate::message::{
    LABEL_ADDED, LABEL_REMOVED, MessageRepository, StoredMessage, flatten_message,
};
use crate::store::Store;
use crate::thread::{MailThread, ThreadRepository};
use crate::user::{UserId, UserRepository};
use crate::{Error, Result};

/// What one reconciliation run changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Change records seen in the log.
    pub events: usize,
    /// Messages fetched and inserted as new.
    pub messages_added: usize,
    /// Messages tombstoned.
    pub messages_deleted: usize,
    /// Label attachments replayed.
    pub labels_added: usize,
    /// Label detachments replayed.
    pub labels_removed: usize,
}

struct LabelEvent {
    message_id: String,
    label_id: String,
    history_id: u64,
    attach: bool,
}

/// Replay every change recorded after `since_history_id`.
///
/// An empty change log is a true no-op: nothing is written and the
/// watermark stays put. Rejected credentials deactivate the user before
/// the error surfaces.
///
/// # Errors
///
/// Returns an error if the provider or storage fails; a storage failure
/// rolls the whole write phase back.
pub async fn reconcile<P: MailProvider>(
    store: &Store,
    provider: &P,
    user: UserId,
    since_history_id: u64,
) -> Result<ReconcileReport> {
    match run(store, provider, user, since_history_id).await {
        Err(Error::Gmail(e)) if e.is_auth() => {
            warn!(user = %user, "access token rejected, deactivating user");
            UserRepository::new(store).deactivate(user).await?;
            Err(Error::Gmail(e))
        }
        result => result,
    }
}

async fn run<P: MailProvider>(
    store: &Store,
    provider: &P,
    user: UserId,
    since_history_id: u64,
) -> Result<ReconcileReport> {
    let records = provider
        .list_history(since_history_id)
        .await
        .map_err(Error::Gmail)?;
    if records.is_empty() {
        info!(user = %user, since = since_history_id, "change log empty, nothing to reconcile");
        return Ok(ReconcileReport::default());
    }

    // Classification pass: one walk over the log, oldest record first.
    let mut touched: HashMap<String, BTreeSet<u64>> = HashMap::new();
    let mut added: HashMap<String, u64> = HashMap::new();
    let mut deleted: HashMap<String, u64> = HashMap::new();
    let mut label_events: Vec<LabelEvent> = Vec::new();
    let mut referenced_labels: HashSet<String> = HashSet::new();
    let mut event_ids: BTreeSet<u64> = BTreeSet::new();

    for record in &records {
        let position = record.position();
        event_ids.insert(position);
        if !record.has_changes() {
            continue;
        }

        for touch in &record.messages {
            touched.entry(touch.id.clone()).or_default().insert(position);
        }
        for envelope in &record.messages_added {
            let id = &envelope.message.id;
            touched.entry(id.clone()).or_default().insert(position);
            let earliest = added.entry(id.clone()).or_insert(position);
            *earliest = (*earliest).min(position);
        }
        for envelope in &record.messages_deleted {
            let id = &envelope.message.id;
            touched.entry(id.clone()).or_default().insert(position);
            let earliest = deleted.entry(id.clone()).or_insert(position);
            *earliest = (*earliest).min(position);
        }
        for change in &record.labels_added {
            for label_id in change.label_ids.iter().flatten() {
                referenced_labels.insert(label_id.clone());
                label_events.push(LabelEvent {
                    message_id: change.message.id.clone(),
                    label_id: label_id.clone(),
                    history_id: position,
                    attach: true,
                });
            }
        }
        for change in &record.labels_removed {
            for label_id in change.label_ids.iter().flatten() {
                referenced_labels.insert(label_id.clone());
                label_events.push(LabelEvent {
                    message_id: change.message.id.clone(),
                    label_id: label_id.clone(),
                    history_id: position,
                    attach: false,
                });
            }
        }
    }

    // The start position itself counts as processed once the range lands.
    if since_history_id > 0 {
        event_ids.insert(since_history_id);
    }

    let event_list: Vec<u64> = event_ids.iter().copied().collect();
    let history_repo = HistoryRepository::new(store);
    if history_repo.are_processed(user, &event_list).await? {
        info!(user = %user, events = event_list.len(), "range already processed");
        return Ok(ReconcileReport {
            events: records.len(),
            ..ReconcileReport::default()
        });
    }

    // Deleted messages never get fetched; their audit rows still land.
    let message_repo = MessageRepository::new(store);
    let candidates: Vec<String> = touched
        .keys()
        .filter(|id| !deleted.contains_key(*id))
        .cloned()
        .collect();
    let known = message_repo.get_existing_ids(user, &candidates).await?;
    let new_ids: Vec<String> = candidates
        .into_iter()
        .filter(|id| !known.contains(id))
        .collect();
    debug!(user = %user, new = new_ids.len(), known = known.len(), "touched messages partitioned");

    let fetched = provider
        .get_messages_by_ids(&new_ids)
        .await
        .map_err(Error::Gmail)?;

    // Threads of the new messages, then the labels everything refers to.
    let thread_ids: Vec<String> = fetched
        .values()
        .map(|m| m.thread_id.clone())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let threads = provider
        .get_threads_by_ids(&thread_ids)
        .await
        .map_err(Error::Gmail)?;
    let thread_repo = ThreadRepository::new(store);
    for thread in threads.values() {
        thread_repo
            .upsert(user, &MailThread::from_wire(thread))
            .await?;
    }

    for message in fetched.values() {
        referenced_labels.extend(message.label_ids.iter().cloned());
    }
    let label_ids: Vec<String> = referenced_labels.into_iter().collect();
    let labels = provider
        .get_labels_by_ids(&label_ids)
        .await
        .map_err(Error::Gmail)?;
    let label_repo = LabelRepository::new(store);
    for label in &labels {
        label_repo.upsert(user, &StoredLabel::from_wire(label)).await?;
    }
    let registry = label_repo.get_all(user).await?;

    let new_messages: Vec<StoredMessage> = fetched
        .values()
        .map(|m| {
            let mut stored = StoredMessage::from_wire(m);
            stored.added_history_id = added.get(&m.id).copied();
            stored
        })
        .collect();

    // Write phase, all or nothing.
    let mut report = ReconcileReport {
        events: records.len(),
        messages_added: new_messages.len(),
        messages_deleted: deleted.len(),
        ..ReconcileReport::default()
    };
    let mut tx = store.begin().await?;

    HistoryRepository::insert_events_on(&mut tx, user, &event_list).await?;

    for event in &label_events {
        let Some(&label_pk) = registry.get(&event.label_id) else {
            warn!(label_id = %event.label_id, "label missing from registry, change skipped");
            continue;
        };
        if event.attach {
            MessageRepository::insert_label_edge_on(&mut tx, user, &event.message_id, label_pk)
                .await?;
            report.labels_added += 1;
        } else {
            MessageRepository::delete_label_edge_on(&mut tx, user, &event.message_id, label_pk)
                .await?;
            report.labels_removed += 1;
        }
        let action = if event.attach { LABEL_ADDED } else { LABEL_REMOVED };
        MessageRepository::insert_label_audit_on(
            &mut tx,
            user,
            &event.message_id,
            label_pk,
            event.history_id,
            action,
        )
        .await?;
    }

    MessageRepository::insert_many_on(&mut tx, user, &new_messages).await?;
    for message in fetched.values() {
        for label_id in &message.label_ids {
            if let Some(&label_pk) = registry.get(label_id) {
                MessageRepository::insert_label_edge_on(&mut tx, user, &message.id, label_pk)
                    .await?;
            } else {
                warn!(message_id = %message.id, label_id = %label_id, "label missing from registry, edge skipped");
            }
        }
        let (parts, headers) = flatten_message(message);
        MessageRepository::insert_parts_on(&mut tx, user, &parts).await?;
        MessageRepository::insert_headers_on(&mut tx, user, &headers).await?;
    }

    for (message_id, earliest_delete) in &deleted {
        MessageRepository::tombstone_on(&mut tx, user, message_id, *earliest_delete).await?;
    }

    for (message_id, positions) in &touched {
        for position in positions {
            MessageRepository::insert_message_history_on(&mut tx, user, message_id, *position)
                .await?;
        }
    }

    HistoryRepository::mark_processed_on(&mut tx, user, &event_list).await?;
    tx.commit().await?;

    info!(
        user = %user,
        events = report.events,
        messages_added = report.messages_added,
        messages_deleted = report.messages_deleted,
        labels_added = report.labels_added,
        labels_removed = report.labels_removed,
        watermark = event_list.last().copied().unwrap_or(since_history_id),
        "reconciliation complete"
    );
    Ok(report)
}
