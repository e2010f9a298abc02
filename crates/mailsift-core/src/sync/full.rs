//! Full mailbox sync.
//!
//! The cold-start path: list every thread, batch-fetch detail, and load
//! the lot into storage. Every write is conflict-ignored or diffed, so a
//! second run over an unchanged mailbox creates no new rows.

use std::collections::HashSet;

use mailsift_gmail::client::THREAD_PAGE_SIZE;
use tracing::{info, warn};

use super::provider::MailProvider;
use crate::label::{LabelRepository, StoredLabel};
use crate::message::{MessageRepository, StoredMessage, flatten_message};
use crate::store::Store;
use crate::thread::{MailThread, ThreadRepository};
use crate::user::{UserId, UserRepository};
use crate::{Error, Result};

/// What one full sync run brought in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Threads fetched and persisted.
    pub threads: usize,
    /// Messages not previously stored.
    pub new_messages: usize,
    /// Labels fetched and upserted.
    pub labels: usize,
}

/// Bulk-load a user's mailbox into the store.
///
/// Rejected credentials deactivate the user before the error surfaces, so
/// scheduled entrypoints stop retrying a dead mailbox.
///
/// # Errors
///
/// Returns an error if listing, rejected credentials, or storage fail.
/// Individual batch sub-request failures degrade instead (logged and
/// dropped by the provider).
pub async fn sync_mailbox<P: MailProvider>(
    store: &Store,
    provider: &P,
    user: UserId,
) -> Result<SyncReport> {
    match run(store, provider, user).await {
        Err(Error::Gmail(e)) if e.is_auth() => {
            warn!(user = %user, "access token rejected, deactivating user");
            UserRepository::new(store).deactivate(user).await?;
            Err(Error::Gmail(e))
        }
        result => result,
    }
}

async fn run<P: MailProvider>(store: &Store, provider: &P, user: UserId) -> Result<SyncReport> {
    let mut thread_ids = Vec::new();
    let mut page_token: Option<String> = None;
    loop {
        let page = provider
            .list_thread_ids(page_token.as_deref(), THREAD_PAGE_SIZE)
            .await
            .map_err(Error::Gmail)?;
        thread_ids.extend(page.ids);
        page_token = page.next_page_token;
        if page_token.is_none() {
            break;
        }
    }
    info!(user = %user, threads = thread_ids.len(), "thread listing complete");

    let threads = provider
        .get_threads_by_ids(&thread_ids)
        .await
        .map_err(Error::Gmail)?;

    let mut label_ids: HashSet<String> = HashSet::new();
    for thread in threads.values() {
        for message in &thread.messages {
            label_ids.extend(message.label_ids.iter().cloned());
        }
    }
    let label_ids: Vec<String> = label_ids.into_iter().collect();
    let labels = provider
        .get_labels_by_ids(&label_ids)
        .await
        .map_err(Error::Gmail)?;

    let thread_repo = ThreadRepository::new(store);
    for thread in threads.values() {
        thread_repo
            .upsert(user, &MailThread::from_wire(thread))
            .await?;
    }

    let label_repo = LabelRepository::new(store);
    for label in &labels {
        label_repo.upsert(user, &StoredLabel::from_wire(label)).await?;
    }
    let registry = label_repo.get_all(user).await?;

    let message_repo = MessageRepository::new(store);
    let wire_messages: Vec<_> = threads.values().flat_map(|t| t.messages.iter()).collect();
    let all_ids: Vec<String> = wire_messages.iter().map(|m| m.id.clone()).collect();
    let known = message_repo.get_existing_ids(user, &all_ids).await?;

    let stored: Vec<StoredMessage> = wire_messages
        .iter()
        .map(|m| StoredMessage::from_wire(m))
        .collect();
    message_repo.insert_many(user, &stored).await?;

    for message in &wire_messages {
        for label_id in &message.label_ids {
            if let Some(&label_pk) = registry.get(label_id) {
                message_repo
                    .insert_label_edge(user, &message.id, label_pk)
                    .await?;
            } else {
                warn!(message_id = %message.id, label_id = %label_id, "label missing from registry, edge skipped");
            }
        }
    }

    let mut new_messages = 0usize;
    for message in &wire_messages {
        if known.contains(&message.id) {
            continue;
        }
        new_messages += 1;
        let (parts, headers) = flatten_message(message);
        message_repo.insert_parts(user, &parts).await?;
        message_repo.insert_headers(user, &headers).await?;
    }

    let report = SyncReport {
        threads: threads.len(),
        new_messages,
        labels: labels.len(),
    };
    info!(
        user = %user,
        threads = report.threads,
        new_messages = report.new_messages,
        labels = report.labels,
        "full sync complete"
    );
    Ok(report)
}
