//! Reply drafting over a stored thread.
//!
//! Drafting is best-effort end to end: any assistant refusal, a thread
//! with no usable text, or a thread with no inbound sender simply yields
//! no draft. Only provider and storage failures surface as errors.

use chrono::Utc;
use mailsift_assist::{ConversationTurn, DraftAssistant};
use tracing::{debug, info};

use super::model::StoredDraft;
use super::repository::DraftRepository;
use crate::message::{MessageRepository, plain_text_body};
use crate::store::Store;
use crate::sync::MailProvider;
use crate::user::User;
use crate::Result;

const SENT_LABEL: &str = "SENT";

/// One message of a stored thread, reduced to what drafting needs.
#[derive(Debug, Clone)]
pub struct ThreadTurn {
    /// Whether the mailbox owner sent the message.
    pub from_me: bool,
    /// The `From` header value, when stored.
    pub sender: Option<String>,
    /// Cleaned plain-text body.
    pub body: String,
}

/// Conversation turns for the assistant, oldest first.
#[must_use]
pub fn build_conversation(turns: &[ThreadTurn]) -> Vec<ConversationTurn> {
    turns
        .iter()
        .map(|turn| ConversationTurn {
            from_me: turn.from_me,
            body: turn.body.clone(),
        })
        .collect()
}

/// Address the reply should go to: the sender of the newest message not
/// written by the mailbox owner.
#[must_use]
pub fn last_inbound_sender(turns: &[ThreadTurn]) -> Option<&str> {
    turns
        .iter()
        .rev()
        .filter(|turn| !turn.from_me)
        .find_map(|turn| turn.sender.as_deref())
}

/// Draft a reply to a synced thread and register it with the provider.
///
/// Returns `Ok(None)` when drafting was skipped: empty thread, no
/// plain-text bodies, no inbound sender, or the assistant declined at any
/// step.
///
/// # Errors
///
/// Returns an error if storage access or draft creation fails.
pub async fn draft_reply_for_thread<P: MailProvider, A: DraftAssistant>(
    store: &Store,
    provider: &P,
    assistant: &A,
    user: &User,
    thread_id: &str,
) -> Result<Option<StoredDraft>> {
    let messages = MessageRepository::new(store);
    let stored = messages.list_thread(user.pk, thread_id).await?;
    if stored.is_empty() {
        debug!(thread_id, "no messages stored for thread, skipping draft");
        return Ok(None);
    }

    let mut turns = Vec::with_capacity(stored.len());
    for message in &stored {
        let parts = messages.parts(user.pk, &message.message_id).await?;
        let Some(raw_body) = plain_text_body(&parts) else {
            continue;
        };
        let Some(body) = assistant.extract_clean_message(&raw_body).await else {
            debug!(thread_id, message_id = %message.message_id, "assistant declined extraction");
            return Ok(None);
        };
        turns.push(ThreadTurn {
            from_me: message.label_ids.iter().any(|id| id == SENT_LABEL),
            sender: messages
                .header_value(user.pk, &message.message_id, "from")
                .await?,
            body,
        });
    }

    let Some(to) = last_inbound_sender(&turns) else {
        debug!(thread_id, "thread has no inbound sender, skipping draft");
        return Ok(None);
    };
    let Some(reply) = assistant.draft_reply(&build_conversation(&turns)).await else {
        debug!(thread_id, "assistant declined to draft a reply");
        return Ok(None);
    };

    let created = provider
        .create_draft(&reply, to, &user.email, thread_id)
        .await
        .map_err(crate::Error::Gmail)?;

    let draft = StoredDraft {
        draft_id: created.id,
        message_id: created.message.map(|m| m.id),
        thread_id: thread_id.to_string(),
        created_at: Utc::now(),
    };
    DraftRepository::new(store).insert(user.pk, &draft).await?;

    info!(thread_id, draft_id = %draft.draft_id, "reply draft created");
    Ok(Some(draft))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(from_me: bool, sender: Option<&str>, body: &str) -> ThreadTurn {
        ThreadTurn {
            from_me,
            sender: sender.map(str::to_string),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_build_conversation_preserves_order_and_roles() {
        let turns = vec![
            turn(false, Some("alice@example.com"), "hello"),
            turn(true, None, "hi alice"),
        ];

        let conversation = build_conversation(&turns);
        assert_eq!(conversation.len(), 2);
        assert!(!conversation[0].from_me);
        assert_eq!(conversation[0].body, "hello");
        assert!(conversation[1].from_me);
    }

    #[test]
    fn test_last_inbound_sender_skips_own_messages() {
        let turns = vec![
            turn(false, Some("alice@example.com"), "hello"),
            turn(false, Some("bob@example.com"), "me too"),
            turn(true, Some("owner@example.com"), "thanks both"),
        ];

        assert_eq!(last_inbound_sender(&turns), Some("bob@example.com"));
    }

    #[test]
    fn test_last_inbound_sender_none_for_outbound_thread() {
        let turns = vec![turn(true, Some("owner@example.com"), "ping")];
        assert_eq!(last_inbound_sender(&turns), None);
    }
}
