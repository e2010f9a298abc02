//! # mailsift-assist
//!
//! Drafting assistant for the mailsift sync engine: a narrow interface for
//! turning a mail conversation into a suggested reply, plus an
//! OpenAI-compatible implementation.
//!
//! The assistant is best-effort by contract: every operation yields
//! `Option<String>`, and `None` means "skip drafting for this thread".
//! Callers must never fail a sync run because the assistant did.

#![forbid(unsafe_code)]

mod openai;

pub use openai::OpenAiAssistant;

/// One turn of the conversation handed to the assistant, oldest first.
#[derive(Debug, Clone)]
pub struct ConversationTurn {
    /// Whether the mailbox owner wrote this turn.
    pub from_me: bool,
    /// Cleaned plain-text body of the turn.
    pub body: String,
}

/// A service that can clean up message text and draft replies.
pub trait DraftAssistant {
    /// Extract only the new message from a raw body, dropping quoted
    /// earlier turns. `None` when the assistant is unavailable.
    fn extract_clean_message(
        &self,
        raw_body: &str,
    ) -> impl Future<Output = Option<String>> + Send;

    /// Draft a reply to the conversation. `None` when the assistant is
    /// unavailable or produced nothing usable.
    fn draft_reply(
        &self,
        conversation: &[ConversationTurn],
    ) -> impl Future<Output = Option<String>> + Send;
}
