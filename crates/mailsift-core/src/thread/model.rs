//! Thread model types.

use mailsift_gmail::Thread;

/// A mailbox thread as persisted locally.
///
/// The message list of the wire thread is not stored here; messages carry
/// their `thread_id` and are persisted independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailThread {
    /// Stable provider thread id.
    pub thread_id: String,
    /// Short preview of the most recent message.
    pub snippet: String,
    /// Last history position that touched this thread. Never moves
    /// backwards; updates bearing an older position are dropped.
    pub history_id: u64,
}

impl MailThread {
    /// Build the local entity from a wire thread.
    #[must_use]
    pub fn from_wire(thread: &Thread) -> Self {
        Self {
            thread_id: thread.id.clone(),
            snippet: thread.snippet.clone().unwrap_or_default(),
            history_id: thread.history_position().unwrap_or(0),
        }
    }
}
