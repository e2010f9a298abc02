//! Draft model types.

use chrono::{DateTime, Utc};

/// A created reply draft, persisted for audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDraft {
    /// Provider draft id.
    pub draft_id: String,
    /// Id of the draft's underlying message, when the provider returned it.
    pub message_id: Option<String>,
    /// Thread the draft replies to.
    pub thread_id: String,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
}
