//! Message model types.

use chrono::{DateTime, Utc};
use mailsift_gmail::Message;

/// A message as persisted locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    /// Stable provider message id.
    pub message_id: String,
    /// Id of the owning thread.
    pub thread_id: String,
    /// Label ids applied to the message at fetch time.
    pub label_ids: Vec<String>,
    /// Short plain-text preview.
    pub snippet: String,
    /// History position at which this version was current.
    pub history_id: u64,
    /// Delivery time.
    pub internal_date: Option<DateTime<Utc>>,
    /// Estimated total size in bytes.
    pub size_estimate: Option<i64>,
    /// History position of the change event that added the message,
    /// when it arrived through the change log rather than a full sync.
    pub added_history_id: Option<u64>,
    /// Set when the provider reported the message deleted. The row is
    /// kept; live label edges are removed.
    pub deleted_history_id: Option<u64>,
}

impl StoredMessage {
    /// Build the local entity from a wire message.
    #[must_use]
    pub fn from_wire(message: &Message) -> Self {
        Self {
            message_id: message.id.clone(),
            thread_id: message.thread_id.clone(),
            label_ids: message.label_ids.clone(),
            snippet: message.snippet.clone().unwrap_or_default(),
            history_id: message.history_position().unwrap_or(0),
            internal_date: message
                .internal_date_millis()
                .and_then(DateTime::from_timestamp_millis),
            size_estimate: message.size_estimate,
            added_history_id: None,
            deleted_history_id: None,
        }
    }
}

/// One node of a message's MIME tree, flattened for storage.
///
/// Parent linkage is carried by `parent_part_id`, derived from the
/// hierarchical part id string alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatPart {
    /// Id of the owning message.
    pub message_id: String,
    /// Hierarchical part id; the root part carries none.
    pub part_id: Option<String>,
    /// MIME type.
    pub mime_type: String,
    /// Attachment filename; empty for inline parts.
    pub filename: String,
    /// Reference to a separately downloadable attachment, if any.
    pub attachment_id: Option<String>,
    /// Size of the body in bytes, as reported by the provider.
    pub body_size: i64,
    /// Inline body data, base64url-encoded. Dropped when the encoded
    /// form exceeds the inline cap.
    pub body_data: Option<String>,
    /// Part id of the enclosing container, if any.
    pub parent_part_id: Option<String>,
}

/// One persisted RFC 2822 header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredHeader {
    /// Id of the owning message.
    pub message_id: String,
    /// Part id the header was read from; the root part carries none.
    pub message_part_id: Option<String>,
    /// Header name, lowercased.
    pub name: String,
    /// Header value.
    pub value: String,
}
