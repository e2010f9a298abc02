//! Message and MIME part wire models.

use serde::{Deserialize, Serialize};

/// One RFC 2822 header as transmitted inside a message part.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PartHeader {
    /// Header name, e.g. `Subject`.
    #[serde(default)]
    pub name: String,
    /// Header value.
    #[serde(default)]
    pub value: String,
}

/// Body of a single MIME part.
///
/// Large bodies come back as an `attachment_id` reference instead of
/// inline `data`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MessagePartBody {
    /// Reference to a separately downloadable attachment, if any.
    #[serde(rename = "attachmentId", default, skip_serializing_if = "Option::is_none")]
    pub attachment_id: Option<String>,
    /// Size of the body in bytes.
    #[serde(default)]
    pub size: i64,
    /// Inline body data, base64url-encoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// A node of the MIME part tree.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MessagePart {
    /// Hierarchical part id, e.g. `"1.2"`. The root part carries none.
    #[serde(rename = "partId", default, skip_serializing_if = "Option::is_none")]
    pub part_id: Option<String>,
    /// MIME type, e.g. `text/plain` or `multipart/alternative`.
    #[serde(rename = "mimeType", default)]
    pub mime_type: String,
    /// Attachment filename; empty for inline parts.
    #[serde(default)]
    pub filename: String,
    /// Headers scoped to this part.
    #[serde(default)]
    pub headers: Vec<PartHeader>,
    /// Part body; absent for pure container parts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<MessagePartBody>,
    /// Child parts for `multipart/*` containers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<MessagePart>,
}

impl MessagePart {
    /// Whether this part is a `multipart/*` container.
    #[must_use]
    pub fn is_container(&self) -> bool {
        self.mime_type.starts_with("multipart/")
    }
}

/// A full Gmail message as returned by `messages.get`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Message {
    /// Stable message id, unique within the mailbox.
    pub id: String,
    /// Id of the owning thread.
    #[serde(rename = "threadId", default)]
    pub thread_id: String,
    /// Labels currently applied to the message.
    #[serde(rename = "labelIds", default)]
    pub label_ids: Vec<String>,
    /// Short plain-text preview.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    /// History position at which this message version was current.
    #[serde(rename = "historyId", default, skip_serializing_if = "Option::is_none")]
    pub history_id: Option<String>,
    /// Delivery time as epoch milliseconds (stringly typed on the wire).
    #[serde(rename = "internalDate", default, skip_serializing_if = "Option::is_none")]
    pub internal_date: Option<String>,
    /// Root of the MIME part tree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<MessagePart>,
    /// Estimated total size in bytes.
    #[serde(rename = "sizeEstimate", default, skip_serializing_if = "Option::is_none")]
    pub size_estimate: Option<i64>,
}

impl Message {
    /// The message's history position parsed to its numeric form.
    #[must_use]
    pub fn history_position(&self) -> Option<u64> {
        self.history_id.as_deref().and_then(|id| id.parse().ok())
    }

    /// Delivery time as epoch milliseconds, if transmitted.
    #[must_use]
    pub fn internal_date_millis(&self) -> Option<i64> {
        self.internal_date.as_deref().and_then(|d| d.parse().ok())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_full_message() {
        let json = r#"{
            "id": "18c2a9",
            "threadId": "18c2a0",
            "labelIds": ["INBOX", "UNREAD"],
            "snippet": "Hi there",
            "historyId": "12345",
            "internalDate": "1700000000000",
            "sizeEstimate": 4096,
            "payload": {
                "mimeType": "multipart/alternative",
                "filename": "",
                "headers": [{"name": "Subject", "value": "Hi"}],
                "body": {"size": 0},
                "parts": [
                    {
                        "partId": "0",
                        "mimeType": "text/plain",
                        "filename": "",
                        "body": {"size": 8, "data": "SGkgdGhlcmU="}
                    }
                ]
            }
        }"#;

        let message: Message = serde_json::from_str(json).unwrap();
        assert_eq!(message.id, "18c2a9");
        assert_eq!(message.thread_id, "18c2a0");
        assert_eq!(message.label_ids, vec!["INBOX", "UNREAD"]);
        assert_eq!(message.history_position(), Some(12345));
        assert_eq!(message.internal_date_millis(), Some(1_700_000_000_000));

        let payload = message.payload.unwrap();
        assert!(payload.is_container());
        assert!(payload.part_id.is_none());
        assert_eq!(payload.parts.len(), 1);
        assert_eq!(payload.parts[0].part_id.as_deref(), Some("0"));
    }

    #[test]
    fn test_deserialize_minimal_message() {
        let json = r#"{"id": "x", "threadId": "y"}"#;
        let message: Message = serde_json::from_str(json).unwrap();
        assert!(message.label_ids.is_empty());
        assert!(message.payload.is_none());
        assert!(message.history_position().is_none());
    }
}
