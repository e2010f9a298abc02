//! History (change log) wire models.

use serde::{Deserialize, Serialize};

/// Minimal message reference carried inside history records.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MessageRef {
    /// Message id.
    pub id: String,
    /// Owning thread id.
    #[serde(rename = "threadId", default)]
    pub thread_id: String,
    /// Labels on the message at the time of the event.
    #[serde(rename = "labelIds", default)]
    pub label_ids: Vec<String>,
}

/// Wrapper around a message reference in `messagesAdded`/`messagesDeleted`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MessageEnvelope {
    /// The affected message.
    pub message: MessageRef,
}

/// One `labelsAdded`/`labelsRemoved` entry: a message plus the label ids
/// that changed on it.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LabelChange {
    /// The affected message.
    pub message: MessageRef,
    /// Label ids added to or removed from the message.
    #[serde(rename = "labelIds", default, skip_serializing_if = "Option::is_none")]
    pub label_ids: Option<Vec<String>>,
}

/// One record of the per-user change log.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct History {
    /// Monotonically increasing position in the change log.
    pub id: String,
    /// Every message touched by this record.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<MessageRef>,
    /// Messages added to the mailbox.
    #[serde(rename = "messagesAdded", default, skip_serializing_if = "Vec::is_empty")]
    pub messages_added: Vec<MessageEnvelope>,
    /// Messages removed from the mailbox.
    #[serde(rename = "messagesDeleted", default, skip_serializing_if = "Vec::is_empty")]
    pub messages_deleted: Vec<MessageEnvelope>,
    /// Label additions per message.
    #[serde(rename = "labelsAdded", default, skip_serializing_if = "Vec::is_empty")]
    pub labels_added: Vec<LabelChange>,
    /// Label removals per message.
    #[serde(rename = "labelsRemoved", default, skip_serializing_if = "Vec::is_empty")]
    pub labels_removed: Vec<LabelChange>,
}

impl History {
    /// The record's position parsed to its numeric form. Records with an
    /// unparseable id sort first and never advance a watermark.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.id.parse().unwrap_or(0)
    }

    /// Whether the record carries any change at all.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !(self.messages.is_empty()
            && self.messages_added.is_empty()
            && self.messages_deleted.is_empty()
            && self.labels_added.is_empty()
            && self.labels_removed.is_empty())
    }
}

/// One page of the `history.list` response.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HistoryPage {
    /// History records on this page, oldest first.
    #[serde(default)]
    pub history: Vec<History>,
    /// The mailbox's current history position.
    #[serde(rename = "historyId", default)]
    pub history_id: String,
    /// Cursor for the next page, absent on the last one.
    #[serde(rename = "nextPageToken", default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_history_page() {
        let json = r#"{
            "history": [
                {
                    "id": "1001",
                    "messages": [{"id": "m1", "threadId": "t1"}],
                    "messagesAdded": [
                        {"message": {"id": "m1", "threadId": "t1", "labelIds": ["INBOX"]}}
                    ]
                },
                {
                    "id": "1002",
                    "labelsRemoved": [
                        {"message": {"id": "m1", "threadId": "t1"}, "labelIds": ["UNREAD"]}
                    ]
                }
            ],
            "historyId": "1002"
        }"#;

        let page: HistoryPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.history.len(), 2);
        assert_eq!(page.history[0].position(), 1001);
        assert_eq!(page.history[0].messages_added[0].message.label_ids, vec!["INBOX"]);
        assert_eq!(
            page.history[1].labels_removed[0].label_ids.as_deref(),
            Some(&["UNREAD".to_string()][..])
        );
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn test_record_without_changes() {
        let record: History = serde_json::from_str(r#"{"id": "55"}"#).unwrap();
        assert!(!record.has_changes());
        assert_eq!(record.position(), 55);
    }
}
