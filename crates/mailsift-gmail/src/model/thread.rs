//! Thread wire models.

use serde::{Deserialize, Serialize};

use super::message::Message;

/// A full thread as returned by `threads.get`, messages included.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Thread {
    /// Stable thread id.
    pub id: String,
    /// Short preview of the most recent message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    /// Last history position that touched this thread.
    #[serde(rename = "historyId", default, skip_serializing_if = "Option::is_none")]
    pub history_id: Option<String>,
    /// Messages in the thread, oldest first.
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Thread {
    /// The thread's history position parsed to its numeric form.
    #[must_use]
    pub fn history_position(&self) -> Option<u64> {
        self.history_id.as_deref().and_then(|id| id.parse().ok())
    }
}

/// One entry of a `threads.list` page; detail must be fetched separately.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ThreadStub {
    /// Stable thread id.
    pub id: String,
    /// Short preview of the most recent message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    /// Last history position that touched this thread.
    #[serde(rename = "historyId", default, skip_serializing_if = "Option::is_none")]
    pub history_id: Option<String>,
}

/// A page of the `threads.list` response.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ThreadList {
    /// Thread stubs on this page.
    #[serde(default)]
    pub threads: Vec<ThreadStub>,
    /// Cursor for the next page, absent on the last one.
    #[serde(rename = "nextPageToken", default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_thread_list_page() {
        let json = r#"{
            "threads": [
                {"id": "t1", "snippet": "a", "historyId": "10"},
                {"id": "t2"}
            ],
            "nextPageToken": "page2"
        }"#;

        let list: ThreadList = serde_json::from_str(json).unwrap();
        assert_eq!(list.threads.len(), 2);
        assert_eq!(list.next_page_token.as_deref(), Some("page2"));
    }

    #[test]
    fn test_deserialize_last_page_without_token() {
        let list: ThreadList = serde_json::from_str(r#"{"threads": []}"#).unwrap();
        assert!(list.threads.is_empty());
        assert!(list.next_page_token.is_none());
    }
}
