//! Label wire models.

use serde::{Deserialize, Serialize};

/// Display colors of a user label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LabelColor {
    /// Foreground color as a hex string.
    #[serde(rename = "textColor", default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    /// Background color as a hex string.
    #[serde(rename = "backgroundColor", default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
}

/// A label as returned by `labels.get`.
///
/// Counter fields are only populated on the detail endpoint, not on
/// `labels.list`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Label {
    /// Stable label id, e.g. `INBOX` or `Label_7`.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// `system` or `user`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub label_type: Option<String>,
    /// Whether messages with this label show in the message list.
    #[serde(
        rename = "messageListVisibility",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub message_list_visibility: Option<String>,
    /// Whether the label shows in the label list.
    #[serde(
        rename = "labelListVisibility",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub label_list_visibility: Option<String>,
    /// Total number of messages carrying the label.
    #[serde(rename = "messagesTotal", default, skip_serializing_if = "Option::is_none")]
    pub messages_total: Option<i64>,
    /// Number of unread messages carrying the label.
    #[serde(rename = "messagesUnread", default, skip_serializing_if = "Option::is_none")]
    pub messages_unread: Option<i64>,
    /// Total number of threads carrying the label.
    #[serde(rename = "threadsTotal", default, skip_serializing_if = "Option::is_none")]
    pub threads_total: Option<i64>,
    /// Number of unread threads carrying the label.
    #[serde(rename = "threadsUnread", default, skip_serializing_if = "Option::is_none")]
    pub threads_unread: Option<i64>,
    /// Display colors, user labels only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<LabelColor>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_label_detail() {
        let json = r##"{
            "id": "Label_7",
            "name": "Receipts",
            "type": "user",
            "messageListVisibility": "show",
            "labelListVisibility": "labelShow",
            "messagesTotal": 42,
            "messagesUnread": 3,
            "threadsTotal": 40,
            "threadsUnread": 3,
            "color": {"textColor": "#ffffff", "backgroundColor": "#fb4c2f"}
        }"##;

        let label: Label = serde_json::from_str(json).unwrap();
        assert_eq!(label.id, "Label_7");
        assert_eq!(label.label_type.as_deref(), Some("user"));
        assert_eq!(label.messages_total, Some(42));
        assert_eq!(
            label.color.unwrap().background_color.as_deref(),
            Some("#fb4c2f")
        );
    }

    #[test]
    fn test_deserialize_system_label_without_counters() {
        let label: Label = serde_json::from_str(r#"{"id": "INBOX", "name": "INBOX"}"#).unwrap();
        assert!(label.messages_total.is_none());
        assert!(label.color.is_none());
    }
}
