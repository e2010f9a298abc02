//! Label model types.

use mailsift_gmail::Label;

/// A label as persisted locally.
///
/// `pk` is the local surrogate key; it is the only value edge tables
/// reference, so updates must never reassign it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoredLabel {
    /// Local surrogate key, assigned on first insert.
    pub pk: Option<i64>,
    /// Stable provider label id.
    pub label_id: String,
    /// Display name.
    pub name: String,
    /// `system` or `user`.
    pub label_type: Option<String>,
    /// Message list visibility flag.
    pub message_list_visibility: Option<String>,
    /// Label list visibility flag.
    pub label_list_visibility: Option<String>,
    /// Total messages carrying the label.
    pub messages_total: Option<i64>,
    /// Unread messages carrying the label.
    pub messages_unread: Option<i64>,
    /// Total threads carrying the label.
    pub threads_total: Option<i64>,
    /// Unread threads carrying the label.
    pub threads_unread: Option<i64>,
    /// Foreground color.
    pub text_color: Option<String>,
    /// Background color.
    pub background_color: Option<String>,
}

impl StoredLabel {
    /// Build the local entity from a wire label.
    #[must_use]
    pub fn from_wire(label: &Label) -> Self {
        Self {
            pk: None,
            label_id: label.id.clone(),
            name: label.name.clone(),
            label_type: label.label_type.clone(),
            message_list_visibility: label.message_list_visibility.clone(),
            label_list_visibility: label.label_list_visibility.clone(),
            messages_total: label.messages_total,
            messages_unread: label.messages_unread,
            threads_total: label.threads_total,
            threads_unread: label.threads_unread,
            text_color: label.color.as_ref().and_then(|c| c.text_color.clone()),
            background_color: label
                .color
                .as_ref()
                .and_then(|c| c.background_color.clone()),
        }
    }

    /// Whether any persisted column differs from `other`, ignoring `pk`.
    #[must_use]
    pub fn differs_from(&self, other: &Self) -> bool {
        self.name != other.name
            || self.label_type != other.label_type
            || self.message_list_visibility != other.message_list_visibility
            || self.label_list_visibility != other.label_list_visibility
            || self.messages_total != other.messages_total
            || self.messages_unread != other.messages_unread
            || self.threads_total != other.threads_total
            || self.threads_unread != other.threads_unread
            || self.text_color != other.text_color
            || self.background_color != other.background_color
    }
}
