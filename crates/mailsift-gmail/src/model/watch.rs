//! Mailbox watch (push subscription) wire models.

use serde::{Deserialize, Serialize};

/// Response to a `users.watch` registration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WatchResponse {
    /// History position at the moment the subscription was created.
    #[serde(rename = "historyId", default)]
    pub history_id: String,
    /// Subscription expiry as epoch milliseconds (stringly typed).
    #[serde(default)]
    pub expiration: String,
}

impl WatchResponse {
    /// Expiry parsed to epoch milliseconds.
    #[must_use]
    pub fn expiration_millis(&self) -> Option<i64> {
        self.expiration.parse().ok()
    }
}
