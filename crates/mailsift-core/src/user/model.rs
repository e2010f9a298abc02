//! User model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Local surrogate key of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl UserId {
    /// Create a new user ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One mailbox owner. Every synced row is scoped to a user's `pk`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Local surrogate key.
    pub pk: UserId,
    /// Mailbox address; notifications are routed by it.
    pub email: String,
    /// Inactive users are skipped by sync entrypoints.
    pub is_active: bool,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
}
