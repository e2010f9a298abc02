//! Draft wire models.

use serde::{Deserialize, Serialize};

use super::history::MessageRef;

/// A draft as returned by `drafts.create`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Draft {
    /// Draft id.
    pub id: String,
    /// The underlying draft message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<MessageRef>,
}
