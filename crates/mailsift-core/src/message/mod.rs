//! Messages, MIME parts and headers.

mod flatten;
mod model;
mod repository;

pub use flatten::{MAX_INLINE_BODY_BYTES, flatten_message, plain_text_body};
pub use model::{FlatPart, StoredHeader, StoredMessage};
pub use repository::{LABEL_ADDED, LABEL_REMOVED, MessageRepository};
