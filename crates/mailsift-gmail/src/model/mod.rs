//! Wire models for Gmail v1 resources.
//!
//! Every field the API may omit is an `Option` or defaults to empty; a
//! partial payload deserializes rather than failing the whole fetch.

mod draft;
mod history;
mod label;
mod message;
mod thread;
mod watch;

pub use draft::Draft;
pub use history::{History, HistoryPage, LabelChange, MessageEnvelope, MessageRef};
pub use label::{Label, LabelColor};
pub use message::{Message, MessagePart, MessagePartBody, PartHeader};
pub use thread::{Thread, ThreadList, ThreadStub};
pub use watch::WatchResponse;
