//! Reply drafting.

mod model;
mod repository;
mod service;

pub use model::StoredDraft;
pub use repository::DraftRepository;
pub use service::{ThreadTurn, build_conversation, draft_reply_for_thread, last_inbound_sender};
