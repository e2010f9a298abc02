//! # mailsift-core
//!
//! Core synchronization engine for mailsift.
//!
//! This crate provides:
//! - Typed mailbox entities (threads, messages, parts, headers, labels)
//! - MIME part flattening with derived parent linkage
//! - Local storage (`SQLite`) repositories for the full mailbox schema
//! - **Full Sync Engine** - cold-start bulk load of a mailbox
//! - **History Reconciliation Engine** - incremental change-log replay
//!   behind a resumable watermark
//! - Reply drafting against a pluggable assistant

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod draft;
mod error;
pub mod history;
pub mod label;
pub mod message;
pub mod notification;
pub mod store;
pub mod sync;
pub mod thread;
pub mod user;

pub use draft::{DraftRepository, StoredDraft, draft_reply_for_thread};
pub use error::{Error, Result};
pub use history::HistoryRepository;
pub use label::{LabelRepository, StoredLabel};
pub use message::{
    FlatPart, MAX_INLINE_BODY_BYTES, MessageRepository, StoredHeader, StoredMessage,
    flatten_message,
};
pub use notification::handle_mailbox_change;
pub use store::Store;
pub use sync::{
    MailProvider, ReconcileReport, SyncReport, reconcile, refresh_subscriptions, register_watch,
    sync_mailbox,
};
pub use thread::{MailThread, ThreadRepository};
pub use user::{User, UserId, UserRepository};
