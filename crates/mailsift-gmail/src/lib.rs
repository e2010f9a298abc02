//! # mailsift-gmail
//!
//! Gmail REST API client for the mailsift sync engine.
//!
//! This crate provides:
//! - Wire models for the Gmail v1 resources (threads, messages, labels,
//!   history, watch subscriptions, drafts)
//! - A client with paginated listing and chunked batch fetches
//! - Push-notification payload decoding
//!
//! The client holds its own HTTP connection pool and access token; nothing
//! in here touches storage.

#![forbid(unsafe_code)]

pub mod client;
mod error;
pub mod model;
pub mod notification;

pub use client::{BATCH_LIMIT, GmailClient, ThreadIdPage};
pub use error::{Error, Result};
pub use model::{
    Draft, History, HistoryPage, Label, LabelChange, LabelColor, Message, MessageEnvelope,
    MessagePart, MessagePartBody, MessageRef, PartHeader, Thread, ThreadStub, WatchResponse,
};
pub use notification::{MailboxNotification, decode_notification};
