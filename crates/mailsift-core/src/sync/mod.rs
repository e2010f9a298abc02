//! Mailbox synchronization engines.
//!
//! [`sync_mailbox`] performs the cold-start bulk load; [`reconcile`]
//! replays the provider's change log from a resumable watermark. Both run
//! against any [`MailProvider`].

mod full;
mod provider;
mod reconcile;
mod watch;

pub use full::{SyncReport, sync_mailbox};
pub use provider::MailProvider;
pub use reconcile::{ReconcileReport, reconcile};
pub use watch::{refresh_subscriptions, register_watch};
