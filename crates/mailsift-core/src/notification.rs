//! Push notification handling.
//!
//! A mailbox push delivery carries only the address and the mailbox's
//! current history position. The stored watermark, not the notification's
//! position, decides where replay starts; the notification position is the
//! fallback for a mailbox that has never reconciled.

use mailsift_gmail::decode_notification;
use tracing::info;

use crate::history::HistoryRepository;
use crate::store::Store;
use crate::sync::{MailProvider, ReconcileReport, reconcile};
use crate::user::UserRepository;
use crate::{Error, Result};

/// React to one push notification payload (base64-encoded JSON).
///
/// # Errors
///
/// Returns an error when the payload is malformed, when no user owns the
/// notified address, or when reconciliation itself fails.
pub async fn handle_mailbox_change<P: MailProvider>(
    store: &Store,
    provider: &P,
    payload: &str,
) -> Result<ReconcileReport> {
    let notification = decode_notification(payload).map_err(Error::Gmail)?;

    let user = UserRepository::new(store)
        .get_by_email(&notification.email_address)
        .await?
        .ok_or_else(|| Error::UserNotFound(notification.email_address.clone()))?;

    let since = HistoryRepository::new(store)
        .latest_history_id(user.pk)
        .await?
        .unwrap_or(notification.history_id);

    info!(
        email = %notification.email_address,
        notified = notification.history_id,
        since,
        "mailbox change notification received"
    );
    reconcile(store, provider, user.pk, since).await
}
