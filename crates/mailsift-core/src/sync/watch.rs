//! Mailbox push subscription upkeep.
//!
//! Provider-side subscriptions expire after a few days; the refresh
//! entrypoint re-registers every active user's subscription and is meant
//! to run on a schedule well inside the expiry window.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::provider::MailProvider;
use crate::history::HistoryRepository;
use crate::store::Store;
use crate::user::{UserId, UserRepository};
use crate::{Error, Result};

/// Register the push subscription for one user and record it.
///
/// # Errors
///
/// Returns an error if registration or storage fails.
pub async fn register_watch<P: MailProvider>(
    store: &Store,
    provider: &P,
    user: UserId,
    topic: &str,
) -> Result<DateTime<Utc>> {
    let response = provider.watch(topic).await.map_err(Error::Gmail)?;
    let expiration = response
        .expiration_millis()
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or_else(Utc::now);
    let history_id: u64 = response.history_id.parse().unwrap_or(0);

    HistoryRepository::new(store)
        .create_subscription(user, history_id, expiration)
        .await?;

    info!(user = %user, history_id, %expiration, "push subscription registered");
    Ok(expiration)
}

/// Re-register the push subscription for every active user.
///
/// A failed registration is logged and skipped so one dead mailbox does
/// not stall the rest. Returns how many users were refreshed.
///
/// # Errors
///
/// Returns an error if the user list cannot be read.
pub async fn refresh_subscriptions<P: MailProvider>(
    store: &Store,
    provider: &P,
    topic: &str,
) -> Result<usize> {
    let users = UserRepository::new(store).list_active().await?;
    let mut refreshed = 0usize;
    for user in &users {
        match register_watch(store, provider, user.pk, topic).await {
            Ok(_) => refreshed += 1,
            Err(e) => warn!(email = %user.email, error = %e, "subscription refresh failed"),
        }
    }

    info!(refreshed, total = users.len(), "subscription refresh complete");
    Ok(refreshed)
}
