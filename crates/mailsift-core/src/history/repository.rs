//! History event storage repository.
//!
//! Every change-log event id seen during reconciliation gets a `history`
//! row; `processed_at` is stamped once the event's writes have committed.
//! The watermark for the next run is recovered from these rows, falling
//! back to the synced data itself for mailboxes that have never
//! reconciled.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::store::Store;
use crate::user::UserId;
use crate::Result;

const INSERT_CHUNK: usize = 200;

/// Repository for history events and mailbox subscriptions.
pub struct HistoryRepository {
    pool: SqlitePool,
}

impl HistoryRepository {
    /// Create a repository over the store's pool.
    #[must_use]
    pub fn new(store: &Store) -> Self {
        Self {
            pool: store.pool().clone(),
        }
    }

    /// Record event ids as seen but not yet processed. Known ids are left
    /// untouched, stamped or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn insert_events_on(
        conn: &mut SqliteConnection,
        user: UserId,
        event_ids: &[u64],
    ) -> Result<()> {
        if event_ids.is_empty() {
            return Ok(());
        }

        for chunk in event_ids.chunks(INSERT_CHUNK) {
            let mut builder = QueryBuilder::new("INSERT OR IGNORE INTO history (user_pk, id) ");
            builder.push_values(chunk, |mut row, id| {
                row.push_bind(user.0).push_bind(as_db_id(*id));
            });
            builder.build().execute(&mut *conn).await?;
        }

        Ok(())
    }

    /// Stamp event ids as processed, inserting rows for ids never seen.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn mark_processed_on(
        conn: &mut SqliteConnection,
        user: UserId,
        event_ids: &[u64],
    ) -> Result<()> {
        if event_ids.is_empty() {
            return Ok(());
        }

        let now = Utc::now().to_rfc3339();
        for chunk in event_ids.chunks(INSERT_CHUNK) {
            let mut builder =
                QueryBuilder::new("INSERT INTO history (user_pk, id, processed_at) ");
            builder.push_values(chunk, |mut row, id| {
                row.push_bind(user.0).push_bind(as_db_id(*id)).push_bind(&now);
            });
            builder.push(
                " ON CONFLICT(user_pk, id) DO UPDATE SET processed_at = excluded.processed_at",
            );
            builder.build().execute(&mut *conn).await?;
        }

        Ok(())
    }

    /// Whether every one of `event_ids` is already stamped processed.
    ///
    /// An empty slice counts as processed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn are_processed(&self, user: UserId, event_ids: &[u64]) -> Result<bool> {
        let mut processed: i64 = 0;
        for chunk in event_ids.chunks(INSERT_CHUNK) {
            let mut builder = QueryBuilder::new(
                "SELECT COUNT(*) FROM history WHERE processed_at IS NOT NULL AND user_pk = ",
            );
            builder.push_bind(user.0);
            builder.push(" AND id IN (");
            let mut values = builder.separated(", ");
            for id in chunk {
                values.push_bind(as_db_id(*id));
            }
            builder.push(")");

            let count: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
            processed += count;
        }

        Ok(processed == i64::try_from(event_ids.len()).unwrap_or(i64::MAX))
    }

    /// The history position the next reconciliation should resume from.
    ///
    /// Preference order: the earliest event seen but never processed (a
    /// crashed run left it behind), then the newest processed event, then
    /// the highest position recorded on the user's threads and messages.
    /// `None` means the mailbox has no synced state at all.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn latest_history_id(&self, user: UserId) -> Result<Option<u64>> {
        let unprocessed: Option<i64> = sqlx::query_scalar(
            r"SELECT MIN(id) FROM history WHERE user_pk = ? AND processed_at IS NULL",
        )
        .bind(user.0)
        .fetch_one(&self.pool)
        .await?;
        if let Some(id) = unprocessed {
            return Ok(Some(from_db_id(id)));
        }

        let processed: Option<i64> = sqlx::query_scalar(
            r"SELECT MAX(id) FROM history WHERE user_pk = ? AND processed_at IS NOT NULL",
        )
        .bind(user.0)
        .fetch_one(&self.pool)
        .await?;
        if let Some(id) = processed {
            return Ok(Some(from_db_id(id)));
        }

        let synced: Option<i64> = sqlx::query_scalar(
            r"
            SELECT MAX(history_id) FROM (
                SELECT history_id FROM threads WHERE user_pk = ?
                UNION ALL
                SELECT history_id FROM messages WHERE user_pk = ?
            )
            ",
        )
        .bind(user.0)
        .bind(user.0)
        .fetch_one(&self.pool)
        .await?;

        Ok(synced.map(from_db_id))
    }

    /// Record a registered mailbox push subscription.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn create_subscription(
        &self,
        user: UserId,
        history_id: u64,
        expiration: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO mailbox_subscriptions (user_pk, history_id, expiration)
            VALUES (?, ?, ?)
            ",
        )
        .bind(user.0)
        .bind(as_db_id(history_id))
        .bind(expiration.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[allow(clippy::cast_possible_wrap)]
const fn as_db_id(history_id: u64) -> i64 {
    history_id as i64
}

#[allow(clippy::cast_sign_loss)]
const fn from_db_id(id: i64) -> u64 {
    id as u64
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::message::MessageRepository;
    use crate::thread::{MailThread, ThreadRepository};

    use super::*;

    #[tokio::test]
    async fn test_unprocessed_event_wins_watermark() {
        let store = Store::in_memory().await.unwrap();
        let repo = HistoryRepository::new(&store);
        let user = UserId::new(1);

        let mut conn = store.pool().acquire().await.unwrap();
        HistoryRepository::mark_processed_on(&mut conn, user, &[100, 120])
            .await
            .unwrap();
        HistoryRepository::insert_events_on(&mut conn, user, &[110, 130])
            .await
            .unwrap();
        drop(conn);

        // 110 and 130 were seen but never stamped; resume from the earliest.
        assert_eq!(repo.latest_history_id(user).await.unwrap(), Some(110));
    }

    #[tokio::test]
    async fn test_newest_processed_event_is_fallback() {
        let store = Store::in_memory().await.unwrap();
        let repo = HistoryRepository::new(&store);
        let user = UserId::new(1);

        let mut conn = store.pool().acquire().await.unwrap();
        HistoryRepository::mark_processed_on(&mut conn, user, &[100, 120, 105])
            .await
            .unwrap();
        drop(conn);

        assert_eq!(repo.latest_history_id(user).await.unwrap(), Some(120));
    }

    #[tokio::test]
    async fn test_synced_rows_are_last_fallback() {
        let store = Store::in_memory().await.unwrap();
        let repo = HistoryRepository::new(&store);
        let user = UserId::new(1);

        ThreadRepository::new(&store)
            .upsert(
                user,
                &MailThread {
                    thread_id: "t1".to_string(),
                    snippet: String::new(),
                    history_id: 77,
                },
            )
            .await
            .unwrap();
        let mut conn = store.pool().acquire().await.unwrap();
        MessageRepository::insert_many_on(
            &mut conn,
            user,
            &[crate::message::StoredMessage {
                message_id: "m1".to_string(),
                thread_id: "t1".to_string(),
                label_ids: Vec::new(),
                snippet: String::new(),
                history_id: 82,
                internal_date: None,
                size_estimate: None,
                added_history_id: None,
                deleted_history_id: None,
            }],
        )
        .await
        .unwrap();
        drop(conn);

        assert_eq!(repo.latest_history_id(user).await.unwrap(), Some(82));
    }

    #[tokio::test]
    async fn test_empty_mailbox_has_no_watermark() {
        let store = Store::in_memory().await.unwrap();
        let repo = HistoryRepository::new(&store);

        assert_eq!(repo.latest_history_id(UserId::new(1)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_are_processed_gates_replays() {
        let store = Store::in_memory().await.unwrap();
        let repo = HistoryRepository::new(&store);
        let user = UserId::new(1);

        let mut conn = store.pool().acquire().await.unwrap();
        HistoryRepository::mark_processed_on(&mut conn, user, &[10, 11])
            .await
            .unwrap();
        HistoryRepository::insert_events_on(&mut conn, user, &[12])
            .await
            .unwrap();
        drop(conn);

        assert!(repo.are_processed(user, &[10, 11]).await.unwrap());
        assert!(!repo.are_processed(user, &[10, 11, 12]).await.unwrap());
        assert!(repo.are_processed(user, &[]).await.unwrap());
    }
}
