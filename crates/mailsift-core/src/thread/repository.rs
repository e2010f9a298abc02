//! Thread storage repository.

use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{QueryBuilder, Row};

use super::model::MailThread;
use crate::store::Store;
use crate::user::UserId;
use crate::Result;

const INSERT_CHUNK: usize = 200;

/// Repository for thread storage and retrieval.
pub struct ThreadRepository {
    pool: SqlitePool,
}

impl ThreadRepository {
    /// Create a repository over the store's pool.
    #[must_use]
    pub fn new(store: &Store) -> Self {
        Self {
            pool: store.pool().clone(),
        }
    }

    /// Whether a thread row exists for this user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn exists(&self, user: UserId, thread_id: &str) -> Result<bool> {
        let row = sqlx::query(r"SELECT 1 FROM threads WHERE user_pk = ? AND id = ?")
            .bind(user.0)
            .bind(thread_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Get a thread by provider id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, user: UserId, thread_id: &str) -> Result<Option<MailThread>> {
        let row = sqlx::query(
            r"SELECT id, snippet, history_id FROM threads WHERE user_pk = ? AND id = ?",
        )
        .bind(user.0)
        .bind(thread_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_thread))
    }

    /// Insert threads in bulk; rows that already exist are left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn insert_many(&self, user: UserId, threads: &[MailThread]) -> Result<()> {
        if threads.is_empty() {
            return Ok(());
        }

        for chunk in threads.chunks(INSERT_CHUNK) {
            let mut builder = QueryBuilder::new(
                "INSERT OR IGNORE INTO threads (user_pk, id, snippet, history_id) ",
            );
            builder.push_values(chunk, |mut row, thread| {
                row.push_bind(user.0)
                    .push_bind(&thread.thread_id)
                    .push_bind(&thread.snippet)
                    .push_bind(as_db_id(thread.history_id));
            });
            builder.build().execute(&self.pool).await?;
        }

        Ok(())
    }

    /// Move the thread's history pointer forward. An update carrying an
    /// older position than the stored one is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn update_history_id(&self, user: UserId, thread: &MailThread) -> Result<()> {
        sqlx::query(
            r"
            UPDATE threads SET history_id = ?, snippet = ?
            WHERE user_pk = ? AND id = ? AND history_id <= ?
            ",
        )
        .bind(as_db_id(thread.history_id))
        .bind(&thread.snippet)
        .bind(user.0)
        .bind(&thread.thread_id)
        .bind(as_db_id(thread.history_id))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert a new thread or advance an existing one's history pointer.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn upsert(&self, user: UserId, thread: &MailThread) -> Result<()> {
        if self.exists(user, &thread.thread_id).await? {
            self.update_history_id(user, thread).await
        } else {
            self.insert_many(user, std::slice::from_ref(thread)).await
        }
    }

    /// Number of thread rows for this user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count(&self, user: UserId) -> Result<i64> {
        let count = sqlx::query_scalar(r"SELECT COUNT(*) FROM threads WHERE user_pk = ?")
            .bind(user.0)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[allow(clippy::cast_possible_wrap)]
const fn as_db_id(history_id: u64) -> i64 {
    history_id as i64
}

#[allow(clippy::cast_sign_loss)]
fn row_to_thread(row: &SqliteRow) -> MailThread {
    MailThread {
        thread_id: row.get("id"),
        snippet: row.get("snippet"),
        history_id: row.get::<i64, _>("history_id") as u64,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn thread(id: &str, history_id: u64) -> MailThread {
        MailThread {
            thread_id: id.to_string(),
            snippet: format!("snippet of {id}"),
            history_id,
        }
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_updates() {
        let store = Store::in_memory().await.unwrap();
        let repo = ThreadRepository::new(&store);
        let user = UserId::new(1);

        repo.upsert(user, &thread("t1", 10)).await.unwrap();
        assert_eq!(repo.count(user).await.unwrap(), 1);

        repo.upsert(user, &thread("t1", 20)).await.unwrap();
        assert_eq!(repo.count(user).await.unwrap(), 1);
        assert_eq!(repo.get(user, "t1").await.unwrap().unwrap().history_id, 20);
    }

    #[tokio::test]
    async fn test_stale_history_update_is_ignored() {
        let store = Store::in_memory().await.unwrap();
        let repo = ThreadRepository::new(&store);
        let user = UserId::new(1);

        repo.upsert(user, &thread("t1", 50)).await.unwrap();
        repo.upsert(user, &thread("t1", 30)).await.unwrap();

        assert_eq!(repo.get(user, "t1").await.unwrap().unwrap().history_id, 50);
    }

    #[tokio::test]
    async fn test_insert_many_is_idempotent() {
        let store = Store::in_memory().await.unwrap();
        let repo = ThreadRepository::new(&store);
        let user = UserId::new(1);

        let threads = vec![thread("t1", 1), thread("t2", 2)];
        repo.insert_many(user, &threads).await.unwrap();
        repo.insert_many(user, &threads).await.unwrap();

        assert_eq!(repo.count(user).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_threads_are_scoped_per_user() {
        let store = Store::in_memory().await.unwrap();
        let repo = ThreadRepository::new(&store);

        repo.upsert(UserId::new(1), &thread("t1", 1)).await.unwrap();
        assert!(!repo.exists(UserId::new(2), "t1").await.unwrap());
    }
}
