//! Draft storage repository.

use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

use super::model::StoredDraft;
use crate::store::Store;
use crate::user::UserId;
use crate::Result;

/// Repository for created drafts.
pub struct DraftRepository {
    pool: SqlitePool,
}

impl DraftRepository {
    /// Create a repository over the store's pool.
    #[must_use]
    pub fn new(store: &Store) -> Self {
        Self {
            pool: store.pool().clone(),
        }
    }

    /// Record a created draft. Recording the same draft id twice keeps
    /// the first row.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn insert(&self, user: UserId, draft: &StoredDraft) -> Result<()> {
        sqlx::query(
            r"
            INSERT OR IGNORE INTO drafts (user_pk, id, message_id, thread_id)
            VALUES (?, ?, ?, ?)
            ",
        )
        .bind(user.0)
        .bind(&draft.draft_id)
        .bind(&draft.message_id)
        .bind(&draft.thread_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Drafts recorded for this user, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self, user: UserId) -> Result<Vec<StoredDraft>> {
        let rows = sqlx::query(
            r"
            SELECT id, message_id, thread_id, created_at
            FROM drafts WHERE user_pk = ? ORDER BY pk DESC
            ",
        )
        .bind(user.0)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_draft).collect())
    }
}

fn row_to_draft(row: &SqliteRow) -> StoredDraft {
    let created_at: String = row.get("created_at");
    StoredDraft {
        draft_id: row.get("id"),
        message_id: row.get("message_id"),
        thread_id: row.get("thread_id"),
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|d| d.with_timezone(&Utc))
            .or_else(|_| {
                NaiveDateTime::parse_from_str(&created_at, "%Y-%m-%d %H:%M:%S")
                    .map(|d| d.and_utc())
            })
            .unwrap_or_else(|_| Utc::now()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_list() {
        let store = Store::in_memory().await.unwrap();
        let repo = DraftRepository::new(&store);
        let user = UserId::new(1);

        let draft = StoredDraft {
            draft_id: "d1".to_string(),
            message_id: Some("m9".to_string()),
            thread_id: "t1".to_string(),
            created_at: Utc::now(),
        };
        repo.insert(user, &draft).await.unwrap();
        repo.insert(user, &draft).await.unwrap();

        let drafts = repo.list(user).await.unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].draft_id, "d1");
        assert_eq!(drafts[0].message_id.as_deref(), Some("m9"));
    }
}
