//! User storage repository.

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};

use super::model::{User, UserId};
use crate::store::Store;
use crate::{Error, Result};

/// Repository for user storage and retrieval.
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a repository over the store's pool.
    #[must_use]
    pub fn new(store: &Store) -> Self {
        Self {
            pool: store.pool().clone(),
        }
    }

    /// Create a user, returning it with its assigned key.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails or the address is taken.
    pub async fn create(&self, email: &str) -> Result<User> {
        let result = sqlx::query(r"INSERT INTO users (email, is_active) VALUES (?, 1)")
            .bind(email)
            .execute(&self.pool)
            .await?;

        self.get(UserId::new(result.last_insert_rowid()))
            .await?
            .ok_or_else(|| Error::UserNotFound(email.to_string()))
    }

    /// Get a user by surrogate key.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query(r"SELECT pk, email, is_active, created_at FROM users WHERE pk = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(row_to_user))
    }

    /// Get a user by mailbox address.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let row =
            sqlx::query(r"SELECT pk, email, is_active, created_at FROM users WHERE email = ?")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.as_ref().map(row_to_user))
    }

    /// List all active users.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_active(&self) -> Result<Vec<User>> {
        let rows = sqlx::query(
            r"SELECT pk, email, is_active, created_at FROM users WHERE is_active = 1 ORDER BY pk",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_user).collect())
    }

    /// Deactivate a user so sync entrypoints skip them. Used when the
    /// user's credentials turn out to be dead.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn deactivate(&self, id: UserId) -> Result<()> {
        sqlx::query(r"UPDATE users SET is_active = 0 WHERE pk = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn row_to_user(row: &SqliteRow) -> User {
    // CURRENT_TIMESTAMP writes "YYYY-MM-DD HH:MM:SS"; rows written by this
    // crate use RFC 3339.
    let created_at: String = row.get("created_at");
    let parsed = DateTime::parse_from_rfc3339(&created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(&created_at, "%Y-%m-%d %H:%M:%S")
                .map(|dt| dt.and_utc())
        });
    User {
        pk: UserId::new(row.get("pk")),
        email: row.get("email"),
        is_active: row.get::<i64, _>("is_active") != 0,
        created_at: parsed.unwrap_or_else(|_| Utc::now()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_get_by_email() {
        let store = Store::in_memory().await.unwrap();
        let repo = UserRepository::new(&store);

        let user = repo.create("a@b.com").await.unwrap();
        assert!(user.is_active);

        let found = repo.get_by_email("a@b.com").await.unwrap().unwrap();
        assert_eq!(found.pk, user.pk);
        assert!(repo.get_by_email("nobody@b.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deactivate_hides_from_active_list() {
        let store = Store::in_memory().await.unwrap();
        let repo = UserRepository::new(&store);

        let user = repo.create("a@b.com").await.unwrap();
        repo.create("b@b.com").await.unwrap();
        repo.deactivate(user.pk).await.unwrap();

        let active = repo.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].email, "b@b.com");
    }
}
