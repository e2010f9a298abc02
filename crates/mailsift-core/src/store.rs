//! Storage gateway.
//!
//! One [`Store`] owns the connection pool and the schema; repositories
//! borrow the pool from it. Writes that must land together (the
//! reconciliation engine's final phase) run on a transaction obtained from
//! [`Store::begin`].

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};

use crate::Result;

/// Connection pool plus schema for the mailbox database.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (or create) the database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn new(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    /// The underlying pool, for repositories.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Begin a transaction. Dropping it without commit rolls back.
    ///
    /// # Errors
    ///
    /// Returns an error if a connection cannot be acquired.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        let statements = [
            r"
            CREATE TABLE IF NOT EXISTS users (
                pk INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS threads (
                pk INTEGER PRIMARY KEY AUTOINCREMENT,
                user_pk INTEGER NOT NULL,
                id TEXT NOT NULL,
                snippet TEXT NOT NULL DEFAULT '',
                history_id INTEGER NOT NULL DEFAULT 0,
                UNIQUE(user_pk, id)
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS messages (
                pk INTEGER PRIMARY KEY AUTOINCREMENT,
                user_pk INTEGER NOT NULL,
                id TEXT NOT NULL,
                thread_id TEXT NOT NULL,
                snippet TEXT NOT NULL DEFAULT '',
                history_id INTEGER NOT NULL DEFAULT 0,
                internal_date TEXT,
                size_estimate INTEGER,
                added_history_id INTEGER,
                deleted_history_id INTEGER,
                UNIQUE(user_pk, id)
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS message_parts (
                pk INTEGER PRIMARY KEY AUTOINCREMENT,
                user_pk INTEGER NOT NULL,
                message_id TEXT NOT NULL,
                part_id TEXT,
                mime_type TEXT NOT NULL DEFAULT '',
                filename TEXT NOT NULL DEFAULT '',
                body_attachment_id TEXT,
                body_size INTEGER NOT NULL DEFAULT 0,
                body_data TEXT,
                parent_part_id TEXT,
                UNIQUE(user_pk, message_id, part_id)
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS message_headers (
                pk INTEGER PRIMARY KEY AUTOINCREMENT,
                user_pk INTEGER NOT NULL,
                message_id TEXT NOT NULL,
                message_part_id TEXT,
                name TEXT NOT NULL,
                value TEXT NOT NULL DEFAULT ''
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS labels (
                pk INTEGER PRIMARY KEY AUTOINCREMENT,
                user_pk INTEGER NOT NULL,
                id TEXT NOT NULL,
                name TEXT NOT NULL DEFAULT '',
                label_type TEXT,
                message_list_visibility TEXT,
                label_list_visibility TEXT,
                messages_total INTEGER,
                messages_unread INTEGER,
                threads_total INTEGER,
                threads_unread INTEGER,
                text_color TEXT,
                background_color TEXT,
                UNIQUE(user_pk, id)
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS messages_labels (
                pk INTEGER PRIMARY KEY AUTOINCREMENT,
                user_pk INTEGER NOT NULL,
                message_id TEXT NOT NULL,
                label_pk INTEGER NOT NULL,
                UNIQUE(user_pk, message_id, label_pk)
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS messages_history (
                pk INTEGER PRIMARY KEY AUTOINCREMENT,
                user_pk INTEGER NOT NULL,
                message_id TEXT NOT NULL,
                history_id INTEGER NOT NULL,
                UNIQUE(user_pk, message_id, history_id)
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS messages_labels_history (
                pk INTEGER PRIMARY KEY AUTOINCREMENT,
                user_pk INTEGER NOT NULL,
                message_id TEXT NOT NULL,
                label_pk INTEGER NOT NULL,
                history_id INTEGER NOT NULL,
                action TEXT NOT NULL CHECK(action IN ('added', 'removed')),
                UNIQUE(user_pk, message_id, label_pk, history_id, action)
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS history (
                pk INTEGER PRIMARY KEY AUTOINCREMENT,
                user_pk INTEGER NOT NULL,
                id INTEGER NOT NULL,
                processed_at TEXT,
                UNIQUE(user_pk, id)
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS drafts (
                pk INTEGER PRIMARY KEY AUTOINCREMENT,
                user_pk INTEGER NOT NULL,
                id TEXT NOT NULL,
                message_id TEXT,
                thread_id TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(user_pk, id)
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS mailbox_subscriptions (
                pk INTEGER PRIMARY KEY AUTOINCREMENT,
                user_pk INTEGER NOT NULL,
                history_id INTEGER NOT NULL,
                expiration TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            ",
            r"
            CREATE INDEX IF NOT EXISTS idx_messages_thread
            ON messages(user_pk, thread_id)
            ",
            r"
            CREATE INDEX IF NOT EXISTS idx_message_parts_message
            ON message_parts(user_pk, message_id)
            ",
            r"
            CREATE INDEX IF NOT EXISTS idx_message_headers_message
            ON message_headers(user_pk, message_id)
            ",
            r"
            CREATE INDEX IF NOT EXISTS idx_messages_labels_message
            ON messages_labels(user_pk, message_id)
            ",
            r"
            CREATE INDEX IF NOT EXISTS idx_history_unprocessed
            ON history(user_pk, id) WHERE processed_at IS NULL
            ",
        ];

        for statement in statements {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_schema_creates_all_tables() {
        let store = Store::in_memory().await.unwrap();

        let tables: Vec<String> = sqlx::query_scalar(
            r"SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
        )
        .fetch_all(store.pool())
        .await
        .unwrap();

        for expected in [
            "users",
            "threads",
            "messages",
            "message_parts",
            "message_headers",
            "labels",
            "messages_labels",
            "messages_history",
            "messages_labels_history",
            "history",
            "drafts",
            "mailbox_subscriptions",
        ] {
            assert!(tables.iter().any(|t| t == expected), "missing {expected}");
        }
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let store = Store::in_memory().await.unwrap();
        store.initialize().await.unwrap();
    }
}
