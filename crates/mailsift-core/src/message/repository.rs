//! Message storage repository.
//!
//! Reconciliation writes messages, parts, headers, label edges and audit
//! rows inside one transaction, so the write paths exist as associated
//! functions over a borrowed connection. The pool-based methods wrap them
//! for callers outside a transaction.

use std::collections::HashSet;

use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{QueryBuilder, Row, SqliteConnection};

use super::model::{FlatPart, StoredHeader, StoredMessage};
use crate::store::Store;
use crate::user::UserId;
use crate::Result;

const INSERT_CHUNK: usize = 100;

/// Label audit action: label applied to a message.
pub const LABEL_ADDED: &str = "added";
/// Label audit action: label removed from a message.
pub const LABEL_REMOVED: &str = "removed";

/// Repository for messages and their satellite rows.
pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
    /// Create a repository over the store's pool.
    #[must_use]
    pub fn new(store: &Store) -> Self {
        Self {
            pool: store.pool().clone(),
        }
    }

    /// Get a message by provider id, with its live label ids.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, user: UserId, message_id: &str) -> Result<Option<StoredMessage>> {
        let row = sqlx::query(
            r"
            SELECT id, thread_id, snippet, history_id, internal_date,
                   size_estimate, added_history_id, deleted_history_id
            FROM messages WHERE user_pk = ? AND id = ?
            ",
        )
        .bind(user.0)
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut message = row_to_message(&row);

        message.label_ids = sqlx::query_scalar(
            r"
            SELECT l.id FROM messages_labels ml
            JOIN labels l ON l.pk = ml.label_pk
            WHERE ml.user_pk = ? AND ml.message_id = ?
            ORDER BY l.id
            ",
        )
        .bind(user.0)
        .bind(message_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(message))
    }

    /// Subset of `ids` that already have a row for this user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_existing_ids(&self, user: UserId, ids: &[String]) -> Result<HashSet<String>> {
        let mut existing = HashSet::new();
        for chunk in ids.chunks(INSERT_CHUNK) {
            let mut builder =
                QueryBuilder::new("SELECT id FROM messages WHERE user_pk = ");
            builder.push_bind(user.0);
            builder.push(" AND id IN (");
            let mut values = builder.separated(", ");
            for id in chunk {
                values.push_bind(id);
            }
            builder.push(")");

            let rows = builder.build().fetch_all(&self.pool).await?;
            existing.extend(rows.into_iter().map(|row| row.get::<String, _>("id")));
        }
        Ok(existing)
    }

    /// Insert messages in bulk; rows that already exist are left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn insert_many(&self, user: UserId, messages: &[StoredMessage]) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_many_on(&mut conn, user, messages).await
    }

    /// Transactional form of [`Self::insert_many`].
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn insert_many_on(
        conn: &mut SqliteConnection,
        user: UserId,
        messages: &[StoredMessage],
    ) -> Result<()> {
        if messages.is_empty() {
            return Ok(());
        }

        for chunk in messages.chunks(INSERT_CHUNK) {
            let mut builder = QueryBuilder::new(
                "INSERT OR IGNORE INTO messages (user_pk, id, thread_id, snippet, \
                 history_id, internal_date, size_estimate, added_history_id) ",
            );
            builder.push_values(chunk, |mut row, message| {
                row.push_bind(user.0)
                    .push_bind(&message.message_id)
                    .push_bind(&message.thread_id)
                    .push_bind(&message.snippet)
                    .push_bind(as_db_id(message.history_id))
                    .push_bind(message.internal_date.map(|d| d.to_rfc3339()))
                    .push_bind(message.size_estimate)
                    .push_bind(message.added_history_id.map(as_db_id));
            });
            builder.build().execute(&mut *conn).await?;
        }

        Ok(())
    }

    /// Insert flattened parts; rows that already exist are left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn insert_parts(&self, user: UserId, parts: &[FlatPart]) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_parts_on(&mut conn, user, parts).await
    }

    /// Transactional form of [`Self::insert_parts`].
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn insert_parts_on(
        conn: &mut SqliteConnection,
        user: UserId,
        parts: &[FlatPart],
    ) -> Result<()> {
        if parts.is_empty() {
            return Ok(());
        }

        for chunk in parts.chunks(INSERT_CHUNK) {
            let mut builder = QueryBuilder::new(
                "INSERT OR IGNORE INTO message_parts (user_pk, message_id, part_id, \
                 mime_type, filename, body_attachment_id, body_size, body_data, \
                 parent_part_id) ",
            );
            builder.push_values(chunk, |mut row, part| {
                row.push_bind(user.0)
                    .push_bind(&part.message_id)
                    .push_bind(&part.part_id)
                    .push_bind(&part.mime_type)
                    .push_bind(&part.filename)
                    .push_bind(&part.attachment_id)
                    .push_bind(part.body_size)
                    .push_bind(&part.body_data)
                    .push_bind(&part.parent_part_id);
            });
            builder.build().execute(&mut *conn).await?;
        }

        Ok(())
    }

    /// Insert headers.
    ///
    /// Header rows carry no uniqueness; callers must only persist headers
    /// for messages they just inserted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn insert_headers(&self, user: UserId, headers: &[StoredHeader]) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_headers_on(&mut conn, user, headers).await
    }

    /// Transactional form of [`Self::insert_headers`].
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn insert_headers_on(
        conn: &mut SqliteConnection,
        user: UserId,
        headers: &[StoredHeader],
    ) -> Result<()> {
        if headers.is_empty() {
            return Ok(());
        }

        for chunk in headers.chunks(INSERT_CHUNK) {
            let mut builder = QueryBuilder::new(
                "INSERT INTO message_headers (user_pk, message_id, message_part_id, \
                 name, value) ",
            );
            builder.push_values(chunk, |mut row, header| {
                row.push_bind(user.0)
                    .push_bind(&header.message_id)
                    .push_bind(&header.message_part_id)
                    .push_bind(&header.name)
                    .push_bind(&header.value);
            });
            builder.build().execute(&mut *conn).await?;
        }

        Ok(())
    }

    /// Attach a label to a message. Re-attaching is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn insert_label_edge(
        &self,
        user: UserId,
        message_id: &str,
        label_pk: i64,
    ) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_label_edge_on(&mut conn, user, message_id, label_pk).await
    }

    /// Transactional form of [`Self::insert_label_edge`].
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn insert_label_edge_on(
        conn: &mut SqliteConnection,
        user: UserId,
        message_id: &str,
        label_pk: i64,
    ) -> Result<()> {
        sqlx::query(
            r"
            INSERT OR IGNORE INTO messages_labels (user_pk, message_id, label_pk)
            VALUES (?, ?, ?)
            ",
        )
        .bind(user.0)
        .bind(message_id)
        .bind(label_pk)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Detach a label from a message. Detaching an absent edge is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn delete_label_edge_on(
        conn: &mut SqliteConnection,
        user: UserId,
        message_id: &str,
        label_pk: i64,
    ) -> Result<()> {
        sqlx::query(
            r"
            DELETE FROM messages_labels
            WHERE user_pk = ? AND message_id = ? AND label_pk = ?
            ",
        )
        .bind(user.0)
        .bind(message_id)
        .bind(label_pk)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Record a label change in the audit log. Replayed changes are
    /// absorbed by the table's uniqueness.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn insert_label_audit_on(
        conn: &mut SqliteConnection,
        user: UserId,
        message_id: &str,
        label_pk: i64,
        history_id: u64,
        action: &str,
    ) -> Result<()> {
        sqlx::query(
            r"
            INSERT OR IGNORE INTO messages_labels_history
                (user_pk, message_id, label_pk, history_id, action)
            VALUES (?, ?, ?, ?, ?)
            ",
        )
        .bind(user.0)
        .bind(message_id)
        .bind(label_pk)
        .bind(as_db_id(history_id))
        .bind(action)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Record that a change event touched a message.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn insert_message_history_on(
        conn: &mut SqliteConnection,
        user: UserId,
        message_id: &str,
        history_id: u64,
    ) -> Result<()> {
        sqlx::query(
            r"
            INSERT OR IGNORE INTO messages_history (user_pk, message_id, history_id)
            VALUES (?, ?, ?)
            ",
        )
        .bind(user.0)
        .bind(message_id)
        .bind(as_db_id(history_id))
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Mark a message deleted without dropping its row.
    ///
    /// The deletion position is stamped once; a later delete event for the
    /// same message leaves the original stamp in place. Live label edges
    /// are removed either way.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn tombstone_on(
        conn: &mut SqliteConnection,
        user: UserId,
        message_id: &str,
        history_id: u64,
    ) -> Result<()> {
        sqlx::query(
            r"
            UPDATE messages SET deleted_history_id = ?
            WHERE user_pk = ? AND id = ? AND deleted_history_id IS NULL
            ",
        )
        .bind(as_db_id(history_id))
        .bind(user.0)
        .bind(message_id)
        .execute(&mut *conn)
        .await?;

        sqlx::query(r"DELETE FROM messages_labels WHERE user_pk = ? AND message_id = ?")
            .bind(user.0)
            .bind(message_id)
            .execute(conn)
            .await?;

        Ok(())
    }

    /// Live messages of a thread, oldest delivery first.
    ///
    /// Tombstoned messages are excluded.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_thread(&self, user: UserId, thread_id: &str) -> Result<Vec<StoredMessage>> {
        let rows = sqlx::query(
            r"
            SELECT id, thread_id, snippet, history_id, internal_date,
                   size_estimate, added_history_id, deleted_history_id
            FROM messages
            WHERE user_pk = ? AND thread_id = ? AND deleted_history_id IS NULL
            ORDER BY internal_date
            ",
        )
        .bind(user.0)
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await?;

        let mut messages: Vec<StoredMessage> = rows.iter().map(row_to_message).collect();
        for message in &mut messages {
            message.label_ids = sqlx::query_scalar(
                r"
                SELECT l.id FROM messages_labels ml
                JOIN labels l ON l.pk = ml.label_pk
                WHERE ml.user_pk = ? AND ml.message_id = ?
                ORDER BY l.id
                ",
            )
            .bind(user.0)
            .bind(&message.message_id)
            .fetch_all(&self.pool)
            .await?;
        }

        Ok(messages)
    }

    /// Flattened parts of a message, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn parts(&self, user: UserId, message_id: &str) -> Result<Vec<FlatPart>> {
        let rows = sqlx::query(
            r"
            SELECT message_id, part_id, mime_type, filename, body_attachment_id,
                   body_size, body_data, parent_part_id
            FROM message_parts
            WHERE user_pk = ? AND message_id = ?
            ORDER BY pk
            ",
        )
        .bind(user.0)
        .bind(message_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| FlatPart {
                message_id: row.get("message_id"),
                part_id: row.get("part_id"),
                mime_type: row.get("mime_type"),
                filename: row.get("filename"),
                attachment_id: row.get("body_attachment_id"),
                body_size: row.get("body_size"),
                body_data: row.get("body_data"),
                parent_part_id: row.get("parent_part_id"),
            })
            .collect())
    }

    /// First stored value of a header on a message, by lowercased name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn header_value(
        &self,
        user: UserId,
        message_id: &str,
        name: &str,
    ) -> Result<Option<String>> {
        let value = sqlx::query_scalar(
            r"
            SELECT value FROM message_headers
            WHERE user_pk = ? AND message_id = ? AND name = ?
            ORDER BY pk LIMIT 1
            ",
        )
        .bind(user.0)
        .bind(message_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(value)
    }

    /// Label surrogate keys currently attached to a message.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn label_edges(&self, user: UserId, message_id: &str) -> Result<Vec<i64>> {
        let pks = sqlx::query_scalar(
            r"
            SELECT label_pk FROM messages_labels
            WHERE user_pk = ? AND message_id = ?
            ORDER BY label_pk
            ",
        )
        .bind(user.0)
        .bind(message_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(pks)
    }

    /// Number of message rows for this user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count(&self, user: UserId) -> Result<i64> {
        let count = sqlx::query_scalar(r"SELECT COUNT(*) FROM messages WHERE user_pk = ?")
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
fn row_to_message(row: &SqliteRow) -> StoredMessage {
    StoredMessage {
        message_id: row.get("id"),
        thread_id: row.get("thread_id"),
        label_ids: Vec::new(),
        snippet: row.get("snippet"),
        history_id: row.get::<i64, _>("history_id") as u64,
        internal_date: row
            .get::<Option<String>, _>("internal_date")
            .and_then(|d| chrono::DateTime::parse_from_rfc3339(&d).ok())
            .map(|d| d.with_timezone(&chrono::Utc)),
        size_estimate: row.get("size_estimate"),
        added_history_id: row
            .get::<Option<i64>, _>("added_history_id")
            .map(|id| id as u64),
        deleted_history_id: row
            .get::<Option<i64>, _>("deleted_history_id")
            .map(|id| id as u64),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::label::{LabelRepository, StoredLabel};

    use super::*;

    fn message(id: &str, thread_id: &str, history_id: u64) -> StoredMessage {
        StoredMessage {
            message_id: id.to_string(),
            thread_id: thread_id.to_string(),
            label_ids: Vec::new(),
            snippet: format!("snippet of {id}"),
            history_id,
            internal_date: None,
            size_estimate: Some(1024),
            added_history_id: None,
            deleted_history_id: None,
        }
    }

    async fn insert_label(store: &Store, user: UserId, label_id: &str) -> i64 {
        LabelRepository::new(store)
            .upsert(
                user,
                &StoredLabel {
                    label_id: label_id.to_string(),
                    name: label_id.to_string(),
                    ..StoredLabel::default()
                },
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_insert_many_is_idempotent() {
        let store = Store::in_memory().await.unwrap();
        let repo = MessageRepository::new(&store);
        let user = UserId::new(1);

        let messages = vec![message("m1", "t1", 5), message("m2", "t1", 6)];
        repo.insert_many(user, &messages).await.unwrap();
        repo.insert_many(user, &messages).await.unwrap();

        assert_eq!(repo.count(user).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_get_existing_ids_discriminates() {
        let store = Store::in_memory().await.unwrap();
        let repo = MessageRepository::new(&store);
        let user = UserId::new(1);

        repo.insert_many(user, &[message("m1", "t1", 5)])
            .await
            .unwrap();

        let existing = repo
            .get_existing_ids(user, &["m1".to_string(), "m2".to_string()])
            .await
            .unwrap();

        assert!(existing.contains("m1"));
        assert!(!existing.contains("m2"));
    }

    #[tokio::test]
    async fn test_label_edges_round_trip() {
        let store = Store::in_memory().await.unwrap();
        let repo = MessageRepository::new(&store);
        let user = UserId::new(1);

        repo.insert_many(user, &[message("m1", "t1", 5)])
            .await
            .unwrap();
        let label_pk = insert_label(&store, user, "INBOX").await;

        repo.insert_label_edge(user, "m1", label_pk).await.unwrap();
        repo.insert_label_edge(user, "m1", label_pk).await.unwrap();
        assert_eq!(repo.label_edges(user, "m1").await.unwrap(), vec![label_pk]);

        let mut conn = store.pool().acquire().await.unwrap();
        MessageRepository::delete_label_edge_on(&mut conn, user, "m1", label_pk)
            .await
            .unwrap();
        drop(conn);
        assert!(repo.label_edges(user, "m1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tombstone_keeps_row_and_first_stamp() {
        let store = Store::in_memory().await.unwrap();
        let repo = MessageRepository::new(&store);
        let user = UserId::new(1);

        repo.insert_many(user, &[message("m1", "t1", 5)])
            .await
            .unwrap();
        let label_pk = insert_label(&store, user, "INBOX").await;
        repo.insert_label_edge(user, "m1", label_pk).await.unwrap();

        let mut conn = store.pool().acquire().await.unwrap();
        MessageRepository::tombstone_on(&mut conn, user, "m1", 40)
            .await
            .unwrap();
        MessageRepository::tombstone_on(&mut conn, user, "m1", 90)
            .await
            .unwrap();
        drop(conn);

        let stored = repo.get(user, "m1").await.unwrap().unwrap();
        assert_eq!(stored.deleted_history_id, Some(40));
        assert!(repo.label_edges(user, "m1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_label_audit_absorbs_replay() {
        let store = Store::in_memory().await.unwrap();
        let user = UserId::new(1);
        let label_pk = insert_label(&store, user, "INBOX").await;

        let mut conn = store.pool().acquire().await.unwrap();
        for _ in 0..2 {
            MessageRepository::insert_label_audit_on(&mut conn, user, "m1", label_pk, 7, LABEL_ADDED)
                .await
                .unwrap();
        }
        drop(conn);

        let count: i64 =
            sqlx::query_scalar(r"SELECT COUNT(*) FROM messages_labels_history WHERE user_pk = ?")
                .bind(user.0)
                .fetch_one(store.pool())
                .await
                .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_get_loads_live_label_ids() {
        let store = Store::in_memory().await.unwrap();
        let repo = MessageRepository::new(&store);
        let user = UserId::new(1);

        repo.insert_many(user, &[message("m1", "t1", 5)])
            .await
            .unwrap();
        let inbox = insert_label(&store, user, "INBOX").await;
        let unread = insert_label(&store, user, "UNREAD").await;
        repo.insert_label_edge(user, "m1", inbox).await.unwrap();
        repo.insert_label_edge(user, "m1", unread).await.unwrap();

        let stored = repo.get(user, "m1").await.unwrap().unwrap();
        assert_eq!(stored.label_ids, vec!["INBOX", "UNREAD"]);
    }
}
