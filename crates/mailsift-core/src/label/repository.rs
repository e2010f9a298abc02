//! Label storage repository.

use std::collections::HashMap;

use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{QueryBuilder, Row};
use tracing::debug;

use super::model::StoredLabel;
use crate::store::Store;
use crate::user::UserId;
use crate::Result;

/// Repository for the per-user label registry.
pub struct LabelRepository {
    pool: SqlitePool,
}

impl LabelRepository {
    /// Create a repository over the store's pool.
    #[must_use]
    pub fn new(store: &Store) -> Self {
        Self {
            pool: store.pool().clone(),
        }
    }

    /// Get a label by provider id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, user: UserId, label_id: &str) -> Result<Option<StoredLabel>> {
        let row = sqlx::query(
            r"
            SELECT pk, id, name, label_type, message_list_visibility,
                   label_list_visibility, messages_total, messages_unread,
                   threads_total, threads_unread, text_color, background_color
            FROM labels WHERE user_pk = ? AND id = ?
            ",
        )
        .bind(user.0)
        .bind(label_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_label))
    }

    /// Insert a new label or bring an existing row up to date.
    ///
    /// Only columns whose values actually changed are written, so a
    /// refresh with identical data issues no UPDATE at all. The surrogate
    /// key of an existing row is preserved either way.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn upsert(&self, user: UserId, label: &StoredLabel) -> Result<i64> {
        match self.get(user, &label.label_id).await? {
            None => self.insert(user, label).await,
            Some(existing) => {
                let pk = existing.pk.unwrap_or_default();
                if label.differs_from(&existing) {
                    self.update_changed(user, label, &existing).await?;
                }
                Ok(pk)
            }
        }
    }

    async fn insert(&self, user: UserId, label: &StoredLabel) -> Result<i64> {
        let result = sqlx::query(
            r"
            INSERT INTO labels (
                user_pk, id, name, label_type, message_list_visibility,
                label_list_visibility, messages_total, messages_unread,
                threads_total, threads_unread, text_color, background_color
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(user.0)
        .bind(&label.label_id)
        .bind(&label.name)
        .bind(&label.label_type)
        .bind(&label.message_list_visibility)
        .bind(&label.label_list_visibility)
        .bind(label.messages_total)
        .bind(label.messages_unread)
        .bind(label.threads_total)
        .bind(label.threads_unread)
        .bind(&label.text_color)
        .bind(&label.background_color)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn update_changed(
        &self,
        user: UserId,
        label: &StoredLabel,
        existing: &StoredLabel,
    ) -> Result<()> {
        let mut builder = QueryBuilder::new("UPDATE labels SET ");
        let mut assignments = builder.separated(", ");

        if label.name != existing.name {
            assignments.push("name = ").push_bind_unseparated(&label.name);
        }
        if label.label_type != existing.label_type {
            assignments
                .push("label_type = ")
                .push_bind_unseparated(&label.label_type);
        }
        if label.message_list_visibility != existing.message_list_visibility {
            assignments
                .push("message_list_visibility = ")
                .push_bind_unseparated(&label.message_list_visibility);
        }
        if label.label_list_visibility != existing.label_list_visibility {
            assignments
                .push("label_list_visibility = ")
                .push_bind_unseparated(&label.label_list_visibility);
        }
        if label.messages_total != existing.messages_total {
            assignments
                .push("messages_total = ")
                .push_bind_unseparated(label.messages_total);
        }
        if label.messages_unread != existing.messages_unread {
            assignments
                .push("messages_unread = ")
                .push_bind_unseparated(label.messages_unread);
        }
        if label.threads_total != existing.threads_total {
            assignments
                .push("threads_total = ")
                .push_bind_unseparated(label.threads_total);
        }
        if label.threads_unread != existing.threads_unread {
            assignments
                .push("threads_unread = ")
                .push_bind_unseparated(label.threads_unread);
        }
        if label.text_color != existing.text_color {
            assignments
                .push("text_color = ")
                .push_bind_unseparated(&label.text_color);
        }
        if label.background_color != existing.background_color {
            assignments
                .push("background_color = ")
                .push_bind_unseparated(&label.background_color);
        }

        builder.push(" WHERE user_pk = ");
        builder.push_bind(user.0);
        builder.push(" AND id = ");
        builder.push_bind(&label.label_id);

        debug!(label_id = %label.label_id, "updating changed label columns");
        builder.build().execute(&self.pool).await?;

        Ok(())
    }

    /// Map of provider label id to local surrogate key for this user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_all(&self, user: UserId) -> Result<HashMap<String, i64>> {
        let rows = sqlx::query(r"SELECT id, pk FROM labels WHERE user_pk = ?")
            .bind(user.0)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.get("id"), row.get("pk")))
            .collect())
    }

    /// Number of label rows for this user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count(&self, user: UserId) -> Result<i64> {
        let count = sqlx::query_scalar(r"SELECT COUNT(*) FROM labels WHERE user_pk = ?")
            .bind(user.0)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn row_to_label(row: &SqliteRow) -> StoredLabel {
    StoredLabel {
        pk: Some(row.get("pk")),
        label_id: row.get("id"),
        name: row.get("name"),
        label_type: row.get("label_type"),
        message_list_visibility: row.get("message_list_visibility"),
        label_list_visibility: row.get("label_list_visibility"),
        messages_total: row.get("messages_total"),
        messages_unread: row.get("messages_unread"),
        threads_total: row.get("threads_total"),
        threads_unread: row.get("threads_unread"),
        text_color: row.get("text_color"),
        background_color: row.get("background_color"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn label(id: &str, name: &str, unread: i64) -> StoredLabel {
        StoredLabel {
            label_id: id.to_string(),
            name: name.to_string(),
            label_type: Some("user".to_string()),
            messages_unread: Some(unread),
            ..StoredLabel::default()
        }
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_updates_in_place() {
        let store = Store::in_memory().await.unwrap();
        let repo = LabelRepository::new(&store);
        let user = UserId::new(1);

        let pk = repo.upsert(user, &label("L1", "Work", 3)).await.unwrap();
        let pk_again = repo.upsert(user, &label("L1", "Work!", 5)).await.unwrap();

        assert_eq!(pk, pk_again);
        assert_eq!(repo.count(user).await.unwrap(), 1);

        let stored = repo.get(user, "L1").await.unwrap().unwrap();
        assert_eq!(stored.name, "Work!");
        assert_eq!(stored.messages_unread, Some(5));
    }

    #[tokio::test]
    async fn test_upsert_with_identical_data_keeps_row() {
        let store = Store::in_memory().await.unwrap();
        let repo = LabelRepository::new(&store);
        let user = UserId::new(1);

        repo.upsert(user, &label("L1", "Work", 3)).await.unwrap();
        repo.upsert(user, &label("L1", "Work", 3)).await.unwrap();

        assert_eq!(repo.count(user).await.unwrap(), 1);
        let stored = repo.get(user, "L1").await.unwrap().unwrap();
        assert_eq!(stored.name, "Work");
    }

    #[tokio::test]
    async fn test_get_all_maps_label_id_to_pk() {
        let store = Store::in_memory().await.unwrap();
        let repo = LabelRepository::new(&store);
        let user = UserId::new(1);

        let pk1 = repo.upsert(user, &label("L1", "Work", 0)).await.unwrap();
        let pk2 = repo.upsert(user, &label("L2", "Home", 0)).await.unwrap();

        let map = repo.get_all(user).await.unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["L1"], pk1);
        assert_eq!(map["L2"], pk2);
    }

    #[tokio::test]
    async fn test_labels_are_scoped_per_user() {
        let store = Store::in_memory().await.unwrap();
        let repo = LabelRepository::new(&store);

        repo.upsert(UserId::new(1), &label("L1", "Work", 0))
            .await
            .unwrap();

        assert!(repo.get(UserId::new(2), "L1").await.unwrap().is_none());
    }
}
