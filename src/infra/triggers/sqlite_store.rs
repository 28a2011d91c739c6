// SQLite-backed trigger store.
//
// One row per trigger, keyed by (guild_id, name), with the full document
// serialized into a JSON column. Schema-per-field is deliberately avoided:
// the document already carries forward-compatible defaults, so older rows
// keep deserializing as fields are added.

use crate::core::triggers::{TriggerDocument, TriggerError, TriggerStore};
use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteTriggerStore {
    pool: Pool<Sqlite>,
}

impl SqliteTriggerStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), TriggerError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS triggers (
                guild_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                document TEXT NOT NULL,
                PRIMARY KEY (guild_id, name)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| TriggerError::Storage(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl TriggerStore for SqliteTriggerStore {
    async fn get_all(&self, guild_id: u64) -> Result<Vec<TriggerDocument>, TriggerError> {
        let rows = sqlx::query(
            "SELECT name, document FROM triggers WHERE guild_id = ? ORDER BY name",
        )
        .bind(guild_id as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TriggerError::Storage(e.to_string()))?;

        let mut docs = Vec::with_capacity(rows.len());
        for row in rows {
            let raw: String = row.get("document");
            match serde_json::from_str::<TriggerDocument>(&raw) {
                Ok(doc) => docs.push(doc),
                Err(e) => {
                    let name: String = row.get("name");
                    tracing::error!(guild_id, name, "unreadable trigger document: {e}");
                }
            }
        }
        Ok(docs)
    }

    async fn get(
        &self,
        guild_id: u64,
        name: &str,
    ) -> Result<Option<TriggerDocument>, TriggerError> {
        let row = sqlx::query("SELECT document FROM triggers WHERE guild_id = ? AND name = ?")
            .bind(guild_id as i64)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| TriggerError::Storage(e.to_string()))?;

        match row {
            Some(row) => {
                let raw: String = row.get("document");
                let doc = serde_json::from_str(&raw)
                    .map_err(|e| TriggerError::Storage(e.to_string()))?;
                Ok(Some(doc))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, guild_id: u64, doc: TriggerDocument) -> Result<(), TriggerError> {
        let raw =
            serde_json::to_string(&doc).map_err(|e| TriggerError::Storage(e.to_string()))?;
        sqlx::query(
            r#"
            INSERT INTO triggers (guild_id, name, document)
            VALUES (?, ?, ?)
            ON CONFLICT(guild_id, name) DO UPDATE SET
                document = excluded.document
            "#,
        )
        .bind(guild_id as i64)
        .bind(&doc.name)
        .bind(raw)
        .execute(&self.pool)
        .await
        .map_err(|e| TriggerError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, guild_id: u64, name: &str) -> Result<(), TriggerError> {
        sqlx::query("DELETE FROM triggers WHERE guild_id = ? AND name = ?")
            .bind(guild_id as i64)
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| TriggerError::Storage(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::triggers::{ResponseAction, ResponseKind, Trigger};
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_store() -> SqliteTriggerStore {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteTriggerStore::new(pool);
        store.migrate().await.unwrap();
        store
    }

    #[tokio::test]
    async fn put_get_round_trip() {
        let store = memory_store().await;
        let mut trigger =
            Trigger::new("stored", r"\bspam\b", vec![ResponseKind::Delete], 3).unwrap();
        trigger.multi_payload = vec![ResponseAction::Delete];
        trigger.chance = Some(75);

        store.put(7, trigger.to_document()).await.unwrap();

        let doc = store.get(7, "stored").await.unwrap().unwrap();
        assert_eq!(doc.regex, r"\bspam\b");
        assert_eq!(doc.chance, Some(75));
        assert!(store.get(8, "stored").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_replaces_an_existing_document() {
        let store = memory_store().await;
        let mut trigger = Trigger::new("flip", "x", vec![ResponseKind::Text], 1).unwrap();
        store.put(7, trigger.to_document()).await.unwrap();

        trigger.enabled = false;
        store.put(7, trigger.to_document()).await.unwrap();

        let doc = store.get(7, "flip").await.unwrap().unwrap();
        assert!(!doc.enabled);
        assert_eq!(store.get_all(7).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn get_all_is_name_ordered_and_delete_removes() {
        let store = memory_store().await;
        for name in ["zulu", "alpha", "mike"] {
            let trigger = Trigger::new(name, "x", vec![ResponseKind::Text], 1).unwrap();
            store.put(7, trigger.to_document()).await.unwrap();
        }

        let names: Vec<String> = store
            .get_all(7)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["alpha", "mike", "zulu"]);

        store.delete(7, "mike").await.unwrap();
        assert_eq!(store.get_all(7).await.unwrap().len(), 2);
    }
}
