use crate::core::triggers::{TriggerDocument, TriggerError, TriggerStore};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tokio::sync::RwLock;

/// JSON-based trigger store. Persists everything in a single file as a map:
/// { guild_id: { trigger_name: TriggerDocument } }
#[derive(Debug, Serialize, Deserialize, Default)]
struct JsonTriggerData {
    pub guilds: HashMap<u64, BTreeMap<String, TriggerDocument>>,
}

#[allow(dead_code)]
pub struct JsonTriggerStore {
    path: PathBuf,
    cache: RwLock<JsonTriggerData>,
}

#[allow(dead_code)]
impl JsonTriggerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cache: JsonTriggerData = if path.exists() {
            let file = File::open(&path).expect("Failed to open trigger JSON file");
            let reader = BufReader::new(file);
            serde_json::from_reader(reader).unwrap_or_default()
        } else {
            JsonTriggerData::default()
        };

        Self {
            path,
            cache: RwLock::new(cache),
        }
    }

    async fn persist(&self) -> Result<(), TriggerError> {
        let cache = self.cache.read().await;
        let file =
            File::create(&self.path).map_err(|e| TriggerError::Storage(e.to_string()))?;
        serde_json::to_writer_pretty(file, &*cache)
            .map_err(|e| TriggerError::Storage(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl TriggerStore for JsonTriggerStore {
    async fn get_all(&self, guild_id: u64) -> Result<Vec<TriggerDocument>, TriggerError> {
        let cache = self.cache.read().await;
        Ok(cache
            .guilds
            .get(&guild_id)
            .map(|guild| guild.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get(
        &self,
        guild_id: u64,
        name: &str,
    ) -> Result<Option<TriggerDocument>, TriggerError> {
        let cache = self.cache.read().await;
        Ok(cache
            .guilds
            .get(&guild_id)
            .and_then(|guild| guild.get(name).cloned()))
    }

    async fn put(&self, guild_id: u64, doc: TriggerDocument) -> Result<(), TriggerError> {
        let mut cache = self.cache.write().await;
        cache
            .guilds
            .entry(guild_id)
            .or_default()
            .insert(doc.name.clone(), doc);
        drop(cache);
        self.persist().await
    }

    async fn delete(&self, guild_id: u64, name: &str) -> Result<(), TriggerError> {
        let mut cache = self.cache.write().await;
        if let Some(guild) = cache.guilds.get_mut(&guild_id) {
            guild.remove(name);
        }
        drop(cache);
        self.persist().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::triggers::{ResponseAction, ResponseKind, Trigger};
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn documents_survive_a_reload() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_owned();
        drop(tmp);

        let store = JsonTriggerStore::new(path.clone());
        let mut trigger =
            Trigger::new("persisted", r"\bspam\b", vec![ResponseKind::Delete], 9).unwrap();
        trigger.multi_payload = vec![ResponseAction::Delete];
        store.put(5, trigger.to_document()).await.unwrap();

        // Reload from file
        let store2 = JsonTriggerStore::new(path);
        let doc = store2.get(5, "persisted").await.unwrap().unwrap();
        assert_eq!(doc.regex, r"\bspam\b");
        assert_eq!(doc.author, 9);
        assert_eq!(doc.multi_payload, vec![ResponseAction::Delete]);
    }

    #[tokio::test]
    async fn deleting_then_reloading_stays_deleted() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_owned();
        drop(tmp);

        let store = JsonTriggerStore::new(path.clone());
        let trigger = Trigger::new("gone", "bye", vec![ResponseKind::Text], 1).unwrap();
        store.put(5, trigger.to_document()).await.unwrap();
        store.delete(5, "gone").await.unwrap();

        let store2 = JsonTriggerStore::new(path);
        assert!(store2.get(5, "gone").await.unwrap().is_none());
        assert!(store2.get_all(5).await.unwrap().is_empty());
    }
}
