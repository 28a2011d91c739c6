// In-memory implementation of TriggerStore.
//
// Useful for tests and for running without any persistence configured;
// the JSON and SQLite stores implement the same contract.

use crate::core::triggers::{TriggerDocument, TriggerError, TriggerStore};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeMap;

/// Guild id -> (trigger name -> document), name-ordered per guild.
#[allow(dead_code)]
pub struct InMemoryTriggerStore {
    data: DashMap<u64, BTreeMap<String, TriggerDocument>>,
}

#[allow(dead_code)]
impl InMemoryTriggerStore {
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
        }
    }
}

impl Default for InMemoryTriggerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TriggerStore for InMemoryTriggerStore {
    async fn get_all(&self, guild_id: u64) -> Result<Vec<TriggerDocument>, TriggerError> {
        Ok(self
            .data
            .get(&guild_id)
            .map(|guild| guild.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get(
        &self,
        guild_id: u64,
        name: &str,
    ) -> Result<Option<TriggerDocument>, TriggerError> {
        Ok(self
            .data
            .get(&guild_id)
            .and_then(|guild| guild.get(name).cloned()))
    }

    async fn put(&self, guild_id: u64, doc: TriggerDocument) -> Result<(), TriggerError> {
        self.data
            .entry(guild_id)
            .or_default()
            .insert(doc.name.clone(), doc);
        Ok(())
    }

    async fn delete(&self, guild_id: u64, name: &str) -> Result<(), TriggerError> {
        if let Some(mut guild) = self.data.get_mut(&guild_id) {
            guild.remove(name);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::triggers::{ResponseKind, Trigger};

    fn doc(name: &str) -> TriggerDocument {
        Trigger::new(name, "hello", vec![ResponseKind::Text], 1)
            .unwrap()
            .to_document()
    }

    #[tokio::test]
    async fn put_get_delete_round_trip() {
        let store = InMemoryTriggerStore::new();

        store.put(1, doc("greet")).await.unwrap();
        assert!(store.get(1, "greet").await.unwrap().is_some());
        assert!(store.get(2, "greet").await.unwrap().is_none());

        store.delete(1, "greet").await.unwrap();
        assert!(store.get(1, "greet").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_all_returns_name_order() {
        let store = InMemoryTriggerStore::new();
        store.put(1, doc("zebra")).await.unwrap();
        store.put(1, doc("apple")).await.unwrap();

        let names: Vec<String> = store
            .get_all(1)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["apple".to_string(), "zebra".to_string()]);
    }
}
