// Trigger lifecycle service - creation, lookup, edits, removal and fire
// bookkeeping on top of a pluggable store.
//
// Storage is guild-scoped: trigger names are unique per guild, and all
// writes for one (guild, name) pair go through a per-key async lock so a
// dispatch-time count increment cannot race an administrative edit.

use super::trigger_models::{Trigger, TriggerDocument, TriggerError};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Persistence for trigger documents, keyed by guild and name.
///
/// `get_all` returns documents in a stable name order so listing and
/// dispatch are deterministic.
#[async_trait]
pub trait TriggerStore: Send + Sync {
    async fn get_all(&self, guild_id: u64) -> Result<Vec<TriggerDocument>, TriggerError>;

    async fn get(
        &self,
        guild_id: u64,
        name: &str,
    ) -> Result<Option<TriggerDocument>, TriggerError>;

    /// Insert or replace the document stored under its name.
    async fn put(&self, guild_id: u64, doc: TriggerDocument) -> Result<(), TriggerError>;

    async fn delete(&self, guild_id: u64, name: &str) -> Result<(), TriggerError>;
}

// ============================================================================
// SERVICE
// ============================================================================

pub struct TriggerService<S: TriggerStore> {
    store: S,
    /// Single-writer discipline per (guild, trigger name).
    locks: DashMap<(u64, String), Arc<Mutex<()>>>,
    /// Compiled triggers per guild, rebuilt after any mutation that affects
    /// matching. Count increments do not invalidate it: the counter is
    /// bookkeeping, not matching state.
    compiled: DashMap<u64, Arc<Vec<Trigger>>>,
}

impl<S: TriggerStore> TriggerService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: DashMap::new(),
            compiled: DashMap::new(),
        }
    }

    fn lock_for(&self, guild_id: u64, name: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry((guild_id, name.to_string()))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn invalidate(&self, guild_id: u64) {
        self.compiled.remove(&guild_id);
    }

    /// Persist a new trigger. Fails if the name is already taken in this
    /// guild; the pattern was already compiled when the entity was built.
    pub async fn create(&self, guild_id: u64, trigger: Trigger) -> Result<(), TriggerError> {
        let lock = self.lock_for(guild_id, &trigger.name);
        let _guard = lock.lock().await;

        if self.store.get(guild_id, &trigger.name).await?.is_some() {
            return Err(TriggerError::NameTaken(trigger.name));
        }
        self.store.put(guild_id, trigger.to_document()).await?;
        self.invalidate(guild_id);
        tracing::info!(guild_id, name = %trigger.name, "trigger created");
        Ok(())
    }

    pub async fn get(&self, guild_id: u64, name: &str) -> Result<Trigger, TriggerError> {
        match self.store.get(guild_id, name).await? {
            Some(doc) => Trigger::from_document(doc),
            None => Err(TriggerError::NotFound(name.to_string())),
        }
    }

    pub async fn remove(&self, guild_id: u64, name: &str) -> Result<(), TriggerError> {
        let lock = self.lock_for(guild_id, name);
        let _guard = lock.lock().await;

        if self.store.get(guild_id, name).await?.is_none() {
            return Err(TriggerError::NotFound(name.to_string()));
        }
        self.store.delete(guild_id, name).await?;
        self.invalidate(guild_id);
        tracing::info!(guild_id, name, "trigger removed");
        Ok(())
    }

    /// Apply an edit to a stored trigger under its write lock and persist
    /// the result.
    pub async fn update<F>(
        &self,
        guild_id: u64,
        name: &str,
        mutate: F,
    ) -> Result<Trigger, TriggerError>
    where
        F: FnOnce(&mut Trigger) + Send,
    {
        let lock = self.lock_for(guild_id, name);
        let _guard = lock.lock().await;

        let doc = self
            .store
            .get(guild_id, name)
            .await?
            .ok_or_else(|| TriggerError::NotFound(name.to_string()))?;
        let mut trigger = Trigger::from_document(doc)?;
        mutate(&mut trigger);
        // The name is the storage key and must stay fixed.
        trigger.name = name.to_string();
        self.store.put(guild_id, trigger.to_document()).await?;
        self.invalidate(guild_id);
        Ok(trigger)
    }

    /// Flip the enabled state, returning the new state.
    pub async fn toggle(&self, guild_id: u64, name: &str) -> Result<bool, TriggerError> {
        let trigger = self.update(guild_id, name, Trigger::toggle).await?;
        Ok(trigger.enabled)
    }

    pub async fn set_enabled(
        &self,
        guild_id: u64,
        name: &str,
        enabled: bool,
    ) -> Result<(), TriggerError> {
        self.update(guild_id, name, |t| t.enabled = enabled).await?;
        Ok(())
    }

    /// Administrative counter reset.
    pub async fn reset_count(&self, guild_id: u64, name: &str) -> Result<(), TriggerError> {
        self.update(guild_id, name, |t| t.count = 0).await?;
        Ok(())
    }

    /// Record a successful firing: bump the counter and persist. Returns the
    /// new count.
    pub async fn record_fire(&self, guild_id: u64, name: &str) -> Result<u64, TriggerError> {
        let lock = self.lock_for(guild_id, name);
        let _guard = lock.lock().await;

        let doc = self
            .store
            .get(guild_id, name)
            .await?
            .ok_or_else(|| TriggerError::NotFound(name.to_string()))?;
        let mut trigger = Trigger::from_document(doc)?;
        trigger.count = trigger.count.saturating_add(1);
        let count = trigger.count;
        self.store.put(guild_id, trigger.to_document()).await?;
        Ok(count)
    }

    /// All compiled triggers for a guild, cached until the next mutation.
    /// Documents that fail to compile are logged and skipped rather than
    /// taking the whole guild down.
    pub async fn triggers_for(&self, guild_id: u64) -> Result<Arc<Vec<Trigger>>, TriggerError> {
        if let Some(cached) = self.compiled.get(&guild_id) {
            return Ok(Arc::clone(&cached));
        }
        let docs = self.store.get_all(guild_id).await?;
        let mut triggers = Vec::with_capacity(docs.len());
        for doc in docs {
            let name = doc.name.clone();
            match Trigger::from_document(doc) {
                Ok(trigger) => triggers.push(trigger),
                Err(e) => {
                    tracing::error!(guild_id, name = %name, "skipping stored trigger: {e}");
                }
            }
        }
        let triggers = Arc::new(triggers);
        self.compiled.insert(guild_id, Arc::clone(&triggers));
        Ok(triggers)
    }
}

// ============================================================================
// TESTS
// ============================================================================
