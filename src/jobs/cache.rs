//! Persisted cache of already-processed item identifiers.
//!
//! The cache is what makes indexing resumable: it is loaded at job start and
//! written back after **every** successfully processed item, so a crash
//! after item *k* loses at most the work for item *k+1*. It grows
//! monotonically and is never pruned automatically.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Context;

use crate::store::StateStore;

/// Store key under which the identifier set is persisted.
pub const CACHE_KEY: &str = "processed-items";

/// Set of opaque identifiers already processed, backed by a [`StateStore`].
pub struct ProcessedItemCache {
    ids: HashSet<String>,
    store: Arc<dyn StateStore>,
}

impl std::fmt::Debug for ProcessedItemCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessedItemCache")
            .field("len", &self.ids.len())
            .finish()
    }
}

impl ProcessedItemCache {
    /// Load the persisted set; an absent document means an empty cache.
    pub async fn load(store: Arc<dyn StateStore>) -> anyhow::Result<Self> {
        let ids = match store.read(CACHE_KEY).await? {
            Some(text) => {
                let list: Vec<String> =
                    serde_json::from_str(&text).context("failed to parse processed-item cache")?;
                list.into_iter().collect()
            }
            None => HashSet::new(),
        };
        Ok(Self { ids, store })
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Record one identifier and persist immediately (not batched).
    pub async fn insert(&mut self, id: impl Into<String>) -> anyhow::Result<()> {
        if self.ids.insert(id.into()) {
            self.persist().await?;
        }
        Ok(())
    }

    async fn persist(&self) -> anyhow::Result<()> {
        // Sorted for a deterministic on-disk document.
        let mut list: Vec<&String> = self.ids.iter().collect();
        list.sort();
        self.store
            .write(CACHE_KEY, &serde_json::to_string(&list)?)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn starts_empty_and_persists_each_insert() {
        let store = Arc::new(MemoryStore::new());
        let mut cache = ProcessedItemCache::load(store.clone()).await.unwrap();
        assert!(cache.is_empty());

        cache.insert("photo-a").await.unwrap();
        cache.insert("photo-b").await.unwrap();

        // Persisted state is already visible to a fresh load.
        let reloaded = ProcessedItemCache::load(store).await.unwrap();
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.contains("photo-a"));
        assert!(reloaded.contains("photo-b"));
    }

    #[tokio::test]
    async fn duplicate_inserts_are_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let mut cache = ProcessedItemCache::load(store).await.unwrap();

        cache.insert("photo-a").await.unwrap();
        cache.insert("photo-a").await.unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn persists_as_sorted_json_array() {
        let store = Arc::new(MemoryStore::new());
        let mut cache = ProcessedItemCache::load(store.clone()).await.unwrap();
        cache.insert("b").await.unwrap();
        cache.insert("a").await.unwrap();

        let text = store.read(CACHE_KEY).await.unwrap().unwrap();
        assert_eq!(text, r#"["a","b"]"#);
    }
}
