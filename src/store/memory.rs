use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use serde_json::Value;

use super::{Document, DocumentStore, Filter, StoreError};

/// In-process store used by the test suite and by `STORE_BACKEND=memory`.
/// Documents live until the process exits.
pub struct MemoryStore {
    next_id: AtomicU64,
    collections: RwLock<HashMap<String, BTreeMap<u64, Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            collections: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, collection: &str, body: Value) -> Result<Document, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let doc = Document {
            id,
            version: 1,
            body,
        };
        self.collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(collection.to_string())
            .or_default()
            .insert(id, doc.clone());
        Ok(doc)
    }

    async fn get(&self, collection: &str, id: u64) -> Result<Option<Document>, StoreError> {
        let collections = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(collections.get(collection).and_then(|c| c.get(&id)).cloned())
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        let collections = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(collections
            .get(collection)
            .map(|c| {
                c.values()
                    .filter(|doc| filter.matches(&doc.body))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn replace(
        &self,
        collection: &str,
        id: u64,
        expected_version: u64,
        body: Value,
    ) -> Result<Option<Document>, StoreError> {
        let mut collections = self
            .collections
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(current) = collections.get_mut(collection).and_then(|c| c.get_mut(&id)) else {
            return Ok(None);
        };
        if current.version != expected_version {
            return Err(StoreError::VersionConflict {
                collection: collection.to_string(),
                id,
            });
        }
        current.version += 1;
        current.body = body;
        Ok(Some(current.clone()))
    }

    async fn delete(&self, collection: &str, id: u64) -> Result<Option<Document>, StoreError> {
        Ok(self
            .collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(collection)
            .and_then(|c| c.remove(&id)))
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let mut collections = self
            .collections
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|_, doc| !filter.matches(&doc.body));
        Ok((before - docs.len()) as u64)
    }
}
