use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::Value;
use tracing::warn;

use super::{Document, DocumentStore, Filter, StoreError, compare, lookup};

/// A decoded document. Serializes as the document's own fields plus `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<T> {
    pub id: u64,
    pub version: u64,
    pub doc: T,
}

impl<T: Serialize> Serialize for Record<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut value = serde_json::to_value(&self.doc).map_err(serde::ser::Error::custom)?;
        if let Value::Object(map) = &mut value {
            map.insert("id".to_string(), Value::from(self.id));
        }
        value.serialize(serializer)
    }
}

impl<T: Serialize> Record<T> {
    /// JSON view with the given top-level fields removed (password hashes).
    pub fn to_json_without(&self, hidden: &[&str]) -> Value {
        let mut value = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut value {
            for field in hidden {
                map.remove(*field);
            }
        }
        value
    }
}

/// Typed repository over one collection of a [`DocumentStore`].
pub struct Collection<T> {
    name: &'static str,
    store: Arc<dyn DocumentStore>,
    write_retries: u32,
    _doc: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            store: self.store.clone(),
            write_retries: self.write_retries,
            _doc: PhantomData,
        }
    }
}

impl<T> Collection<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(name: &'static str, store: Arc<dyn DocumentStore>, write_retries: u32) -> Self {
        Self {
            name,
            store,
            write_retries,
            _doc: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn decode(doc: Document) -> Result<Record<T>, StoreError> {
        Ok(Record {
            id: doc.id,
            version: doc.version,
            doc: serde_json::from_value(doc.body)?,
        })
    }

    pub async fn insert(&self, doc: T) -> Result<Record<T>, StoreError> {
        let body = serde_json::to_value(&doc)?;
        let stored = self.store.insert(self.name, body).await?;
        Ok(Record {
            id: stored.id,
            version: stored.version,
            doc,
        })
    }

    pub async fn get(&self, id: u64) -> Result<Option<Record<T>>, StoreError> {
        self.store
            .get(self.name, id)
            .await?
            .map(Self::decode)
            .transpose()
    }

    pub async fn find(&self, filter: &Filter) -> Result<Vec<Record<T>>, StoreError> {
        self.store
            .find(self.name, filter)
            .await?
            .into_iter()
            .map(Self::decode)
            .collect()
    }

    /// Like [`find`](Self::find), ordered by the given fields (ascending,
    /// later fields break ties).
    pub async fn find_sorted(
        &self,
        filter: &Filter,
        sort_by: &[&str],
    ) -> Result<Vec<Record<T>>, StoreError> {
        let mut docs = self.store.find(self.name, filter).await?;
        docs.sort_by(|a, b| {
            sort_by
                .iter()
                .map(|field| match (lookup(&a.body, field), lookup(&b.body, field)) {
                    (Some(x), Some(y)) => compare(x, y).unwrap_or(std::cmp::Ordering::Equal),
                    (None, Some(_)) => std::cmp::Ordering::Less,
                    (Some(_), None) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                })
                .find(|ord| ord.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        docs.into_iter().map(Self::decode).collect()
    }

    pub async fn find_one(&self, filter: &Filter) -> Result<Option<Record<T>>, StoreError> {
        Ok(self.find(filter).await?.into_iter().next())
    }

    pub async fn all(&self) -> Result<Vec<Record<T>>, StoreError> {
        self.find(&Filter::new()).await
    }

    pub async fn delete(&self, id: u64) -> Result<Option<Record<T>>, StoreError> {
        self.store
            .delete(self.name, id)
            .await?
            .map(Self::decode)
            .transpose()
    }

    pub async fn delete_many(&self, filter: &Filter) -> Result<u64, StoreError> {
        self.store.delete_many(self.name, filter).await
    }

    /// Read-modify-write of one document under a version check.
    ///
    /// `apply` mutates a fresh copy of the stored document; if another writer
    /// got in between the read and the write the whole cycle is repeated, up
    /// to the configured number of retries. An error from `apply` aborts
    /// without writing. `Ok(None)` when the document does not exist.
    pub async fn update_with<R, E, F>(&self, id: u64, mut apply: F) -> Result<Option<(Record<T>, R)>, E>
    where
        F: FnMut(&mut T) -> Result<R, E>,
        E: From<StoreError>,
    {
        let mut attempt = 0;
        loop {
            let Some(current) = self.get(id).await? else {
                return Ok(None);
            };
            let mut doc = current.doc;
            let outcome = apply(&mut doc)?;
            let body = serde_json::to_value(&doc).map_err(StoreError::from)?;

            match self.store.replace(self.name, id, current.version, body).await {
                Ok(Some(stored)) => {
                    let record = Record {
                        id,
                        version: stored.version,
                        doc,
                    };
                    return Ok(Some((record, outcome)));
                }
                Ok(None) => return Ok(None),
                Err(StoreError::VersionConflict { .. }) if attempt < self.write_retries => {
                    attempt += 1;
                    warn!(collection = self.name, id, attempt, "Version conflict, retrying write");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        name: String,
        hits: u32,
    }

    fn counters(store: Arc<dyn DocumentStore>) -> Collection<Counter> {
        Collection::new("counters", store, 3)
    }

    #[actix_web::test]
    async fn record_serializes_flat_with_id() {
        let coll = counters(Arc::new(MemoryStore::new()));
        let rec = coll
            .insert(Counter {
                name: "a".into(),
                hits: 1,
            })
            .await
            .unwrap();

        let value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value, json!({"id": rec.id, "name": "a", "hits": 1}));
        assert_eq!(rec.to_json_without(&["hits"]), json!({"id": rec.id, "name": "a"}));
    }

    #[actix_web::test]
    async fn find_sorted_orders_by_fields() {
        let coll = counters(Arc::new(MemoryStore::new()));
        for (name, hits) in [("b", 2), ("a", 2), ("c", 1)] {
            coll.insert(Counter {
                name: name.into(),
                hits,
            })
            .await
            .unwrap();
        }

        let names: Vec<_> = coll
            .find_sorted(&Filter::new(), &["hits", "name"])
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.doc.name)
            .collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[actix_web::test]
    async fn update_with_error_leaves_document_untouched() {
        let coll = counters(Arc::new(MemoryStore::new()));
        let rec = coll
            .insert(Counter {
                name: "a".into(),
                hits: 0,
            })
            .await
            .unwrap();

        let result: Result<_, StoreError> = coll
            .update_with(rec.id, |c| {
                c.hits = 99;
                Err(StoreError::VersionConflict {
                    collection: "counters".into(),
                    id: 0,
                })
            })
            .await
            .map(|r: Option<(Record<Counter>, ())>| r.is_some());
        assert!(result.is_err());

        let stored = coll.get(rec.id).await.unwrap().unwrap();
        assert_eq!(stored.doc.hits, 0);
        assert_eq!(stored.version, rec.version);
    }

    /// Store whose first `replace` always loses the race.
    struct RacingStore {
        inner: MemoryStore,
        conflicts_left: AtomicU32,
    }

    #[async_trait]
    impl DocumentStore for RacingStore {
        async fn insert(&self, c: &str, body: Value) -> Result<Document, StoreError> {
            self.inner.insert(c, body).await
        }
        async fn get(&self, c: &str, id: u64) -> Result<Option<Document>, StoreError> {
            self.inner.get(c, id).await
        }
        async fn find(&self, c: &str, f: &Filter) -> Result<Vec<Document>, StoreError> {
            self.inner.find(c, f).await
        }
        async fn replace(
            &self,
            c: &str,
            id: u64,
            version: u64,
            body: Value,
        ) -> Result<Option<Document>, StoreError> {
            if self.conflicts_left.load(Ordering::SeqCst) > 0 {
                self.conflicts_left.fetch_sub(1, Ordering::SeqCst);
                return Err(StoreError::VersionConflict {
                    collection: c.to_string(),
                    id,
                });
            }
            self.inner.replace(c, id, version, body).await
        }
        async fn delete(&self, c: &str, id: u64) -> Result<Option<Document>, StoreError> {
            self.inner.delete(c, id).await
        }
        async fn delete_many(&self, c: &str, f: &Filter) -> Result<u64, StoreError> {
            self.inner.delete_many(c, f).await
        }
    }

    #[actix_web::test]
    async fn update_with_retries_after_conflict() {
        let store = Arc::new(RacingStore {
            inner: MemoryStore::new(),
            conflicts_left: AtomicU32::new(2),
        });
        let coll = counters(store);
        let rec = coll
            .insert(Counter {
                name: "a".into(),
                hits: 0,
            })
            .await
            .unwrap();

        let mut calls = 0;
        let (updated, _) = coll
            .update_with(rec.id, |c| {
                calls += 1;
                c.hits += 1;
                Ok::<_, StoreError>(())
            })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(calls, 3);
        assert_eq!(updated.doc.hits, 1);
    }

    #[actix_web::test]
    async fn update_with_gives_up_after_retries() {
        let store = Arc::new(RacingStore {
            inner: MemoryStore::new(),
            conflicts_left: AtomicU32::new(10),
        });
        let coll = counters(store);
        let rec = coll
            .insert(Counter {
                name: "a".into(),
                hits: 0,
            })
            .await
            .unwrap();

        let result = coll
            .update_with(rec.id, |c| {
                c.hits += 1;
                Ok::<_, StoreError>(())
            })
            .await;

        assert!(matches!(result, Err(StoreError::VersionConflict { .. })));
    }
}
