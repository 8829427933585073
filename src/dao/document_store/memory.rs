//! In-process [`DocumentStore`] used by the integration tests and selectable
//! as a runtime backend for local development (`STORE_BACKEND=memory`).
//!
//! Change notifications are pushed over a broadcast channel, so watchers react
//! immediately instead of polling like the MongoDB backend does.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_stream::stream;
use futures::{future::BoxFuture, stream::BoxStream};
use indexmap::IndexMap;
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use super::{DocumentStore, Fields};
use crate::dao::storage::{StorageError, StorageResult};

/// Capacity of the change broadcast channel; lagged watchers resynchronise by
/// re-reading the current state.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Notification that a document changed (created, overwritten, or merged).
#[derive(Clone, Debug)]
struct Change {
    collection: &'static str,
    id: String,
}

struct Inner {
    // Collections keep insertion order so query results have a stable
    // store-return order, which the ranking tie-break relies on.
    collections: Mutex<HashMap<&'static str, IndexMap<String, Fields>>>,
    changes: broadcast::Sender<Change>,
}

/// Cheap-to-clone in-memory store backed by insertion-ordered maps.
#[derive(Clone)]
pub struct MemoryDocumentStore {
    inner: Arc<Inner>,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        let (changes, _receiver) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                collections: Mutex::new(HashMap::new()),
                changes,
            }),
        }
    }

    fn notify(&self, collection: &'static str, id: &str) {
        let _ = self.inner.changes.send(Change {
            collection,
            id: id.to_owned(),
        });
    }

    fn read_doc(&self, collection: &'static str, id: &str) -> Option<Fields> {
        let guard = self.inner.collections.lock().expect("memory store poisoned");
        guard.get(collection).and_then(|docs| docs.get(id)).cloned()
    }

    fn read_query(&self, collection: &'static str, field: &str, value: &Value) -> Vec<Fields> {
        let guard = self.inner.collections.lock().expect("memory store poisoned");
        guard
            .get(collection)
            .map(|docs| {
                docs.values()
                    .filter(|doc| doc.get(field) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn write(&self, collection: &'static str, id: &str, mut fields: Fields) {
        fields.insert("id".into(), Value::String(id.to_owned()));
        let mut guard = self.inner.collections.lock().expect("memory store poisoned");
        guard
            .entry(collection)
            .or_default()
            .insert(id.to_owned(), fields);
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn get(
        &self,
        collection: &'static str,
        id: &str,
    ) -> BoxFuture<'static, StorageResult<Option<Fields>>> {
        let store = self.clone();
        let id = id.to_owned();
        Box::pin(async move { Ok(store.read_doc(collection, &id)) })
    }

    fn set(
        &self,
        collection: &'static str,
        id: &str,
        fields: Fields,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let id = id.to_owned();
        Box::pin(async move {
            store.write(collection, &id, fields);
            store.notify(collection, &id);
            Ok(())
        })
    }

    fn update(
        &self,
        collection: &'static str,
        id: &str,
        fields: Fields,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let id = id.to_owned();
        Box::pin(async move {
            {
                let mut guard = store.inner.collections.lock().expect("memory store poisoned");
                let doc = guard
                    .get_mut(collection)
                    .and_then(|docs| docs.get_mut(&id))
                    .ok_or_else(|| StorageError::not_found(collection, &id))?;
                for (key, value) in fields {
                    doc.insert(key, value);
                }
            }
            store.notify(collection, &id);
            Ok(())
        })
    }

    fn update_where_eq(
        &self,
        collection: &'static str,
        id: &str,
        guard_field: &'static str,
        guard: Value,
        fields: Fields,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        let id = id.to_owned();
        Box::pin(async move {
            let applied = {
                let mut lock = store.inner.collections.lock().expect("memory store poisoned");
                let Some(doc) = lock.get_mut(collection).and_then(|docs| docs.get_mut(&id)) else {
                    return Ok(false);
                };
                let current = doc.get(guard_field).cloned().unwrap_or(Value::Null);
                if current == guard {
                    for (key, value) in fields {
                        doc.insert(key, value);
                    }
                    true
                } else {
                    false
                }
            };
            if applied {
                store.notify(collection, &id);
            }
            Ok(applied)
        })
    }

    fn add(
        &self,
        collection: &'static str,
        fields: Fields,
    ) -> BoxFuture<'static, StorageResult<String>> {
        let store = self.clone();
        Box::pin(async move {
            let id = Uuid::new_v4().simple().to_string();
            store.write(collection, &id, fields);
            store.notify(collection, &id);
            Ok(id)
        })
    }

    fn query_eq(
        &self,
        collection: &'static str,
        field: &'static str,
        value: Value,
    ) -> BoxFuture<'static, StorageResult<Vec<Fields>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.read_query(collection, field, &value)) })
    }

    fn list(&self, collection: &'static str) -> BoxFuture<'static, StorageResult<Vec<Fields>>> {
        let store = self.clone();
        Box::pin(async move {
            let guard = store.inner.collections.lock().expect("memory store poisoned");
            Ok(guard
                .get(collection)
                .map(|docs| docs.values().cloned().collect())
                .unwrap_or_default())
        })
    }

    fn watch_doc(&self, collection: &'static str, id: &str) -> BoxStream<'static, Option<Fields>> {
        let store = self.clone();
        let id = id.to_owned();
        Box::pin(stream! {
            let mut changes = store.inner.changes.subscribe();
            yield store.read_doc(collection, &id);
            loop {
                match changes.recv().await {
                    Ok(change) => {
                        if change.collection == collection && change.id == id {
                            yield store.read_doc(collection, &id);
                        }
                    }
                    // Dropped notifications: resynchronise from current state.
                    Err(RecvError::Lagged(_)) => yield store.read_doc(collection, &id),
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    fn watch_query_eq(
        &self,
        collection: &'static str,
        field: &'static str,
        value: Value,
    ) -> BoxStream<'static, Vec<Fields>> {
        let store = self.clone();
        Box::pin(stream! {
            let mut changes = store.inner.changes.subscribe();
            let mut last = store.read_query(collection, field, &value);
            yield last.clone();
            loop {
                match changes.recv().await {
                    Ok(change) if change.collection == collection => {
                        let rows = store.read_query(collection, field, &value);
                        if rows != last {
                            last = rows.clone();
                            yield rows;
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(_)) => {
                        let rows = store.read_query(collection, field, &value);
                        last = rows.clone();
                        yield rows;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use serde_json::json;

    use super::*;
    use crate::dao::document_store::to_fields;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let store = MemoryDocumentStore::new();
        store
            .set("venues", "v1", to_fields(json!({"name": "Main Hall"})))
            .await
            .unwrap();

        let doc = store.get("venues", "v1").await.unwrap().unwrap();
        assert_eq!(doc.get("name"), Some(&json!("Main Hall")));
        assert_eq!(doc.get("id"), Some(&json!("v1")));
    }

    #[tokio::test]
    async fn update_missing_document_is_not_found() {
        let store = MemoryDocumentStore::new();
        let err = store
            .update("venues", "missing", to_fields(json!({"name": "x"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn update_where_eq_applies_only_on_guard_match() {
        let store = MemoryDocumentStore::new();
        store
            .set("venues", "v1", to_fields(json!({"name": "Hall"})))
            .await
            .unwrap();

        // Null guard matches an absent field.
        let claimed = store
            .update_where_eq(
                "venues",
                "v1",
                "current_round_id",
                Value::Null,
                to_fields(json!({"current_round_id": "r1"})),
            )
            .await
            .unwrap();
        assert!(claimed);

        // Second claim loses: the field is now set.
        let claimed = store
            .update_where_eq(
                "venues",
                "v1",
                "current_round_id",
                Value::Null,
                to_fields(json!({"current_round_id": "r2"})),
            )
            .await
            .unwrap();
        assert!(!claimed);

        let doc = store.get("venues", "v1").await.unwrap().unwrap();
        assert_eq!(doc.get("current_round_id"), Some(&json!("r1")));
    }

    #[tokio::test]
    async fn query_eq_preserves_insertion_order() {
        let store = MemoryDocumentStore::new();
        for name in ["alpha", "beta", "gamma"] {
            store
                .add("teams", to_fields(json!({"venue_id": "v1", "name": name})))
                .await
                .unwrap();
        }
        store
            .add("teams", to_fields(json!({"venue_id": "v2", "name": "other"})))
            .await
            .unwrap();

        let rows = store
            .query_eq("teams", "venue_id", json!("v1"))
            .await
            .unwrap();
        let names: Vec<_> = rows.iter().map(|r| r.get("name").cloned().unwrap()).collect();
        assert_eq!(names, vec![json!("alpha"), json!("beta"), json!("gamma")]);
    }

    #[tokio::test]
    async fn watch_doc_emits_current_value_then_changes() {
        let store = MemoryDocumentStore::new();
        store
            .set("rounds", "r1", to_fields(json!({"state": "rolling"})))
            .await
            .unwrap();

        let mut watch = store.watch_doc("rounds", "r1");
        let initial = watch.next().await.unwrap().unwrap();
        assert_eq!(initial.get("state"), Some(&json!("rolling")));

        store
            .update("rounds", "r1", to_fields(json!({"state": "answering"})))
            .await
            .unwrap();
        let next = watch.next().await.unwrap().unwrap();
        assert_eq!(next.get("state"), Some(&json!("answering")));
    }
}
