//! Process-local document store used by default and in tests.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::{self, BoxFuture};
use serde_json::Value;
use uuid::Uuid;

use crate::dao::{document_store::DocumentStore, storage::StorageResult};

/// [`DocumentStore`] keeping every document in a concurrent map.
#[derive(Clone, Default)]
pub struct MemoryStore {
    documents: Arc<DashMap<(&'static str, Uuid), Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryStore {
    fn put(
        &self,
        collection: &'static str,
        id: Uuid,
        document: Value,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.documents.insert((collection, id), document);
        Box::pin(future::ready(Ok(())))
    }

    fn get(
        &self,
        collection: &'static str,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<Value>>> {
        let found = self
            .documents
            .get(&(collection, id))
            .map(|entry| entry.value().clone());
        Box::pin(future::ready(Ok(found)))
    }

    fn list(&self, collection: &'static str) -> BoxFuture<'static, StorageResult<Vec<Value>>> {
        let documents = self
            .documents
            .iter()
            .filter(|entry| entry.key().0 == collection)
            .map(|entry| entry.value().clone())
            .collect();
        Box::pin(future::ready(Ok(documents)))
    }

    fn delete(&self, collection: &'static str, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let removed = self.documents.remove(&(collection, id)).is_some();
        Box::pin(future::ready(Ok(removed)))
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(future::ready(Ok(())))
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(future::ready(Ok(())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn collections_are_isolated() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        store.put("matches", id, json!({"id": id})).await.unwrap();
        store
            .put("notifications", Uuid::new_v4(), json!({}))
            .await
            .unwrap();

        assert_eq!(store.list("matches").await.unwrap().len(), 1);
        assert!(store.get("notifications", id).await.unwrap().is_none());
        assert!(store.delete("matches", id).await.unwrap());
        assert!(!store.delete("matches", id).await.unwrap());
    }
}
