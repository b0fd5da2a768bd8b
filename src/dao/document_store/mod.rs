#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use futures::future::BoxFuture;
use serde_json::Value;
use uuid::Uuid;

use crate::dao::storage::StorageResult;

/// Abstraction over the persistence layer: JSON documents grouped in named collections.
pub trait DocumentStore: Send + Sync {
    /// Insert or replace the document stored under `id`.
    fn put(
        &self,
        collection: &'static str,
        id: Uuid,
        document: Value,
    ) -> BoxFuture<'static, StorageResult<()>>;
    fn get(&self, collection: &'static str, id: Uuid)
    -> BoxFuture<'static, StorageResult<Option<Value>>>;
    fn list(&self, collection: &'static str) -> BoxFuture<'static, StorageResult<Vec<Value>>>;
    /// Remove a document, returning whether it existed.
    fn delete(&self, collection: &'static str, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
