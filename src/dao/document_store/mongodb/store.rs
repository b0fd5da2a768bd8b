use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{Collection, Database, bson::doc};
use serde_json::Value;
use uuid::Uuid;

use crate::dao::{document_store::DocumentStore, storage::StorageResult};

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
};

const ID_FIELD: &str = "_id";

/// MongoDB-backed [`DocumentStore`] with one collection per entity type.
#[derive(Clone)]
pub struct MongoStore {
    config: MongoConfig,
    database: Database,
}

impl MongoStore {
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let database = establish_connection(&config).await?;
        Ok(Self { config, database })
    }

    fn collection(&self, name: &str) -> Collection<Value> {
        self.database.collection::<Value>(name)
    }

    async fn put_document(
        &self,
        collection: &'static str,
        id: Uuid,
        document: Value,
    ) -> MongoResult<()> {
        let Value::Object(mut fields) = document else {
            return Err(MongoDaoError::MalformedDocument { collection, id });
        };
        fields.insert(ID_FIELD.into(), Value::String(id.to_string()));

        self.collection(collection)
            .replace_one(doc! {"_id": id.to_string()}, &Value::Object(fields))
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::Save {
                collection,
                id,
                source,
            })?;
        Ok(())
    }

    async fn get_document(&self, collection: &'static str, id: Uuid) -> MongoResult<Option<Value>> {
        let document = self
            .collection(collection)
            .find_one(doc! {"_id": id.to_string()})
            .await
            .map_err(|source| MongoDaoError::Load {
                collection,
                id,
                source,
            })?;
        Ok(document.map(strip_id))
    }

    async fn list_documents(&self, collection: &'static str) -> MongoResult<Vec<Value>> {
        let documents: Vec<Value> = self
            .collection(collection)
            .find(doc! {})
            .await
            .map_err(|source| MongoDaoError::List { collection, source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::List { collection, source })?;
        Ok(documents.into_iter().map(strip_id).collect())
    }

    async fn delete_document(&self, collection: &'static str, id: Uuid) -> MongoResult<bool> {
        let outcome = self
            .collection(collection)
            .delete_one(doc! {"_id": id.to_string()})
            .await
            .map_err(|source| MongoDaoError::Delete {
                collection,
                id,
                source,
            })?;
        Ok(outcome.deleted_count > 0)
    }

    async fn ping(&self) -> MongoResult<()> {
        self.database
            .run_command(doc! { "ping": 1 })
            .await
            .map(|_| ())
            .map_err(|source| MongoDaoError::HealthPing { source })
    }
}

fn strip_id(document: Value) -> Value {
    match document {
        Value::Object(mut fields) => {
            fields.remove(ID_FIELD);
            Value::Object(fields)
        }
        other => other,
    }
}

impl DocumentStore for MongoStore {
    fn put(
        &self,
        collection: &'static str,
        id: Uuid,
        document: Value,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .put_document(collection, id, document)
                .await
                .map_err(Into::into)
        })
    }

    fn get(
        &self,
        collection: &'static str,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<Value>>> {
        let store = self.clone();
        Box::pin(async move { store.get_document(collection, id).await.map_err(Into::into) })
    }

    fn list(&self, collection: &'static str) -> BoxFuture<'static, StorageResult<Vec<Value>>> {
        let store = self.clone();
        Box::pin(async move { store.list_documents(collection).await.map_err(Into::into) })
    }

    fn delete(&self, collection: &'static str, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .delete_document(collection, id)
                .await
                .map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            establish_connection(&store.config)
                .await
                .map(|_| ())
                .map_err(Into::into)
        })
    }
}
