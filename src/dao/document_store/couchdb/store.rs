use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::dao::{document_store::DocumentStore, storage::StorageResult};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        AllDocsResponse, END_SUFFIX, RevisionOnly, collection_prefix, doc_id, into_body,
        into_document,
    },
};

const ALL_DOCS: &str = "_all_docs";

/// CouchDB-backed [`DocumentStore`]. Every collection lives in one database and
/// is told apart by the `<collection>::` prefix of the document ids.
#[derive(Clone)]
pub struct CouchStore {
    client: Client,
    database_url: Arc<str>,
    credentials: Option<Arc<(String, String)>>,
}

impl CouchStore {
    /// Connect and create the database when it does not exist yet.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let store = Self {
            client,
            database_url: Arc::from(format!("{}/{}", config.base_url, config.database)),
            credentials: config.credentials.map(Arc::new),
        };
        store.ensure_database().await?;
        Ok(store)
    }

    /// `path` is relative to the database; the empty path is the database itself.
    async fn send(
        &self,
        method: Method,
        path: &str,
        customize: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> CouchResult<Response> {
        let url = if path.is_empty() {
            self.database_url.to_string()
        } else {
            format!("{}/{path}", self.database_url)
        };
        let mut builder = self.client.request(method.clone(), url);
        if let Some(credentials) = &self.credentials {
            builder = builder.basic_auth(&credentials.0, Some(&credentials.1));
        }
        customize(builder)
            .send()
            .await
            .map_err(|source| CouchDaoError::Transport {
                method,
                path: path.to_string(),
                source,
            })
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let status = self.send(Method::GET, "", |b| b).await?.status();
        if status.is_success() {
            return Ok(());
        }
        if status != StatusCode::NOT_FOUND {
            return Err(unexpected(Method::GET, "", status));
        }

        let created = self.send(Method::PUT, "", |b| b).await?.status();
        // 412: another instance created it in between
        if created.is_success() || created == StatusCode::PRECONDITION_FAILED {
            Ok(())
        } else {
            Err(unexpected(Method::PUT, "", created))
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, doc_id: &str) -> CouchResult<Option<T>> {
        let response = self.send(Method::GET, doc_id, |b| b).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => decode(Method::GET, doc_id, response).await.map(Some),
            status => Err(unexpected(Method::GET, doc_id, status)),
        }
    }

    async fn current_rev(&self, doc_id: &str) -> CouchResult<Option<String>> {
        Ok(self
            .fetch::<RevisionOnly>(doc_id)
            .await?
            .map(|current| current.rev))
    }

    async fn save(&self, doc_id: &str, body: Value) -> CouchResult<()> {
        let rev = self.current_rev(doc_id).await?;
        let document = into_document(doc_id, rev, body)?;
        let status = self
            .send(Method::PUT, doc_id, |b| b.json(&document))
            .await?
            .status();
        if status.is_success() {
            Ok(())
        } else {
            Err(unexpected(Method::PUT, doc_id, status))
        }
    }

    async fn remove(&self, doc_id: &str) -> CouchResult<bool> {
        let Some(rev) = self.current_rev(doc_id).await? else {
            return Ok(false);
        };
        let status = self
            .send(Method::DELETE, doc_id, |b| b.query(&[("rev", rev)]))
            .await?
            .status();
        match status {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(unexpected(Method::DELETE, doc_id, status)),
        }
    }

    async fn scan(&self, collection: &str) -> CouchResult<Vec<Value>> {
        let prefix = collection_prefix(collection);
        let query = [
            ("include_docs", "true".to_string()),
            ("startkey", format!("\"{prefix}\"")),
            ("endkey", format!("\"{prefix}{END_SUFFIX}\"")),
        ];
        let response = self
            .send(Method::GET, ALL_DOCS, |b| b.query(&query))
            .await?;
        if !response.status().is_success() {
            return Err(unexpected(Method::GET, ALL_DOCS, response.status()));
        }

        let page: AllDocsResponse = decode(Method::GET, ALL_DOCS, response).await?;
        Ok(page
            .rows
            .into_iter()
            .filter_map(|row| row.doc)
            .map(into_body)
            .collect())
    }
}

fn unexpected(method: Method, path: &str, status: StatusCode) -> CouchDaoError {
    CouchDaoError::Status {
        method,
        path: path.to_string(),
        status,
    }
}

async fn decode<T: DeserializeOwned>(method: Method, path: &str, response: Response) -> CouchResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|source| CouchDaoError::Transport {
            method,
            path: path.to_string(),
            source,
        })
}

impl DocumentStore for CouchStore {
    fn put(
        &self,
        collection: &'static str,
        id: Uuid,
        document: Value,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.save(&doc_id(collection, id), document).await?) })
    }

    fn get(
        &self,
        collection: &'static str,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<Value>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store.fetch::<Value>(&doc_id(collection, id)).await?;
            Ok(document.map(into_body))
        })
    }

    fn list(&self, collection: &'static str) -> BoxFuture<'static, StorageResult<Vec<Value>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.scan(collection).await?) })
    }

    fn delete(&self, collection: &'static str, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.remove(&doc_id(collection, id)).await?) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let status = store.send(Method::HEAD, "", |b| b).await?.status();
            if status.is_success() {
                Ok(())
            } else {
                Err(unexpected(Method::HEAD, "", status).into())
            }
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.ensure_database().await?) })
    }
}
