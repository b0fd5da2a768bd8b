use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    config::StoreBackend,
    dao::{
        document_store::{DocumentStore, memory::MemoryStore},
        storage::StorageError,
    },
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Open the document store selected by `backend`.
pub async fn connect(backend: StoreBackend) -> Result<Arc<dyn DocumentStore>, StorageError> {
    match backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        #[cfg(feature = "couch-store")]
        StoreBackend::Couch => {
            use crate::dao::document_store::couchdb::{CouchConfig, CouchStore};
            let config = CouchConfig::from_env()?;
            Ok(Arc::new(CouchStore::connect(config).await?))
        }
        #[cfg(feature = "mongo-store")]
        StoreBackend::Mongo => {
            use crate::dao::document_store::mongodb::{MongoConfig, MongoStore};
            let config = MongoConfig::from_env().await?;
            Ok(Arc::new(MongoStore::connect(config).await?))
        }
        #[allow(unreachable_patterns)]
        other => {
            warn!(backend = ?other, "storage backend not compiled in; using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Retry `try_reconnect` with backoff. Degraded mode starts at the first failure.
async fn recover(state: &SharedState, store: &Arc<dyn DocumentStore>) -> bool {
    let mut reconnect_delay = INITIAL_DELAY;

    for attempt in 0..MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => {
                info!(attempt, "storage reconnection succeeded after health check failure");
                return true;
            }
            Err(err) => {
                if attempt == 0 {
                    warn!(attempt, error = %err, "storage reconnect failed; entering degraded mode");
                    state.update_degraded(true).await;
                } else {
                    warn!(attempt, error = %err, "storage reconnect attempt failed");
                }
                sleep(reconnect_delay).await;
                reconnect_delay = (reconnect_delay * 2).min(MAX_DELAY);
            }
        }
    }
    false
}

/// Keep a document store installed in the shared state, falling back to
/// degraded mode while the backend is unreachable.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn DocumentStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        let store = match connect().await {
            Ok(store) => store,
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
                continue;
            }
        };

        state.set_store(store.clone()).await;
        info!("storage connection established; leaving degraded mode");
        delay = INITIAL_DELAY;

        loop {
            match store.health_check().await {
                Ok(()) => {
                    if state.is_degraded().await {
                        info!("storage healthy again; leaving degraded mode");
                        state.update_degraded(false).await;
                    }
                }
                Err(err) => {
                    warn!(error = %err, "storage health check failed");
                    if !recover(&state, &store).await {
                        warn!("exhausted storage reconnect attempts; dropping the connection");
                        break;
                    }
                    state.update_degraded(false).await;
                }
            }
            sleep(HEALTH_POLL_INTERVAL).await;
        }

        state.clear_store().await;
        sleep(delay).await;
        delay = (delay * 2).min(MAX_DELAY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestContext;
    use futures::future::BoxFuture;
    use serde_json::Value;
    use std::sync::atomic::{AtomicBool, Ordering};
    use uuid::Uuid;

    struct FlakyStore {
        healthy: Arc<AtomicBool>,
        inner: MemoryStore,
    }

    impl FlakyStore {
        fn status(&self) -> BoxFuture<'static, Result<(), StorageError>> {
            let healthy = self.healthy.load(Ordering::SeqCst);
            Box::pin(async move {
                if healthy {
                    Ok(())
                } else {
                    Err(StorageError::unavailable(
                        "down".into(),
                        std::io::Error::other("down"),
                    ))
                }
            })
        }
    }

    impl DocumentStore for FlakyStore {
        fn put(
            &self,
            collection: &'static str,
            id: Uuid,
            document: Value,
        ) -> BoxFuture<'static, Result<(), StorageError>> {
            self.inner.put(collection, id, document)
        }

        fn get(
            &self,
            collection: &'static str,
            id: Uuid,
        ) -> BoxFuture<'static, Result<Option<Value>, StorageError>> {
            self.inner.get(collection, id)
        }

        fn list(&self, collection: &'static str) -> BoxFuture<'static, Result<Vec<Value>, StorageError>> {
            self.inner.list(collection)
        }

        fn delete(
            &self,
            collection: &'static str,
            id: Uuid,
        ) -> BoxFuture<'static, Result<bool, StorageError>> {
            self.inner.delete(collection, id)
        }

        fn health_check(&self) -> BoxFuture<'static, Result<(), StorageError>> {
            self.status()
        }

        fn try_reconnect(&self) -> BoxFuture<'static, Result<(), StorageError>> {
            self.status()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn degrades_on_failed_health_check_and_recovers() {
        let ctx = TestContext::without_store();
        let healthy = Arc::new(AtomicBool::new(true));
        let store: Arc<dyn DocumentStore> = Arc::new(FlakyStore {
            healthy: healthy.clone(),
            inner: MemoryStore::new(),
        });

        let task = tokio::spawn(run(ctx.state.clone(), move || {
            let store = store.clone();
            async move { Ok(store) }
        }));

        sleep(Duration::from_millis(10)).await;
        assert!(!ctx.state.is_degraded().await);

        healthy.store(false, Ordering::SeqCst);
        sleep(Duration::from_millis(5_500)).await;
        assert!(ctx.state.is_degraded().await);

        healthy.store(true, Ordering::SeqCst);
        sleep(Duration::from_millis(1_500)).await;
        assert!(!ctx.state.is_degraded().await);

        task.abort();
    }

    #[tokio::test]
    async fn memory_backend_connects_immediately() {
        assert!(connect(StoreBackend::Memory).await.is_ok());
    }
}
