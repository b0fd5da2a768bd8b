mod notifications;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock, watch};

use crate::{
    config::{AppConfig, Credentials},
    dao::{document_store::DocumentStore, models::Entity, repository::Repository},
    error::ServiceError,
    integrations::Integrations,
};

pub use self::notifications::NotificationHub;

pub type SharedState = Arc<AppState>;

const NOTIFICATION_CHANNEL_CAPACITY: usize = 64;

/// Central application state: storage handle, upstream clients and background coordination.
pub struct AppState {
    store: RwLock<Option<Arc<dyn DocumentStore>>>,
    degraded: watch::Sender<bool>,
    config: AppConfig,
    credentials: Credentials,
    integrations: Integrations,
    notifications: NotificationHub,
    reconcile_gate: Mutex<()>,
    stats_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(
        config: AppConfig,
        credentials: Credentials,
        integrations: Integrations,
    ) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            store: RwLock::new(None),
            degraded: degraded_tx,
            config,
            credentials,
            integrations,
            notifications: NotificationHub::new(NOTIFICATION_CHANNEL_CAPACITY),
            reconcile_gate: Mutex::new(()),
            stats_locks: DashMap::new(),
        })
    }

    /// Obtain a handle to the current store, if one is installed.
    pub async fn store(&self) -> Option<Arc<dyn DocumentStore>> {
        let guard = self.store.read().await;
        guard.as_ref().cloned()
    }

    /// Install a new store implementation and leave degraded mode.
    pub async fn set_store(&self, store: Arc<dyn DocumentStore>) {
        {
            let mut guard = self.store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current store and enter degraded mode.
    pub async fn clear_store(&self) {
        {
            let mut guard = self.store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    /// Store handle, or [`ServiceError::Degraded`] when storage is down.
    pub async fn require_store(&self) -> Result<Arc<dyn DocumentStore>, ServiceError> {
        if self.is_degraded().await {
            return Err(ServiceError::Degraded);
        }
        self.store().await.ok_or(ServiceError::Degraded)
    }

    /// Typed repository over the installed store.
    pub async fn repo<E: Entity>(&self) -> Result<Repository<E>, ServiceError> {
        Ok(Repository::new(self.require_store().await?))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn integrations(&self) -> &Integrations {
        &self.integrations
    }

    /// Broadcast hub feeding the notification streams.
    pub fn notifications(&self) -> &NotificationHub {
        &self.notifications
    }

    /// Gate allowing a single reconciliation run at a time.
    pub fn reconcile_gate(&self) -> &Mutex<()> {
        &self.reconcile_gate
    }

    /// Serialize read-modify-write cycles on the stats record of `email`.
    pub async fn lock_stats(&self, email: &str) -> OwnedMutexGuard<()> {
        let lock = self.stats_locks.entry(email.to_string()).or_default().clone();
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::TestContext;

    #[tokio::test]
    async fn degraded_until_store_installed() {
        let ctx = TestContext::without_store();
        assert!(ctx.state.is_degraded().await);
        assert!(ctx.state.require_store().await.is_err());

        ctx.install_memory_store().await;
        assert!(!ctx.state.is_degraded().await);

        let mut watcher = ctx.state.degraded_watcher();
        ctx.state.clear_store().await;
        assert!(watcher.has_changed().unwrap());
        assert!(*watcher.borrow_and_update());
    }

    #[tokio::test]
    async fn stats_locks_are_per_user() {
        let ctx = TestContext::new().await;
        let held = ctx.state.lock_stats("a@x.io").await;

        let state = ctx.state.clone();
        let same_user = tokio::spawn(async move { drop(state.lock_stats("a@x.io").await) });
        let _other = ctx.state.lock_stats("b@x.io").await;

        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert!(!same_user.is_finished());

        drop(held);
        same_user.await.unwrap();
    }
}
