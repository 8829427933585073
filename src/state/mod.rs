pub mod round;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::{
    sync::{RwLock, watch},
    task::JoinHandle,
};

use crate::{
    config::AppConfig,
    dao::{document_store::DocumentStore, repository::EntityRepository},
    error::ServiceError,
};

/// Shared handle to the [`AppState`].
pub type SharedState = Arc<AppState>;

/// Central application state storing the storage handle, engine configuration
/// and the registry of armed round deadline timers.
pub struct AppState {
    store: RwLock<Option<Arc<dyn DocumentStore>>>,
    degraded: watch::Sender<bool>,
    config: AppConfig,
    deadlines: DashMap<String, JoinHandle<()>>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            store: RwLock::new(None),
            degraded: degraded_tx,
            config,
            deadlines: DashMap::new(),
        })
    }

    /// Obtain a handle to the current document store, if one is installed.
    pub async fn document_store(&self) -> Option<Arc<dyn DocumentStore>> {
        let guard = self.store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the current document store, or fail with [`ServiceError::Degraded`].
    pub async fn require_document_store(&self) -> Result<Arc<dyn DocumentStore>, ServiceError> {
        self.document_store().await.ok_or(ServiceError::Degraded)
    }

    /// Typed repository over the current document store, if one is installed.
    pub async fn repository(&self) -> Result<EntityRepository, ServiceError> {
        Ok(EntityRepository::new(self.require_document_store().await?))
    }

    /// Install a new document store implementation and leave degraded mode.
    pub async fn install_document_store(&self, store: Arc<dyn DocumentStore>) {
        {
            let mut guard = self.store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current document store and enter degraded mode.
    pub async fn clear_document_store(&self) {
        {
            let mut guard = self.store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Current degraded flag. Set while no store is installed, and also while
    /// an installed store is failing its health checks.
    pub async fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Engine timing configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Registry of armed deadline timers keyed by round id.
    pub fn deadlines(&self) -> &DashMap<String, JoinHandle<()>> {
        &self.deadlines
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        if *self.degraded.borrow() == value {
            return;
        }

        let _ = self.degraded.send(value);
    }
}

/// Current wall-clock time as epoch milliseconds. All persisted timestamps and
/// deadlines use this representation.
pub fn now_epoch_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
