//! Selects the backend for the alert repository and mailbox.

use std::sync::Arc;

use tracing::info;

use verdant_core::config::{DatabaseConfig, DatabaseProvider};
use verdant_core::result::AppResult;

use crate::connection::DatabasePool;
use crate::memory::MemoryStore;
use crate::repositories::{PgAlertRepository, PgNotificationMailbox};
use crate::store::{AlertRepository, NotificationMailbox};

/// The collaborators the alert engine is wired with.
#[derive(Debug, Clone)]
pub struct StoreHandles {
    /// Alert state queries and transitions.
    pub alerts: Arc<dyn AlertRepository>,
    /// Notification mailbox.
    pub mailbox: Arc<dyn NotificationMailbox>,
    /// Present when the PostgreSQL provider is in use.
    pub pool: Option<DatabasePool>,
}

impl StoreHandles {
    /// Open the configured provider.
    pub async fn open(config: &DatabaseConfig) -> AppResult<Self> {
        match config.provider {
            DatabaseProvider::Postgres => {
                let pool = DatabasePool::connect(config).await?;
                Ok(Self {
                    alerts: Arc::new(PgAlertRepository::new(pool.pool().clone())),
                    mailbox: Arc::new(PgNotificationMailbox::new(pool.pool().clone())),
                    pool: Some(pool),
                })
            }
            DatabaseProvider::Memory => {
                info!("Using in-memory alert store; data is not persisted");
                Ok(Self::from_memory(Arc::new(MemoryStore::new())))
            }
        }
    }

    /// Wire both collaborators to one in-memory store.
    pub fn from_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            alerts: store.clone(),
            mailbox: store,
            pool: None,
        }
    }

    /// Release backend resources.
    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
