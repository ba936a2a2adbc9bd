//! Registry of currently live connections
//!
//! Authoritative view of which transport endpoints may receive a broadcast.
//! Registration is an idempotent upsert and removal tolerates ids that are
//! already gone, because delivery failures race with explicit leaves.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::core::connection::Connection;
use crate::error::Result;
use crate::storage::traits::ConnectionStore;

struct RegistryInner {
    entries: HashMap<String, Connection>,
    /// Ids in registration order, so snapshots iterate deterministically
    order: Vec<String>,
}

/// Tracks live connections and hands out point-in-time snapshots
pub struct ConnectionRegistry {
    inner: RwLock<RegistryInner>,
    store: Option<Arc<dyn ConnectionStore>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner {
                entries: HashMap::new(),
                order: Vec::new(),
            }),
            store: None,
        }
    }

    /// Create a registry that mirrors every change into the given store
    pub fn with_store(store: Arc<dyn ConnectionStore>) -> Self {
        Self {
            inner: RwLock::new(RegistryInner {
                entries: HashMap::new(),
                order: Vec::new(),
            }),
            store: Some(store),
        }
    }

    /// Register a connection, or overwrite its metadata if already present.
    ///
    /// Re-registering keeps the original join time and snapshot position.
    pub async fn register(&self, id: &str, display_name: &str) -> Result<()> {
        let connection = {
            let mut inner = self.inner.write().await;
            match inner.entries.get_mut(id) {
                Some(existing) => {
                    existing.display_name = display_name.to_string();
                    existing.clone()
                }
                None => {
                    let connection = Connection::new(id, display_name);
                    inner.order.push(id.to_string());
                    inner.entries.insert(id.to_string(), connection.clone());
                    connection
                }
            }
        };

        if let Some(store) = &self.store {
            store.put(&connection).await?;
        }

        log::debug!("Registered connection {} ({})", id, display_name);
        Ok(())
    }

    /// Remove a connection if present.
    ///
    /// Removing an absent id is not an error: broadcast failure cleanup
    /// races with explicit leaves, so double-removal must be harmless.
    pub async fn unregister(&self, id: &str) {
        let removed = {
            let mut inner = self.inner.write().await;
            inner.order.retain(|entry| entry != id);
            inner.entries.remove(id).is_some()
        };

        if removed {
            log::debug!("Unregistered connection {}", id);
        }

        if let Some(store) = &self.store {
            // The entry may already be gone from the store as well
            if let Err(e) = store.delete(id).await {
                log::warn!("Failed to delete connection {} from store: {}", id, e);
            }
        }
    }

    /// Point-in-time copy of all live connections, in registration order.
    ///
    /// Writers are only blocked for the duration of the copy.
    pub async fn snapshot(&self) -> Vec<Connection> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .filter_map(|id| inner.entries.get(id))
            .cloned()
            .collect()
    }

    /// Whether the id is currently registered
    pub async fn contains(&self, id: &str) -> bool {
        self.inner.read().await.entries.contains_key(id)
    }

    /// Number of live connections
    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    /// Rebuild the live set from the backing store after a restart.
    ///
    /// Connections already registered in memory are left untouched.
    /// Returns the number of live connections afterwards.
    pub async fn restore(&self) -> Result<usize> {
        let Some(store) = &self.store else {
            return Ok(self.connection_count().await);
        };

        let stored = store.scan_all().await?;
        let mut inner = self.inner.write().await;
        for connection in stored {
            if !inner.entries.contains_key(&connection.id) {
                inner.order.push(connection.id.clone());
                inner.entries.insert(connection.id.clone(), connection);
            }
        }
        Ok(inner.entries.len())
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
