//! Integrated feed service that coordinates the registry, log and dispatcher
//!
//! This is the surface thin boundary handlers wire to: join/leave events,
//! message submission and history requests. The service owns construction
//! of the three core components so callers never touch shared state
//! directly.

use std::sync::Arc;

use log::info;

use crate::config::ServerConfig;
use crate::core::dispatcher::{BroadcastDispatcher, DeliverySummary, FanoutOptions};
use crate::core::message::Message;
use crate::core::message_log::MessageLog;
use crate::core::registry::ConnectionRegistry;
use crate::error::Result;
use crate::storage::traits::{ConnectionStore, MessageStore};
use crate::transport::TransportSender;

/// Coordinates the connection registry, message log and dispatcher
pub struct FeedService {
    registry: Arc<ConnectionRegistry>,
    log: Arc<MessageLog>,
    dispatcher: BroadcastDispatcher,
}

impl FeedService {
    /// Create a fully in-memory service
    pub fn new(config: &ServerConfig, transport: Arc<dyn TransportSender>) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let log = Arc::new(MessageLog::with_capacity(config.history_capacity));
        Self::assemble(config, registry, log, transport)
    }

    /// Create a service backed by injected stores, for state that must
    /// survive a process restart
    pub fn with_stores(
        config: &ServerConfig,
        transport: Arc<dyn TransportSender>,
        connection_store: Arc<dyn ConnectionStore>,
        message_store: Arc<dyn MessageStore>,
    ) -> Self {
        let registry = Arc::new(ConnectionRegistry::with_store(connection_store));
        let log = Arc::new(MessageLog::with_store(message_store));
        Self::assemble(config, registry, log, transport)
    }

    fn assemble(
        config: &ServerConfig,
        registry: Arc<ConnectionRegistry>,
        log: Arc<MessageLog>,
        transport: Arc<dyn TransportSender>,
    ) -> Self {
        let dispatcher = BroadcastDispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&log),
            transport,
            FanoutOptions::from(config),
        );
        Self {
            registry,
            log,
            dispatcher,
        }
    }

    /// A client joined: register its connection
    pub async fn on_join(&self, connection_id: &str, display_name: &str) -> Result<()> {
        self.registry.register(connection_id, display_name).await?;
        info!(
            "Connection {} joined as '{}' ({} live)",
            connection_id,
            display_name,
            self.registry.connection_count().await
        );
        Ok(())
    }

    /// A client left: drop its connection
    pub async fn on_leave(&self, connection_id: &str) {
        self.registry.unregister(connection_id).await;
        info!(
            "Connection {} left ({} live)",
            connection_id,
            self.registry.connection_count().await
        );
    }

    /// A message was submitted: append it and fan it out
    pub async fn on_message(
        &self,
        room: &str,
        author: &str,
        content: &str,
    ) -> Result<DeliverySummary> {
        self.dispatcher.publish(room, author, content).await
    }

    /// A client asked for recent history, oldest first
    pub async fn on_history(&self, room: &str, limit: usize) -> Result<Vec<Message>> {
        self.log.recent_messages(room, limit).await
    }

    /// Rehydrate the registry from its store after a restart
    pub async fn restore(&self) -> Result<usize> {
        self.registry.restore().await
    }

    /// Number of live connections
    pub async fn connection_count(&self) -> usize {
        self.registry.connection_count().await
    }
}
