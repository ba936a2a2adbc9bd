//! Fan-out of one message to every live connection
//!
//! A broadcast must complete and report, not abort: one dead connection
//! never prevents delivery to the rest. Sends run with bounded parallelism
//! and a per-send timeout; connections whose endpoint is confirmed gone are
//! removed from the registry so stale entries self-heal.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::StreamExt;
use log::{debug, info, warn};

use crate::config::ServerConfig;
use crate::constants::{
    DEFAULT_BROADCAST_DEADLINE_SECS, DEFAULT_FANOUT_WORKERS, DEFAULT_SEND_TIMEOUT_SECS,
};
use crate::core::message::{encode_broadcast, Message};
use crate::core::message_log::MessageLog;
use crate::core::registry::ConnectionRegistry;
use crate::error::Result;
use crate::transport::{DeliveryError, TransportSender};

/// Bounds on one broadcast call
#[derive(Debug, Clone)]
pub struct FanoutOptions {
    /// Upper bound on concurrently in-flight sends
    pub max_in_flight: usize,
    /// Timeout applied to each individual send
    pub send_timeout: Duration,
    /// Overall deadline; sends still outstanding when it elapses are
    /// abandoned and reported as transient failures
    pub broadcast_deadline: Duration,
}

impl Default for FanoutOptions {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_FANOUT_WORKERS,
            send_timeout: Duration::from_secs(DEFAULT_SEND_TIMEOUT_SECS),
            broadcast_deadline: Duration::from_secs(DEFAULT_BROADCAST_DEADLINE_SECS),
        }
    }
}

impl From<&ServerConfig> for FanoutOptions {
    fn from(config: &ServerConfig) -> Self {
        Self {
            max_in_flight: config.fanout_workers.max(1),
            send_timeout: config.send_timeout,
            broadcast_deadline: config.broadcast_deadline,
        }
    }
}

/// Aggregate result of one broadcast
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliverySummary {
    /// Connections the payload reached
    pub delivered: usize,
    /// Connections removed from the registry because their endpoint is gone
    pub removed: Vec<String>,
    /// Connections that failed transiently and stay registered
    pub failed_transient: Vec<String>,
}

enum SendOutcome {
    Delivered,
    Gone,
    Transient(String),
}

/// Delivers new messages to every live connection
pub struct BroadcastDispatcher {
    registry: Arc<ConnectionRegistry>,
    log: Arc<MessageLog>,
    sender: Arc<dyn TransportSender>,
    options: FanoutOptions,
}

impl BroadcastDispatcher {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        log: Arc<MessageLog>,
        sender: Arc<dyn TransportSender>,
        options: FanoutOptions,
    ) -> Self {
        Self {
            registry,
            log,
            sender,
            options,
        }
    }

    /// Append a message to the log, then broadcast it.
    ///
    /// A validation or sequence-assignment failure from the log is the
    /// only hard failure; per-connection delivery failures are reported
    /// in the summary instead.
    pub async fn publish(&self, room: &str, author: &str, content: &str) -> Result<DeliverySummary> {
        let message = self.log.append(room, author, content).await?;
        self.broadcast(&message).await
    }

    /// Deliver one already-appended message to every connection in the
    /// current registry snapshot.
    pub async fn broadcast(&self, message: &Message) -> Result<DeliverySummary> {
        let connections = self.registry.snapshot().await;
        if connections.is_empty() {
            debug!("Broadcast for {}#{} found no live connections", message.room, message.sequence_index);
            return Ok(DeliverySummary::default());
        }

        // Encode once and share the payload across all sends
        let payload: Arc<Vec<u8>> = Arc::new(encode_broadcast(std::slice::from_ref(message))?);
        let mut outstanding: Vec<String> = connections.iter().map(|c| c.id.clone()).collect();

        let send_timeout = self.options.send_timeout;
        let sends = futures_util::stream::iter(connections.into_iter().map(|connection| {
            let sender = Arc::clone(&self.sender);
            let payload = Arc::clone(&payload);
            async move {
                let id = connection.id;
                let outcome =
                    match tokio::time::timeout(send_timeout, sender.send(&id, &payload)).await {
                        Ok(Ok(())) => SendOutcome::Delivered,
                        Ok(Err(DeliveryError::Gone)) => SendOutcome::Gone,
                        Ok(Err(DeliveryError::Transient(reason))) => SendOutcome::Transient(reason),
                        Err(_) => SendOutcome::Transient("send timed out".to_string()),
                    };
                (id, outcome)
            }
        }))
        .buffer_unordered(self.options.max_in_flight);
        tokio::pin!(sends);

        let deadline = tokio::time::sleep(self.options.broadcast_deadline);
        tokio::pin!(deadline);

        let mut summary = DeliverySummary::default();
        loop {
            tokio::select! {
                completed = sends.next() => {
                    let Some((id, outcome)) = completed else { break };
                    outstanding.retain(|entry| entry != &id);
                    match outcome {
                        SendOutcome::Delivered => summary.delivered += 1,
                        SendOutcome::Gone => {
                            debug!("Connection {} is gone, removing from registry", id);
                            self.registry.unregister(&id).await;
                            summary.removed.push(id);
                        }
                        SendOutcome::Transient(reason) => {
                            debug!("Transient delivery failure for {}: {}", id, reason);
                            summary.failed_transient.push(id);
                        }
                    }
                }
                _ = &mut deadline => {
                    // Abandoned sends count as transient; exceeding the
                    // overall deadline alone never unregisters a connection.
                    warn!(
                        "Broadcast deadline elapsed with {} sends outstanding",
                        outstanding.len()
                    );
                    summary.failed_transient.append(&mut outstanding);
                    break;
                }
            }
        }

        info!(
            "Broadcast {}#{}: delivered to {}, removed {}, {} transient failures",
            message.room,
            message.sequence_index,
            summary.delivered,
            summary.removed.len(),
            summary.failed_transient.len()
        );
        Ok(summary)
    }
}
