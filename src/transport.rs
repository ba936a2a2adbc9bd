//! Transport boundary for pushing payloads to connections
//!
//! The core never constructs transport endpoints itself; it delivers
//! through a `TransportSender` implemented by the gateway layer.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};
use warp::ws::Message as WsMessage;

/// Classification of a failed delivery attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The remote endpoint is confirmed dead; the connection should be
    /// removed from the registry
    Gone,
    /// A hiccup (timeout, transport backpressure); the connection stays
    /// registered and retrying is the caller's policy decision
    Transient(String),
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gone => write!(f, "connection is gone"),
            Self::Transient(reason) => write!(f, "transient delivery failure: {}", reason),
        }
    }
}

/// Pushes encoded payloads to a single connection
#[async_trait]
pub trait TransportSender: Send + Sync {
    async fn send(
        &self,
        connection_id: &str,
        payload: &[u8],
    ) -> std::result::Result<(), DeliveryError>;
}

/// WebSocket-backed transport: one mpsc sender per attached connection,
/// drained by the per-client forwarding task in the gateway.
pub struct WsTransport {
    senders: RwLock<HashMap<String, mpsc::UnboundedSender<WsMessage>>>,
}

impl WsTransport {
    pub fn new() -> Self {
        Self {
            senders: RwLock::new(HashMap::new()),
        }
    }

    /// Attach the outbound channel of a newly upgraded socket
    pub async fn attach(&self, connection_id: &str, sender: mpsc::UnboundedSender<WsMessage>) {
        self.senders
            .write()
            .await
            .insert(connection_id.to_string(), sender);
    }

    /// Drop the outbound channel once the socket closes
    pub async fn detach(&self, connection_id: &str) {
        self.senders.write().await.remove(connection_id);
    }
}

impl Default for WsTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransportSender for WsTransport {
    async fn send(
        &self,
        connection_id: &str,
        payload: &[u8],
    ) -> std::result::Result<(), DeliveryError> {
        let sender = {
            let senders = self.senders.read().await;
            senders.get(connection_id).cloned()
        };

        let Some(sender) = sender else {
            // Never attached or already detached
            return Err(DeliveryError::Gone);
        };

        let text = String::from_utf8_lossy(payload).into_owned();
        // An unbounded channel only fails once the receiver task is gone,
        // which means the socket is dead.
        sender
            .send(WsMessage::text(text))
            .map_err(|_| DeliveryError::Gone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_to_unknown_connection_is_gone() {
        let transport = WsTransport::new();
        let result = transport.send("nobody", b"{}").await;
        assert_eq!(result, Err(DeliveryError::Gone));
    }

    #[tokio::test]
    async fn test_send_to_attached_connection() {
        let transport = WsTransport::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        transport.attach("c1", tx).await;

        transport.send("c1", br#"{"messages":[]}"#).await.unwrap();
        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.to_str().unwrap(), r#"{"messages":[]}"#);
    }

    #[tokio::test]
    async fn test_send_after_receiver_dropped_is_gone() {
        let transport = WsTransport::new();
        let (tx, rx) = mpsc::unbounded_channel();
        transport.attach("c1", tx).await;
        drop(rx);

        let result = transport.send("c1", b"{}").await;
        assert_eq!(result, Err(DeliveryError::Gone));
    }

    #[tokio::test]
    async fn test_detach_makes_connection_gone() {
        let transport = WsTransport::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        transport.attach("c1", tx).await;
        transport.detach("c1").await;

        let result = transport.send("c1", b"{}").await;
        assert_eq!(result, Err(DeliveryError::Gone));
    }
}
