//! Abstract storage interfaces for pluggable backends
//!
//! The registry and log delegate persistence to these traits when state
//! must survive a process restart. Stores are constructed once and
//! injected; components never reach for module-level handles.

use async_trait::async_trait;

use crate::core::connection::Connection;
use crate::core::message::Message;
use crate::error::Result;

/// Persistence for the live-connection set, keyed by connection id
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    /// Insert or overwrite a connection record
    async fn put(&self, connection: &Connection) -> Result<()>;

    /// Remove a connection record; absent ids are not an error
    async fn delete(&self, connection_id: &str) -> Result<()>;

    /// Every stored connection. A full scan is acceptable at this
    /// fan-out scale; larger deployments would need an indexed traversal.
    async fn scan_all(&self) -> Result<Vec<Connection>>;
}

/// Persistence for messages, keyed by (room, sequence index)
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Atomically reserve the next sequence index for `room`.
    ///
    /// Two concurrent calls for the same room must never return the same
    /// index; remote implementations carry this with a conditional update
    /// on the counter record.
    async fn append_atomic(&self, room: &str) -> Result<u64>;

    /// Store a message under its assigned index
    async fn put(&self, message: &Message) -> Result<()>;

    /// Up to `limit` most recent messages of `room`, newest first
    async fn query_recent(&self, room: &str, limit: usize) -> Result<Vec<Message>>;
}
