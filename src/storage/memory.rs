//! In-memory storage implementation for development and testing
//!
//! Keeps all data in process memory behind async locks. Suitable for
//! development, testing, or single-process deployments.

use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use async_trait::async_trait;

use crate::core::connection::Connection;
use crate::core::message::Message;
use crate::error::Result;
use crate::storage::traits::{ConnectionStore, MessageStore};

/// In-memory connection store
pub struct MemoryConnectionStore {
    connections: RwLock<HashMap<String, Connection>>,
}

impl MemoryConnectionStore {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryConnectionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConnectionStore for MemoryConnectionStore {
    async fn put(&self, connection: &Connection) -> Result<()> {
        self.connections
            .write()
            .await
            .insert(connection.id.clone(), connection.clone());
        Ok(())
    }

    async fn delete(&self, connection_id: &str) -> Result<()> {
        self.connections.write().await.remove(connection_id);
        Ok(())
    }

    async fn scan_all(&self) -> Result<Vec<Connection>> {
        let mut connections: Vec<Connection> =
            self.connections.read().await.values().cloned().collect();
        // Join order makes restored snapshots deterministic
        connections.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then(a.id.cmp(&b.id)));
        Ok(connections)
    }
}

/// Counter and messages for one room
#[derive(Default)]
struct RoomPartition {
    next_index: u64,
    messages: BTreeMap<u64, Message>,
}

/// In-memory message store; the write lock is the atomic-increment
/// serialization point
pub struct MemoryMessageStore {
    rooms: RwLock<HashMap<String, RoomPartition>>,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn append_atomic(&self, room: &str) -> Result<u64> {
        let mut rooms = self.rooms.write().await;
        let partition = rooms.entry(room.to_string()).or_default();
        let index = partition.next_index;
        partition.next_index += 1;
        Ok(index)
    }

    async fn put(&self, message: &Message) -> Result<()> {
        let mut rooms = self.rooms.write().await;
        let partition = rooms.entry(message.room.clone()).or_default();
        partition
            .messages
            .insert(message.sequence_index, message.clone());
        Ok(())
    }

    async fn query_recent(&self, room: &str, limit: usize) -> Result<Vec<Message>> {
        let rooms = self.rooms.read().await;
        let Some(partition) = rooms.get(room) else {
            return Ok(Vec::new());
        };
        Ok(partition
            .messages
            .values()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_atomic_is_monotonic_per_room() {
        let store = MemoryMessageStore::new();
        assert_eq!(store.append_atomic("general").await.unwrap(), 0);
        assert_eq!(store.append_atomic("general").await.unwrap(), 1);
        assert_eq!(store.append_atomic("random").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_query_recent_is_newest_first() {
        let store = MemoryMessageStore::new();
        for i in 0..5 {
            let index = store.append_atomic("general").await.unwrap();
            store
                .put(&Message::new("general", index, "alice", &format!("m{}", i)))
                .await
                .unwrap();
        }

        let recent = store.query_recent("general", 3).await.unwrap();
        let indices: Vec<u64> = recent.iter().map(|m| m.sequence_index).collect();
        assert_eq!(indices, vec![4, 3, 2]);
    }

    #[tokio::test]
    async fn test_query_recent_unknown_room_is_empty() {
        let store = MemoryMessageStore::new();
        assert!(store.query_recent("nowhere", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_connection_store_roundtrip() {
        let store = MemoryConnectionStore::new();
        store.put(&Connection::new("c1", "alice")).await.unwrap();
        store.put(&Connection::new("c2", "bob")).await.unwrap();
        store.delete("c1").await.unwrap();
        store.delete("ghost").await.unwrap();

        let all = store.scan_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "c2");
    }
}
