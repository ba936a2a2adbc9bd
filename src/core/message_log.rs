//! Append-only, ordered message history per room
//!
//! Sequence assignment is the correctness-critical part: two concurrent
//! appends for the same room must never receive the same index. Each room
//! owns a mutex guarding its counter and history, so assignment is
//! linearizable per room while rooms stay independent of each other.
//! When a message store is injected, the atomic-index contract is pushed
//! down to the store instead.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::constants::DEFAULT_HISTORY_CAPACITY;
use crate::core::message::Message;
use crate::error::{Result, RoomcastError};
use crate::storage::traits::MessageStore;

/// Counter and bounded history for one room
struct RoomHistory {
    next_index: u64,
    messages: VecDeque<Message>,
    capacity: usize,
}

impl RoomHistory {
    fn new(capacity: usize) -> Self {
        Self {
            next_index: 0,
            messages: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append, dropping the oldest entry once at capacity. The caller
    /// holds the room mutex that assigned the index, so arrival order is
    /// ascending sequence order.
    fn push(&mut self, message: Message) {
        if self.messages.len() >= self.capacity {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
    }

    fn tail(&self, limit: usize) -> Vec<Message> {
        let skip = self.messages.len().saturating_sub(limit);
        self.messages.iter().skip(skip).cloned().collect()
    }
}

/// Ordered, room-scoped message log with linearizable sequence assignment
pub struct MessageLog {
    rooms: RwLock<HashMap<String, Arc<Mutex<RoomHistory>>>>,
    store: Option<Arc<dyn MessageStore>>,
    history_capacity: usize,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// Create a log retaining at most `history_capacity` messages per room
    pub fn with_capacity(history_capacity: usize) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            store: None,
            history_capacity,
        }
    }

    /// Create a log that delegates index assignment and retrieval to a store
    pub fn with_store(store: Arc<dyn MessageStore>) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            store: Some(store),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }

    /// Append a message to `room`, assigning the next sequence index.
    ///
    /// Safe under arbitrary concurrent callers. Validation happens before
    /// any index is consumed: a rejected append never advances the counter.
    pub async fn append(&self, room: &str, author: &str, content: &str) -> Result<Message> {
        if content.is_empty() {
            return Err(RoomcastError::ValidationError(
                "message content must not be empty".to_string(),
            ));
        }

        match &self.store {
            Some(store) => {
                // The store owns the counter; its conditional update is the
                // serialization point.
                let index = store
                    .append_atomic(room)
                    .await
                    .map_err(|e| RoomcastError::SequenceAssignment(e.to_string()))?;
                let message = Message::new(room, index, author, content);
                store.put(&message).await?;
                Ok(message)
            }
            None => {
                // Single in-process serialization point per room; the
                // critical section never waits on I/O.
                let history = self.room_history(room).await;
                let mut history = history.lock().await;
                let message = Message::new(room, history.next_index, author, content);
                history.next_index += 1;
                history.push(message.clone());
                Ok(message)
            }
        }
    }

    /// The most recent messages of `room`, ascending by sequence index,
    /// at most `limit` entries.
    pub async fn recent_messages(&self, room: &str, limit: usize) -> Result<Vec<Message>> {
        if let Some(store) = &self.store {
            // Store queries return newest-first; replaying clients want
            // ascending order.
            let mut messages = store.query_recent(room, limit).await?;
            messages.reverse();
            return Ok(messages);
        }

        let history = self.rooms.read().await.get(room).cloned();
        match history {
            Some(history) => Ok(history.lock().await.tail(limit)),
            None => Ok(Vec::new()),
        }
    }

    async fn room_history(&self, room: &str) -> Arc<Mutex<RoomHistory>> {
        if let Some(history) = self.rooms.read().await.get(room) {
            return Arc::clone(history);
        }
        let mut rooms = self.rooms.write().await;
        Arc::clone(
            rooms
                .entry(room.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(RoomHistory::new(self.history_capacity)))),
        )
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new()
    }
}
