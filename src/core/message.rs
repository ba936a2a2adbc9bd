//! Chat message and wire frame types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RoomcastError};

/// A single chat message, immutable once appended
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Room the message belongs to
    pub room: String,
    /// Per-room, strictly increasing index defining total order
    pub sequence_index: u64,
    pub timestamp: DateTime<Utc>,
    pub author: String,
    pub content: String,
}

impl Message {
    pub fn new(room: &str, sequence_index: u64, author: &str, content: &str) -> Self {
        Self {
            room: room.to_string(),
            sequence_index,
            timestamp: Utc::now(),
            author: author.to_string(),
            content: content.to_string(),
        }
    }
}

/// Requests a client may submit over the socket, tagged by `action`.
///
/// Unknown actions fail to deserialize and are reported back to the
/// client instead of being silently dropped.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientRequest {
    /// Submit a message to a room; the token resolves to the author
    SendMessage {
        token: String,
        content: String,
        #[serde(default)]
        room: Option<String>,
    },
    /// Ask for the most recent messages of a room
    RecentMessages {
        #[serde(default)]
        room: Option<String>,
        #[serde(default)]
        limit: Option<usize>,
    },
}

impl ClientRequest {
    /// Parse a raw text frame into a request.
    ///
    /// Distinguishes malformed JSON from a well-formed frame whose action
    /// is not recognized, so the two surface as different errors.
    pub fn parse(raw: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| RoomcastError::MessageParseError(e.to_string()))?;
        serde_json::from_value(value)
            .map_err(|e| RoomcastError::UnrecognizedRequest(e.to_string()))
    }
}

/// Frame pushed to connections carrying one or more messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastFrame {
    pub messages: Vec<Message>,
}

/// Frame pushed to a connection when its request was rejected
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorFrame {
    pub error: String,
}

/// Encode messages into the wire payload delivered to each connection
pub fn encode_broadcast(messages: &[Message]) -> Result<Vec<u8>> {
    serde_json::to_vec(&BroadcastFrame {
        messages: messages.to_vec(),
    })
    .map_err(|e| RoomcastError::MessageParseError(e.to_string()))
}

/// Encode an error frame for a single connection
pub fn encode_error(error: &str) -> Result<Vec<u8>> {
    serde_json::to_vec(&ErrorFrame {
        error: error.to_string(),
    })
    .map_err(|e| RoomcastError::MessageParseError(e.to_string()))
}
