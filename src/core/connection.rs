//! Live connection metadata
//! A connection is a registered transport endpoint identified by an opaque id

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A currently live transport endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Connection {
    /// Opaque identifier assigned by the transport boundary
    pub id: String,
    /// Name shown to other participants
    pub display_name: String,
    /// Timestamp of the initial registration
    pub joined_at: DateTime<Utc>,
}

impl Connection {
    /// Create a connection record joined now
    pub fn new(id: &str, display_name: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            joined_at: Utc::now(),
        }
    }
}
