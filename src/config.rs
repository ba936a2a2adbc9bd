//! Server configuration module
//! Handles dynamic configuration parameters for the fan-out engine

use crate::constants::{
    DEFAULT_BROADCAST_DEADLINE_SECS, DEFAULT_FANOUT_WORKERS, DEFAULT_HISTORY_CAPACITY,
    DEFAULT_HISTORY_LIMIT, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_ROOM, DEFAULT_SEND_TIMEOUT_SECS,
};
use crate::error::{Result, RoomcastError};
use std::env;
use std::time::Duration;

/// Server configuration parameters
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Room a connection posts to when a request names none
    pub default_room: String,
    /// Number of messages replayed to a joining client, and the cap on
    /// history requests
    pub history_limit: usize,
    /// Messages retained in memory per room before the oldest are dropped
    pub history_capacity: usize,
    /// Upper bound on concurrently in-flight sends during one broadcast
    pub fanout_workers: usize,
    /// Per-connection send timeout during a broadcast
    pub send_timeout: Duration,
    /// Overall deadline for one broadcast call
    pub broadcast_deadline: Duration,
    /// HMAC secret for verifying submitted tokens
    pub jwt_secret: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        panic!("ServerConfig::default() is not allowed. Use ServerConfig::from_env() instead.");
    }
}

impl ServerConfig {
    /// Create a test configuration - only for testing!
    #[cfg(test)]
    pub fn for_testing() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            default_room: DEFAULT_ROOM.to_string(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            fanout_workers: DEFAULT_FANOUT_WORKERS,
            send_timeout: Duration::from_millis(200),
            broadcast_deadline: Duration::from_secs(2),
            jwt_secret: "test-jwt-secret-only-for-unit-tests-never-use-in-production".to_string(),
        }
    }

    /// Validate that the signing secret meets minimal requirements
    fn validate_jwt_secret(secret: &str) -> Result<()> {
        if secret.len() < 32 {
            return Err(RoomcastError::ConfigError(
                "JWT secret must be at least 32 characters long. \
                 Generate one with: openssl rand -base64 32"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Load configuration from environment variables if available
    pub fn from_env() -> Result<Self> {
        let host = env::var("ROOMCAST_HOST").unwrap_or(DEFAULT_HOST.to_string());
        let port = env::var("ROOMCAST_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let default_room = env::var("ROOMCAST_DEFAULT_ROOM").unwrap_or(DEFAULT_ROOM.to_string());

        let history_limit = env::var("ROOMCAST_HISTORY_LIMIT")
            .ok()
            .and_then(|n| n.parse().ok())
            .unwrap_or(DEFAULT_HISTORY_LIMIT);

        let history_capacity = env::var("ROOMCAST_HISTORY_CAPACITY")
            .ok()
            .and_then(|n| n.parse().ok())
            .unwrap_or(DEFAULT_HISTORY_CAPACITY);

        let fanout_workers = env::var("ROOMCAST_FANOUT_WORKERS")
            .ok()
            .and_then(|n| n.parse().ok())
            .unwrap_or(DEFAULT_FANOUT_WORKERS)
            .max(1);

        let send_timeout_secs = env::var("ROOMCAST_SEND_TIMEOUT")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(DEFAULT_SEND_TIMEOUT_SECS);

        let deadline_secs = env::var("ROOMCAST_BROADCAST_DEADLINE")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(DEFAULT_BROADCAST_DEADLINE_SECS);

        let jwt_secret = env::var("ROOMCAST_JWT_SECRET")
            .or_else(|_| env::var("JWT_SECRET"))
            .map_err(|_| {
                RoomcastError::ConfigError(
                    "JWT_SECRET environment variable is required. \
                     Generate one with: openssl rand -base64 32"
                        .to_string(),
                )
            })?;

        Self::validate_jwt_secret(&jwt_secret)?;

        if history_capacity < history_limit {
            return Err(RoomcastError::ConfigError(format!(
                "history capacity ({}) must not be smaller than the replay limit ({})",
                history_capacity, history_limit
            )));
        }

        Ok(Self {
            host,
            port,
            default_room,
            history_limit,
            history_capacity,
            fanout_workers,
            send_timeout: Duration::from_secs(send_timeout_secs),
            broadcast_deadline: Duration::from_secs(deadline_secs),
            jwt_secret,
        })
    }
}
