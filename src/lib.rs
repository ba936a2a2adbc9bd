//! Roomcast - a real-time fan-out engine for room-scoped chat feeds
//!
//! Tracks live connections, keeps an append-only ordered message history
//! per room, and delivers each new message to every live connection with
//! bounded parallelism and partial-failure reporting.

pub mod auth;
pub mod config;
pub mod constants;
pub mod core;
pub mod error;
pub mod handlers;
pub mod storage;
pub mod transport;

// Re-export main components
pub use config::ServerConfig;
pub use error::{Result, RoomcastError};
pub use self::core::{ConnectionRegistry, DeliverySummary, FeedService, Message, MessageLog};
pub use transport::{DeliveryError, TransportSender, WsTransport};
