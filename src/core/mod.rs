pub mod connection;
pub mod dispatcher;
pub mod message;
pub mod message_log;
pub mod registry;
pub mod service;

pub use connection::Connection;
pub use dispatcher::{BroadcastDispatcher, DeliverySummary, FanoutOptions};
pub use message::{ClientRequest, Message};
pub use message_log::MessageLog;
pub use registry::ConnectionRegistry;
pub use service::FeedService;
