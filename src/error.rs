use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum RoomcastError {
    // Validation errors - rejected before any state mutation
    ValidationError(String),

    // Sequence assignment errors - the counter primitive itself failed
    SequenceAssignment(String),

    // Storage errors
    StorageError(String),

    // Auth errors
    AuthError(String),

    // Wire errors
    MessageParseError(String),
    UnrecognizedRequest(String),

    // Configuration errors
    ConfigError(String),
}

impl fmt::Display for RoomcastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            Self::SequenceAssignment(msg) => write!(f, "Sequence assignment failed: {}", msg),
            Self::StorageError(msg) => write!(f, "Storage error: {}", msg),
            Self::AuthError(msg) => write!(f, "Authentication error: {}", msg),
            Self::MessageParseError(msg) => write!(f, "Message parse error: {}", msg),
            Self::UnrecognizedRequest(msg) => write!(f, "Unrecognized request: {}", msg),
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for RoomcastError {}

// Generic result type for Roomcast
pub type Result<T> = std::result::Result<T, RoomcastError>;
