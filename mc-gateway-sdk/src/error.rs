use thiserror::Error;

/// Protocol adapter specific errors
#[derive(Error, Debug, Default)]
pub enum AdapterError {
    #[error("Service unavailable")]
    #[default]
    ServiceUnavailable,
    #[error("Unknown adapter type: {0}")]
    UnknownType(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Initialization error: {0}")]
    InitializationError(String),
    #[error("Connection error: {0}")]
    ConnectionError(String),
    #[error("Not connected")]
    NotConnected,
    #[error("Send error: {0}")]
    SendError(String),
    #[error("Codec error: {0}")]
    CodecError(String),
    /// The raw message queue of the owning pipeline is saturated
    #[error("Raw message queue is full (capacity reached)")]
    QueueFull,
    /// The raw message queue of the owning pipeline is closed
    #[error("Raw message queue is closed")]
    QueueClosed,
    #[error("LoadError error: {0}")]
    LoadError(String),
}

impl From<serde_json::Error> for AdapterError {
    fn from(err: serde_json::Error) -> Self {
        AdapterError::CodecError(err.to_string())
    }
}
