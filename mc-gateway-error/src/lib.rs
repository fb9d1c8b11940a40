pub mod bus;

use anyhow::Error as AnyhowError;
use bus::BusError;
use config::ConfigError;
use serde_json::Error as SerdeJsonError;
use std::{error::Error as StdError, io::Error as IoError};
use thiserror::Error;
use tokio::{task::JoinError, time::Duration};

pub type MCResult<T, E = MCError> = anyhow::Result<T, E>;
pub type BusResult<T, E = BusError> = Result<T, E>;

#[derive(Error, Debug, Default)]
pub enum MCError {
    #[error("service unavailable")]
    #[default]
    ServiceUnavailable,
    #[error("read/write timeout")]
    Timeout(Duration),
    #[error("{0}")]
    JoinError(#[from] JoinError),
    #[error("{0}")]
    StdError(#[from] Box<dyn StdError + Send + Sync>),
    #[error("{0}")]
    Error(String),
    #[error("{0}")]
    IoError(#[from] IoError),
    #[error("{0}")]
    Msg(String),
    #[error("{0}")]
    Anyhow(#[from] AnyhowError),
    #[error("{0}")]
    Json(#[from] SerdeJsonError),
    #[error("{0}")]
    ConfigError(#[from] ConfigError),
    #[error("Bus error: {0}")]
    BusError(#[from] BusError),
    #[error("Adapter error: {0}")]
    AdapterError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Gateway '{0}' is already running")]
    AlreadyRunning(String),
    #[error("Queue '{0}' is full")]
    QueueFull(String),
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
    #[error("Unsupported resource type: {0}")]
    UnsupportedType(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Initialization error: {0}")]
    InitializationError(String),
    #[error("Shutdown error: {0}")]
    ShutdownError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Deserialization error: {0}")]
    DeserializationError(String),
    #[error("Invalid state error: {0}")]
    InvalidStateError(String),
}

impl From<()> for MCError {
    #[inline]
    fn from(_: ()) -> Self {
        Self::default()
    }
}

impl From<String> for MCError {
    #[inline]
    fn from(e: String) -> Self {
        MCError::Msg(e)
    }
}

impl From<&str> for MCError {
    #[inline]
    fn from(e: &str) -> Self {
        MCError::Msg(e.to_string())
    }
}

impl From<&MCError> for MCError {
    #[inline]
    fn from(e: &MCError) -> Self {
        MCError::Msg(e.to_string())
    }
}
