use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Reported health of a gateway connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Up,
    Down,
    Error,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Status {
    #[inline]
    pub fn is_up(&self) -> bool {
        matches!(self, Status::Up)
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Up => "up",
            Status::Down => "down",
            Status::Error => "error",
            Status::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Last known state of a gateway, written only through the `updateState` path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct State {
    pub status: Status,
    #[serde(default)]
    pub message: String,
    pub since: DateTime<Utc>,
}

impl State {
    /// Build a state stamped with the current time
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            since: Utc::now(),
        }
    }

    #[inline]
    pub fn up(message: impl Into<String>) -> Self {
        Self::new(Status::Up, message)
    }

    #[inline]
    pub fn down(message: impl Into<String>) -> Self {
        Self::new(Status::Down, message)
    }

    #[inline]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Status::Error, message)
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new(Status::Unknown, "")
    }
}
