use thiserror::Error;

/// Error type for message bus operations
#[derive(Error, Debug)]
pub enum BusError {
    /// Returned when the bus has been closed and no longer accepts work
    #[error("bus closed")]
    Closed,
    /// Returned when an unsubscribe names a subscription the topic does not hold
    #[error("subscription {id} not found on topic '{topic}'")]
    SubscriptionNotFound { topic: String, id: u64 },
    /// Returned when the payload could not be encoded for the wire
    #[error("failed to encode payload for topic '{topic}': {reason}")]
    Encode { topic: String, reason: String },
    /// Returned when a delivered payload could not be decoded
    #[error("failed to decode payload: {0}")]
    Decode(String),
}
