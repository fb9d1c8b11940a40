mod adapter;
mod error;
mod message;
mod types;

pub type AdapterResult<T> = Result<T, AdapterError>;

pub use adapter::{
    registry::AdapterRegistry, AdapterContext, AdapterFactory, ProtocolAdapter, RawMessageSink,
    StateReporter,
};
pub use error::AdapterError;
pub use message::{Message, MessageType, Payload, RawMessage, ACTION_AWAKE};
pub use types::{State, Status};
