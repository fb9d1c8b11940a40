use crate::queue::BoundedQueue;
use mc_gateway_error::MCError;
use mc_gateway_sdk::{AdapterError, AdapterResult, RawMessage, RawMessageSink};
use std::sync::Arc;

/// Raw message sink handed to the adapter, backed by the pipeline's
/// inbound queue.
///
/// Never blocks: a saturated queue is reported as [`AdapterError::QueueFull`]
/// so the adapter keeps reading the wire.
pub struct QueueRawMessageSink {
    queue: Arc<BoundedQueue<RawMessage>>,
}

impl QueueRawMessageSink {
    pub fn new(queue: Arc<BoundedQueue<RawMessage>>) -> Self {
        Self { queue }
    }
}

impl RawMessageSink for QueueRawMessageSink {
    #[inline]
    fn try_send(&self, raw: RawMessage) -> AdapterResult<()> {
        self.queue.produce(raw).map_err(|e| match e {
            MCError::QueueFull(_) => AdapterError::QueueFull,
            _ => AdapterError::QueueClosed,
        })
    }
}
