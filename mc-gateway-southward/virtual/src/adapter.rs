use crate::types::VirtualConfig;
use async_trait::async_trait;
use bytes::Bytes;
use mc_gateway_sdk::{
    AdapterContext, AdapterError, AdapterResult, Message, ProtocolAdapter, RawMessage,
    RawMessageSink, State,
};
use parking_lot::Mutex;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tracing::debug;

pub const VIRTUAL_ADAPTER_TYPE: &str = "virtual";

/// Loopback adapter: every posted message comes back as a received raw
/// message, so a pipeline can be exercised without hardware.
pub struct VirtualAdapter {
    ctx: AdapterContext,
    config: VirtualConfig,
    sink: Mutex<Option<Arc<dyn RawMessageSink>>>,
    posted: AtomicU64,
}

impl VirtualAdapter {
    pub fn new(ctx: AdapterContext) -> AdapterResult<Self> {
        let config: VirtualConfig = ctx.settings_as()?;
        Ok(Self {
            ctx,
            config,
            sink: Mutex::new(None),
            posted: AtomicU64::new(0),
        })
    }

    #[inline]
    pub fn posted(&self) -> u64 {
        self.posted.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_started(&self) -> bool {
        self.sink.lock().is_some()
    }
}

#[async_trait]
impl ProtocolAdapter for VirtualAdapter {
    fn name(&self) -> &str {
        VIRTUAL_ADAPTER_TYPE
    }

    async fn start(&self, sink: Arc<dyn RawMessageSink>) -> AdapterResult<()> {
        if self.config.fail_start {
            self.ctx.report_state(State::error("start refused by configuration"));
            return Err(AdapterError::ConnectionError(
                "start refused by configuration".into(),
            ));
        }
        *self.sink.lock() = Some(sink);
        self.ctx.report_state(State::up("connected"));
        Ok(())
    }

    async fn post(&self, message: &Message) -> AdapterResult<()> {
        if self.config.fail_post {
            return Err(AdapterError::SendError("post refused by configuration".into()));
        }
        let sink = self
            .sink
            .lock()
            .clone()
            .ok_or(AdapterError::NotConnected)?;

        let data = serde_json::to_vec(message)?;
        let raw = RawMessage::new(true, Bytes::from(data))
            .with_hint("nodeId", serde_json::Value::from(message.node_id.as_str()));
        sink.try_send(raw)?;
        self.posted.fetch_add(1, Ordering::Relaxed);
        debug!(gateway = %self.ctx.gateway_id, node = %message.node_id, "Message looped back");
        Ok(())
    }

    async fn process_received(&self, raw: RawMessage) -> AdapterResult<Vec<Message>> {
        let mut message: Message = serde_json::from_slice(&raw.data)?;
        message.is_received = true;
        if message.timestamp.is_none() {
            message.timestamp = Some(raw.timestamp);
        }
        Ok(vec![message])
    }

    async fn close(&self) -> AdapterResult<()> {
        if self.sink.lock().take().is_some() {
            self.ctx.report_state(State::down("closed"));
        }
        Ok(())
    }
}
