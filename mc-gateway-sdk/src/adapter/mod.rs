pub mod registry;

use crate::{AdapterError, AdapterResult, Message, RawMessage, State};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Non-blocking hand-off of raw device bytes into the owning pipeline.
///
/// Implementations must never block the caller: a saturated queue surfaces
/// as [`AdapterError::QueueFull`] so the adapter can decide to drop or retry.
pub trait RawMessageSink: Send + Sync {
    fn try_send(&self, raw: RawMessage) -> AdapterResult<()>;
}

/// Channel through which an adapter reports the health of its connection
pub trait StateReporter: Send + Sync {
    fn report(&self, gateway_id: &str, state: State);
}

/// Everything an adapter receives from the host when it is constructed
#[derive(Clone)]
pub struct AdapterContext {
    /// Owning gateway id
    pub gateway_id: String,
    /// Adapter specific settings blob (the gateway's `provider` section)
    pub settings: serde_json::Value,
    /// Host supplied state reporter
    pub reporter: Arc<dyn StateReporter>,
}

impl AdapterContext {
    pub fn new(
        gateway_id: impl Into<String>,
        settings: serde_json::Value,
        reporter: Arc<dyn StateReporter>,
    ) -> Self {
        Self {
            gateway_id: gateway_id.into(),
            settings,
            reporter,
        }
    }

    /// Decode the settings blob into the adapter's own config type
    pub fn settings_as<T: DeserializeOwned>(&self) -> AdapterResult<T> {
        serde_json::from_value(self.settings.clone())
            .map_err(|e| AdapterError::ConfigurationError(e.to_string()))
    }

    #[inline]
    pub fn report_state(&self, state: State) {
        self.reporter.report(&self.gateway_id, state);
    }
}

/// Capability implemented by every device network protocol.
///
/// The pipeline never inspects adapter internals; it only calls these four
/// operations. Adapters own their I/O timeouts.
#[async_trait]
pub trait ProtocolAdapter: Send + Sync {
    /// Adapter type name, matching the key it is registered under
    fn name(&self) -> &str;

    /// Open the device connection. Received bytes go to `sink`.
    async fn start(&self, sink: Arc<dyn RawMessageSink>) -> AdapterResult<()>;

    /// Deliver one message to the device network
    async fn post(&self, message: &Message) -> AdapterResult<()>;

    /// Parse raw bytes into zero or more messages
    async fn process_received(&self, raw: RawMessage) -> AdapterResult<Vec<Message>>;

    /// Sever the device connection
    async fn close(&self) -> AdapterResult<()>;
}

/// Constructor for one adapter type
pub trait AdapterFactory: Send + Sync {
    /// Type name used as the registry key (`provider.type` in gateway config)
    fn adapter_type(&self) -> &str;

    fn create(&self, ctx: AdapterContext) -> AdapterResult<Box<dyn ProtocolAdapter>>;
}
