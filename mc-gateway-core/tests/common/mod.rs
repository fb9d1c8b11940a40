#![allow(dead_code)]

use async_trait::async_trait;
use mc_gateway_common::MCMessageBus;
use mc_gateway_core::GatewayPipeline;
use mc_gateway_error::MCResult;
use mc_gateway_models::{
    event::BusData, gateway::GatewayConfig, settings::Pipeline as PipelineSettings,
    topics::Topics, BusHandler, MessageBus,
};
use mc_gateway_sdk::{
    AdapterContext, AdapterError, AdapterFactory, AdapterRegistry, AdapterResult, Message,
    ProtocolAdapter, RawMessage, RawMessageSink, State, StateReporter,
};
use parking_lot::Mutex;
use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::sync::Semaphore;

pub const MOCK_ADAPTER_TYPE: &str = "mock";

/// Raw payload the mock adapter refuses to parse
pub const GARBAGE: &[u8] = b"garbage";

/// Shared knobs and recordings of every mock adapter built by one factory
pub struct MockControl {
    pub posted: Mutex<Vec<Message>>,
    pub parsed: Mutex<Vec<Message>>,
    pub sink: Mutex<Option<Arc<dyn RawMessageSink>>>,
    pub fail_post: AtomicBool,
    pub fail_start: AtomicBool,
    pub fail_close: AtomicBool,
    pub starts: AtomicUsize,
    pub closes: AtomicUsize,
    /// Each post takes one permit
    pub gate: Semaphore,
}

impl MockControl {
    pub fn new() -> Arc<Self> {
        Self::with_permits(Semaphore::MAX_PERMITS)
    }

    /// Posts block until permits are added to `gate`
    pub fn gated() -> Arc<Self> {
        Self::with_permits(0)
    }

    fn with_permits(permits: usize) -> Arc<Self> {
        Arc::new(Self {
            posted: Mutex::new(Vec::new()),
            parsed: Mutex::new(Vec::new()),
            sink: Mutex::new(None),
            fail_post: AtomicBool::new(false),
            fail_start: AtomicBool::new(false),
            fail_close: AtomicBool::new(false),
            starts: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
            gate: Semaphore::new(permits),
        })
    }

    pub fn posted(&self) -> Vec<Message> {
        self.posted.lock().clone()
    }

    /// Push raw bytes through the sink handed to the adapter at start
    pub fn receive(&self, raw: RawMessage) -> AdapterResult<()> {
        let sink = self.sink.lock().clone().ok_or(AdapterError::NotConnected)?;
        sink.try_send(raw)
    }
}

pub struct MockAdapter {
    control: Arc<MockControl>,
}

#[async_trait]
impl ProtocolAdapter for MockAdapter {
    fn name(&self) -> &str {
        MOCK_ADAPTER_TYPE
    }

    async fn start(&self, sink: Arc<dyn RawMessageSink>) -> AdapterResult<()> {
        self.control.starts.fetch_add(1, Ordering::SeqCst);
        if self.control.fail_start.load(Ordering::SeqCst) {
            return Err(AdapterError::ConnectionError("port busy".into()));
        }
        *self.control.sink.lock() = Some(sink);
        Ok(())
    }

    async fn post(&self, message: &Message) -> AdapterResult<()> {
        if let Ok(permit) = self.control.gate.acquire().await {
            permit.forget();
        }
        if self.control.fail_post.load(Ordering::SeqCst) {
            return Err(AdapterError::SendError("node unreachable".into()));
        }
        self.control.posted.lock().push(message.clone());
        Ok(())
    }

    async fn process_received(&self, raw: RawMessage) -> AdapterResult<Vec<Message>> {
        if raw.data.as_ref() == GARBAGE {
            return Err(AdapterError::CodecError("bad frame".into()));
        }
        Ok(self.control.parsed.lock().clone())
    }

    async fn close(&self) -> AdapterResult<()> {
        self.control.closes.fetch_add(1, Ordering::SeqCst);
        self.control.sink.lock().take();
        if self.control.fail_close.load(Ordering::SeqCst) {
            return Err(AdapterError::ConnectionError("port stuck".into()));
        }
        Ok(())
    }
}

pub struct MockFactory {
    pub control: Arc<MockControl>,
}

impl AdapterFactory for MockFactory {
    fn adapter_type(&self) -> &str {
        MOCK_ADAPTER_TYPE
    }

    fn create(&self, _ctx: AdapterContext) -> AdapterResult<Box<dyn ProtocolAdapter>> {
        Ok(Box::new(MockAdapter {
            control: Arc::clone(&self.control),
        }))
    }
}

pub fn mock_registry(control: &Arc<MockControl>) -> AdapterRegistry {
    let registry = AdapterRegistry::new();
    registry
        .register_factory(Arc::new(MockFactory {
            control: Arc::clone(control),
        }))
        .unwrap();
    registry
}

#[derive(Default)]
pub struct RecordingReporter {
    pub states: Mutex<Vec<(String, State)>>,
}

impl StateReporter for RecordingReporter {
    fn report(&self, gateway_id: &str, state: State) {
        self.states.lock().push((gateway_id.to_string(), state));
    }
}

pub fn gateway(id: &str) -> GatewayConfig {
    GatewayConfig::new(id, MOCK_ADAPTER_TYPE)
}

pub async fn start_pipeline(
    control: &Arc<MockControl>,
    bus: &Arc<MCMessageBus>,
    config: GatewayConfig,
) -> MCResult<GatewayPipeline> {
    let adapter: Arc<dyn ProtocolAdapter> = Arc::new(MockAdapter {
        control: Arc::clone(control),
    });
    let bus: Arc<dyn MessageBus> = bus.clone();
    GatewayPipeline::start(
        config,
        adapter,
        bus,
        &Topics::default(),
        &PipelineSettings::default(),
    )
    .await
}

/// Record every event published on `topic`
pub async fn record_topic(bus: &MCMessageBus, topic: &str) -> Arc<Mutex<Vec<BusData>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let handler: BusHandler = Arc::new(move |data: BusData| sink.lock().push(data));
    bus.subscribe(topic, handler).await.unwrap();
    seen
}

/// Poll `check` until it holds, panicking after roughly two seconds
pub async fn eventually<F>(mut check: F)
where
    F: FnMut() -> bool,
{
    for _ in 0..400 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met in time");
}

/// Run `fut` and give spawned dispatch tasks a chance to settle
pub async fn settle<F: Future>(fut: F) -> F::Output {
    let out = fut.await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    out
}
