//! Per gateway message pipeline.
//!
//! A pipeline owns two bounded queues (outbound messages for the device
//! network, inbound raw bytes from it), the sleeping node buffer and the
//! protocol adapter instance. Bus traffic for the gateway enters through
//! the outbound queue; raw bytes pushed by the adapter are parsed on the
//! inbound queue and published to the shared to-server topic.
mod sink;
mod sleeping;

pub use sink::QueueRawMessageSink;
pub use sleeping::SleepingQueue;

use crate::queue::{BoundedQueue, QueueConsumer};
use async_trait::async_trait;
use chrono::Utc;
use mc_gateway_error::{MCError, MCResult};
use mc_gateway_models::{
    event::BusData, gateway::GatewayConfig, settings::Pipeline as PipelineSettings,
    topics::Topics, BusHandler, MessageBus, MessageBusExt, SubscriptionId,
};
use mc_gateway_sdk::{Message, ProtocolAdapter, RawMessage};
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, error, info, warn};

pub struct GatewayPipeline {
    config: GatewayConfig,
    adapter: Arc<dyn ProtocolAdapter>,
    bus: Arc<dyn MessageBus>,
    provider_topic: String,
    sleeping: Arc<SleepingQueue>,
    messages: Arc<BoundedQueue<Message>>,
    raw_messages: Arc<BoundedQueue<RawMessage>>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl GatewayPipeline {
    /// Build and start a pipeline.
    ///
    /// Subscribes to the gateway's provider topic, then starts the adapter.
    /// If the adapter fails to start the subscription is removed and both
    /// queues are closed before the error is returned.
    pub async fn start(
        config: GatewayConfig,
        adapter: Arc<dyn ProtocolAdapter>,
        bus: Arc<dyn MessageBus>,
        topics: &Topics,
        sizing: &PipelineSettings,
    ) -> MCResult<Self> {
        let gateway_id = config.id.clone();
        let sleeping = Arc::new(SleepingQueue::new(sizing.sleeping_queue_limit));

        let messages = Arc::new(BoundedQueue::start(
            format!("{gateway_id}_message"),
            sizing.message_queue_capacity,
            sizing.message_workers,
            MessageConsumer {
                gateway_id: gateway_id.clone(),
                adapter: Arc::clone(&adapter),
                sleeping: Arc::clone(&sleeping),
                queue_failed: config.queue_failed_message,
            },
        ));
        let raw_messages = Arc::new(BoundedQueue::start(
            format!("{gateway_id}_raw_message"),
            sizing.raw_message_queue_capacity,
            sizing.raw_message_workers,
            RawMessageConsumer {
                gateway_id: gateway_id.clone(),
                adapter: Arc::clone(&adapter),
                bus: Arc::clone(&bus),
                topic: topics.post_to_server(),
            },
        ));

        let provider_topic = topics.post_to_provider(&gateway_id);
        let handler: BusHandler = {
            let queue = Arc::clone(&messages);
            let gateway_id = gateway_id.clone();
            Arc::new(move |data: BusData| {
                let message: Message = match data.load_data() {
                    Ok(message) => message,
                    Err(e) => {
                        warn!(gateway = %gateway_id, error = %e, "Dropping undecodable message");
                        return;
                    }
                };
                if let Err(e) = queue.produce(message) {
                    warn!(gateway = %gateway_id, error = %e, "Message dropped");
                }
            })
        };

        let subscription = match bus.subscribe(&provider_topic, handler).await {
            Ok(id) => id,
            Err(e) => {
                messages.close().await;
                raw_messages.close().await;
                return Err(e.into());
            }
        };

        let sink = Arc::new(QueueRawMessageSink::new(Arc::clone(&raw_messages)));
        if let Err(e) = adapter.start(sink).await {
            error!(gateway = %gateway_id, error = %e, "Failed to start protocol adapter");
            if let Err(e) = bus.unsubscribe(&provider_topic, subscription).await {
                warn!(gateway = %gateway_id, error = %e, "Failed to unsubscribe");
            }
            messages.close().await;
            raw_messages.close().await;
            return Err(MCError::AdapterError(e.to_string()));
        }

        info!(gateway = %gateway_id, adapter = adapter.name(), "Gateway pipeline started");
        Ok(Self {
            config,
            adapter,
            bus,
            provider_topic,
            sleeping,
            messages,
            raw_messages,
            subscription: Mutex::new(Some(subscription)),
        })
    }

    /// Close the adapter, then tear down the subscription and both queues.
    ///
    /// Teardown runs even when the adapter fails to close; that failure is
    /// returned afterwards.
    pub async fn stop(&self) -> MCResult<()> {
        let gateway_id = self.gateway_id();
        let closed = self.adapter.close().await;
        if let Err(e) = &closed {
            warn!(gateway = %gateway_id, error = %e, "Protocol adapter failed to close");
        }
        // Whatever is still queued drains against the closed adapter and is lost.
        let stranded = self.messages.pending();
        if stranded > 0 {
            debug!(gateway = %gateway_id, stranded, "Discarding outbound messages queued at stop");
        }

        let subscription = self.subscription.lock().take();
        if let Some(id) = subscription {
            if let Err(e) = self.bus.unsubscribe(&self.provider_topic, id).await {
                warn!(gateway = %gateway_id, error = %e, "Failed to unsubscribe");
            }
        }
        self.messages.close().await;
        self.raw_messages.close().await;

        info!(gateway = %gateway_id, "Gateway pipeline stopped");
        closed.map_err(|e| MCError::AdapterError(e.to_string()))
    }

    /// Queue a message for the device network without waiting; fails when
    /// the outbound queue is saturated or the pipeline is stopped
    pub fn post_message(&self, message: Message) -> MCResult<()> {
        self.messages.produce(message)
    }

    #[inline]
    pub fn gateway_id(&self) -> &str {
        &self.config.id
    }

    #[inline]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    #[inline]
    pub fn adapter_name(&self) -> &str {
        self.adapter.name()
    }

    pub fn get_node_sleeping_queue(&self, node_id: &str) -> Vec<Message> {
        self.sleeping.node(node_id)
    }

    pub fn get_gateway_sleeping_queue(&self) -> HashMap<String, Vec<Message>> {
        self.sleeping.all()
    }

    pub fn clear_node_sleeping_queue(&self, node_id: &str) {
        self.sleeping.clear_node(node_id);
    }

    pub fn clear_gateway_sleeping_queue(&self) {
        self.sleeping.clear();
    }
}

/// Outbound side: bus message to adapter post, sleeping buffer or flush
struct MessageConsumer {
    gateway_id: String,
    adapter: Arc<dyn ProtocolAdapter>,
    sleeping: Arc<SleepingQueue>,
    queue_failed: bool,
}

impl MessageConsumer {
    async fn post(&self, message: Message, queue_failed: bool) {
        match self.adapter.post(&message).await {
            Ok(()) => {
                debug!(gateway = %self.gateway_id, node = %message.node_id, "Message posted");
            }
            Err(e) if queue_failed => {
                warn!(
                    gateway = %self.gateway_id,
                    node = %message.node_id,
                    error = %e,
                    "Failed to post message, moved to sleeping queue"
                );
                self.sleeping.add(message);
            }
            Err(e) => {
                warn!(
                    gateway = %self.gateway_id,
                    node = %message.node_id,
                    error = %e,
                    "Failed to post message"
                );
            }
        }
    }

    async fn flush(&self, node_id: &str) {
        let buffered = self.sleeping.take_node(node_id);
        if buffered.is_empty() {
            return;
        }
        debug!(gateway = %self.gateway_id, node = %node_id, count = buffered.len(), "Flushing sleeping queue");
        for message in buffered {
            self.post(message, false).await;
        }
    }
}

#[async_trait]
impl QueueConsumer<Message> for MessageConsumer {
    async fn consume(&self, mut message: Message) {
        if message.timestamp.is_none() {
            message.timestamp = Some(Utc::now());
        }

        if message.is_awake_action() {
            self.flush(&message.node_id).await;
            return;
        }

        if message.is_sleep_node {
            let len = self.sleeping.add(message);
            debug!(gateway = %self.gateway_id, queued = len, "Message buffered for sleeping node");
            return;
        }

        self.post(message, self.queue_failed).await;
    }
}

/// Inbound side: adapter parse, gateway id stamping, publish to server
struct RawMessageConsumer {
    gateway_id: String,
    adapter: Arc<dyn ProtocolAdapter>,
    bus: Arc<dyn MessageBus>,
    topic: String,
}

#[async_trait]
impl QueueConsumer<RawMessage> for RawMessageConsumer {
    async fn consume(&self, raw: RawMessage) {
        let messages = match self.adapter.process_received(raw).await {
            Ok(messages) => messages,
            Err(e) => {
                warn!(gateway = %self.gateway_id, error = %e, "Failed to parse raw message, dropped");
                return;
            }
        };

        for mut message in messages {
            if message.gateway_id.is_empty() {
                message.gateway_id = self.gateway_id.clone();
            }
            if let Err(e) = self.bus.publish_json(&self.topic, &message).await {
                error!(gateway = %self.gateway_id, error = %e, "Failed to publish received message");
            }
        }
    }
}
