use crate::{
    pipeline::GatewayPipeline,
    queue::{BoundedQueue, QueueConsumer},
    registry::GatewayRegistry,
};
use async_trait::async_trait;
use mc_gateway_error::{MCError, MCResult};
use mc_gateway_models::{
    event::{BusData, ResourceType, ServiceCommand, ServiceEvent},
    filter::OwnershipFilter,
    gateway::GatewayConfig,
    settings::Pipeline as PipelineSettings,
    topics::Topics,
    BusHandler, MessageBus, MessageBusExt, SubscriptionId,
};
use mc_gateway_sdk::{AdapterContext, AdapterRegistry, State, StateReporter};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::{debug, error, info, instrument, warn};

/// Turns gateway service commands into pipeline lifecycle calls.
///
/// Only gateways passing the ownership filter are started here, which lets
/// several controller instances share one bus.
pub struct GatewayOrchestrator {
    bus: Arc<dyn MessageBus>,
    registry: Arc<GatewayRegistry>,
    adapters: AdapterRegistry,
    reporter: Arc<dyn StateReporter>,
    topics: Topics,
    ownership: OwnershipFilter,
    sizing: PipelineSettings,
    events: Mutex<Option<Arc<BoundedQueue<ServiceEvent>>>>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl GatewayOrchestrator {
    pub fn new(
        bus: Arc<dyn MessageBus>,
        registry: Arc<GatewayRegistry>,
        adapters: AdapterRegistry,
        reporter: Arc<dyn StateReporter>,
        topics: Topics,
        ownership: OwnershipFilter,
        sizing: PipelineSettings,
    ) -> Self {
        Self {
            bus,
            registry,
            adapters,
            reporter,
            topics,
            ownership,
            sizing,
            events: Mutex::new(None),
            subscription: Mutex::new(None),
        }
    }

    #[inline]
    pub fn registry(&self) -> &Arc<GatewayRegistry> {
        &self.registry
    }

    /// Start consuming the gateway service topic, then ask the resource
    /// service to send `start` for every known gateway.
    pub async fn start(self: &Arc<Self>, event_queue_capacity: usize) -> MCResult<()> {
        if self.events.lock().is_some() {
            return Err(MCError::InvalidStateError(
                "gateway orchestrator already started".into(),
            ));
        }

        let queue = Arc::new(BoundedQueue::start(
            "gateway_service",
            event_queue_capacity,
            1,
            EventConsumer {
                orchestrator: Arc::downgrade(self),
            },
        ));

        let topic = self.topics.service_gateway();
        let handler: BusHandler = {
            let queue = Arc::clone(&queue);
            Arc::new(move |data: BusData| {
                let event: ServiceEvent = match data.load_data() {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(error = %e, "Failed to decode gateway service event");
                        return;
                    }
                };
                debug!(command = %event.command, id = %event.id, "Gateway service event queued");
                if let Err(e) = queue.produce(event) {
                    warn!(error = %e, "Gateway service event dropped");
                }
            })
        };

        let subscription = match self.bus.subscribe(&topic, handler).await {
            Ok(id) => id,
            Err(e) => {
                queue.close().await;
                return Err(e.into());
            }
        };
        *self.events.lock() = Some(queue);
        *self.subscription.lock() = Some(subscription);

        info!(topic = %topic, "Gateway orchestrator started");

        let load_all = ServiceEvent::new(ResourceType::Gateway, ServiceCommand::LoadAll);
        self.bus
            .publish_json(&self.topics.service_resource(), &load_all)
            .await?;
        Ok(())
    }

    /// Stop consuming commands and unload every pipeline
    pub async fn stop(&self) -> MCResult<()> {
        let subscription = self.subscription.lock().take();
        if let Some(id) = subscription {
            if let Err(e) = self
                .bus
                .unsubscribe(&self.topics.service_gateway(), id)
                .await
            {
                warn!(error = %e, "Failed to unsubscribe gateway service topic");
            }
        }
        let queue = self.events.lock().take();
        if let Some(queue) = queue {
            queue.close().await;
        }
        self.unload_all().await;
        info!("Gateway orchestrator stopped");
        Ok(())
    }

    /// Dispatch one gateway service command
    #[instrument(name = "gateway-command", skip_all, fields(command = %event.command))]
    pub async fn handle_event(&self, event: ServiceEvent) -> MCResult<()> {
        if event.r#type != ResourceType::Gateway {
            warn!(resource = ?event.r#type, "Unsupported event type");
        }

        match event.command {
            ServiceCommand::Start => {
                let config: GatewayConfig = event.load_data()?;
                self.start_gateway(config).await
            }
            ServiceCommand::Stop => {
                let id = if event.id.is_empty() {
                    event.load_data::<GatewayConfig>()?.id
                } else {
                    event.id
                };
                self.stop_gateway(&id).await
            }
            ServiceCommand::Reload => {
                let config: GatewayConfig = event.load_data()?;
                self.reload_gateway(config).await
            }
            ServiceCommand::UnloadAll => {
                self.unload_all().await;
                Ok(())
            }
            other => Err(MCError::UnknownCommand(other.to_string())),
        }
    }

    /// Build, start and register a pipeline for `config`.
    ///
    /// Gateways that are disabled or owned by another instance are skipped.
    /// A gateway already running is an error and keeps its pipeline.
    pub async fn start_gateway(&self, config: GatewayConfig) -> MCResult<()> {
        let gateway_id = config.id.clone();
        if !self.ownership.is_mine(&gateway_id, &config.labels) {
            debug!(gateway = %gateway_id, "Gateway not owned by this instance");
            return Ok(());
        }
        if !config.enabled {
            info!(gateway = %gateway_id, "Gateway is disabled, not starting");
            return Ok(());
        }
        if self.registry.contains(&gateway_id) {
            return Err(MCError::AlreadyRunning(gateway_id));
        }

        let pipeline = match self.build_pipeline(config).await {
            Ok(pipeline) => Arc::new(pipeline),
            Err(e) => {
                error!(gateway = %gateway_id, error = %e, "Failed to start gateway");
                self.reporter.report(&gateway_id, State::error(e.to_string()));
                return Err(e);
            }
        };

        if let Err(e) = self.registry.add(Arc::clone(&pipeline)) {
            if let Err(stop_err) = pipeline.stop().await {
                warn!(gateway = %gateway_id, error = %stop_err, "Failed to stop duplicate pipeline");
            }
            return Err(e);
        }
        Ok(())
    }

    async fn build_pipeline(&self, config: GatewayConfig) -> MCResult<GatewayPipeline> {
        let adapter_type = config.provider_type().ok_or_else(|| {
            MCError::ConfigurationError(format!("gateway '{}' has no provider type", config.id))
        })?;
        let ctx = AdapterContext::new(
            config.id.clone(),
            config.provider.clone(),
            Arc::clone(&self.reporter),
        );
        let adapter = self
            .adapters
            .create(adapter_type, ctx)
            .map_err(|e| MCError::AdapterError(e.to_string()))?;

        GatewayPipeline::start(
            config,
            Arc::from(adapter),
            Arc::clone(&self.bus),
            &self.topics,
            &self.sizing,
        )
        .await
    }

    /// Stop and deregister a pipeline; an unknown id is a no-op
    pub async fn stop_gateway(&self, id: &str) -> MCResult<()> {
        let Some(pipeline) = self.registry.remove(id) else {
            debug!(gateway = %id, "Gateway not running, nothing to stop");
            return Ok(());
        };
        if let Err(e) = pipeline.stop().await {
            warn!(gateway = %id, error = %e, "Gateway stopped with error");
        }
        Ok(())
    }

    pub async fn reload_gateway(&self, config: GatewayConfig) -> MCResult<()> {
        self.stop_gateway(&config.id).await?;
        self.start_gateway(config).await
    }

    pub async fn unload_all(&self) {
        for id in self.registry.list_ids() {
            if let Err(e) = self.stop_gateway(&id).await {
                warn!(gateway = %id, error = %e, "Failed to unload gateway");
            }
        }
    }
}

struct EventConsumer {
    orchestrator: Weak<GatewayOrchestrator>,
}

#[async_trait]
impl QueueConsumer<ServiceEvent> for EventConsumer {
    async fn consume(&self, event: ServiceEvent) {
        let Some(orchestrator) = self.orchestrator.upgrade() else {
            return;
        };
        if let Err(e) = orchestrator.handle_event(event).await {
            warn!(error = %e, "Failed to process gateway service event");
        }
    }
}
