use crate::{
    api::GatewayApi, orchestrator::GatewayOrchestrator, registry::GatewayRegistry,
    reporter::BusStateReporter, supervisor::GatewaySupervisor,
};
use mc_gateway_error::MCResult;
use mc_gateway_models::{settings::Settings, GatewayStore, MessageBus};
use mc_gateway_sdk::{AdapterRegistry, StateReporter};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tracing::{info, instrument, warn};

/// Composition root wiring the bus, store and adapter factories into the
/// supervisor, orchestrator and admin API
pub struct MCController {
    settings: Settings,
    bus: Arc<dyn MessageBus>,
    store: Arc<dyn GatewayStore>,
    registry: Arc<GatewayRegistry>,
    reporter: Arc<BusStateReporter>,
    supervisor: Arc<GatewaySupervisor>,
    orchestrator: Arc<GatewayOrchestrator>,
    api: GatewayApi,
    shutting_down: AtomicBool,
}

impl MCController {
    /// Must be called from within a tokio runtime
    pub fn new(
        settings: Settings,
        bus: Arc<dyn MessageBus>,
        store: Arc<dyn GatewayStore>,
        adapters: AdapterRegistry,
    ) -> Self {
        let topics = settings.topics();
        let registry = Arc::new(GatewayRegistry::new());
        let reporter = Arc::new(BusStateReporter::start(
            Arc::clone(&bus),
            topics.service_resource(),
        ));

        let supervisor = Arc::new(GatewaySupervisor::new(
            Arc::clone(&bus),
            Arc::clone(&store),
            topics.clone(),
        ));
        let orchestrator = Arc::new(GatewayOrchestrator::new(
            Arc::clone(&bus),
            Arc::clone(&registry),
            adapters,
            Arc::clone(&reporter) as Arc<dyn StateReporter>,
            topics.clone(),
            settings.gateway_service.ownership(),
            settings.pipeline,
        ));
        let api = GatewayApi::new(
            Arc::clone(&bus),
            Arc::clone(&store),
            Arc::clone(&registry),
            Arc::clone(&supervisor),
            topics,
        );

        Self {
            settings,
            bus,
            store,
            registry,
            reporter,
            supervisor,
            orchestrator,
            api,
            shutting_down: AtomicBool::new(false),
        }
    }

    /// Start the supervisor first so it is listening when the orchestrator
    /// requests the initial gateway list
    pub async fn start(&self) -> MCResult<()> {
        self.supervisor
            .start(self.settings.resource_service.event_queue_capacity)
            .await?;
        self.orchestrator
            .start(self.settings.gateway_service.event_queue_capacity)
            .await?;
        info!("Controller started");
        Ok(())
    }

    /// Unload every gateway, flush state reports, cancel pending reconnects
    /// and close the bus.
    /// Only the first call does anything.
    #[instrument(name = "graceful-shutdown", skip_all)]
    pub async fn stop(&self) -> MCResult<()> {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        info!("Stopping controller...");

        if let Err(e) = self.orchestrator.stop().await {
            warn!(error = %e, "Gateway orchestrator stopped with error");
        }
        // Down reports from the unloaded pipelines must reach the bus before it closes.
        self.reporter.close().await;
        if let Err(e) = self.supervisor.stop().await {
            warn!(error = %e, "Gateway supervisor stopped with error");
        }
        if let Err(e) = self.bus.close().await {
            warn!(error = %e, "Message bus closed with error");
        }

        info!("Controller stopped");
        Ok(())
    }

    #[inline]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[inline]
    pub fn bus(&self) -> &Arc<dyn MessageBus> {
        &self.bus
    }

    #[inline]
    pub fn store(&self) -> &Arc<dyn GatewayStore> {
        &self.store
    }

    #[inline]
    pub fn registry(&self) -> &Arc<GatewayRegistry> {
        &self.registry
    }

    #[inline]
    pub fn supervisor(&self) -> &Arc<GatewaySupervisor> {
        &self.supervisor
    }

    #[inline]
    pub fn orchestrator(&self) -> &Arc<GatewayOrchestrator> {
        &self.orchestrator
    }

    #[inline]
    pub fn api(&self) -> &GatewayApi {
        &self.api
    }
}
