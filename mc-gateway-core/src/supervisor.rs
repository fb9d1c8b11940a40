use crate::queue::{BoundedQueue, QueueConsumer};
use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use mc_gateway_error::{MCError, MCResult};
use mc_gateway_models::{
    event::{BusData, ResourceType, ServiceCommand, ServiceEvent},
    topics::Topics,
    BusHandler, GatewayStore, MessageBus, MessageBusExt, SubscriptionId,
};
use mc_gateway_sdk::State;
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
    time::Duration,
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, info, instrument, warn};

/// Pending single shot reconnect for one gateway
struct ReconnectJob {
    serial: u64,
    token: CancellationToken,
}

/// Gateway health bookkeeping on the resource service topic.
///
/// Answers `get`, persists `updateState` reports and runs the reconnect
/// state machine: a non-up report for an enabled gateway with a reconnect
/// delay schedules exactly one job, an up report cancels it. A fired job
/// re-reads the gateway and requests a `reload` on the gateway service
/// topic, so repair always goes through the normal start path.
pub struct GatewaySupervisor {
    bus: Arc<dyn MessageBus>,
    store: Arc<dyn GatewayStore>,
    topics: Topics,
    jobs: Arc<DashMap<String, ReconnectJob>>,
    next_serial: AtomicU64,
    tracker: TaskTracker,
    events: Mutex<Option<Arc<BoundedQueue<ServiceEvent>>>>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl GatewaySupervisor {
    pub fn new(bus: Arc<dyn MessageBus>, store: Arc<dyn GatewayStore>, topics: Topics) -> Self {
        Self {
            bus,
            store,
            topics,
            jobs: Arc::new(DashMap::new()),
            next_serial: AtomicU64::new(1),
            tracker: TaskTracker::new(),
            events: Mutex::new(None),
            subscription: Mutex::new(None),
        }
    }

    pub async fn start(self: &Arc<Self>, event_queue_capacity: usize) -> MCResult<()> {
        if self.events.lock().is_some() {
            return Err(MCError::InvalidStateError(
                "gateway supervisor already started".into(),
            ));
        }

        let queue = Arc::new(BoundedQueue::start(
            "resource_service",
            event_queue_capacity,
            1,
            EventConsumer {
                supervisor: Arc::downgrade(self),
            },
        ));

        let topic = self.topics.service_resource();
        let handler: BusHandler = {
            let queue = Arc::clone(&queue);
            Arc::new(move |data: BusData| match data.load_data::<ServiceEvent>() {
                Ok(event) => {
                    if let Err(e) = queue.produce(event) {
                        warn!(error = %e, "Resource service event dropped");
                    }
                }
                Err(e) => warn!(error = %e, "Failed to decode resource service event"),
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

        info!(topic = %topic, "Gateway supervisor started");
        Ok(())
    }

    /// Stop consuming reports and cancel every pending reconnect
    pub async fn stop(&self) -> MCResult<()> {
        let subscription = self.subscription.lock().take();
        if let Some(id) = subscription {
            if let Err(e) = self
                .bus
                .unsubscribe(&self.topics.service_resource(), id)
                .await
            {
                warn!(error = %e, "Failed to unsubscribe resource service topic");
            }
        }
        let queue = self.events.lock().take();
        if let Some(queue) = queue {
            queue.close().await;
        }

        self.cancel_all();
        self.tracker.close();
        self.tracker.wait().await;
        info!("Gateway supervisor stopped");
        Ok(())
    }

    /// Process one resource service event and answer on its reply topic
    #[instrument(name = "resource-command", skip_all, fields(command = %event.command, id = %event.id))]
    pub async fn handle_event(&self, event: ServiceEvent) -> MCResult<()> {
        let result = if event.r#type != ResourceType::Gateway {
            Err(MCError::UnsupportedType(format!("{:?}", event.r#type)))
        } else {
            match event.command {
                ServiceCommand::Get => self.get(&event).await.map(Some),
                ServiceCommand::UpdateState => self.update_state(&event).await.map(|_| None),
                ServiceCommand::LoadAll => self.load_all().await.map(|_| None),
                other => Err(MCError::UnknownCommand(other.to_string())),
            }
        };

        self.reply(&event, &result).await;
        result.map(|_| ())
    }

    async fn reply(&self, request: &ServiceEvent, result: &MCResult<Option<String>>) {
        if request.reply_topic.is_empty() {
            return;
        }

        let mut response = ServiceEvent::new(
            request.r#type,
            request.reply_command.unwrap_or(request.command),
        )
        .with_id(request.id.clone());
        match result {
            Ok(data) => response.data = data.clone().unwrap_or_default(),
            Err(e) => response.error = e.to_string(),
        }

        if let Err(e) = self.bus.publish_json(&request.reply_topic, &response).await {
            warn!(topic = %request.reply_topic, error = %e, "Failed to post response");
        }
    }

    /// Gateway config by id, or the list matching a label filter
    async fn get(&self, event: &ServiceEvent) -> MCResult<String> {
        if !event.id.is_empty() {
            let config = self
                .store
                .get(&event.id)
                .await?
                .ok_or_else(|| MCError::NotFound(format!("gateway '{}'", event.id)))?;
            return Ok(serde_json::to_string(&config)?);
        }
        if !event.labels.is_empty() {
            let configs = self.store.list(&event.labels).await?;
            return Ok(serde_json::to_string(&configs)?);
        }
        Err(MCError::from("filter not supplied"))
    }

    async fn update_state(&self, event: &ServiceEvent) -> MCResult<()> {
        if event.id.is_empty() {
            return Err(MCError::from("gateway id not supplied"));
        }
        if !event.has_data() {
            return Err(MCError::from("gateway state not supplied"));
        }
        let state: State = event.load_data()?;
        self.store.set_state(&event.id, state.clone()).await?;
        debug!(gateway = %event.id, status = %state.status, "Gateway state updated");
        self.reconcile(&event.id, &state).await
    }

    /// Publish `start` for every stored gateway
    async fn load_all(&self) -> MCResult<()> {
        let topic = self.topics.service_gateway();
        let gateways = self.store.list(&HashMap::new()).await?;
        for config in gateways {
            let event = ServiceEvent::new(ResourceType::Gateway, ServiceCommand::Start)
                .with_id(config.id.clone())
                .with_data(&config)?;
            self.bus.publish_json(&topic, &event).await?;
        }
        Ok(())
    }

    /// Reconnect state machine step for a freshly stored state
    async fn reconcile(&self, gateway_id: &str, state: &State) -> MCResult<()> {
        if state.status.is_up() {
            self.cancel_job(gateway_id);
            return Ok(());
        }

        let Some(config) = self.store.get(gateway_id).await? else {
            self.cancel_job(gateway_id);
            return Ok(());
        };
        if !config.enabled {
            self.cancel_job(gateway_id);
            return Ok(());
        }
        if let Some(delay) = config.reconnect_delay() {
            self.schedule_reconnect(gateway_id, delay);
        }
        Ok(())
    }

    /// Create the reconnect job unless one is already pending.
    /// Returns whether a job was created.
    pub fn schedule_reconnect(&self, gateway_id: &str, delay: Duration) -> bool {
        let serial = self.next_serial.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        match self.jobs.entry(gateway_id.to_string()) {
            Entry::Occupied(_) => {
                debug!(gateway = %gateway_id, "Reconnect already scheduled");
                return false;
            }
            Entry::Vacant(entry) => {
                entry.insert(ReconnectJob {
                    serial,
                    token: token.clone(),
                });
            }
        }

        let jobs = Arc::clone(&self.jobs);
        let store = Arc::clone(&self.store);
        let bus = Arc::clone(&self.bus);
        let topic = self.topics.service_gateway();
        let id = gateway_id.to_string();
        self.tracker.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            // Whoever removes the entry first wins against a concurrent cancel.
            if jobs.remove_if(&id, |_, job| job.serial == serial).is_none() {
                return;
            }
            request_reload(store, bus, &topic, &id).await;
        });

        info!(gateway = %gateway_id, delay_ms = delay.as_millis() as u64, "Reconnect scheduled");
        true
    }

    /// Cancel the pending job of a gateway; returns whether one existed
    pub fn cancel_job(&self, gateway_id: &str) -> bool {
        match self.jobs.remove(gateway_id) {
            Some((_, job)) => {
                job.token.cancel();
                info!(gateway = %gateway_id, "Reconnect cancelled");
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        self.jobs.retain(|_, job| {
            job.token.cancel();
            false
        });
    }

    #[inline]
    pub fn has_pending_job(&self, gateway_id: &str) -> bool {
        self.jobs.contains_key(gateway_id)
    }

    #[inline]
    pub fn pending_jobs(&self) -> usize {
        self.jobs.len()
    }
}

/// Fired reconnect: re-validate the gateway, then ask for a reload
async fn request_reload(
    store: Arc<dyn GatewayStore>,
    bus: Arc<dyn MessageBus>,
    topic: &str,
    gateway_id: &str,
) {
    let config = match store.get(gateway_id).await {
        Ok(Some(config)) => config,
        Ok(None) => {
            debug!(gateway = %gateway_id, "Gateway removed, reconnect skipped");
            return;
        }
        Err(e) => {
            warn!(gateway = %gateway_id, error = %e, "Failed to read gateway, reconnect skipped");
            return;
        }
    };
    if !config.enabled || config.is_up() {
        debug!(gateway = %gateway_id, "Gateway disabled or up, reconnect skipped");
        return;
    }

    let event = match ServiceEvent::new(ResourceType::Gateway, ServiceCommand::Reload)
        .with_id(gateway_id)
        .with_data(&config)
    {
        Ok(event) => event,
        Err(e) => {
            warn!(gateway = %gateway_id, error = %e, "Failed to encode reload request");
            return;
        }
    };
    match bus.publish_json(topic, &event).await {
        Ok(()) => info!(gateway = %gateway_id, "Reconnect: reload requested"),
        Err(e) => warn!(gateway = %gateway_id, error = %e, "Failed to request reload"),
    }
}

struct EventConsumer {
    supervisor: Weak<GatewaySupervisor>,
}

#[async_trait]
impl QueueConsumer<ServiceEvent> for EventConsumer {
    async fn consume(&self, event: ServiceEvent) {
        let Some(supervisor) = self.supervisor.upgrade() else {
            return;
        };
        if let Err(e) = supervisor.handle_event(event).await {
            warn!(error = %e, "Failed to process resource service event");
        }
    }
}
