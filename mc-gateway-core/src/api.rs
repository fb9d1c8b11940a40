use crate::{pipeline::GatewayPipeline, registry::GatewayRegistry, supervisor::GatewaySupervisor};
use mc_gateway_error::{MCError, MCResult};
use mc_gateway_models::{
    event::{ResourceType, ServiceCommand, ServiceEvent},
    gateway::GatewayConfig,
    topics::Topics,
    GatewayStore, MessageBus, MessageBusExt,
};
use mc_gateway_sdk::Message;
use std::{collections::HashMap, sync::Arc};
use tracing::info;

/// Administrative operations on gateways.
///
/// Lifecycle changes are published as commands on the gateway service
/// topic, so they reach whichever instance owns the gateway. Sleeping queue
/// access goes straight to a pipeline running on this instance.
#[derive(Clone)]
pub struct GatewayApi {
    bus: Arc<dyn MessageBus>,
    store: Arc<dyn GatewayStore>,
    registry: Arc<GatewayRegistry>,
    supervisor: Arc<GatewaySupervisor>,
    topics: Topics,
}

impl GatewayApi {
    pub fn new(
        bus: Arc<dyn MessageBus>,
        store: Arc<dyn GatewayStore>,
        registry: Arc<GatewayRegistry>,
        supervisor: Arc<GatewaySupervisor>,
        topics: Topics,
    ) -> Self {
        Self {
            bus,
            store,
            registry,
            supervisor,
            topics,
        }
    }

    async fn load(&self, id: &str) -> MCResult<GatewayConfig> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| MCError::NotFound(format!("gateway '{id}'")))
    }

    async fn post_command(&self, command: ServiceCommand, config: &GatewayConfig) -> MCResult<()> {
        let event = ServiceEvent::new(ResourceType::Gateway, command)
            .with_id(config.id.clone())
            .with_data(config)?;
        self.bus
            .publish_json(&self.topics.service_gateway(), &event)
            .await?;
        Ok(())
    }

    pub async fn enable(&self, ids: &[String]) -> MCResult<()> {
        for id in ids {
            let mut config = self.load(id).await?;
            if !config.enabled {
                config.enabled = true;
                self.store.save(config.clone()).await?;
            }
            self.post_command(ServiceCommand::Start, &config).await?;
            info!(gateway = %id, "Gateway enabled");
        }
        Ok(())
    }

    pub async fn disable(&self, ids: &[String]) -> MCResult<()> {
        for id in ids {
            let mut config = self.load(id).await?;
            if config.enabled {
                config.enabled = false;
                self.store.save(config.clone()).await?;
            }
            self.supervisor.cancel_job(id);
            self.post_command(ServiceCommand::Stop, &config).await?;
            info!(gateway = %id, "Gateway disabled");
        }
        Ok(())
    }

    pub async fn reload(&self, ids: &[String]) -> MCResult<()> {
        for id in ids {
            let config = self.load(id).await?;
            if config.enabled {
                self.post_command(ServiceCommand::Reload, &config).await?;
            }
        }
        Ok(())
    }

    /// Stop and remove gateways, returning how many were deleted
    pub async fn delete(&self, ids: &[String]) -> MCResult<usize> {
        let mut deleted = 0;
        for id in ids {
            let Some(config) = self.store.get(id).await? else {
                continue;
            };
            self.supervisor.cancel_job(id);
            self.post_command(ServiceCommand::Stop, &config).await?;
            self.store.delete(id).await?;
            deleted += 1;
        }
        Ok(deleted)
    }

    /// Persist `config` and reload the gateway when enabled, stop it otherwise
    pub async fn save_and_reload(&self, config: GatewayConfig) -> MCResult<()> {
        self.store.save(config.clone()).await?;
        let config = self.load(&config.id).await?;
        if config.enabled {
            self.post_command(ServiceCommand::Reload, &config).await
        } else {
            self.post_command(ServiceCommand::Stop, &config).await
        }
    }

    /// Ask the resource service to start every stored gateway
    pub async fn load_all(&self) -> MCResult<()> {
        let event = ServiceEvent::new(ResourceType::Gateway, ServiceCommand::LoadAll);
        self.bus
            .publish_json(&self.topics.service_resource(), &event)
            .await?;
        Ok(())
    }

    /// Buffered messages of one node, or of every node when `node_id` is `None`
    pub fn get_sleeping_queue(
        &self,
        gateway_id: &str,
        node_id: Option<&str>,
    ) -> MCResult<HashMap<String, Vec<Message>>> {
        let pipeline = self.running(gateway_id)?;
        Ok(match node_id {
            Some(node_id) => {
                HashMap::from([(node_id.to_string(), pipeline.get_node_sleeping_queue(node_id))])
            }
            None => pipeline.get_gateway_sleeping_queue(),
        })
    }

    pub fn clear_sleeping_queue(&self, gateway_id: &str, node_id: Option<&str>) -> MCResult<()> {
        let pipeline = self.running(gateway_id)?;
        match node_id {
            Some(node_id) => pipeline.clear_node_sleeping_queue(node_id),
            None => pipeline.clear_gateway_sleeping_queue(),
        }
        Ok(())
    }

    fn running(&self, gateway_id: &str) -> MCResult<Arc<GatewayPipeline>> {
        self.registry
            .get(gateway_id)
            .ok_or_else(|| MCError::NotFound(format!("gateway '{gateway_id}' is not running")))
    }
}
