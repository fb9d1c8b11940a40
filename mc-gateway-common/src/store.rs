use async_trait::async_trait;
use dashmap::DashMap;
use mc_gateway_error::{MCError, MCResult};
use mc_gateway_models::{filter::labels_match, gateway::GatewayConfig, GatewayStore};
use mc_gateway_sdk::State;
use std::collections::HashMap;

/// In-memory gateway store seeded from settings at boot
#[derive(Debug, Default)]
pub struct MCGatewayStore {
    gateways: DashMap<String, GatewayConfig>,
}

impl MCGatewayStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gateways(gateways: impl IntoIterator<Item = GatewayConfig>) -> Self {
        let store = Self::new();
        for gateway in gateways {
            store.gateways.insert(gateway.id.clone(), gateway);
        }
        store
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.gateways.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.gateways.is_empty()
    }
}

#[async_trait]
impl GatewayStore for MCGatewayStore {
    async fn get(&self, id: &str) -> MCResult<Option<GatewayConfig>> {
        Ok(self.gateways.get(id).map(|g| g.value().clone()))
    }

    async fn list(&self, labels: &HashMap<String, String>) -> MCResult<Vec<GatewayConfig>> {
        let mut gateways: Vec<GatewayConfig> = self
            .gateways
            .iter()
            .filter(|g| labels_match(labels, &g.labels))
            .map(|g| g.value().clone())
            .collect();
        gateways.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(gateways)
    }

    async fn save(&self, mut config: GatewayConfig) -> MCResult<()> {
        if config.id.trim().is_empty() {
            return Err(MCError::ConfigurationError("gateway id is empty".into()));
        }
        if let Some(existing) = self.gateways.get(&config.id) {
            config.state = existing.state.clone();
        }
        self.gateways.insert(config.id.clone(), config);
        Ok(())
    }

    async fn set_state(&self, id: &str, state: State) -> MCResult<()> {
        let mut gateway = self
            .gateways
            .get_mut(id)
            .ok_or_else(|| MCError::NotFound(format!("gateway '{id}'")))?;
        gateway.state = Some(state);
        Ok(())
    }

    async fn delete(&self, id: &str) -> MCResult<()> {
        let _ = self.gateways.remove(id);
        Ok(())
    }
}
