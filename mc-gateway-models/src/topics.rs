use crate::constants::DEFAULT_TOPIC_PREFIX;

/// Topic names, all rooted at a deployment wide prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    prefix: String,
}

impl Default for Topics {
    fn default() -> Self {
        Self::new(DEFAULT_TOPIC_PREFIX)
    }
}

impl Topics {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix: String = prefix.into();
        Self {
            prefix: prefix.trim_end_matches('.').to_string(),
        }
    }

    /// Gateway lifecycle commands
    pub fn service_gateway(&self) -> String {
        format!("{}.service.gateway", self.prefix)
    }

    /// Resource service: state updates, `get` queries and `loadAll`
    pub fn service_resource(&self) -> String {
        format!("{}.service.resource_server", self.prefix)
    }

    /// Outbound messages for one gateway
    pub fn post_to_provider(&self, gateway_id: &str) -> String {
        format!("{}.message.to_provider.{}", self.prefix, gateway_id)
    }

    /// Inbound messages from every gateway
    pub fn post_to_server(&self) -> String {
        format!("{}.message.to_server", self.prefix)
    }
}
