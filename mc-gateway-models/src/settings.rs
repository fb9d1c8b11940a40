use crate::{
    constants::{
        DEFAULT_EVENT_QUEUE_CAPACITY, DEFAULT_MESSAGE_QUEUE_CAPACITY, DEFAULT_QUEUE_WORKERS,
        DEFAULT_RAW_MESSAGE_QUEUE_CAPACITY, DEFAULT_SLEEPING_QUEUE_LIMIT, DEFAULT_TOPIC_PREFIX,
        ENV_PREFIX,
    },
    filter::OwnershipFilter,
    gateway::GatewayConfig,
    topics::Topics,
};
use config::{Config, File};
use mc_gateway_error::MCResult;
use serde::{self, Deserialize};
use std::{collections::HashMap, ops::Deref, sync::Arc};

#[derive(Debug, Clone, Default)]
pub struct Settings(Arc<Inner>);

impl Deref for Settings {
    type Target = Inner;
    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl From<Inner> for Settings {
    fn from(inner: Inner) -> Self {
        Self(Arc::new(inner))
    }
}

impl Settings {
    pub fn new(config_path: &str) -> MCResult<Self> {
        let builder = Config::builder()
            .add_source(File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("gateway_service.ids"),
            );
        let inner: Inner = builder.build()?.try_deserialize()?;
        Ok(Self(Arc::new(inner)))
    }

    #[inline]
    pub fn topics(&self) -> Topics {
        Topics::new(self.bus.topic_prefix.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Inner {
    #[serde(default)]
    pub general: General,
    #[serde(default)]
    pub log: Log,
    #[serde(default)]
    pub bus: Bus,
    #[serde(default)]
    pub gateway_service: GatewayService,
    #[serde(default)]
    pub pipeline: Pipeline,
    #[serde(default)]
    pub resource_service: ResourceService,
    /// Gateways loaded into the store at boot
    #[serde(default)]
    pub gateways: Vec<GatewayConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct General {
    /// Directory relative paths (`./logs`) are resolved from.
    ///
    /// The process changes its working directory here at startup.
    /// Override with `MC__GENERAL__RUNTIME_DIR=/var/lib/mycontroller`.
    #[serde(default = "General::runtime_dir_default")]
    pub runtime_dir: String,
}

impl Default for General {
    fn default() -> Self {
        General {
            runtime_dir: General::runtime_dir_default(),
        }
    }
}

impl General {
    fn runtime_dir_default() -> String {
        ".".into()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    /// One of trace, debug, info, warn, error
    #[serde(default = "Log::level_default")]
    pub level: String,
}

impl Default for Log {
    fn default() -> Self {
        Log {
            level: Log::level_default(),
        }
    }
}

impl Log {
    fn level_default() -> String {
        "info".into()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Bus {
    #[serde(default = "Bus::topic_prefix_default")]
    pub topic_prefix: String,
}

impl Default for Bus {
    fn default() -> Self {
        Bus {
            topic_prefix: Bus::topic_prefix_default(),
        }
    }
}

impl Bus {
    fn topic_prefix_default() -> String {
        DEFAULT_TOPIC_PREFIX.into()
    }
}

/// Gateway command handling of this instance
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayService {
    /// Gateway ids owned by this instance
    #[serde(default)]
    pub ids: Vec<String>,
    /// Label selector; a gateway carrying every entry is owned
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default = "GatewayService::event_queue_capacity_default")]
    pub event_queue_capacity: usize,
}

impl Default for GatewayService {
    fn default() -> Self {
        GatewayService {
            ids: Vec::new(),
            labels: HashMap::new(),
            event_queue_capacity: GatewayService::event_queue_capacity_default(),
        }
    }
}

impl GatewayService {
    fn event_queue_capacity_default() -> usize {
        DEFAULT_EVENT_QUEUE_CAPACITY
    }

    #[inline]
    pub fn ownership(&self) -> OwnershipFilter {
        OwnershipFilter::new(self.ids.clone(), self.labels.clone())
    }
}

/// Per gateway pipeline sizing
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pipeline {
    #[serde(default = "Pipeline::message_queue_capacity_default")]
    pub message_queue_capacity: usize,
    #[serde(default = "Pipeline::workers_default")]
    pub message_workers: usize,
    #[serde(default = "Pipeline::raw_message_queue_capacity_default")]
    pub raw_message_queue_capacity: usize,
    #[serde(default = "Pipeline::workers_default")]
    pub raw_message_workers: usize,
    /// Per node capacity of the sleeping queue
    #[serde(default = "Pipeline::sleeping_queue_limit_default")]
    pub sleeping_queue_limit: usize,
}

impl Default for Pipeline {
    fn default() -> Self {
        Pipeline {
            message_queue_capacity: Pipeline::message_queue_capacity_default(),
            message_workers: Pipeline::workers_default(),
            raw_message_queue_capacity: Pipeline::raw_message_queue_capacity_default(),
            raw_message_workers: Pipeline::workers_default(),
            sleeping_queue_limit: Pipeline::sleeping_queue_limit_default(),
        }
    }
}

impl Pipeline {
    fn message_queue_capacity_default() -> usize {
        DEFAULT_MESSAGE_QUEUE_CAPACITY
    }

    fn raw_message_queue_capacity_default() -> usize {
        DEFAULT_RAW_MESSAGE_QUEUE_CAPACITY
    }

    fn workers_default() -> usize {
        DEFAULT_QUEUE_WORKERS
    }

    fn sleeping_queue_limit_default() -> usize {
        DEFAULT_SLEEPING_QUEUE_LIMIT
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ResourceService {
    #[serde(default = "ResourceService::event_queue_capacity_default")]
    pub event_queue_capacity: usize,
}

impl Default for ResourceService {
    fn default() -> Self {
        ResourceService {
            event_queue_capacity: ResourceService::event_queue_capacity_default(),
        }
    }
}

impl ResourceService {
    fn event_queue_capacity_default() -> usize {
        DEFAULT_EVENT_QUEUE_CAPACITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.pipeline.message_queue_capacity, 200);
        assert_eq!(settings.pipeline.raw_message_queue_capacity, 200);
        assert_eq!(settings.pipeline.message_workers, 1);
        assert_eq!(settings.pipeline.sleeping_queue_limit, 20);
        assert_eq!(settings.gateway_service.event_queue_capacity, 50);
        assert_eq!(settings.bus.topic_prefix, "mc");
        assert!(settings.gateways.is_empty());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let settings = Settings::new("/nonexistent/controller").unwrap();
        assert_eq!(settings.log.level, "info");
        assert_eq!(settings.general.runtime_dir, ".");
    }
}
