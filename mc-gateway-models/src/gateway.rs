use crate::constants::DEFAULT_RECONNECT_DELAY_MS;
use mc_gateway_sdk::State;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, time::Duration};

/// Key inside the provider blob naming the adapter type
pub const PROVIDER_TYPE_KEY: &str = "type";

/// Configuration of one gateway.
///
/// Only `state` changes at runtime, and only through the `updateState` path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub enabled: bool,
    /// Unset means the default delay, `0` disables automatic reconnect
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect_delay_ms: Option<u64>,
    /// Buffer messages the adapter failed to post into the sleeping queue
    #[serde(default)]
    pub queue_failed_message: bool,
    /// Adapter specific settings; `type` selects the adapter
    #[serde(default)]
    pub provider: serde_json::Value,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<State>,
}

impl GatewayConfig {
    pub fn new(id: impl Into<String>, provider_type: &str) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            provider: serde_json::json!({ PROVIDER_TYPE_KEY: provider_type }),
            ..Default::default()
        }
    }

    /// Effective reconnect delay, `None` when reconnect is disabled
    pub fn reconnect_delay(&self) -> Option<Duration> {
        match self.reconnect_delay_ms {
            None => Some(Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS)),
            Some(0) => None,
            Some(ms) => Some(Duration::from_millis(ms)),
        }
    }

    #[inline]
    pub fn provider_type(&self) -> Option<&str> {
        self.provider.get(PROVIDER_TYPE_KEY).and_then(|v| v.as_str())
    }

    #[inline]
    pub fn is_up(&self) -> bool {
        self.state.as_ref().is_some_and(|s| s.status.is_up())
    }
}
