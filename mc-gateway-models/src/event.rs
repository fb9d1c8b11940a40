use bytes::Bytes;
use mc_gateway_error::{MCError, MCResult};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    collections::HashMap,
    fmt::{self, Display, Formatter},
};

/// Resource kind a [`ServiceEvent`] addresses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceType {
    #[default]
    Gateway,
    Node,
    Task,
    Handler,
    Scheduler,
    Firmware,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ServiceCommand {
    Start,
    Stop,
    Reload,
    Get,
    UpdateState,
    LoadAll,
    UnloadAll,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Display for ServiceCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServiceCommand::Start => "start",
            ServiceCommand::Stop => "stop",
            ServiceCommand::Reload => "reload",
            ServiceCommand::Get => "get",
            ServiceCommand::UpdateState => "updateState",
            ServiceCommand::LoadAll => "loadAll",
            ServiceCommand::UnloadAll => "unloadAll",
            ServiceCommand::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Command/event envelope carried on the service topics.
///
/// `data` is an opaque serialized payload whose schema depends on the
/// type/command pair (a gateway config for start/reload, a state for
/// updateState). Replies are sent to `reply_topic` when one is given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEvent {
    #[serde(default)]
    pub r#type: ResourceType,
    #[serde(default)]
    pub command: ServiceCommand,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub data: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reply_topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_command: Option<ServiceCommand>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}

impl ServiceEvent {
    pub fn new(r#type: ResourceType, command: ServiceCommand) -> Self {
        Self {
            r#type,
            command,
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_reply(mut self, topic: impl Into<String>, command: ServiceCommand) -> Self {
        self.reply_topic = topic.into();
        self.reply_command = Some(command);
        self
    }

    /// Serialize `value` into the opaque data field
    pub fn set_data<T: Serialize>(&mut self, value: &T) -> MCResult<()> {
        self.data = serde_json::to_string(value)?;
        Ok(())
    }

    pub fn with_data<T: Serialize>(mut self, value: &T) -> MCResult<Self> {
        self.set_data(value)?;
        Ok(self)
    }

    #[inline]
    pub fn has_data(&self) -> bool {
        !self.data.trim().is_empty()
    }

    /// Decode the opaque data field
    pub fn load_data<T: DeserializeOwned>(&self) -> MCResult<T> {
        if !self.has_data() {
            return Err(MCError::DeserializationError(format!(
                "'{}' event carries no data",
                self.command
            )));
        }
        serde_json::from_str(&self.data).map_err(|e| MCError::DeserializationError(e.to_string()))
    }
}

/// Payload delivered to bus subscribers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusData {
    pub topic: String,
    pub data: Bytes,
}

impl BusData {
    pub fn new(topic: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            data: data.into(),
        }
    }

    /// Decode the JSON body
    pub fn load_data<T: DeserializeOwned>(&self) -> MCResult<T> {
        serde_json::from_slice(&self.data).map_err(|e| {
            MCError::DeserializationError(format!("topic '{}': {}", self.topic, e))
        })
    }
}
