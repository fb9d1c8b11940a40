use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Payload key carried by the action a sleeping node sends when it wakes up.
pub const ACTION_AWAKE: &str = "awake";

/// Kind of a [`Message`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageType {
    /// Field value update (set/report)
    #[default]
    Data,
    /// Request for the current field value
    Request,
    /// Node or source presentation
    Presentation,
    /// Node level action (reboot, heartbeat, awake, ...)
    Action,
    /// Protocol specific event
    Event,
}

impl MessageType {
    fn as_str(&self) -> &'static str {
        match self {
            MessageType::Data => "data",
            MessageType::Request => "request",
            MessageType::Presentation => "presentation",
            MessageType::Action => "action",
            MessageType::Event => "event",
        }
    }
}

/// One key/value entry of a [`Message`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl Payload {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            metadata: HashMap::new(),
        }
    }
}

/// Envelope exchanged between the core bus and a protocol adapter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default)]
    pub gateway_id: String,
    #[serde(default)]
    pub node_id: String,
    #[serde(default)]
    pub source_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_id: Option<String>,
    #[serde(default)]
    pub r#type: MessageType,
    #[serde(default)]
    pub payloads: Vec<Payload>,
    #[serde(default)]
    pub is_ack: bool,
    #[serde(default)]
    pub is_received: bool,
    #[serde(default)]
    pub is_sleep_node: bool,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    /// Unset until the producer or the outbound consumer stamps it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Message {
    pub fn new(
        gateway_id: impl Into<String>,
        node_id: impl Into<String>,
        source_id: impl Into<String>,
        r#type: MessageType,
    ) -> Self {
        Self {
            gateway_id: gateway_id.into(),
            node_id: node_id.into(),
            source_id: source_id.into(),
            r#type,
            ..Default::default()
        }
    }

    /// Builder helper appending a payload entry
    pub fn with_payload(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.payloads.push(Payload::new(key, value));
        self
    }

    /// Builder helper setting the field id
    pub fn with_field(mut self, field_id: impl Into<String>) -> Self {
        self.field_id = Some(field_id.into());
        self
    }

    /// Builder helper marking the destination node as a sleeping node
    pub fn sleeping(mut self) -> Self {
        self.is_sleep_node = true;
        self
    }

    /// True for the action a sleeping node emits right after it wakes up
    #[inline]
    pub fn is_awake_action(&self) -> bool {
        self.r#type == MessageType::Action
            && self
                .payloads
                .first()
                .is_some_and(|p| p.key == ACTION_AWAKE)
    }

    /// Logical identity used to deduplicate buffered messages.
    ///
    /// Two messages addressing the same gateway/node/source/field with the same
    /// type and payload keys share an identity; payload values and the
    /// timestamp do not take part, so a newer value supersedes an older one.
    pub fn identity(&self) -> String {
        const SEP: char = '\u{1f}';
        let mut id = String::with_capacity(
            self.gateway_id.len() + self.node_id.len() + self.source_id.len() + 32,
        );
        id.push_str(&self.gateway_id);
        id.push(SEP);
        id.push_str(&self.node_id);
        id.push(SEP);
        id.push_str(&self.source_id);
        id.push(SEP);
        id.push_str(self.field_id.as_deref().unwrap_or_default());
        id.push(SEP);
        id.push_str(self.r#type.as_str());
        for payload in &self.payloads {
            id.push(SEP);
            id.push_str(&payload.key);
        }
        id
    }
}

/// Adapter specific bytes received from the device network, prior to parsing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessage {
    #[serde(default)]
    pub is_received: bool,
    pub data: Bytes,
    pub timestamp: DateTime<Utc>,
    /// Minimal routing hint (topic, node address, ...) chosen by the adapter
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub others: HashMap<String, serde_json::Value>,
}

impl RawMessage {
    pub fn new(is_received: bool, data: impl Into<Bytes>) -> Self {
        Self {
            is_received,
            data: data.into(),
            timestamp: Utc::now(),
            others: HashMap::new(),
        }
    }

    /// Builder helper attaching a routing hint
    pub fn with_hint(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.others.insert(key.into(), value);
        self
    }
}
