use serde::{Deserialize, Serialize};

/// Settings read from the gateway's `provider` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualConfig {
    /// Reject every post, to exercise failed message queueing
    #[serde(default)]
    pub fail_post: bool,
    /// Refuse to start, to exercise the reconnect path
    #[serde(default)]
    pub fail_start: bool,
}
