/// Config file looked up when no `--config` / `MC_CONFIG` is given
pub const DEFAULT_CONFIG_FILE_NAME: &str = "controller.toml";
/// Environment variable prefix, e.g. `MC__PIPELINE__SLEEPING_QUEUE_LIMIT=50`
pub const ENV_PREFIX: &str = "MC";

pub const LOG_DIR: &str = "logs";
pub const LOG_FILE_NAME: &str = "mc-gateway.log";

pub const DEFAULT_TOPIC_PREFIX: &str = "mc";

/// Reconnect delay applied when a gateway does not configure one
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 15_000;

pub const DEFAULT_MESSAGE_QUEUE_CAPACITY: usize = 200;
pub const DEFAULT_RAW_MESSAGE_QUEUE_CAPACITY: usize = 200;
pub const DEFAULT_QUEUE_WORKERS: usize = 1;
pub const DEFAULT_SLEEPING_QUEUE_LIMIT: usize = 20;
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 50;
