use mc_gateway_sdk::{
    AdapterContext, AdapterError, AdapterResult, RawMessage, RawMessageSink, State, StateReporter,
};
use parking_lot::Mutex;
use std::sync::{Arc, Once};
use tracing::Level;

/// Sink recording every raw message; refuses once `capacity` is reached
#[derive(Default)]
pub struct RecordingSink {
    pub capacity: Option<usize>,
    pub received: Mutex<Vec<RawMessage>>,
}

impl RawMessageSink for RecordingSink {
    fn try_send(&self, raw: RawMessage) -> AdapterResult<()> {
        let mut received = self.received.lock();
        if self.capacity.is_some_and(|cap| received.len() >= cap) {
            return Err(AdapterError::QueueFull);
        }
        received.push(raw);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingReporter {
    pub states: Mutex<Vec<(String, State)>>,
}

impl StateReporter for RecordingReporter {
    fn report(&self, gateway_id: &str, state: State) {
        self.states.lock().push((gateway_id.to_string(), state));
    }
}

static INIT_TRACING: Once = Once::new();

pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_target(false)
            .without_time()
            .try_init();
    });
}

pub fn build_context(
    settings: serde_json::Value,
) -> (AdapterContext, Arc<RecordingReporter>) {
    let reporter = Arc::new(RecordingReporter::default());
    let ctx = AdapterContext::new("virtual-1", settings, reporter.clone());
    (ctx, reporter)
}
