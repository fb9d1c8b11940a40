use mc_gateway_models::{
    event::{ResourceType, ServiceCommand, ServiceEvent},
    MessageBus, MessageBusExt,
};
use mc_gateway_sdk::{State, StateReporter};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, warn};

/// Publishes adapter state reports as `updateState` events on the
/// resource service topic.
///
/// Reports are forwarded by a single task so they reach the bus in the
/// order they were made. [`BusStateReporter::close`] flushes them.
pub struct BusStateReporter {
    tx: Mutex<Option<mpsc::UnboundedSender<ServiceEvent>>>,
    tracker: TaskTracker,
}

impl BusStateReporter {
    /// Must be called from within a tokio runtime
    pub fn start(bus: Arc<dyn MessageBus>, topic: impl Into<String>) -> Self {
        let topic = topic.into();
        let (tx, mut rx) = mpsc::unbounded_channel::<ServiceEvent>();
        let tracker = TaskTracker::new();
        tracker.spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(e) = bus.publish_json(&topic, &event).await {
                    error!(gateway = %event.id, error = %e, "Failed to publish gateway state");
                }
            }
            debug!("State reporter stopped");
        });
        tracker.close();
        Self {
            tx: Mutex::new(Some(tx)),
            tracker,
        }
    }

    /// Stop accepting reports and wait until the queued ones are published
    pub async fn close(&self) {
        let tx = self.tx.lock().take();
        drop(tx);
        self.tracker.wait().await;
    }
}

impl StateReporter for BusStateReporter {
    fn report(&self, gateway_id: &str, state: State) {
        let event = match ServiceEvent::new(ResourceType::Gateway, ServiceCommand::UpdateState)
            .with_id(gateway_id)
            .with_data(&state)
        {
            Ok(event) => event,
            Err(e) => {
                error!(gateway = %gateway_id, error = %e, "Failed to encode gateway state");
                return;
            }
        };
        let sent = match self.tx.lock().as_ref() {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        };
        if !sent {
            warn!(gateway = %gateway_id, "State reporter stopped, report dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mc_gateway_common::MCMessageBus;
    use mc_gateway_models::{event::BusData, BusHandler};
    use mc_gateway_sdk::Status;

    #[tokio::test]
    async fn test_close_flushes_reports_in_order() {
        let bus = Arc::new(MCMessageBus::new());
        let seen = Arc::new(Mutex::new(Vec::<BusData>::new()));
        let sink = Arc::clone(&seen);
        let handler: BusHandler = Arc::new(move |data: BusData| sink.lock().push(data));
        bus.subscribe("states", handler).await.unwrap();

        let reporter = BusStateReporter::start(bus.clone(), "states");
        reporter.report("gw-1", State::up("connected"));
        reporter.report("gw-1", State::down("closed"));
        reporter.report("gw-2", State::error("port busy"));
        reporter.close().await;
        reporter.close().await;

        // Reports after close are dropped rather than published late.
        reporter.report("gw-1", State::up("again"));
        bus.close().await.unwrap();

        let statuses: Vec<(String, Status)> = seen
            .lock()
            .iter()
            .map(|d| {
                let event: ServiceEvent = d.load_data().unwrap();
                let state: State = event.load_data().unwrap();
                (event.id, state.status)
            })
            .collect();
        assert_eq!(
            statuses,
            vec![
                ("gw-1".to_string(), Status::Up),
                ("gw-1".to_string(), Status::Down),
                ("gw-2".to_string(), Status::Error),
            ]
        );
    }
}
