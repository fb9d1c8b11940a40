//! Runtime core of the MC gateway controller.
//!
//! - [`GatewayPipeline`]: per gateway message flow between the bus and a
//!   protocol adapter, including the sleeping node buffer
//! - [`GatewayRegistry`]: running pipelines by gateway id
//! - [`GatewayOrchestrator`]: gateway service commands to pipeline lifecycle
//! - [`GatewaySupervisor`]: state bookkeeping and automatic reconnect
//! - [`GatewayApi`]: administrative operations
//! - [`MCController`]: wires everything together
pub mod api;
pub mod controller;
pub mod orchestrator;
pub mod pipeline;
pub mod queue;
pub mod registry;
pub mod reporter;
pub mod supervisor;

pub use api::GatewayApi;
pub use controller::MCController;
pub use orchestrator::GatewayOrchestrator;
pub use pipeline::{GatewayPipeline, SleepingQueue};
pub use queue::{BoundedQueue, QueueConsumer};
pub use registry::GatewayRegistry;
pub use reporter::BusStateReporter;
pub use supervisor::GatewaySupervisor;
