pub mod constants;
pub mod event;
pub mod filter;
pub mod gateway;
pub mod settings;
pub mod topics;

use async_trait::async_trait;
use bytes::Bytes;
use event::BusData;
use gateway::GatewayConfig;
use mc_gateway_error::{bus::BusError, BusResult, MCResult};
use mc_gateway_sdk::State;
use serde::Serialize;
use std::{collections::HashMap, sync::Arc};

/// Handle returned by a subscription, used to unsubscribe later
pub type SubscriptionId = u64;

/// Subscriber callback; invoked in publish order for one subscription
pub type BusHandler = Arc<dyn Fn(BusData) + Send + Sync>;

/// Topic based publish/subscribe transport.
///
/// Delivery to local subscribers is asynchronous and best effort. Handlers
/// of one subscription observe events in publish order; nothing is promised
/// across topics. Failures surface to the caller and are never retried here.
#[async_trait]
pub trait MessageBus: Send + Sync + 'static {
    async fn publish(&self, topic: &str, data: Bytes) -> BusResult<()>;

    async fn subscribe(&self, topic: &str, handler: BusHandler) -> BusResult<SubscriptionId>;

    async fn unsubscribe(&self, topic: &str, id: SubscriptionId) -> BusResult<()>;

    /// Competing consumer subscription: each event goes to one member of `group`
    async fn queue_subscribe(
        &self,
        topic: &str,
        group: &str,
        handler: BusHandler,
    ) -> BusResult<SubscriptionId>;

    async fn queue_unsubscribe(&self, topic: &str, group: &str, id: SubscriptionId)
        -> BusResult<()>;

    /// Drop every subscription on `topic`
    async fn unsubscribe_all(&self, topic: &str) -> BusResult<()>;

    async fn close(&self) -> BusResult<()>;
}

#[async_trait]
pub trait MessageBusExt: MessageBus {
    /// Serialize `value` as JSON and publish it
    async fn publish_json<T: Serialize + Sync>(&self, topic: &str, value: &T) -> BusResult<()> {
        let data = serde_json::to_vec(value).map_err(|e| BusError::Encode {
            topic: topic.to_string(),
            reason: e.to_string(),
        })?;
        self.publish(topic, Bytes::from(data)).await
    }
}

impl<T: MessageBus + ?Sized> MessageBusExt for T {}

/// Gateway configuration storage, the only writer of gateway state
#[async_trait]
pub trait GatewayStore: Send + Sync + 'static {
    async fn get(&self, id: &str) -> MCResult<Option<GatewayConfig>>;

    /// Gateways whose labels satisfy `labels`; an empty selector lists all
    async fn list(&self, labels: &HashMap<String, String>) -> MCResult<Vec<GatewayConfig>>;

    /// Insert or replace, keeping the stored state
    async fn save(&self, config: GatewayConfig) -> MCResult<()>;

    async fn set_state(&self, id: &str, state: State) -> MCResult<()>;

    async fn delete(&self, id: &str) -> MCResult<()>;
}
