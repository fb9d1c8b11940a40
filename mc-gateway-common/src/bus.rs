use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use mc_gateway_error::{bus::BusError, BusResult};
use mc_gateway_models::{event::BusData, BusHandler, MessageBus, SubscriptionId};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
};
use tokio::sync::mpsc;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

/// One delivery lane; dropping it ends the dispatch task after it drains
struct Subscription {
    id: SubscriptionId,
    tx: mpsc::UnboundedSender<BusData>,
}

#[derive(Default)]
struct QueueGroup {
    members: Vec<Subscription>,
    next: AtomicUsize,
}

#[derive(Default)]
struct TopicSubscribers {
    plain: Vec<Subscription>,
    groups: HashMap<String, QueueGroup>,
}

impl TopicSubscribers {
    fn is_empty(&self) -> bool {
        self.plain.is_empty() && self.groups.is_empty()
    }
}

/// In-process bus.
///
/// Every subscription owns an unbounded channel drained by its own task, so
/// a handler sees events in publish order and a slow handler never stalls
/// the publisher or other subscribers.
pub struct MCMessageBus {
    topics: DashMap<String, TopicSubscribers>,
    next_id: AtomicU64,
    closed: AtomicBool,
    tracker: TaskTracker,
}

impl Default for MCMessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MCMessageBus {
    pub fn new() -> Self {
        Self {
            topics: DashMap::new(),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
            tracker: TaskTracker::new(),
        }
    }

    fn ensure_open(&self) -> BusResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BusError::Closed);
        }
        Ok(())
    }

    fn spawn_subscription(&self, handler: BusHandler) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, mut rx) = mpsc::unbounded_channel::<BusData>();
        self.tracker.spawn(async move {
            while let Some(data) = rx.recv().await {
                handler(data);
            }
        });
        Subscription { id, tx }
    }

    /// Number of live subscriptions on `topic`, queue group members included
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .get(topic)
            .map(|t| t.plain.len() + t.groups.values().map(|g| g.members.len()).sum::<usize>())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MessageBus for MCMessageBus {
    async fn publish(&self, topic: &str, data: Bytes) -> BusResult<()> {
        self.ensure_open()?;

        let Some(subscribers) = self.topics.get(topic) else {
            debug!(topic = %topic, "No subscriber, event discarded");
            return Ok(());
        };

        let event = BusData::new(topic, data);
        for sub in &subscribers.plain {
            if sub.tx.send(event.clone()).is_err() {
                warn!(topic = %topic, id = sub.id, "Subscriber gone, event dropped");
            }
        }
        for (name, group) in &subscribers.groups {
            if group.members.is_empty() {
                continue;
            }
            let index = group.next.fetch_add(1, Ordering::Relaxed) % group.members.len();
            if group.members[index].tx.send(event.clone()).is_err() {
                warn!(topic = %topic, group = %name, "Queue member gone, event dropped");
            }
        }
        Ok(())
    }

    async fn subscribe(&self, topic: &str, handler: BusHandler) -> BusResult<SubscriptionId> {
        self.ensure_open()?;
        let sub = self.spawn_subscription(handler);
        let id = sub.id;
        self.topics.entry(topic.to_string()).or_default().plain.push(sub);
        debug!(topic = %topic, id, "Subscribed");
        Ok(id)
    }

    async fn unsubscribe(&self, topic: &str, id: SubscriptionId) -> BusResult<()> {
        let not_found = || BusError::SubscriptionNotFound {
            topic: topic.to_string(),
            id,
        };
        let mut subscribers = self.topics.get_mut(topic).ok_or_else(not_found)?;
        let before = subscribers.plain.len();
        subscribers.plain.retain(|s| s.id != id);
        if subscribers.plain.len() == before {
            return Err(not_found());
        }
        let empty = subscribers.is_empty();
        drop(subscribers);
        if empty {
            self.topics.remove_if(topic, |_, t| t.is_empty());
        }
        debug!(topic = %topic, id, "Unsubscribed");
        Ok(())
    }

    async fn queue_subscribe(
        &self,
        topic: &str,
        group: &str,
        handler: BusHandler,
    ) -> BusResult<SubscriptionId> {
        self.ensure_open()?;
        let sub = self.spawn_subscription(handler);
        let id = sub.id;
        self.topics
            .entry(topic.to_string())
            .or_default()
            .groups
            .entry(group.to_string())
            .or_default()
            .members
            .push(sub);
        debug!(topic = %topic, group = %group, id, "Queue subscribed");
        Ok(id)
    }

    async fn queue_unsubscribe(
        &self,
        topic: &str,
        group: &str,
        id: SubscriptionId,
    ) -> BusResult<()> {
        let not_found = || BusError::SubscriptionNotFound {
            topic: topic.to_string(),
            id,
        };
        let mut subscribers = self.topics.get_mut(topic).ok_or_else(not_found)?;
        let members = &mut subscribers
            .groups
            .get_mut(group)
            .ok_or_else(not_found)?
            .members;
        let before = members.len();
        members.retain(|s| s.id != id);
        if members.len() == before {
            return Err(not_found());
        }
        if members.is_empty() {
            subscribers.groups.remove(group);
        }
        let empty = subscribers.is_empty();
        drop(subscribers);
        if empty {
            self.topics.remove_if(topic, |_, t| t.is_empty());
        }
        Ok(())
    }

    async fn unsubscribe_all(&self, topic: &str) -> BusResult<()> {
        let _ = self.topics.remove(topic);
        debug!(topic = %topic, "Removed all subscriptions");
        Ok(())
    }

    async fn close(&self) -> BusResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.topics.clear();
        self.tracker.close();
        self.tracker.wait().await;
        debug!("Message bus closed");
        Ok(())
    }
}
