use mc_gateway_sdk::Message;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Per node buffer of messages waiting for a sleeping node to wake up.
///
/// Buffering is deduplicating (a newer message with the same identity
/// replaces the buffered one and moves to the tail) and bounded per node.
/// Past the limit the oldest entries are discarded.
#[derive(Debug)]
pub struct SleepingQueue {
    limit: usize,
    nodes: Mutex<HashMap<String, VecDeque<Message>>>,
}

impl SleepingQueue {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            nodes: Mutex::new(HashMap::new()),
        }
    }

    #[inline]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Buffer `message` for its node and return the node's queue length
    pub fn add(&self, message: Message) -> usize {
        let identity = message.identity();
        let node_id = message.node_id.clone();

        let mut nodes = self.nodes.lock();
        let queue = nodes.entry(node_id.clone()).or_default();
        queue.retain(|m| m.identity() != identity);
        queue.push_back(message);

        let mut dropped = 0usize;
        while queue.len() > self.limit {
            queue.pop_front();
            dropped += 1;
        }
        let len = queue.len();
        if len == 0 {
            nodes.remove(&node_id);
        }
        drop(nodes);

        if dropped > 0 {
            debug!(node = %node_id, dropped, "Sleeping queue full, dropped oldest entries");
        }
        len
    }

    /// Remove and return the node's buffered messages, oldest first
    pub fn take_node(&self, node_id: &str) -> Vec<Message> {
        self.nodes
            .lock()
            .remove(node_id)
            .map(Vec::from)
            .unwrap_or_default()
    }

    /// Copy of the node's buffered messages
    pub fn node(&self, node_id: &str) -> Vec<Message> {
        self.nodes
            .lock()
            .get(node_id)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Copy of every node's buffered messages
    pub fn all(&self) -> HashMap<String, Vec<Message>> {
        self.nodes
            .lock()
            .iter()
            .map(|(node, q)| (node.clone(), q.iter().cloned().collect()))
            .collect()
    }

    pub fn clear_node(&self, node_id: &str) {
        self.nodes.lock().remove(node_id);
    }

    pub fn clear(&self) {
        self.nodes.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mc_gateway_sdk::MessageType;

    fn msg(node: &str, source: &str, value: &str) -> Message {
        Message::new("gw", node, source, MessageType::Data)
            .with_payload("V_STATUS", value)
            .sleeping()
    }

    #[test]
    fn test_never_exceeds_limit_and_keeps_newest() {
        let queue = SleepingQueue::new(20);
        assert_eq!(queue.limit(), 20);
        for i in 0..25 {
            let len = queue.add(msg("7", &i.to_string(), "1"));
            assert!(len <= 20);
        }
        let buffered = queue.node("7");
        assert_eq!(buffered.len(), 20);
        assert_eq!(buffered.first().unwrap().source_id, "5");
        assert_eq!(buffered.last().unwrap().source_id, "24");
    }

    #[test]
    fn test_duplicate_identity_replaced_once() {
        let queue = SleepingQueue::new(20);
        queue.add(msg("7", "1", "on"));
        queue.add(msg("7", "2", "on"));
        assert_eq!(queue.add(msg("7", "1", "off")), 2);

        let buffered = queue.node("7");
        assert_eq!(buffered[0].source_id, "2");
        assert_eq!(buffered[1].source_id, "1");
        assert_eq!(buffered[1].payloads[0].value, "off");
    }

    #[test]
    fn test_take_empties_node_only() {
        let queue = SleepingQueue::new(5);
        queue.add(msg("7", "1", "on"));
        queue.add(msg("8", "1", "on"));

        let taken = queue.take_node("7");
        assert_eq!(taken.len(), 1);
        assert!(queue.node("7").is_empty());
        assert_eq!(queue.all().len(), 1);
        assert!(queue.take_node("7").is_empty());
    }

    #[test]
    fn test_copies_are_detached() {
        let queue = SleepingQueue::new(5);
        queue.add(msg("7", "1", "on"));
        let mut copy = queue.node("7");
        copy[0].payloads[0].value = "mutated".into();
        copy.clear();
        assert_eq!(queue.node("7")[0].payloads[0].value, "on");

        queue.clear();
        assert!(queue.all().is_empty());
    }
}
