mod common;

use bytes::Bytes;
use common::{eventually, gateway, record_topic, start_pipeline, MockControl, GARBAGE};
use mc_gateway_common::MCMessageBus;
use mc_gateway_core::GatewayRegistry;
use mc_gateway_error::MCError;
use mc_gateway_models::{topics::Topics, MessageBus, MessageBusExt};
use mc_gateway_sdk::{Message, MessageType, RawMessage, ACTION_AWAKE};
use std::sync::{atomic::Ordering, Arc};

fn data(node: &str, source: &str, value: &str) -> Message {
    Message::new("gw-1", node, source, MessageType::Data).with_payload("V_STATUS", value)
}

fn awake(node: &str) -> Message {
    Message::new("gw-1", node, "", MessageType::Action).with_payload(ACTION_AWAKE, "")
}

#[tokio::test]
async fn bus_messages_are_posted_in_order_with_timestamp() {
    let control = MockControl::new();
    let bus = Arc::new(MCMessageBus::new());
    let pipeline = start_pipeline(&control, &bus, gateway("gw-1")).await.unwrap();

    let topic = Topics::default().post_to_provider("gw-1");
    for i in 0..5 {
        bus.publish_json(&topic, &data("1", &i.to_string(), "1"))
            .await
            .unwrap();
    }
    eventually(|| control.posted().len() == 5).await;

    let posted = control.posted();
    let sources: Vec<&str> = posted.iter().map(|m| m.source_id.as_str()).collect();
    assert_eq!(sources, vec!["0", "1", "2", "3", "4"]);
    assert!(posted.iter().all(|m| m.timestamp.is_some()));

    pipeline.stop().await.unwrap();
}

#[tokio::test]
async fn undecodable_bus_payload_is_dropped() {
    let control = MockControl::new();
    let bus = Arc::new(MCMessageBus::new());
    let pipeline = start_pipeline(&control, &bus, gateway("gw-1")).await.unwrap();

    let topic = Topics::default().post_to_provider("gw-1");
    bus.publish(&topic, Bytes::from_static(b"{not json")).await.unwrap();
    bus.publish_json(&topic, &data("1", "1", "1")).await.unwrap();
    eventually(|| control.posted().len() == 1).await;

    pipeline.stop().await.unwrap();
}

#[tokio::test]
async fn awake_flushes_sleeping_node_in_fifo_order() {
    let control = MockControl::new();
    let bus = Arc::new(MCMessageBus::new());
    let pipeline = start_pipeline(&control, &bus, gateway("gw-1")).await.unwrap();

    for i in 0..3 {
        pipeline
            .post_message(data("7", &i.to_string(), "1").sleeping())
            .unwrap();
    }
    pipeline.post_message(data("8", "0", "1").sleeping()).unwrap();
    eventually(|| pipeline.get_node_sleeping_queue("7").len() == 3).await;
    assert!(control.posted().is_empty());

    pipeline.post_message(awake("7")).unwrap();
    eventually(|| control.posted().len() == 3).await;

    let posted = control.posted();
    let sources: Vec<&str> = posted.iter().map(|m| m.source_id.as_str()).collect();
    assert_eq!(sources, vec!["0", "1", "2"]);
    assert!(posted.iter().all(|m| !m.is_awake_action()));
    assert!(pipeline.get_node_sleeping_queue("7").is_empty());
    assert_eq!(pipeline.get_node_sleeping_queue("8").len(), 1);

    pipeline.stop().await.unwrap();
}

#[tokio::test]
async fn sleeping_queue_is_capped_per_node() {
    let control = MockControl::new();
    let bus = Arc::new(MCMessageBus::new());
    let pipeline = start_pipeline(&control, &bus, gateway("gw-1")).await.unwrap();

    for i in 0..25 {
        pipeline
            .post_message(data("7", &i.to_string(), "1").sleeping())
            .unwrap();
    }
    eventually(|| {
        pipeline
            .get_node_sleeping_queue("7")
            .last()
            .is_some_and(|m| m.source_id == "24")
    })
    .await;

    let buffered = pipeline.get_node_sleeping_queue("7");
    assert_eq!(buffered.len(), 20);
    assert_eq!(buffered.first().unwrap().source_id, "5");
    assert_eq!(buffered.last().unwrap().source_id, "24");

    pipeline.stop().await.unwrap();
}

#[tokio::test]
async fn duplicate_identity_is_replaced() {
    let control = MockControl::new();
    let bus = Arc::new(MCMessageBus::new());
    let pipeline = start_pipeline(&control, &bus, gateway("gw-1")).await.unwrap();

    pipeline.post_message(data("7", "1", "on").sleeping()).unwrap();
    pipeline.post_message(data("7", "2", "on").sleeping()).unwrap();
    pipeline.post_message(data("7", "1", "off").sleeping()).unwrap();
    eventually(|| {
        pipeline
            .get_node_sleeping_queue("7")
            .last()
            .is_some_and(|m| m.payloads[0].value == "off")
    })
    .await;

    let buffered = pipeline.get_node_sleeping_queue("7");
    assert_eq!(buffered.len(), 2);
    assert_eq!(buffered[0].source_id, "2");
    assert_eq!(buffered[1].source_id, "1");

    pipeline.clear_node_sleeping_queue("7");
    assert!(pipeline.get_gateway_sleeping_queue().is_empty());
    pipeline.stop().await.unwrap();
}

#[tokio::test]
async fn failed_post_is_buffered_only_when_requested() {
    let control = MockControl::new();
    control.fail_post.store(true, Ordering::SeqCst);
    let bus = Arc::new(MCMessageBus::new());

    let mut config = gateway("gw-1");
    config.queue_failed_message = true;
    let pipeline = start_pipeline(&control, &bus, config).await.unwrap();
    pipeline.post_message(data("3", "1", "1")).unwrap();
    eventually(|| pipeline.get_node_sleeping_queue("3").len() == 1).await;
    pipeline.stop().await.unwrap();

    let pipeline = start_pipeline(&control, &bus, gateway("gw-2")).await.unwrap();
    pipeline.post_message(data("3", "1", "1")).unwrap();
    pipeline.post_message(awake("9")).unwrap();
    pipeline.stop().await.unwrap();
    assert!(pipeline.get_gateway_sleeping_queue().is_empty());
}

#[tokio::test]
async fn saturated_outbound_queue_refuses_the_201st_message() {
    let control = MockControl::gated();
    let bus = Arc::new(MCMessageBus::new());
    let pipeline = start_pipeline(&control, &bus, gateway("gw-1")).await.unwrap();

    for i in 0..200 {
        pipeline.post_message(data("1", &i.to_string(), "1")).unwrap();
    }
    let err = pipeline.post_message(data("1", "200", "1")).unwrap_err();
    assert!(matches!(err, MCError::QueueFull(_)));

    control.gate.add_permits(200);
    eventually(|| control.posted().len() == 200).await;
    let posted = control.posted();
    for (i, message) in posted.iter().enumerate() {
        assert_eq!(message.source_id, i.to_string());
    }

    pipeline.stop().await.unwrap();
}

#[tokio::test]
async fn parsed_messages_get_the_gateway_id() {
    let control = MockControl::new();
    *control.parsed.lock() = vec![
        Message::new("", "1", "1", MessageType::Data),
        Message::new("", "2", "1", MessageType::Presentation),
    ];
    let bus = Arc::new(MCMessageBus::new());
    let seen = record_topic(&bus, &Topics::default().post_to_server()).await;
    let pipeline = start_pipeline(&control, &bus, gateway("gw-1")).await.unwrap();

    control
        .receive(RawMessage::new(true, Bytes::from_static(b"1;1;1;0;2;1")))
        .unwrap();
    eventually(|| seen.lock().len() == 2).await;

    let messages: Vec<Message> = seen
        .lock()
        .iter()
        .map(|d| d.load_data().unwrap())
        .collect();
    assert!(messages.iter().all(|m| m.gateway_id == "gw-1"));
    assert_eq!(messages[0].node_id, "1");
    assert_eq!(messages[1].node_id, "2");

    pipeline.stop().await.unwrap();
}

#[tokio::test]
async fn parse_failure_drops_the_raw_message() {
    let control = MockControl::new();
    *control.parsed.lock() = vec![Message::new("", "1", "1", MessageType::Data)];
    let bus = Arc::new(MCMessageBus::new());
    let seen = record_topic(&bus, &Topics::default().post_to_server()).await;
    let pipeline = start_pipeline(&control, &bus, gateway("gw-1")).await.unwrap();

    control
        .receive(RawMessage::new(true, Bytes::from_static(GARBAGE)))
        .unwrap();
    control
        .receive(RawMessage::new(true, Bytes::from_static(b"0;0;3;0;14;")))
        .unwrap();
    eventually(|| seen.lock().len() == 1).await;

    pipeline.stop().await.unwrap();
    assert_eq!(seen.lock().len(), 1);
}

#[tokio::test]
async fn adapter_start_failure_leaves_nothing_behind() {
    let control = MockControl::new();
    control.fail_start.store(true, Ordering::SeqCst);
    let bus = Arc::new(MCMessageBus::new());

    let err = start_pipeline(&control, &bus, gateway("gw-1"))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, MCError::AdapterError(_)));
    assert_eq!(
        bus.subscriber_count(&Topics::default().post_to_provider("gw-1")),
        0
    );
}

#[tokio::test]
async fn stop_closes_adapter_and_unsubscribes() {
    let control = MockControl::new();
    let bus = Arc::new(MCMessageBus::new());
    let pipeline = start_pipeline(&control, &bus, gateway("gw-1")).await.unwrap();
    let topic = Topics::default().post_to_provider("gw-1");
    assert_eq!(bus.subscriber_count(&topic), 1);
    assert_eq!(pipeline.adapter_name(), common::MOCK_ADAPTER_TYPE);

    pipeline.stop().await.unwrap();
    assert_eq!(control.closes.load(Ordering::SeqCst), 1);
    assert_eq!(bus.subscriber_count(&topic), 0);
    assert!(pipeline.post_message(data("1", "1", "1")).is_err());
}

#[tokio::test]
async fn teardown_completes_when_adapter_close_fails() {
    let control = MockControl::new();
    let bus = Arc::new(MCMessageBus::new());
    let pipeline = start_pipeline(&control, &bus, gateway("gw-1")).await.unwrap();
    let topic = Topics::default().post_to_provider("gw-1");
    control.fail_close.store(true, Ordering::SeqCst);

    let err = pipeline.stop().await.unwrap_err();
    assert!(matches!(err, MCError::AdapterError(_)));
    assert_eq!(control.closes.load(Ordering::SeqCst), 1);
    assert_eq!(bus.subscriber_count(&topic), 0);
    assert!(pipeline.post_message(data("1", "1", "1")).is_err());

    // Late bus traffic for the stopped gateway reaches nobody.
    bus.publish_json(&topic, &data("1", "2", "1")).await.unwrap();
    assert!(control.posted().is_empty());
}

#[tokio::test]
async fn registry_holds_one_pipeline_per_gateway() {
    let control = MockControl::new();
    let bus = Arc::new(MCMessageBus::new());
    let registry = GatewayRegistry::new();

    let first = Arc::new(start_pipeline(&control, &bus, gateway("gw-1")).await.unwrap());
    let second = Arc::new(start_pipeline(&control, &bus, gateway("gw-1")).await.unwrap());
    registry.add(Arc::clone(&first)).unwrap();
    assert!(matches!(
        registry.add(Arc::clone(&second)),
        Err(MCError::AlreadyRunning(id)) if id == "gw-1"
    ));
    assert!(Arc::ptr_eq(&registry.get("gw-1").unwrap(), &first));
    assert_eq!(registry.list_ids(), vec!["gw-1".to_string()]);

    assert!(registry.remove("gw-1").is_some());
    assert!(registry.remove("gw-1").is_none());
    assert!(registry.is_empty());

    first.stop().await.unwrap();
    second.stop().await.unwrap();
}
