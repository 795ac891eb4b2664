use std::time::Duration;

use scriptline::event_bus::{BridgeEvent, EventBus, EventHub, MemorySink};
use scriptline::notify::Notification;

#[test]
fn hub_fans_out_to_all_subscribers() {
    let hub = EventHub::with_default_capacity();
    let mut a = hub.subscribe();
    let mut b = hub.subscribe();

    let delivered = hub.publish(BridgeEvent::jump_to_state("s1"));
    assert_eq!(delivered, 2);
    assert_eq!(a.try_recv().unwrap().label(), "jump-to-state");
    assert_eq!(b.try_recv().unwrap().label(), "jump-to-state");
}

#[test]
fn publish_without_subscribers_is_not_an_error() {
    let hub = EventHub::with_default_capacity();
    assert_eq!(hub.publish(BridgeEvent::verification_complete("m1")), 0);
}

#[tokio::test]
async fn stream_timeout_returns_none_when_quiet() {
    let hub = EventHub::with_default_capacity();
    let mut stream = hub.subscribe();
    assert!(
        stream
            .next_timeout(Duration::from_millis(20))
            .await
            .is_none()
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn bus_mirrors_events_into_sinks() {
    let sink = MemorySink::new();
    let bus = EventBus::with_sink(sink.clone());
    bus.listen_for_events();
    // Second call is a no-op.
    bus.listen_for_events();

    let sender = bus.sender();
    sender
        .send(BridgeEvent::Notification {
            notification: Notification::warning("heads up", "check the line"),
        })
        .unwrap();
    sender
        .send(BridgeEvent::verification_complete("m1"))
        .unwrap();

    // The listener drains asynchronously.
    for _ in 0..100 {
        if sink.snapshot().len() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let seen = sink.snapshot();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].label(), "notification");
    assert_eq!(seen[1].label(), "verification-complete");

    bus.stop_listener().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn stopped_listener_stops_draining() {
    let sink = MemorySink::new();
    let bus = EventBus::with_sink(sink.clone());
    bus.listen_for_events();
    bus.stop_listener().await;

    bus.sender()
        .send(BridgeEvent::verification_complete("m1"))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(sink.snapshot().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn attached_hub_signals_reach_the_sinks() {
    let hub = EventHub::with_default_capacity();
    let sink = MemorySink::new();
    let bus = EventBus::with_sink(sink.clone());
    bus.attach_hub(&hub);
    bus.listen_for_events();

    hub.publish(BridgeEvent::verification_complete("m1"));
    hub.publish(BridgeEvent::jump_to_state("s2"));

    for _ in 0..100 {
        if sink.snapshot().len() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let seen = sink.snapshot();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].label(), "verification-complete");
    assert_eq!(seen[1].label(), "jump-to-state");

    bus.stop_listener().await;
}
