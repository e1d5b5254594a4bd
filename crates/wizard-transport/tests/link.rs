//! Link lifecycle tests over the in-memory connector.
//!
//! The memory connector lets each test decide exactly when the "server"
//! accepts, refuses or hangs up, so reconnect behavior is deterministic.

use std::time::Duration;

use tokio::sync::mpsc;
use wizard_transport::{
    Link, LinkEvent, LinkState, MemoryConnector, ReconnectPolicy,
    TransportError,
};

const ENDPOINT: &str = "memory://wizard";

/// Zero-delay retries so tests don't sleep.
fn fast_policy(max_attempts: Option<u32>) -> ReconnectPolicy {
    ReconnectPolicy::immediate().with_max_attempts(max_attempts)
}

async fn next_event(rx: &mut mpsc::Receiver<LinkEvent>) -> LinkEvent {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for link event")
        .expect("link event channel closed")
}

#[tokio::test]
async fn test_link_connect_emits_connected_and_delivers_frames() {
    let (connector, mut listener) = MemoryConnector::pair();
    let (handle, mut events) =
        Link::spawn(connector, ENDPOINT, fast_policy(None), 16);

    let mut peer = listener.accept().await.expect("should accept");
    assert_eq!(next_event(&mut events).await, LinkEvent::Connected(peer.id()));
    assert_eq!(handle.state(), LinkState::Connected);
    assert_eq!(handle.endpoint(), ENDPOINT);

    // Server → client
    assert!(peer.send(b"{\"type\":\"joined\"}".to_vec()));
    assert_eq!(
        next_event(&mut events).await,
        LinkEvent::Message(b"{\"type\":\"joined\"}".to_vec())
    );

    // Client → server, order preserved
    handle.send(b"one".to_vec()).expect("send should succeed");
    handle.send(b"two".to_vec()).expect("send should succeed");
    assert_eq!(peer.recv().await.as_deref(), Some(&b"one"[..]));
    assert_eq!(peer.recv().await.as_deref(), Some(&b"two"[..]));
}

#[tokio::test]
async fn test_send_before_connect_returns_not_connected() {
    let (connector, _listener) = MemoryConnector::pair();
    let (handle, _events) =
        Link::spawn(connector, ENDPOINT, fast_policy(None), 16);

    // The link task hasn't run yet on the current-thread runtime.
    let result = handle.send(b"early".to_vec());

    assert!(
        matches!(result, Err(TransportError::NotConnected)),
        "got {result:?}"
    );
}

#[tokio::test]
async fn test_peer_hang_up_triggers_reconnect() {
    let (connector, mut listener) = MemoryConnector::pair();
    let (handle, mut events) =
        Link::spawn(connector, ENDPOINT, fast_policy(None), 16);

    let first = listener.accept().await.expect("should accept");
    let first_id = first.id();
    assert_eq!(next_event(&mut events).await, LinkEvent::Connected(first_id));

    first.hang_up();

    assert!(matches!(
        next_event(&mut events).await,
        LinkEvent::Closed { requested: false, .. }
    ));
    assert!(matches!(
        next_event(&mut events).await,
        LinkEvent::Reconnecting { attempt: 1, .. }
    ));

    let second = listener.accept().await.expect("should accept again");
    assert_ne!(second.id(), first_id);
    assert_eq!(
        next_event(&mut events).await,
        LinkEvent::Reconnected(second.id())
    );
    assert_eq!(handle.state(), LinkState::Connected);
}

#[tokio::test]
async fn test_refused_connects_give_up_after_max_attempts() {
    let (connector, _listener) = MemoryConnector::pair();
    connector.refuse_next(10);
    let (handle, mut events) =
        Link::spawn(connector, ENDPOINT, fast_policy(Some(2)), 16);

    assert!(matches!(
        next_event(&mut events).await,
        LinkEvent::Reconnecting { attempt: 1, .. }
    ));
    assert!(matches!(
        next_event(&mut events).await,
        LinkEvent::Reconnecting { attempt: 2, .. }
    ));
    assert_eq!(
        next_event(&mut events).await,
        LinkEvent::GaveUp { attempts: 2 }
    );

    assert_eq!(handle.state(), LinkState::GaveUp);
    assert!(matches!(
        handle.send(b"late".to_vec()),
        Err(TransportError::Shutdown)
    ));
}

#[tokio::test]
async fn test_refused_connect_recovers_when_server_returns() {
    let (connector, mut listener) = MemoryConnector::pair();
    connector.refuse_next(1);
    let (_handle, mut events) =
        Link::spawn(connector, ENDPOINT, fast_policy(Some(5)), 16);

    assert!(matches!(
        next_event(&mut events).await,
        LinkEvent::Reconnecting { attempt: 1, .. }
    ));

    // Never connected before, so this is the first Connected.
    let peer = listener.accept().await.expect("should accept");
    assert_eq!(next_event(&mut events).await, LinkEvent::Connected(peer.id()));
}

#[tokio::test]
async fn test_close_stops_link_without_reconnect() {
    let (connector, mut listener) = MemoryConnector::pair();
    let (handle, mut events) =
        Link::spawn(connector, ENDPOINT, fast_policy(None), 16);

    let mut peer = listener.accept().await.expect("should accept");
    next_event(&mut events).await; // Connected

    handle.close();

    assert!(matches!(
        next_event(&mut events).await,
        LinkEvent::Closed { requested: true, .. }
    ));
    assert_eq!(handle.state(), LinkState::Closed);
    assert!(peer.recv().await.is_none(), "server should see the close");

    // The task is gone: the event channel ends and nothing reconnects.
    let tail = tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("channel should close");
    assert!(tail.is_none());
}
