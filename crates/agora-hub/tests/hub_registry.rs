//! Registry behavior against an in-memory transport: single-flight
//! connections, event fan-out, stop semantics, and reconnection.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;

use agora_hub::{HubRegistry, StaticToken};
use agora_protocol::{events, hubs, CartUpdate};
use agora_transport::{
    Connection, ConnectionId, Connector, ReconnectPolicy, TransportError,
    TransportState,
};

// -- In-memory transport --------------------------------------------------

/// The test's side of one dialed connection.
struct ServerHalf {
    to_client: mpsc::UnboundedSender<Vec<u8>>,
    from_client: tokio::sync::Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
}

struct MockConnection {
    id: ConnectionId,
    inbound: tokio::sync::Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
}

impl Connection for MockConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        self.outbound
            .send(data.to_vec())
            .map_err(|_| TransportError::ConnectionClosed("peer gone".into()))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        // Sender dropped reads as a clean close.
        Ok(self.inbound.lock().await.recv().await)
    }

    async fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

/// Dials in-memory connections; the test keeps the server halves.
#[derive(Clone, Default)]
struct MockConnector {
    dials: Arc<AtomicU32>,
    fail_remaining: Arc<AtomicU32>,
    hubs_dialed: Arc<Mutex<Vec<String>>>,
    tokens_seen: Arc<Mutex<Vec<Option<String>>>>,
    servers: Arc<Mutex<Vec<Arc<ServerHalf>>>>,
}

impl MockConnector {
    fn dial_count(&self) -> u32 {
        self.dials.load(Ordering::SeqCst)
    }

    fn fail_next(&self, n: u32) {
        self.fail_remaining.store(n, Ordering::SeqCst);
    }

    fn latest_server(&self) -> Arc<ServerHalf> {
        Arc::clone(self.servers.lock().unwrap().last().expect("no connection yet"))
    }
}

impl Connector for MockConnector {
    type Conn = MockConnection;

    async fn dial(
        &self,
        hub: &str,
        access_token: Option<&str>,
    ) -> Result<MockConnection, TransportError> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        self.hubs_dialed.lock().unwrap().push(hub.to_owned());
        self.tokens_seen
            .lock()
            .unwrap()
            .push(access_token.map(str::to_owned));

        if self.fail_remaining.load(Ordering::SeqCst) > 0 {
            self.fail_remaining.fetch_sub(1, Ordering::SeqCst);
            return Err(TransportError::ConnectFailed("mock refusal".into()));
        }

        let (to_client, inbound) = mpsc::unbounded_channel();
        let (outbound, from_client) = mpsc::unbounded_channel();
        self.servers.lock().unwrap().push(Arc::new(ServerHalf {
            to_client,
            from_client: tokio::sync::Mutex::new(from_client),
        }));
        Ok(MockConnection {
            id: ConnectionId::next(),
            inbound: tokio::sync::Mutex::new(inbound),
            outbound,
        })
    }
}

// -- Helpers --------------------------------------------------------------

fn registry(connector: &MockConnector) -> HubRegistry<MockConnector, StaticToken> {
    HubRegistry::new(
        connector.clone(),
        StaticToken("tok-1".into()),
        ReconnectPolicy::default(),
    )
}

async fn wait_for_state(rx: &mut watch::Receiver<TransportState>, want: TransportState) {
    timeout(Duration::from_secs(2), async {
        loop {
            if *rx.borrow_and_update() == want {
                return;
            }
            rx.changed().await.expect("state channel closed");
        }
    })
    .await
    .unwrap_or_else(|_| panic!("never reached state {want}"));
}

fn event_frame(event: &str, payload: serde_json::Value) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "type": "event",
        "event": event,
        "payload": payload,
    }))
    .unwrap()
}

// -- Tests ----------------------------------------------------------------

#[tokio::test]
async fn test_start_connection_single_flight_reuses_live_connection() {
    let connector = MockConnector::default();
    let registry = registry(&connector);

    let first = registry.start_connection(hubs::CART).await;
    let mut states = first.state_changes();
    wait_for_state(&mut states, TransportState::Connected).await;

    let second = registry.start_connection(hubs::CART).await;

    assert_eq!(connector.dial_count(), 1, "second start must not dial");
    assert_eq!(first.connection_id(), second.connection_id());
}

// The connection task is handed to tokio::spawn, so the whole actor
// future (trait futures included) must be Send. Running on a worker pool
// exercises exactly that.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_connection_task_runs_on_multi_thread_runtime() {
    let connector = MockConnector::default();
    let registry = registry(&connector);

    let handle = registry.start_connection(hubs::CART).await;
    wait_for_state(&mut handle.state_changes(), TransportState::Connected).await;

    assert_eq!(connector.dial_count(), 1);
    registry.stop_connection(hubs::CART).await;
}

#[tokio::test]
async fn test_start_connection_different_hubs_dial_separately() {
    let connector = MockConnector::default();
    let registry = registry(&connector);

    let cart = registry.start_connection(hubs::CART).await;
    let notif = registry.start_connection(hubs::NOTIFICATION).await;
    wait_for_state(&mut cart.state_changes(), TransportState::Connected).await;
    wait_for_state(&mut notif.state_changes(), TransportState::Connected).await;

    assert_eq!(connector.dial_count(), 2);
    assert_ne!(cart.connection_id(), notif.connection_id());
}

#[tokio::test]
async fn test_dial_carries_provider_token() {
    let connector = MockConnector::default();
    let registry = registry(&connector);

    let handle = registry.start_connection(hubs::CART).await;
    wait_for_state(&mut handle.state_changes(), TransportState::Connected).await;

    let tokens = connector.tokens_seen.lock().unwrap().clone();
    assert_eq!(tokens, vec![Some("tok-1".to_owned())]);
    let hubs_dialed = connector.hubs_dialed.lock().unwrap().clone();
    assert_eq!(hubs_dialed, vec![hubs::CART.to_owned()]);
}

#[tokio::test]
async fn test_cart_update_event_reaches_subscriber_once() {
    let connector = MockConnector::default();
    let registry = registry(&connector);
    let handle = registry.start_connection(hubs::CART).await;
    wait_for_state(&mut handle.state_changes(), TransportState::Connected).await;

    let (got_tx, mut got_rx) = mpsc::unbounded_channel();
    let _sub = registry
        .subscribe_to_event(hubs::CART, events::RECEIVE_CART_UPDATE, move |payload| {
            let update: CartUpdate = serde_json::from_value(payload).unwrap();
            got_tx.send(update).unwrap();
        })
        .await
        .expect("hub is started");

    let server = connector.latest_server();
    server
        .to_client
        .send(event_frame(
            events::RECEIVE_CART_UPDATE,
            json!({ "numberOfItems": 3, "totalPrice": 45.5 }),
        ))
        .unwrap();

    let update = timeout(Duration::from_secs(2), got_rx.recv())
        .await
        .expect("no event delivered")
        .expect("channel closed");
    assert_eq!(update.number_of_items, 3);
    assert_eq!(update.total_price, 45.5);

    // Exactly one delivery for one frame.
    tokio::task::yield_now().await;
    assert!(got_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_multiple_subscribers_fire_in_registration_order() {
    let connector = MockConnector::default();
    let registry = registry(&connector);
    let handle = registry.start_connection(hubs::NOTIFICATION).await;
    wait_for_state(&mut handle.state_changes(), TransportState::Connected).await;

    let order = Arc::new(Mutex::new(Vec::new()));
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    let o1 = Arc::clone(&order);
    let o2 = Arc::clone(&order);
    let _a = registry
        .subscribe_to_event(hubs::NOTIFICATION, events::RECEIVE_NOTIFICATION, move |_| {
            o1.lock().unwrap().push("badge");
        })
        .await
        .unwrap();
    let _b = registry
        .subscribe_to_event(hubs::NOTIFICATION, events::RECEIVE_NOTIFICATION, move |_| {
            o2.lock().unwrap().push("toast");
            done_tx.send(()).unwrap();
        })
        .await
        .unwrap();

    connector
        .latest_server()
        .to_client
        .send(event_frame(
            events::RECEIVE_NOTIFICATION,
            json!({ "id": 1, "title": "Order shipped", "body": "", "isRead": false, "createdAt": "2026-08-26T10:00:00Z" }),
        ))
        .unwrap();

    timeout(Duration::from_secs(2), done_rx.recv())
        .await
        .expect("event not delivered");
    assert_eq!(*order.lock().unwrap(), vec!["badge", "toast"]);
}

#[tokio::test]
async fn test_dropped_subscription_stops_delivery() {
    let connector = MockConnector::default();
    let registry = registry(&connector);
    let handle = registry.start_connection(hubs::CART).await;
    wait_for_state(&mut handle.state_changes(), TransportState::Connected).await;

    let (got_tx, mut got_rx) = mpsc::unbounded_channel();
    let sub = registry
        .subscribe_to_event(hubs::CART, events::RECEIVE_CART_UPDATE, move |_| {
            got_tx.send(()).unwrap();
        })
        .await
        .unwrap();
    drop(sub);

    connector
        .latest_server()
        .to_client
        .send(event_frame(
            events::RECEIVE_CART_UPDATE,
            json!({ "numberOfItems": 1, "totalPrice": 9.99 }),
        ))
        .unwrap();

    // Give the frame time to be pumped; nothing should arrive.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(got_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_unknown_hub_operations_are_diagnostics_only() {
    let connector = MockConnector::default();
    let registry = registry(&connector);

    let sub = registry
        .subscribe_to_event("ghostHub", "AnyEvent", |_| {})
        .await;
    assert!(sub.is_none());

    registry.send_message("ghostHub", "DoThing", vec![]).await;
    registry.stop_connection("ghostHub").await;

    assert_eq!(connector.dial_count(), 0);
    assert_eq!(
        registry.connection_state("ghostHub").await,
        TransportState::Disconnected
    );
}

#[tokio::test]
async fn test_send_message_writes_invocation_frame() {
    let connector = MockConnector::default();
    let registry = registry(&connector);
    let handle = registry.start_connection(hubs::CART).await;
    wait_for_state(&mut handle.state_changes(), TransportState::Connected).await;

    registry
        .send_message(hubs::CART, "MarkNotificationAsRead", vec![json!("n-1")])
        .await;

    let server = connector.latest_server();
    let sent = timeout(Duration::from_secs(2), async {
        server.from_client.lock().await.recv().await
    })
    .await
    .expect("nothing sent")
    .expect("connection dropped");
    let frame: serde_json::Value = serde_json::from_slice(&sent).unwrap();
    assert_eq!(frame["type"], "invocation");
    assert_eq!(frame["method"], "MarkNotificationAsRead");
    assert_eq!(frame["args"], json!(["n-1"]));
}

#[tokio::test]
async fn test_stop_connection_is_idempotent() {
    let connector = MockConnector::default();
    let registry = registry(&connector);
    let handle = registry.start_connection(hubs::CART).await;
    let mut states = handle.state_changes();
    wait_for_state(&mut states, TransportState::Connected).await;

    registry.stop_connection(hubs::CART).await;
    wait_for_state(&mut states, TransportState::Disconnected).await;

    // Second stop: the entry is gone, nothing to do, no panic.
    registry.stop_connection(hubs::CART).await;
    assert_eq!(
        registry.connection_state(hubs::CART).await,
        TransportState::Disconnected
    );
}

#[tokio::test]
async fn test_stop_all_connections_stops_every_hub() {
    let connector = MockConnector::default();
    let registry = registry(&connector);
    let cart = registry.start_connection(hubs::CART).await;
    let notif = registry.start_connection(hubs::NOTIFICATION).await;
    let mut cart_states = cart.state_changes();
    let mut notif_states = notif.state_changes();
    wait_for_state(&mut cart_states, TransportState::Connected).await;
    wait_for_state(&mut notif_states, TransportState::Connected).await;

    registry.stop_all_connections().await;

    wait_for_state(&mut cart_states, TransportState::Disconnected).await;
    wait_for_state(&mut notif_states, TransportState::Disconnected).await;
}

#[tokio::test]
async fn test_server_close_triggers_reconnect_with_fresh_dial() {
    let connector = MockConnector::default();
    let registry = registry(&connector);
    let handle = registry.start_connection(hubs::CART).await;
    let mut states = handle.state_changes();
    wait_for_state(&mut states, TransportState::Connected).await;
    let first_id = handle.connection_id();

    // Drop the server half: the client reads a clean close.
    connector.servers.lock().unwrap().clear();

    // State updates coalesce, so poll for the second dial instead of
    // trying to observe the transient Reconnecting value.
    timeout(Duration::from_secs(2), async {
        while !(connector.dial_count() == 2
            && handle.state() == TransportState::Connected
            && handle.connection_id() != first_id)
        {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("hub never reconnected");

    // Every reconnect attempt fetched the token again.
    assert_eq!(connector.tokens_seen.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_no_retry_policy_still_dials_once_and_first_drop_is_final() {
    let connector = MockConnector::default();
    let registry = HubRegistry::new(
        connector.clone(),
        StaticToken("tok-1".into()),
        ReconnectPolicy::none(),
    );

    // The opening dial is not gated by the (empty) retry ladder.
    let handle = registry.start_connection(hubs::CART).await;
    let mut states = handle.state_changes();
    wait_for_state(&mut states, TransportState::Connected).await;
    assert_eq!(connector.dial_count(), 1);

    // After the drop there is no ladder to walk: no redial, parked.
    connector.servers.lock().unwrap().clear();
    wait_for_state(&mut states, TransportState::Disconnected).await;
    assert_eq!(connector.dial_count(), 1, "first drop must be final");
    assert!(handle.is_stopped());
}

#[tokio::test]
async fn test_exhausted_reconnects_park_hub_then_restart_replaces_it() {
    let connector = MockConnector::default();
    // A one-rung ladder: a single immediate attempt, then give up.
    let registry = HubRegistry::new(
        connector.clone(),
        StaticToken("tok-1".into()),
        ReconnectPolicy::new(vec![Duration::ZERO]),
    );

    connector.fail_next(1);
    let handle = registry.start_connection(hubs::CART).await;
    let mut states = handle.state_changes();
    wait_for_state(&mut states, TransportState::Disconnected).await;
    assert!(handle.is_stopped());

    // The dead entry must not satisfy single-flight.
    let replacement = registry.start_connection(hubs::CART).await;
    wait_for_state(
        &mut replacement.state_changes(),
        TransportState::Connected,
    )
    .await;
    assert_eq!(connector.dial_count(), 2);
}

// TokenProvider selection for anonymous hubs.
#[tokio::test]
async fn test_anonymous_provider_dials_without_token() {
    let connector = MockConnector::default();
    let registry = HubRegistry::new(
        connector.clone(),
        agora_hub::Anonymous,
        ReconnectPolicy::default(),
    );

    let handle = registry.start_connection(hubs::NOTIFICATION).await;
    wait_for_state(&mut handle.state_changes(), TransportState::Connected).await;

    assert_eq!(connector.tokens_seen.lock().unwrap().clone(), vec![None]);
}
