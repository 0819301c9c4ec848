//! Polling transport tests against a mock HTTP server.

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::sync::broadcast::Receiver;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wobserver_http::{
    ActiveNode, Command, NodeAddress, PollingConfig, PollingTransport, SessionEvent,
    SessionEventEmitter, Transport, TransportError, TransportState, TransportType,
};

fn polling(server: &MockServer) -> (PollingTransport, Receiver<SessionEvent>) {
    polling_with(PollingConfig::new(server.uri()), ActiveNode::default())
}

fn polling_with(
    config: PollingConfig,
    node: ActiveNode,
) -> (PollingTransport, Receiver<SessionEvent>) {
    let events = SessionEventEmitter::new();
    let rx = events.subscribe();
    let transport = PollingTransport::new(config, node, events).unwrap();
    (transport, rx)
}

fn drain_events(rx: &mut Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_response_wrapped_as_envelope() {
    let server = MockServer::start().await;
    let body = json!({"uptime": 1234, "schedulers": 8});

    Mock::given(method("GET"))
        .and(path("/api/system"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let (transport, _rx) = polling(&server);
    let before = chrono::Utc::now().timestamp();
    let envelope = transport
        .send_and_await(Command::new("system"))
        .await
        .unwrap();
    let after = chrono::Utc::now().timestamp();

    assert_eq!(envelope.kind, "system");
    assert_eq!(envelope.data, body);
    assert!(envelope.timestamp >= before && envelope.timestamp <= after);

    let metrics = transport.metrics();
    assert_eq!(metrics.messages_sent, 1);
    assert_eq!(metrics.messages_received, 1);
    assert_eq!(metrics.failed_exchanges, 0);
}

#[tokio::test]
async fn test_local_command_path_is_encoded() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/table%2F%23Port%3C0.7.0%3E"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rows": []})))
        .expect(1)
        .mount(&server)
        .await;

    let (transport, _rx) = polling(&server);
    let envelope = transport
        .send_and_await(Command::new("table/#Port<0.7.0>"))
        .await
        .unwrap();

    assert_eq!(envelope.kind, "table/#Port<0.7.0>");
}

#[tokio::test]
async fn test_remote_node_prefixes_path() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/worker%40host/table%2F%23Port%3C0.7.0%3E"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rows": []})))
        .expect(1)
        .mount(&server)
        .await;

    let (transport, _rx) = polling_with(
        PollingConfig::new(server.uri()),
        ActiveNode::new(NodeAddress::new("worker@host")),
    );
    transport
        .send_and_await(Command::new("table/#Port<0.7.0>"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_switch_node_commits_immediately() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/nodeB/memory"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let (transport, mut rx) = polling(&server);
    transport
        .switch_node(NodeAddress::new("nodeB"))
        .await
        .unwrap();

    assert_eq!(transport.active_node(), "nodeB");
    assert_eq!(
        drain_events(&mut rx),
        vec![SessionEvent::NodeChanged(NodeAddress::new("nodeB"))]
    );

    // Switching to the node already active changes nothing
    transport
        .switch_node(NodeAddress::new("nodeB"))
        .await
        .unwrap();
    assert!(drain_events(&mut rx).is_empty());

    transport
        .send_and_await(Command::new("memory"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_disconnected_and_reconnected_fire_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/system"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (transport, mut rx) = polling(&server);

    for _ in 0..4 {
        let err = transport
            .send_and_await(Command::new("system"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::HttpStatus { status: 500, .. }));
    }

    assert_eq!(transport.state(), TransportState::Broken);
    let events = drain_events(&mut rx);
    assert_eq!(events.len(), 1);
    assert!(matches!(
        events[0],
        SessionEvent::Disconnected {
            transport: TransportType::Polling,
            ..
        }
    ));

    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/api/system"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    transport
        .send_and_await(Command::new("system"))
        .await
        .unwrap();
    transport
        .send_and_await(Command::new("system"))
        .await
        .unwrap();

    assert_eq!(transport.state(), TransportState::Open);
    assert_eq!(
        drain_events(&mut rx),
        vec![SessionEvent::Reconnected {
            transport: TransportType::Polling
        }]
    );

    let metrics = transport.metrics();
    assert_eq!(metrics.failed_exchanges, 4);
    assert_eq!(metrics.reconnections, 1);
}

#[tokio::test]
async fn test_send_updates_connected_flag() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/refresh"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let (transport, mut rx) = polling(&server);
    assert!(transport.send(Command::new("refresh")).await.is_err());

    assert!(!transport.is_connected());
    assert_eq!(drain_events(&mut rx).len(), 1);
}

#[tokio::test]
async fn test_non_json_body_is_a_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/system"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let (transport, mut rx) = polling(&server);
    let err = transport
        .send_and_await(Command::new("system"))
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::ProtocolError(_)));
    assert!(!transport.is_connected());
    assert_eq!(drain_events(&mut rx).len(), 1);
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/processes"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"list": "x".repeat(256)})),
        )
        .mount(&server)
        .await;

    let (transport, _rx) = polling_with(
        PollingConfig::new(server.uri()).with_max_response_size(64),
        ActiveNode::default(),
    );
    let err = transport
        .send_and_await(Command::new("processes"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TransportError::ResponseTooLarge { max: 64, .. }
    ));
    assert!(!transport.is_connected());
}

#[tokio::test]
async fn test_unreachable_server() {
    // Bind and release a port so nothing listens on it
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let events = SessionEventEmitter::new();
    let mut rx = events.subscribe();
    let transport = PollingTransport::new(
        PollingConfig::new(format!("http://{}", addr)),
        ActiveNode::default(),
        events,
    )
    .unwrap();

    let err = transport
        .send_and_await(Command::new("system"))
        .await
        .unwrap_err();

    assert!(err.is_connectivity(), "unexpected error: {err}");
    assert!(matches!(
        rx.try_recv(),
        Ok(SessionEvent::Disconnected { .. })
    ));
}
