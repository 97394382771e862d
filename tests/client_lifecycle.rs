//! End-to-end tests against an in-process websocket server.
//!
//! Every test starts its own `FakeServer` on an ephemeral port and drives a
//! real `Client` through the tungstenite transport.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use helpers::fake_server::{Behavior, FakeServer, GREETING_METHOD, SUPPORTED_OBJECTS, ServerOptions};
use helpers::local_settings;
use helpers::polling::wait_until;
use helpers::recording::RecordingListener;
use moonlink::{
    Client, ClientError, ConnectionState, Params, PrinterAdministration, Reply,
};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

fn params(value: serde_json::Value) -> Params {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("not an object: {}", other),
    }
}

#[tokio::test]
async fn listener_sees_connect_then_clean_stop() {
    let server = FakeServer::start(ServerOptions::default()).await;
    let listener = Arc::new(RecordingListener::default());
    let client = Client::builder(local_settings(server.port()))
        .listener(listener.clone())
        .build()
        .unwrap();

    assert_ok!(client.connect().await);
    assert!(client.is_connected());
    client.disconnect().await;

    assert_eq!(
        listener.states(),
        vec![
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Stopping,
            ConnectionState::Stopped,
        ]
    );
    assert!(listener.errors().is_empty());
    assert_eq!(client.state(), ConnectionState::Stopped);
}

#[tokio::test]
async fn call_resolves_with_result_of_matching_reply() {
    let server = FakeServer::start(
        ServerOptions::default().respond("printer.objects.query", json!({"result": {"status": "ok"}})),
    )
    .await;
    let client = Client::new(local_settings(server.port())).unwrap();
    assert_ok!(client.connect().await);

    let query = params(json!({"objects": {"a": null}}));
    let reply = assert_ok!(client.call_method("printer.objects.query", Some(&query)).await);
    assert_eq!(reply, Reply::Result(json!({"status": "ok"})));

    let received = server.requests("printer.objects.query");
    assert_eq!(received.len(), 1);
    assert_eq!(received[0]["jsonrpc"], "2.0");
    assert_eq!(received[0]["params"], json!({"objects": {"a": null}}));
    assert!(received[0]["id"].is_u64());
    assert_eq!(client.pending_count(), 0);

    client.disconnect().await;
}

#[tokio::test]
async fn error_reply_resolves_the_call() {
    let server = FakeServer::start(ServerOptions::default().respond(
        "printer.gcode.script",
        json!({"error": {"code": 400, "message": "Unknown command"}}),
    ))
    .await;
    let client = Client::new(local_settings(server.port())).unwrap();
    assert_ok!(client.connect().await);

    let reply = assert_ok!(client.call_method("printer.gcode.script", None).await);
    assert!(reply.is_error());
    let error = assert_err!(reply.into_result());
    assert!(matches!(error, ClientError::Remote(ref body) if body["code"] == 400));

    client.disconnect().await;
}

#[tokio::test]
async fn replies_are_matched_by_id_not_arrival_order() {
    let server = FakeServer::start(ServerOptions::behavior(Behavior::ReplyInReverse(2))).await;
    let client = Client::new(local_settings(server.port())).unwrap();
    assert_ok!(client.connect().await);

    let mut first = assert_ok!(client.request("server.info", None));
    let mut second = assert_ok!(client.request("printer.info", None));
    assert_ne!(first.id(), second.id());
    assert_eq!(client.pending_count(), 2);

    let (first, second) = tokio::join!(first.response(), second.response());
    assert_eq!(assert_ok!(first).result().unwrap()["echo"], "server.info");
    assert_eq!(assert_ok!(second).result().unwrap()["echo"], "printer.info");

    client.disconnect().await;
}

#[tokio::test]
async fn request_before_connect_fails_immediately() {
    let server = FakeServer::start(ServerOptions::default()).await;
    let client = Client::new(local_settings(server.port())).unwrap();

    let error = assert_err!(client.request("printer.info", None));
    assert!(matches!(error, ClientError::NotConnected));
    assert_eq!(client.pending_count(), 0);
    assert_eq!(server.connections(), 0);
}

#[tokio::test]
async fn second_connect_is_rejected() {
    let server = FakeServer::start(ServerOptions::default()).await;
    let client = Client::new(local_settings(server.port())).unwrap();
    assert_ok!(client.connect().await);

    let error = assert_err!(client.connect().await);
    assert!(matches!(error, ClientError::AlreadyConnected));
    assert!(client.is_connected());
    assert_eq!(server.connections(), 1);

    client.disconnect().await;
}

#[tokio::test]
async fn disconnect_cancels_pending_calls() {
    let server = FakeServer::start(ServerOptions::behavior(Behavior::NoResponse)).await;
    let client = Client::new(local_settings(server.port())).unwrap();
    assert_ok!(client.connect().await);

    let mut request = assert_ok!(client.request("printer.info", None));
    assert_eq!(client.pending_count(), 1);

    client.disconnect().await;

    let error = assert_err!(request.response().await);
    assert!(matches!(error, ClientError::Cancelled));
    assert_eq!(client.state(), ConnectionState::Stopped);
    assert_eq!(client.pending_count(), 0);
    assert!(matches!(
        client.request("printer.info", None),
        Err(ClientError::NotConnected)
    ));
}

#[tokio::test]
async fn unanswered_call_times_out_and_connection_survives() {
    let server = FakeServer::start(ServerOptions::behavior(Behavior::NoResponse)).await;
    let mut settings = local_settings(server.port());
    settings.timeout = Duration::from_millis(300);
    let client = Client::new(settings).unwrap();
    assert_ok!(client.connect().await);

    let error = assert_err!(client.call_method("printer.info", None).await);
    assert!(matches!(error, ClientError::Timeout));
    assert!(client.is_connected());
    assert_eq!(client.pending_count(), 0);

    client.disconnect().await;
}

#[tokio::test]
async fn server_close_cancels_calls_and_retry_reconnects() {
    let server = FakeServer::start(ServerOptions::behavior(Behavior::CloseOnRequest)).await;
    let listener = Arc::new(RecordingListener::default());
    let mut settings = local_settings(server.port());
    settings.retry = true;
    let client = Client::builder(settings)
        .listener(listener.clone())
        .build()
        .unwrap();
    assert_ok!(client.connect().await);

    let error = assert_err!(client.call_method("printer.info", None).await);
    assert!(matches!(error, ClientError::Cancelled));

    let reconnected = wait_until(Duration::from_secs(5), || {
        server.connections() >= 2 && client.is_connected()
    })
    .await;
    assert!(reconnected, "client did not reconnect after server close");

    client.disconnect().await;
    assert!(listener.entered(ConnectionState::Disconnected) >= 1);
    assert!(listener.entered(ConnectionState::Connecting) >= 2);
    assert_eq!(listener.states().last(), Some(&ConnectionState::Stopped));
}

#[tokio::test]
async fn server_close_without_retry_stops() {
    let server = FakeServer::start(ServerOptions::behavior(Behavior::CloseOnRequest)).await;
    let client = Client::new(local_settings(server.port())).unwrap();
    assert_ok!(client.connect().await);

    let error = assert_err!(client.call_method("printer.info", None).await);
    assert!(matches!(error, ClientError::Cancelled));

    let stopped = wait_until(Duration::from_secs(2), || {
        client.state() == ConnectionState::Stopped
    })
    .await;
    assert!(stopped);
    assert_eq!(server.connections(), 1);
}

#[tokio::test]
async fn client_can_connect_again_after_disconnect() {
    let server = FakeServer::start(ServerOptions::default()).await;
    let client = Client::new(local_settings(server.port())).unwrap();

    assert_ok!(client.connect().await);
    client.disconnect().await;
    assert_ok!(client.connect().await);

    let reply = assert_ok!(client.get_websocket_id().await);
    assert_eq!(reply.result().unwrap()["echo"], "server.websocket.id");
    assert_eq!(server.connections(), 2);

    client.disconnect().await;
}

#[tokio::test]
async fn notification_reaches_listener_without_touching_pending_calls() {
    let server = FakeServer::start(ServerOptions::behavior(Behavior::NoResponse)).await;
    let listener = Arc::new(RecordingListener::default());
    let client = Client::builder(local_settings(server.port()))
        .listener(listener.clone())
        .build()
        .unwrap();
    assert_ok!(client.connect().await);

    let mut request = assert_ok!(client.request("printer.info", None));
    server.push(json!({"jsonrpc": "2.0", "method": "notify_x", "params": [1, 2]}));

    let delivered = wait_until(Duration::from_secs(2), || !listener.notifications().is_empty()).await;
    assert!(delivered, "notification was not delivered");
    assert_eq!(
        listener.notifications(),
        vec![("notify_x".to_string(), json!([1, 2]))]
    );
    assert!(!request.is_complete());
    assert_eq!(client.pending_count(), 1);

    client.disconnect().await;
}

#[tokio::test]
async fn rejected_credentials_stop_without_retry() {
    let server = FakeServer::start(ServerOptions {
        api_key: Some("secret".to_string()),
        ..ServerOptions::default()
    })
    .await;
    let listener = Arc::new(RecordingListener::default());
    let mut settings = local_settings(server.port());
    settings.retry = true;
    let client = Client::builder(settings)
        .listener(listener.clone())
        .build()
        .unwrap();

    let error = assert_err!(client.connect().await);
    assert!(matches!(error, ClientError::Unauthenticated));
    assert_eq!(client.state(), ConnectionState::Stopped);

    client.disconnect().await;
    assert_eq!(
        listener.states(),
        vec![
            ConnectionState::Connecting,
            ConnectionState::Stopping,
            ConnectionState::Stopped,
        ]
    );
    assert!(matches!(listener.errors().as_slice(), [ClientError::Unauthenticated]));
    assert_eq!(server.connections(), 0);
}

#[tokio::test]
async fn api_key_is_sent_in_handshake() {
    let server = FakeServer::start(ServerOptions {
        api_key: Some("secret".to_string()),
        ..ServerOptions::default()
    })
    .await;
    let mut settings = local_settings(server.port());
    settings.api_key = Some("secret".to_string());
    let client = Client::new(settings).unwrap();

    assert_ok!(client.connect().await);
    assert_eq!(server.connections(), 1);

    client.disconnect().await;
}

#[tokio::test]
async fn unreachable_server_fails_without_retry() {
    let port = {
        let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        probe.local_addr().unwrap().port()
    };
    let client = Client::new(local_settings(port)).unwrap();

    let error = assert_err!(client.connect().await);
    assert!(matches!(error, ClientError::Transport(_)), "got {:?}", error);
    assert_eq!(client.state(), ConnectionState::Stopped);
}

#[tokio::test]
async fn greeting_reply_records_supported_objects() {
    let server = FakeServer::start(ServerOptions::default()).await;
    let client = Client::new(local_settings(server.port())).unwrap();
    let admin = PrinterAdministration::attach(&client);

    assert_ok!(client.connect().await);
    let recorded = wait_until(Duration::from_secs(2), || !admin.supported_objects().is_empty()).await;

    assert!(recorded, "greeting reply was not handled");
    assert_eq!(admin.supported_objects(), SUPPORTED_OBJECTS.to_vec());
    assert_eq!(server.requests(GREETING_METHOD).len(), 1);
    assert_eq!(client.pending_count(), 0);

    client.disconnect().await;
}

#[tokio::test]
async fn disabled_greeting_sends_nothing_on_connect() {
    let server = FakeServer::start(ServerOptions::default()).await;
    let mut settings = local_settings(server.port());
    settings.greeting_method = None;
    let client = Client::new(settings).unwrap();

    assert_ok!(client.connect().await);
    let reply = assert_ok!(client.get_host_info().await);
    assert_eq!(reply.result().unwrap()["echo"], "printer.info");
    assert!(server.requests(GREETING_METHOD).is_empty());

    client.disconnect().await;
}
