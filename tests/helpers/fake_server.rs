//! In-process websocket server speaking the printer API's JSON-RPC dialect.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;

/// Method the client sends after every handshake.
pub const GREETING_METHOD: &str = "printer.objects.list";

/// Objects listed in the greeting reply.
pub const SUPPORTED_OBJECTS: [&str; 4] = ["webhooks", "gcode_move", "toolhead", "extruder"];

/// How the server treats requests other than the greeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Reply to each request as it arrives
    Respond,
    /// Never reply
    NoResponse,
    /// Close the socket instead of replying
    CloseOnRequest,
    /// Hold replies until `n` requests arrived, then answer newest first
    ReplyInReverse(usize),
}

#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub behavior: Behavior,
    /// Reject handshakes with HTTP 401 unless `X-Api-Key` matches
    pub api_key: Option<String>,
    /// Canned reply bodies (without `jsonrpc`/`id`) keyed by method.
    /// Unlisted methods are answered with an echo of method and params.
    pub responses: HashMap<String, Value>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            behavior: Behavior::Respond,
            api_key: None,
            responses: HashMap::new(),
        }
    }
}

impl ServerOptions {
    pub fn behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            ..Self::default()
        }
    }

    pub fn respond(mut self, method: &str, body: Value) -> Self {
        self.responses.insert(method.to_string(), body);
        self
    }
}

struct Shared {
    options: ServerOptions,
    received: Mutex<Vec<Value>>,
    connections: AtomicUsize,
    notifications: broadcast::Sender<String>,
}

pub struct FakeServer {
    addr: SocketAddr,
    shared: Arc<Shared>,
    accept_task: JoinHandle<()>,
}

impl FakeServer {
    pub async fn start(options: ServerOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake server");
        let addr = listener.local_addr().expect("fake server address");
        let (notifications, _) = broadcast::channel(64);
        let shared = Arc::new(Shared {
            options,
            received: Mutex::new(Vec::new()),
            connections: AtomicUsize::new(0),
            notifications,
        });

        let accept_shared = Arc::clone(&shared);
        let accept_task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve(stream, Arc::clone(&accept_shared)));
            }
        });

        Self {
            addr,
            shared,
            accept_task,
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Completed websocket handshakes so far.
    pub fn connections(&self) -> usize {
        self.shared.connections.load(Ordering::SeqCst)
    }

    /// Requests received so far for `method`.
    pub fn requests(&self, method: &str) -> Vec<Value> {
        self.shared
            .received
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request["method"] == method)
            .cloned()
            .collect()
    }

    /// Push a message to every connected client.
    pub fn push(&self, message: Value) {
        let _ = self.shared.notifications.send(message.to_string());
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

async fn serve(stream: TcpStream, shared: Arc<Shared>) {
    let mut notifications = shared.notifications.subscribe();

    let expected_key = shared.options.api_key.clone();
    let check_key = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        if let Some(expected) = &expected_key {
            let provided = request
                .headers()
                .get("X-Api-Key")
                .and_then(|value| value.to_str().ok());
            if provided != Some(expected.as_str()) {
                let mut rejection = ErrorResponse::new(Some("Unauthorized".to_string()));
                *rejection.status_mut() = StatusCode::UNAUTHORIZED;
                return Err(rejection);
            }
        }
        Ok(response)
    };

    let Ok(socket) = accept_hdr_async(stream, check_key).await else {
        return;
    };
    shared.connections.fetch_add(1, Ordering::SeqCst);
    let (mut sink, mut frames) = socket.split();
    let mut held: Vec<String> = Vec::new();

    loop {
        tokio::select! {
            frame = frames.next() => {
                let text = match frame {
                    Some(Ok(Message::Text(text))) => text.as_str().to_string(),
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => continue,
                };
                let request: Value = match serde_json::from_str(&text) {
                    Ok(request) => request,
                    Err(_) => continue,
                };
                shared.received.lock().unwrap().push(request.clone());

                let method = request["method"].as_str().unwrap_or_default().to_string();
                if method == GREETING_METHOD {
                    let reply = json!({
                        "jsonrpc": "2.0",
                        "id": request["id"],
                        "result": {"objects": SUPPORTED_OBJECTS},
                    });
                    if sink.send(Message::text(reply.to_string())).await.is_err() {
                        break;
                    }
                    continue;
                }

                match shared.options.behavior {
                    Behavior::NoResponse => {}
                    Behavior::CloseOnRequest => {
                        let _ = sink.send(Message::Close(None)).await;
                        break;
                    }
                    Behavior::Respond => {
                        let reply = reply_for(&shared.options, &request);
                        if sink.send(Message::text(reply)).await.is_err() {
                            break;
                        }
                    }
                    Behavior::ReplyInReverse(batch) => {
                        held.push(reply_for(&shared.options, &request));
                        if held.len() >= batch {
                            while let Some(reply) = held.pop() {
                                if sink.send(Message::text(reply)).await.is_err() {
                                    return;
                                }
                            }
                        }
                    }
                }
            }
            pushed = notifications.recv() => {
                if let Ok(text) = pushed {
                    if sink.send(Message::text(text)).await.is_err() {
                        break;
                    }
                }
            }
        }
    }
}

fn reply_for(options: &ServerOptions, request: &Value) -> String {
    let method = request["method"].as_str().unwrap_or_default();
    let mut reply = match options.responses.get(method) {
        Some(body) => body.clone(),
        None => json!({
            "result": {
                "echo": method,
                "params": request.get("params").cloned().unwrap_or(Value::Null),
            }
        }),
    };
    reply["jsonrpc"] = json!("2.0");
    reply["id"] = request["id"].clone();
    reply.to_string()
}
