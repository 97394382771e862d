//! Websocket transport.
//!
//! The supervisor never opens sockets itself. It asks a [`Transport`] for a
//! fresh [`Session`] on every connection attempt, which lets callers supply
//! their own session (a proxy, a pre-authenticated stream, an in-memory
//! double) in place of the default [`TungsteniteTransport`].

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Sink, Stream, StreamExt};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderValue, StatusCode};
use tokio_tungstenite::tungstenite::{self, Message};
use url::Url;

use crate::config::ClientSettings;
use crate::error::{ClientError, ClientResult};

/// Header carrying the API key on the websocket handshake.
pub const API_KEY_HEADER: &str = "X-Api-Key";

/// Outgoing half of an open session.
pub type FrameSink = Pin<Box<dyn Sink<Message, Error = tungstenite::Error> + Send>>;

/// Incoming half of an open session.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Message, tungstenite::Error>> + Send>>;

/// An open websocket, split into its two halves.
pub struct Session {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

impl Session {
    pub fn new(sink: FrameSink, stream: FrameStream) -> Self {
        Self { sink, stream }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

/// Opens websocket sessions for the supervisor.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a session to the server described by `settings`.
    ///
    /// A handshake rejected with HTTP 401 must be reported as
    /// `ClientError::Unauthenticated`; the supervisor gives up instead of
    /// retrying in that case.
    async fn open(&self, settings: &ClientSettings) -> ClientResult<Session>;
}

/// Default transport backed by `tokio-tungstenite`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TungsteniteTransport;

#[async_trait]
impl Transport for TungsteniteTransport {
    async fn open(&self, settings: &ClientSettings) -> ClientResult<Session> {
        let url = websocket_url(settings)?;
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| ClientError::transport(format!("invalid websocket request: {}", e)))?;

        if let Some(api_key) = &settings.api_key {
            let value = HeaderValue::from_str(api_key)
                .map_err(|e| ClientError::transport(format!("invalid API key header: {}", e)))?;
            request.headers_mut().insert(API_KEY_HEADER, value);
        }

        log::debug!(
            target: "moonlink::transport",
            "Opening websocket to {}",
            url
        );

        let connect = tokio_tungstenite::connect_async(request);
        let (socket, _response) = match tokio::time::timeout(settings.timeout, connect).await {
            Ok(Ok(opened)) => opened,
            Ok(Err(e)) => return Err(handshake_error(e)),
            Err(_) => return Err(ClientError::Timeout),
        };

        let (sink, stream) = socket.split();
        Ok(Session::new(Box::pin(sink), Box::pin(stream)))
    }
}

/// Build `ws(s)://<host>:<port>/websocket` for the configured server.
pub fn websocket_url(settings: &ClientSettings) -> ClientResult<Url> {
    let scheme = if settings.ssl { "wss" } else { "ws" };
    let raw = format!("{}://{}:{}/websocket", scheme, settings.host, settings.port);
    Url::parse(&raw).map_err(|e| ClientError::transport(format!("invalid server address {}: {}", raw, e)))
}

fn handshake_error(error: tungstenite::Error) -> ClientError {
    match error {
        tungstenite::Error::Http(response) if response.status() == StatusCode::UNAUTHORIZED => {
            ClientError::Unauthenticated
        }
        tungstenite::Error::Http(response) => {
            ClientError::transport(format!("handshake rejected with HTTP {}", response.status()))
        }
        other => ClientError::transport(other.to_string()),
    }
}
