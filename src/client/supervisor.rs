//! Connection supervisor.
//!
//! Owns the connection lifecycle: open the transport, run one connection
//! epoch until it ends, clean up, then either stop or wait out the retry
//! delay and try again.
//!
//! ```text
//! Stopped -> Connecting -> Connected -> Stopping -> Stopped
//! Connected -> Disconnected -> Connecting   (retry path)
//! Connecting -> Stopping -> Stopped          (auth failure, no retry)
//! ```
//!
//! The caller awaiting `connect()` holds the receiving end of the completion
//! signal. It is settled exactly once: `Ok` at the first successful
//! handshake, or the error that ended the supervisor before one happened.

use std::sync::Arc;
use std::time::Duration;

use futures::SinkExt;
use log::{debug, info, warn};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use super::actor::{Inbox, OutboundMessage, cancel_queued, recv_loop, send_loop};
use super::connection::{Connection, Epoch};
use super::pending::PendingCalls;
use super::state::ConnectionState;
use super::transport::{FrameSink, Session, Transport};
use crate::config::ClientSettings;
use crate::error::{ClientError, ClientResult};
use crate::protocol::{self, RequestId};

/// Bound on sending the close frame during teardown.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Sender half of the `connect()` completion signal.
pub(crate) type Completion = oneshot::Sender<ClientResult<()>>;

pub(crate) struct Supervisor {
    pub(crate) connection: Arc<Connection>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) settings: ClientSettings,
    pub(crate) stop: CancellationToken,
}

impl Supervisor {
    /// Run connection attempts until stopped, retry is disabled, or the
    /// server rejects the credentials.
    pub(crate) async fn run(self, completion: Completion) {
        let mut completion = Some(completion);
        let mut last_error = None;

        loop {
            if self.stop.is_cancelled() {
                break;
            }
            self.connection.set_state(ConnectionState::Connecting);

            let opened = tokio::select! {
                _ = self.stop.cancelled() => break,
                opened = self.transport.open(&self.settings) => opened,
            };

            match opened {
                Ok(session) => {
                    if let Err(e) = self.run_session(session, &mut completion).await {
                        last_error = Some(e);
                    }
                }
                Err(e) if e.is_fatal() => {
                    warn!(
                        target: "moonlink::supervisor",
                        "Server rejected the connection: {}",
                        e
                    );
                    self.connection.events().exception(e.clone());
                    self.connection.set_state(ConnectionState::Stopping);
                    last_error = Some(e);
                    break;
                }
                Err(e) => {
                    warn!(
                        target: "moonlink::supervisor",
                        "Connection attempt to {}:{} failed: {}",
                        self.settings.host,
                        self.settings.port,
                        e
                    );
                    self.connection.events().exception(e.clone());
                    last_error = Some(e);
                }
            }

            if self.stop.is_cancelled() || !self.settings.retry {
                break;
            }

            self.connection.set_state(ConnectionState::Disconnected);
            info!(
                target: "moonlink::supervisor",
                "Reconnecting in {:?}",
                self.settings.retry_delay
            );
            tokio::select! {
                _ = self.stop.cancelled() => break,
                _ = tokio::time::sleep(self.settings.retry_delay) => {}
            }
        }

        self.connection.set_state(ConnectionState::Stopped);

        if let Some(completion) = completion.take() {
            let error = if self.stop.is_cancelled() {
                ClientError::Cancelled
            } else {
                last_error.unwrap_or(ClientError::Cancelled)
            };
            let _ = completion.send(Err(error));
        }

        debug!(target: "moonlink::supervisor", "Supervisor exited");
    }

    /// Run one connection epoch over an open session.
    ///
    /// Returns `Ok(())` when the server closed the socket or a stop was
    /// requested, and the transport error otherwise.
    async fn run_session(
        &self,
        session: Session,
        completion: &mut Option<Completion>,
    ) -> ClientResult<()> {
        let Session {
            mut sink,
            mut stream,
        } = session;
        let pending = Arc::new(PendingCalls::new());
        let (outbound, mut rx) = mpsc::unbounded_channel();

        if let Some(method) = &self.settings.greeting_method {
            let greeting = protocol::build_request(RequestId::random(), method, None);
            let _ = outbound.send(OutboundMessage::Untracked(greeting.to_string()));
        }

        let epoch = Epoch {
            pending: Arc::clone(&pending),
            outbound,
        };
        if !self.connection.activate(epoch, &self.stop) {
            debug!(
                target: "moonlink::supervisor",
                "Stop requested during handshake, closing"
            );
            close_sink(&mut sink).await;
            return Ok(());
        }

        info!(
            target: "moonlink::supervisor",
            "Connected to {}:{}",
            self.settings.host,
            self.settings.port
        );
        if let Some(completion) = completion.take() {
            let _ = completion.send(Ok(()));
        }

        let inbox = Inbox {
            pending: &pending,
            handlers: self.connection.handlers(),
            events: self.connection.events(),
        };
        let outcome = tokio::select! {
            _ = self.stop.cancelled() => Ok(()),
            result = recv_loop(&mut stream, inbox) => result,
            result = send_loop(&mut sink, &mut rx, &pending) => result,
        };

        self.connection.take_epoch();
        let unsent = cancel_queued(&mut rx, &pending);
        let reason = match &outcome {
            Ok(()) => ClientError::Cancelled,
            Err(e) => e.clone(),
        };
        let failed = pending.fail_all(&reason);
        debug!(
            target: "moonlink::supervisor",
            "Connection closed: cancelled {} unsent and failed {} pending requests",
            unsent,
            failed
        );

        if let Err(e) = &outcome {
            warn!(
                target: "moonlink::supervisor",
                "Connection lost: {}",
                e
            );
            self.connection.events().exception(e.clone());
        }

        close_sink(&mut sink).await;
        outcome
    }
}

async fn close_sink(sink: &mut FrameSink) {
    match tokio::time::timeout(CLOSE_TIMEOUT, sink.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            debug!(
                target: "moonlink::supervisor",
                "Error closing websocket: {}",
                e
            );
        }
        Err(_) => {
            debug!(
                target: "moonlink::supervisor",
                "Timed out closing websocket"
            );
        }
    }
}
