//! Public client handle.

use std::sync::Arc;

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::connection::Connection;
use super::dispatcher::event_channel;
use super::handler::MessageHandler;
use super::listener::{ClientListener, NoopListener};
use super::scoped::ScopedRequest;
use super::state::ConnectionState;
use super::supervisor::Supervisor;
use super::tasks::{TaskRegistry, log_join_error};
use super::transport::{Transport, TungsteniteTransport};
use crate::config::ClientSettings;
use crate::error::{ClientError, ClientResult};
use crate::protocol::{Params, Reply};

/// Builder for [`Client`].
pub struct ClientBuilder {
    settings: ClientSettings,
    listener: Option<Arc<dyn ClientListener>>,
    handlers: Vec<Arc<dyn MessageHandler>>,
    runtime: Option<Handle>,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    pub fn new(settings: ClientSettings) -> Self {
        Self {
            settings,
            listener: None,
            handlers: Vec::new(),
            runtime: None,
            transport: None,
        }
    }

    /// Receiver of state changes, notifications and connection errors.
    pub fn listener(mut self, listener: Arc<dyn ClientListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Append a handler for uncorrelated messages.
    pub fn handler(mut self, handler: Arc<dyn MessageHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Runtime the client's tasks are spawned on. Defaults to the runtime
    /// `build()` is called from.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Source of websocket sessions. Defaults to [`TungsteniteTransport`].
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the client.
    ///
    /// Fails with `ClientError::Runtime` when no runtime was given and none
    /// is running on the current thread.
    pub fn build(self) -> ClientResult<Client> {
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|e| ClientError::Runtime(e.to_string()))?,
        };

        let listener = self.listener.unwrap_or_else(|| Arc::new(NoopListener));
        let (events, dispatcher) = event_channel(listener);
        let tasks = TaskRegistry::new();
        tasks.spawn(&runtime, "listener dispatcher", dispatcher);

        let connection = Arc::new(Connection::new(events));
        for handler in self.handlers {
            connection.handlers().push(handler);
        }

        Ok(Client {
            inner: Arc::new(ClientInner {
                settings: self.settings,
                runtime,
                transport: self
                    .transport
                    .unwrap_or_else(|| Arc::new(TungsteniteTransport)),
                connection,
                supervisor: tokio::sync::Mutex::new(None),
                tasks,
            }),
        })
    }
}

struct SupervisorHandle {
    join: JoinHandle<()>,
    stop: CancellationToken,
}

struct ClientInner {
    settings: ClientSettings,
    runtime: Handle,
    transport: Arc<dyn Transport>,
    connection: Arc<Connection>,
    /// Held across the join in `disconnect()`, so the slot stays occupied
    /// until the old supervisor has exited.
    supervisor: tokio::sync::Mutex<Option<SupervisorHandle>>,
    tasks: TaskRegistry,
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        if let Some(supervisor) = self.supervisor.get_mut().take() {
            self.connection.request_stop(&supervisor.stop);
        }
        self.tasks.abort_all();
    }
}

/// JSON-RPC client over one persistent websocket connection.
///
/// Cheap to clone; clones share the connection. The connection is stopped
/// when the last clone is dropped.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    pub fn builder(settings: ClientSettings) -> ClientBuilder {
        ClientBuilder::new(settings)
    }

    /// Build a client with no listener, no handlers and the default transport.
    pub fn new(settings: ClientSettings) -> ClientResult<Self> {
        ClientBuilder::new(settings).build()
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.inner.settings
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.connection.state()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Number of calls of the current connection still awaiting a reply.
    pub fn pending_count(&self) -> usize {
        self.inner.connection.pending_count()
    }

    /// Append a handler for uncorrelated messages.
    pub fn add_handler(&self, handler: Arc<dyn MessageHandler>) {
        self.inner.connection.handlers().push(handler);
    }

    /// Start the connection and wait for the first handshake.
    ///
    /// Waits at most the configured timeout. On `ClientError::Timeout` the
    /// supervisor keeps trying in the background; call `disconnect()` to
    /// give up.
    pub async fn connect(&self) -> ClientResult<()> {
        let completion = self.spawn_supervisor()?;
        match tokio::time::timeout(self.inner.settings.timeout, completion).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(ClientError::Cancelled),
            Err(_) => Err(ClientError::Timeout),
        }
    }

    /// Start the connection without waiting for the handshake.
    pub fn start(&self) -> ClientResult<()> {
        self.spawn_supervisor().map(drop)
    }

    /// Stop the connection and wait for the supervisor to exit.
    ///
    /// Every pending call is cancelled. Safe to call repeatedly or when
    /// never connected. Returns once the listener has seen every event up to
    /// and including `Stopped`.
    pub async fn disconnect(&self) {
        let mut slot = self.inner.supervisor.lock().await;
        if let Some(supervisor) = slot.as_mut() {
            self.inner.connection.request_stop(&supervisor.stop);
            if let Err(e) = (&mut supervisor.join).await {
                log_join_error(e);
                self.inner.connection.set_state(ConnectionState::Stopped);
            }
        }
        *slot = None;
        drop(slot);

        self.inner.connection.events().flush().await;
    }

    /// Issue a call on the current connection.
    ///
    /// Fails immediately with `ClientError::NotConnected` unless the state is
    /// `Connected`. Never suspends; await [`ScopedRequest::response`] for
    /// the reply.
    pub fn request(&self, method: &str, params: Option<&Params>) -> ClientResult<ScopedRequest> {
        self.inner
            .connection
            .request(method, params, self.inner.settings.timeout)
    }

    /// Issue a call and wait for its reply.
    pub async fn call_method(&self, method: &str, params: Option<&Params>) -> ClientResult<Reply> {
        let mut request = self.request(method, params)?;
        request.response().await
    }

    /// `printer.info`
    pub async fn get_host_info(&self) -> ClientResult<Reply> {
        self.call_method("printer.info", None).await
    }

    /// `server.websocket.id`
    pub async fn get_websocket_id(&self) -> ClientResult<Reply> {
        self.call_method("server.websocket.id", None).await
    }

    fn spawn_supervisor(&self) -> ClientResult<oneshot::Receiver<ClientResult<()>>> {
        // A held lock means `disconnect()` is still waiting for the previous
        // supervisor to exit.
        let Ok(mut slot) = self.inner.supervisor.try_lock() else {
            return Err(ClientError::AlreadyConnected);
        };

        if let Some(previous) = slot.take() {
            if !previous.join.is_finished() {
                *slot = Some(previous);
                return Err(ClientError::AlreadyConnected);
            }
            if let Some(Err(e)) = previous.join.now_or_never() {
                log_join_error(e);
            }
        }

        let (completion, completed) = oneshot::channel();
        let stop = CancellationToken::new();
        let supervisor = Supervisor {
            connection: Arc::clone(&self.inner.connection),
            transport: Arc::clone(&self.inner.transport),
            settings: self.inner.settings.clone(),
            stop: stop.clone(),
        };
        let join = self.inner.runtime.spawn(supervisor.run(completion));
        *slot = Some(SupervisorHandle { join, stop });

        Ok(completed)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("host", &self.inner.settings.host)
            .field("port", &self.inner.settings.port)
            .field("state", &self.state())
            .finish()
    }
}
