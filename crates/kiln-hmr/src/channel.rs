//! WebSocket update channel.
//!
//! The channel pushes [`HmrPayload`]s to every connected client. It either
//! shares the host's listener ([`HmrChannel::attach`] layers a middleware that
//! claims upgrade requests carrying the HMR sub-protocol) or runs its own
//! listener ([`HmrChannel::listen`]).
//!
//! Each client gets an unbounded queue drained by its connection task, so
//! `send` never waits on a slow client and every client sees payloads in
//! submission order.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{
        FromRequestParts, Request, State,
        ws::{
            CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code,
            rejection::WebSocketUpgradeRejection,
        },
    },
    http::{HeaderMap, StatusCode, header::SEC_WEBSOCKET_PROTOCOL},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::any,
};
use futures_util::{SinkExt, StreamExt};
use kiln_config::HmrConfig;
use parking_lot::Mutex;
use rustc_hash::FxHashMap as HashMap;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info, trace, warn};

use crate::error::{HmrError, Result};
use crate::payload::HmrPayload;

/// Handle to the update channel. Clones share the same clients.
#[derive(Clone)]
pub struct HmrChannel {
    inner: Arc<ChannelInner>,
}

struct ChannelInner {
    subprotocol: String,
    state: Mutex<ClientState>,
    server: Mutex<Option<ServerHandle>>,
}

#[derive(Default)]
struct ClientState {
    clients: HashMap<usize, Client>,
    next_id: usize,
    /// Serialized error sent while nobody was connected
    buffered_error: Option<Utf8Bytes>,
}

struct Client {
    tx: mpsc::UnboundedSender<Utf8Bytes>,
    /// Resolves once the connection task has exited; `None` for in-process
    /// subscribers
    done: Option<oneshot::Receiver<()>>,
}

struct ServerHandle {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
}

impl std::fmt::Debug for HmrChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmrChannel")
            .field("subprotocol", &self.inner.subprotocol)
            .field("clients", &self.client_count())
            .field("server", &self.local_addr())
            .finish()
    }
}

impl HmrChannel {
    /// Channel claiming upgrades whose `Sec-WebSocket-Protocol` is exactly
    /// `subprotocol`.
    pub fn new(subprotocol: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                subprotocol: subprotocol.into(),
                state: Mutex::new(ClientState::default()),
                server: Mutex::new(None),
            }),
        }
    }

    pub fn from_config(config: &HmrConfig) -> Self {
        Self::new(config.subprotocol.clone())
    }

    pub fn subprotocol(&self) -> &str {
        &self.inner.subprotocol
    }

    pub fn client_count(&self) -> usize {
        self.inner.state.lock().clients.len()
    }

    /// Address of the dedicated listener, if one is running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.inner.server.lock().as_ref().map(|server| server.addr)
    }

    /// Push a payload to every open client.
    ///
    /// An `error` payload sent while no client is connected is kept and
    /// delivered to the next client right after `connected`; a later error
    /// replaces it. Clients whose connection has gone away are dropped.
    pub fn send(&self, payload: &HmrPayload) -> Result<()> {
        let text = Utf8Bytes::from(serde_json::to_string(payload)?);
        let mut state = self.inner.state.lock();

        state.clients.retain(|id, client| {
            let open = client.tx.send(text.clone()).is_ok();
            if !open {
                debug!(client = id, "dropping closed HMR client");
            }
            open
        });

        // Clients that went away without unregistering count as absent
        if payload.is_error() && state.clients.is_empty() {
            debug!("no HMR client connected, buffering error");
            state.buffered_error = Some(text);
        }
        Ok(())
    }

    /// Register an in-process client. It receives the same stream of
    /// payloads as a socket client, starting with `connected`.
    pub fn subscribe(&self) -> Result<HmrReceiver> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.register(tx, None)?;
        Ok(HmrReceiver { rx })
    }

    /// Layer HMR upgrade handling onto a host router.
    ///
    /// Upgrade requests carrying the HMR sub-protocol are taken over by the
    /// channel; every other request passes through to the router untouched.
    pub fn attach<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.layer(middleware::from_fn_with_state(self.clone(), hmr_middleware))
    }

    /// Start a dedicated listener on `config.host:config.port`.
    ///
    /// Returns `Ok(None)` when the address is already in use, so a second
    /// dev server can start without HMR. Any other bind failure is an error.
    pub async fn listen(&self, config: &HmrConfig) -> Result<Option<SocketAddr>> {
        let addr = config.listen_addr();
        let listener = match tokio::net::TcpListener::bind(&addr).await {
            Ok(listener) => listener,
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                debug!(%addr, "HMR port already in use, not starting dedicated listener");
                return Ok(None);
            }
            Err(err) => {
                error!(%addr, error = %err, "HMR server failed to start");
                return Err(HmrError::Bind { addr, source: err });
            }
        };
        let local = listener.local_addr()?;

        let app = Router::new()
            .route(&config.path, any(dedicated_upgrade))
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .with_state(self.clone());

        let (shutdown, signal) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = signal.await;
                })
                .await
        });

        let previous = self.inner.server.lock().replace(ServerHandle {
            addr: local,
            shutdown,
            task,
        });
        if let Some(previous) = previous {
            warn!(addr = %previous.addr, "replacing running HMR listener");
            let _ = previous.shutdown.send(());
        }

        info!(addr = %local, "HMR server listening");
        Ok(Some(local))
    }

    /// Close every client, then stop the dedicated listener if one runs.
    ///
    /// Waits for each connection task to finish. The first error wins.
    pub async fn close(&self) -> Result<()> {
        let clients: Vec<Client> = {
            let mut state = self.inner.state.lock();
            state.clients.drain().map(|(_, client)| client).collect()
        };

        for Client { tx, done } in clients {
            drop(tx);
            if let Some(done) = done {
                // The sender side is dropped when the task exits
                let _ = done.await;
            }
        }

        let server = self.inner.server.lock().take();
        if let Some(server) = server {
            let _ = server.shutdown.send(());
            server
                .task
                .await?
                .map_err(|err| HmrError::Server(err.to_string()))?;
            debug!(addr = %server.addr, "HMR server stopped");
        }

        Ok(())
    }

    fn claims(&self, headers: &HeaderMap) -> bool {
        headers
            .get(SEC_WEBSOCKET_PROTOCOL)
            .and_then(|value| value.to_str().ok())
            == Some(self.inner.subprotocol.as_str())
    }

    fn upgrade(&self, ws: WebSocketUpgrade) -> Response {
        let channel = self.clone();
        ws.protocols([self.inner.subprotocol.clone()])
            .on_upgrade(move |socket| async move { channel.run_connection(socket).await })
    }

    /// Add a client and queue `connected` plus any buffered error, all under
    /// the state lock so no `send` can slip in between.
    fn register(
        &self,
        tx: mpsc::UnboundedSender<Utf8Bytes>,
        done: Option<oneshot::Receiver<()>>,
    ) -> Result<usize> {
        let connected = Utf8Bytes::from(serde_json::to_string(&HmrPayload::Connected)?);
        let mut state = self.inner.state.lock();

        let _ = tx.send(connected);
        if let Some(err) = state.buffered_error.take() {
            let _ = tx.send(err);
        }

        let id = state.next_id;
        state.next_id += 1;
        state.clients.insert(id, Client { tx, done });
        Ok(id)
    }

    fn unregister(&self, id: usize) {
        self.inner.state.lock().clients.remove(&id);
    }

    async fn run_connection(self, socket: WebSocket) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (_done, done_rx) = oneshot::channel::<()>();
        let id = match self.register(tx, Some(done_rx)) {
            Ok(id) => id,
            Err(err) => {
                error!(error = %err, "failed to register HMR client");
                return;
            }
        };
        info!(client = id, "HMR client connected");

        let (mut sink, mut stream) = socket.split();
        loop {
            tokio::select! {
                outgoing = rx.recv() => match outgoing {
                    Some(text) => {
                        if let Err(err) = sink.send(Message::Text(text)).await {
                            debug!(client = id, error = %err, "HMR client write failed");
                            break;
                        }
                    }
                    None => {
                        let frame = CloseFrame {
                            code: close_code::AWAY,
                            reason: Utf8Bytes::from_static("server closing"),
                        };
                        let _ = sink.send(Message::Close(Some(frame))).await;
                        break;
                    }
                },
                incoming = stream.next() => match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Text(text))) => {
                        trace!(client = id, text = %text.as_str(), "ignoring client message");
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        debug!(client = id, error = %err, "HMR client read failed");
                        break;
                    }
                },
            }
        }

        self.unregister(id);
        info!(client = id, "HMR client disconnected");
    }
}

/// In-process HMR client created by [`HmrChannel::subscribe`].
#[derive(Debug)]
pub struct HmrReceiver {
    rx: mpsc::UnboundedReceiver<Utf8Bytes>,
}

impl HmrReceiver {
    /// Next payload, or `None` once the channel closed this client.
    pub async fn recv(&mut self) -> Option<HmrPayload> {
        while let Some(text) = self.rx.recv().await {
            if let Some(payload) = decode(&text) {
                return Some(payload);
            }
        }
        None
    }

    /// Next payload if one is already queued.
    pub fn try_recv(&mut self) -> Option<HmrPayload> {
        while let Ok(text) = self.rx.try_recv() {
            if let Some(payload) = decode(&text) {
                return Some(payload);
            }
        }
        None
    }
}

fn decode(text: &Utf8Bytes) -> Option<HmrPayload> {
    match serde_json::from_str(text.as_str()) {
        Ok(payload) => Some(payload),
        Err(err) => {
            warn!(error = %err, "skipping undecodable HMR payload");
            None
        }
    }
}

async fn hmr_middleware(State(channel): State<HmrChannel>, request: Request, next: Next) -> Response {
    if !channel.claims(request.headers()) {
        return next.run(request).await;
    }

    let (mut parts, _body) = request.into_parts();
    match WebSocketUpgrade::from_request_parts(&mut parts, &()).await {
        Ok(ws) => channel.upgrade(ws),
        Err(rejection) => rejection.into_response(),
    }
}

async fn dedicated_upgrade(
    State(channel): State<HmrChannel>,
    headers: HeaderMap,
    ws: std::result::Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    if !channel.claims(&headers) {
        return (StatusCode::UPGRADE_REQUIRED, "Upgrade Required").into_response();
    }
    match ws {
        Ok(ws) => channel.upgrade(ws),
        Err(rejection) => rejection.into_response(),
    }
}
