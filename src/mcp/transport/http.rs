//! Single-session HTTP transport.
//!
//! Every JSON-RPC message is a `POST` to one path. Requests with an id are
//! queued for the server loop, and the HTTP call stays open until the loop
//! writes the response carrying the same id. Notifications are queued and
//! answered `202 Accepted` straight away.
//!
//! `initialize` mints a fresh session id, returned in the `Mcp-Session-Id`
//! header, and discards the previous one. Requests other than `initialize`
//! must echo the current id. Notifications are accepted without a header
//! until the first session exists.
//!
//! Messages are only accepted while a server loop is attached (see
//! [`Transport::attach`]). Otherwise, and during shutdown, callers get
//! `503 Service Unavailable`. Detaching fails every outstanding exchange and
//! discards anything still queued.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::{Json, Router};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::ServerOptions;
use crate::error::TransportError;
use crate::mcp::protocol::{
    parse_request, ErrorCode, JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId,
};
use crate::mcp::transport::Transport;

/// Session header name (HTTP header names are case-insensitive).
pub const SESSION_HEADER: &str = "mcp-session-id";

const INITIALIZE: &str = "initialize";

/// Upper bound on waiting for the listener task during [`HttpTransport::close`].
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

struct Pending {
    seq: u64,
    reply: oneshot::Sender<JsonRpcResponse>,
}

/// A message queued for the server loop.
///
/// `seq` ties a request to the exchange that admitted it, so a request
/// whose caller has gone cannot answer a later caller reusing its id.
struct Inbound {
    seq: Option<u64>,
    request: JsonRpcRequest,
}

#[derive(Default)]
struct SessionState {
    session: Option<String>,
    /// Live HTTP calls waiting for a response, by request id.
    pending: HashMap<RequestId, Pending>,
    /// Exchanges handed to the loop and not yet answered.
    dispatched: HashMap<RequestId, u64>,
    next_seq: u64,
    /// Whether a server loop is consuming requests.
    attached: bool,
}

/// Why a message was refused before reaching the loop.
#[derive(Debug)]
enum Rejection {
    /// No loop is consuming, or the transport is closing.
    Unavailable,
    /// Missing or stale session header.
    InvalidSession(Option<RequestId>),
    /// The id already has a live exchange.
    DuplicateId(RequestId),
}

/// A message accepted onto the queue.
struct Admitted {
    exchange: Option<(ExchangeGuard, oneshot::Receiver<JsonRpcResponse>)>,
    session: Option<String>,
}

/// State shared between the transport handle and the HTTP handlers.
struct Shared {
    state: Mutex<SessionState>,
    inbound: mpsc::UnboundedSender<Inbound>,
    shutdown: CancellationToken,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Validates and queues one message.
    ///
    /// The session check, the duplicate-id check, session minting for
    /// `initialize` and the enqueue all happen under one lock, so a refused
    /// message leaves no trace.
    fn admit(
        self: &Arc<Self>,
        request: JsonRpcRequest,
        presented: Option<&str>,
    ) -> Result<Admitted, Rejection> {
        let initialize = request.method == INITIALIZE;
        let mut state = self.lock();

        if !state.attached || self.shutdown.is_cancelled() {
            return Err(Rejection::Unavailable);
        }

        if !initialize {
            let valid = match state.session.as_deref() {
                Some(current) => presented == Some(current),
                // notifications may precede the first session
                None => request.is_notification(),
            };
            if !valid {
                return Err(Rejection::InvalidSession(request.id));
            }
        }

        let seq = match &request.id {
            Some(id) if state.pending.contains_key(id) => {
                return Err(Rejection::DuplicateId(id.clone()));
            }
            Some(_) => {
                let seq = state.next_seq;
                state.next_seq = seq.wrapping_add(1);
                Some(seq)
            }
            None => None,
        };

        let id = request.id.clone();
        if self.inbound.send(Inbound { seq, request }).is_err() {
            return Err(Rejection::Unavailable);
        }

        let exchange = match (id, seq) {
            (Some(id), Some(seq)) => {
                let (reply, rx) = oneshot::channel();
                state.pending.insert(id.clone(), Pending { seq, reply });
                let guard = ExchangeGuard {
                    shared: Arc::clone(self),
                    id,
                    seq,
                };
                Some((guard, rx))
            }
            _ => None,
        };

        let session = initialize.then(|| {
            let id = uuid::Uuid::new_v4().to_string();
            if state.session.replace(id.clone()).is_some() {
                tracing::info!(session = %id, "Replacing MCP session");
            } else {
                tracing::info!(session = %id, "MCP session started");
            }
            id
        });

        Ok(Admitted { exchange, session })
    }

    /// Marks a queued request as handed to the loop.
    ///
    /// Returns `false` if its exchange has ended, in which case the request
    /// must not be served.
    fn claim(&self, id: &RequestId, seq: u64) -> bool {
        let mut state = self.lock();
        if state.pending.get(id).is_some_and(|p| p.seq == seq) {
            state.dispatched.insert(id.clone(), seq);
            true
        } else {
            false
        }
    }

    /// Takes the reply channel for a dispatched request, if its caller is
    /// still the one that sent it.
    fn take_reply(&self, id: &RequestId) -> Option<oneshot::Sender<JsonRpcResponse>> {
        let mut state = self.lock();
        let seq = state.dispatched.remove(id)?;
        if state.pending.get(id).is_some_and(|p| p.seq == seq) {
            state.pending.remove(id).map(|p| p.reply)
        } else {
            None
        }
    }

    /// Fails every outstanding exchange. Returns how many there were.
    fn fail_pending(state: &mut SessionState) -> usize {
        let count = state.pending.len();
        state.pending.clear();
        state.dispatched.clear();
        count
    }
}

/// Removes a pending exchange when its HTTP call ends, however it ends.
struct ExchangeGuard {
    shared: Arc<Shared>,
    id: RequestId,
    seq: u64,
}

impl Drop for ExchangeGuard {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        // the slot may already hold a newer exchange for the same id
        if state.pending.get(&self.id).is_some_and(|p| p.seq == self.seq) {
            state.pending.remove(&self.id);
            tracing::debug!(id = %self.id, "Dropped pending HTTP exchange");
        }
    }
}

struct Bound {
    local_addr: SocketAddr,
    endpoint: String,
    server: JoinHandle<()>,
}

/// HTTP transport for the MCP server.
pub struct HttpTransport {
    host: String,
    port: u16,
    path: String,
    shared: Arc<Shared>,
    inbound: tokio::sync::Mutex<mpsc::UnboundedReceiver<Inbound>>,
    bound: Mutex<Option<Bound>>,
}

impl HttpTransport {
    /// Creates an unstarted transport from the HTTP settings in `options`.
    #[must_use]
    pub fn new(options: &ServerOptions) -> Self {
        let path = if options.http_path.starts_with('/') {
            options.http_path.clone()
        } else {
            format!("/{}", options.http_path)
        };
        let (tx, rx) = mpsc::unbounded_channel();

        Self {
            host: options.http_host.clone(),
            port: options.http_port,
            path,
            shared: Arc::new(Shared {
                state: Mutex::new(SessionState::default()),
                inbound: tx,
                shutdown: CancellationToken::new(),
            }),
            inbound: tokio::sync::Mutex::new(rx),
            bound: Mutex::new(None),
        }
    }

    fn bound(&self) -> MutexGuard<'_, Option<Bound>> {
        self.bound.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Binds the listener and starts serving.
    ///
    /// If the configured port is in use, the next port is tried once.
    ///
    /// # Errors
    ///
    /// Returns an error if the host does not resolve, if neither port can be
    /// bound, or if the transport was already started.
    pub async fn start(&self) -> Result<SocketAddr, TransportError> {
        if self.bound().is_some() {
            return Err(TransportError::AlreadyStarted);
        }

        let listener = bind_with_fallback(&self.host, self.port).await?;
        let local_addr = listener.local_addr()?;
        let endpoint = endpoint_url(&self.host, local_addr.port(), &self.path);

        let app = Router::new()
            .route(&self.path, any(handle_mcp))
            .with_state(Arc::clone(&self.shared));

        let token = self.shared.shutdown.clone();
        let server = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
            }
        });

        let mut bound = self.bound();
        if bound.is_some() {
            // lost a race with a concurrent start
            server.abort();
            return Err(TransportError::AlreadyStarted);
        }
        tracing::info!(endpoint = %endpoint, "HTTP transport listening");
        *bound = Some(Bound {
            local_addr,
            endpoint,
            server,
        });

        Ok(local_addr)
    }

    /// Port actually bound, once started.
    #[must_use]
    pub fn actual_port(&self) -> Option<u16> {
        self.bound().as_ref().map(|b| b.local_addr.port())
    }

    /// Full endpoint URL, once started.
    #[must_use]
    pub fn endpoint(&self) -> Option<String> {
        self.bound().as_ref().map(|b| b.endpoint.clone())
    }

    /// Socket address actually bound, once started.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.bound().as_ref().map(|b| b.local_addr)
    }

    /// Current session id, if a client has initialized.
    #[must_use]
    pub fn session_id(&self) -> Option<String> {
        self.shared.lock().session.clone()
    }

    /// Whether a server loop is consuming requests.
    ///
    /// While detached, every message is answered `503 Service Unavailable`.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.shared.lock().attached
    }

    /// Stops the listener and fails every outstanding exchange.
    ///
    /// After this, [`Transport::read_request`] reports end-of-stream.
    pub async fn close(&self) {
        self.shared.shutdown.cancel();

        let dropped = {
            let mut state = self.shared.lock();
            state.session = None;
            Shared::fail_pending(&mut state)
        };
        if dropped > 0 {
            tracing::debug!(count = dropped, "Failed outstanding HTTP exchanges");
        }

        let server = self.bound().take().map(|b| b.server);
        if let Some(mut server) = server {
            if tokio::time::timeout(CLOSE_TIMEOUT, &mut server).await.is_err() {
                tracing::warn!("HTTP server did not stop in time, aborting");
                server.abort();
            }
        }
        tracing::info!("HTTP transport closed");
    }
}

impl Drop for HttpTransport {
    fn drop(&mut self) {
        self.shared.shutdown.cancel();
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn read_request(&self) -> Result<Option<JsonRpcRequest>, TransportError> {
        let mut inbound = self.inbound.lock().await;
        loop {
            let message = tokio::select! {
                biased;
                () = self.shared.shutdown.cancelled() => return Ok(None),
                message = inbound.recv() => message,
            };
            let Some(Inbound { seq, request }) = message else {
                return Ok(None);
            };
            let (Some(seq), Some(id)) = (seq, request.id.clone()) else {
                return Ok(Some(request));
            };
            if self.shared.claim(&id, seq) {
                return Ok(Some(request));
            }
            tracing::debug!(id = %id, "Skipping request whose HTTP caller has gone");
        }
    }

    async fn write_response(&self, response: JsonRpcResponse) -> Result<(), TransportError> {
        let Some(id) = response.id.clone() else {
            tracing::warn!("Dropping HTTP response without an id");
            return Ok(());
        };

        match self.shared.take_reply(&id) {
            Some(reply) => {
                if reply.send(response).is_err() {
                    tracing::debug!(id = %id, "HTTP caller went away before the response");
                }
            }
            None => tracing::debug!(id = %id, "HTTP exchange ended before the response"),
        }
        Ok(())
    }

    async fn write_notification(
        &self,
        method: &str,
        _params: Option<Value>,
    ) -> Result<(), TransportError> {
        tracing::debug!(method, "HTTP transport has no notification stream, dropping");
        Ok(())
    }

    fn attach(&self) {
        self.shared.lock().attached = true;
        tracing::debug!("Server loop attached to HTTP transport");
    }

    fn detach(&self) {
        let dropped = {
            let mut state = self.shared.lock();
            state.attached = false;
            Shared::fail_pending(&mut state)
        };
        // queued messages belong to a loop that no longer exists
        let mut discarded = 0;
        if let Ok(mut inbound) = self.inbound.try_lock() {
            while inbound.try_recv().is_ok() {
                discarded += 1;
            }
        }
        tracing::debug!(
            failed = dropped,
            discarded,
            "Server loop detached from HTTP transport"
        );
    }
}

/// Resolves `host` (preferring IPv4) and binds, retrying once on `port + 1`.
async fn bind_with_fallback(host: &str, port: u16) -> Result<TcpListener, TransportError> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port)).await?.collect();
    let addr = addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| TransportError::Resolve {
            host: host.to_string(),
            port,
        })?;

    match TcpListener::bind(addr).await {
        Ok(listener) => Ok(listener),
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            let Some(next) = port.checked_add(1) else {
                return Err(TransportError::Bind { addr, source: e });
            };
            let fallback = SocketAddr::new(addr.ip(), next);
            tracing::warn!(port, fallback = next, "HTTP port in use, trying next port");
            TcpListener::bind(fallback)
                .await
                .map_err(|source| TransportError::Bind {
                    addr: fallback,
                    source,
                })
        }
        Err(source) => Err(TransportError::Bind { addr, source }),
    }
}

fn endpoint_url(host: &str, port: u16, path: &str) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("http://[{host}]:{port}{path}")
    } else {
        format!("http://{host}:{port}{path}")
    }
}

async fn handle_mcp(
    State(shared): State<Arc<Shared>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if method != Method::POST {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, HeaderValue::from_static("POST"))],
        )
            .into_response();
    }
    if shared.shutdown.is_cancelled() {
        return unavailable();
    }

    let request = match std::str::from_utf8(&body)
        .map_err(|e| JsonRpcError::from_code(ErrorCode::ParseError).with_data(e.to_string().into()))
        .and_then(parse_request)
    {
        Ok(request) => request,
        Err(error) => {
            tracing::debug!(error = %error, "Rejecting malformed HTTP message");
            return bad_request(None, error);
        }
    };

    let presented = headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok());

    let Admitted { exchange, session } = match shared.admit(request, presented) {
        Ok(admitted) => admitted,
        Err(Rejection::Unavailable) => return unavailable(),
        Err(Rejection::InvalidSession(id)) => {
            tracing::debug!("Rejecting request without a valid session");
            return bad_request(
                id,
                JsonRpcError::with_message(
                    ErrorCode::InvalidRequest,
                    "Missing or invalid Mcp-Session-Id header",
                ),
            );
        }
        Err(Rejection::DuplicateId(id)) => {
            return bad_request(
                Some(id),
                JsonRpcError::with_message(
                    ErrorCode::InvalidRequest,
                    "A request with this id is already in flight",
                ),
            );
        }
    };

    let Some((guard, reply)) = exchange else {
        return with_session(StatusCode::ACCEPTED.into_response(), session.as_deref());
    };

    let response = tokio::select! {
        () = shared.shutdown.cancelled() => return unavailable(),
        reply = reply => match reply {
            Ok(response) => response,
            Err(_) => return unavailable(),
        },
    };
    drop(guard);

    with_session(Json(response).into_response(), session.as_deref())
}

fn with_session(mut response: Response, session: Option<&str>) -> Response {
    if let Some(value) = session.and_then(|s| HeaderValue::from_str(s).ok()) {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    response
}

fn bad_request(id: Option<RequestId>, error: JsonRpcError) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(JsonRpcResponse::from_error(id, error)),
    )
        .into_response()
}

fn unavailable() -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, "MCP server is shutting down").into_response()
}
