//! Owning context for WebSocket sessions.
//!
//! A [`Client`] holds at most one live [`Session`] at a time, the shared
//! [`CookieJar`], and the many-shot event channel. Each `open()` builds a
//! fresh session; once it reaches `Closed` or `Failed` the client accepts a
//! new `open()`.
//!
//! # Example
//!
//! ```ignore
//! use websocket_ssl_pinning::{Client, ConnectOptions};
//!
//! let client = Client::new();
//! let mut events = client.subscribe();
//!
//! let opened = client
//!     .open("wss://example.com/socket", ConnectOptions::with_certs(["sha256/AAAA"]))?
//!     .await?;
//! assert_eq!(opened.code, 101);
//!
//! client.send("ping")?;
//! let event = events.recv().await?;
//! client.close("bye")?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, warn};
use url::Url;

use crate::cookie::CookieJar;
use crate::domain::DomainKey;
use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::pinning::{ConnectOptions, PinningPolicy};
use crate::protocol::{OpenResponse, SocketEvent};
use crate::transport::{DialRequest, EventHandler, Transport};

use super::builder::ClientBuilder;
use super::machine::Session;
use super::SessionState;

// ============================================================================
// Client
// ============================================================================

/// Owning context for one WebSocket connection at a time.
///
/// Cheap to clone; clones share the same session slot, jar and event
/// channel.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    /// Dials sockets.
    transport: Arc<dyn Transport>,
    /// Cookie store shared by every session.
    jar: Arc<CookieJar>,
    /// Many-shot event channel.
    events: broadcast::Sender<SocketEvent>,
    /// Most recent session.
    current: Mutex<Option<Arc<Session>>>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("session", &*self.inner.current.lock())
            .field("cookies", &self.inner.jar.len())
            .finish_non_exhaustive()
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Client - Constructors
// ============================================================================

impl Client {
    /// Creates a client with the default `tokio-tungstenite` transport.
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(super::builder::DEFAULT_EVENT_CAPACITY);
        Self::from_parts(
            Arc::new(crate::transport::TungsteniteTransport::new()),
            Arc::new(CookieJar::new()),
            events,
        )
    }

    /// Creates a builder for custom configuration.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(crate) fn from_parts(
        transport: Arc<dyn Transport>,
        jar: Arc<CookieJar>,
        events: broadcast::Sender<SocketEvent>,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                transport,
                jar,
                events,
                current: Mutex::new(None),
            }),
        }
    }
}

// ============================================================================
// Client - Commands
// ============================================================================

impl Client {
    /// Starts a connection to `url`.
    ///
    /// Validation is synchronous: every error below is returned before any
    /// dial. The handshake outcome is delivered through the returned
    /// [`PendingOpen`].
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyOpen`] if a session is connecting, open or closing
    /// - [`Error::MalformedUrl`] if `url` does not parse or has no host
    /// - [`Error::MissingPinningConfig`], [`Error::MissingCertsField`] or
    ///   [`Error::EmptyCertificateSet`] for an unusable pinning section
    /// - [`Error::UnsupportedScheme`] for anything but `wss://` (`ws://` is
    ///   allowed only with security disabled)
    /// - [`Error::InvalidHeader`] for a malformed extra header
    pub fn open(&self, url: &str, options: ConnectOptions) -> Result<PendingOpen> {
        let mut current = self.inner.current.lock();
        if let Some(session) = current.as_ref()
            && session.state().is_live()
        {
            debug!(session_id = %session.id(), "open() rejected, session is live");
            return Err(Error::AlreadyOpen);
        }

        let parsed = Url::parse(url).map_err(|e| Error::malformed_url(url, e.to_string()))?;
        let domain = DomainKey::parse(url)?;
        let policy = PinningPolicy::resolve(domain.clone(), &options)?;

        match parsed.scheme() {
            "wss" => {}
            "ws" if policy.disable_all_security() => {}
            other => return Err(Error::unsupported_scheme(other)),
        }

        let headers = options.validated_headers()?;
        let host = parsed.host_str().unwrap_or_default().to_string();
        let cookies = self.inner.jar.load_for_request(&host);

        let session = Session::new(
            parsed.clone(),
            domain,
            policy.clone(),
            Arc::clone(&self.inner.jar),
            self.inner.events.clone(),
        );
        let rx = session.begin_connect();
        *current = Some(Arc::clone(&session));
        drop(current);

        debug!(
            session_id = %session.id(),
            host = %host,
            cookies = cookies.len(),
            pins = policy.pins().len(),
            "Dialing"
        );

        let request = DialRequest {
            session_id: session.id(),
            url: parsed,
            policy,
            cookies,
            headers,
            timeout: options.timeout_duration(),
            cancel: session.cancellation(),
        };
        let session_id = session.id();
        let handler: EventHandler = Arc::new(move |event| session.handle(event));
        self.inner.transport.dial(request, handler);

        Ok(PendingOpen { session_id, rx })
    }

    /// Sends a text message on the open session.
    ///
    /// # Errors
    ///
    /// - [`Error::NotInitialized`] unless a session is open
    /// - [`Error::Send`] if the write fails; the session becomes `Failed`
    pub fn send(&self, message: &str) -> Result<()> {
        self.current()
            .ok_or(Error::NotInitialized)?
            .send(message)
    }

    /// Closes the current session with code 1000 and `reason`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] if no session is connecting, open
    /// or closing.
    pub fn close(&self, reason: &str) -> Result<()> {
        self.current()
            .ok_or(Error::NotInitialized)?
            .close(reason)
    }

    /// Returns the stored cookies for a domain or URL as `name -> value`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedUrl`] if the input cannot be normalized.
    pub fn get_cookies(&self, domain_or_url: &str) -> Result<FxHashMap<String, String>> {
        self.inner.jar.get_cookies(domain_or_url)
    }

    /// Removes every stored cookie named `name`, across all hosts.
    pub fn remove_cookie_by_name(&self, name: &str) {
        self.inner.jar.remove_cookie_by_name(name);
    }
}

// ============================================================================
// Client - Accessors
// ============================================================================

impl Client {
    /// Subscribes to message, close and failure events.
    ///
    /// Events emitted before subscribing are not replayed.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SocketEvent> {
        self.inner.events.subscribe()
    }

    /// Returns the state of the most recent session, or `Idle` if none.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.current().map_or(SessionState::Idle, |s| s.state())
    }

    /// Returns the id of the most recent session.
    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        self.current().map(|s| s.id())
    }

    /// Returns the normalized domain of the most recent session.
    #[must_use]
    pub fn domain(&self) -> Option<DomainKey> {
        self.current().map(|s| s.domain().clone())
    }

    /// Returns the trust policy of the most recent session.
    #[must_use]
    pub fn policy(&self) -> Option<PinningPolicy> {
        self.current().map(|s| s.policy().clone())
    }

    /// Returns the shared cookie jar.
    #[inline]
    #[must_use]
    pub fn cookie_jar(&self) -> &Arc<CookieJar> {
        &self.inner.jar
    }

    fn current(&self) -> Option<Arc<Session>> {
        self.inner.current.lock().clone()
    }
}

// ============================================================================
// PendingOpen
// ============================================================================

/// One-shot result of [`Client::open`].
///
/// Resolves exactly once: to the [`OpenResponse`] when the handshake
/// succeeds, to [`Error::ConnectFailure`] when it fails, or to
/// [`Error::OpenCancelled`] when the session is closed first.
#[must_use = "the open result is only observable by awaiting it"]
pub struct PendingOpen {
    session_id: SessionId,
    rx: oneshot::Receiver<Result<OpenResponse>>,
}

impl PendingOpen {
    /// Returns the id of the session being opened.
    #[inline]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }
}

impl fmt::Debug for PendingOpen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingOpen")
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

impl Future for PendingOpen {
    type Output = Result<OpenResponse>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let session_id = self.session_id;
        Pin::new(&mut self.rx).poll(cx).map(|received| {
            received.unwrap_or_else(|_| {
                warn!(session_id = %session_id, "Open abandoned before completion");
                Err(Error::OpenCancelled)
            })
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::Ordering;

    use crate::cookie::CookieSink;
    use crate::transport::mock::MockTransport;
    use crate::transport::{HandshakeResponse, TransportEvent};

    const URL: &str = "wss://example.com/socket";

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn client() -> (Client, Arc<MockTransport>) {
        init_tracing();
        let transport = Arc::new(MockTransport::default());
        let client = Client::builder()
            .transport(Arc::clone(&transport))
            .build()
            .unwrap();
        (client, transport)
    }

    fn pinned() -> ConnectOptions {
        ConnectOptions::with_certs(["sha256/AAAA"])
    }

    // ------------------------------------------------------------------------
    // open()
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_open_success_reports_handshake() {
        let (client, transport) = client();

        let pending = client.open(URL, pinned()).unwrap();
        assert_eq!(client.state(), SessionState::Connecting);
        assert_eq!(client.session_id(), Some(pending.session_id()));
        assert_eq!(transport.dial_count(), 1);

        transport.open(&[]);
        let response = pending.await.unwrap();

        assert_eq!(response.status, OpenResponse::OPENED);
        assert_eq!(response.code, 101);
        assert_eq!(response.message, "Switching Protocols");
        assert_eq!(client.state(), SessionState::Open);
        assert_eq!(client.domain().unwrap().as_str(), "example.com");
    }

    #[test]
    fn test_pending_open_resolves_without_runtime() -> anyhow::Result<()> {
        let (client, transport) = client();

        let pending = client.open(URL, pinned())?;
        transport.open(&[]);

        let response = tokio_test::block_on(pending)?;
        assert_eq!(response.code, 101);
        assert_eq!(client.state(), SessionState::Open);
        Ok(())
    }

    #[tokio::test]
    async fn test_open_twice_is_rejected_without_dial() {
        let (client, transport) = client();

        let _pending = client.open(URL, pinned()).unwrap();
        let first = client.session_id();

        let err = client.open(URL, pinned()).unwrap_err();
        assert!(matches!(err, Error::AlreadyOpen));
        assert_eq!(transport.dial_count(), 1);
        assert_eq!(client.session_id(), first);
        assert_eq!(client.state(), SessionState::Connecting);

        transport.open(&[]);
        assert!(matches!(client.open(URL, pinned()), Err(Error::AlreadyOpen)));
        assert_eq!(client.state(), SessionState::Open);
        assert_eq!(transport.dial_count(), 1);
    }

    #[tokio::test]
    async fn test_open_with_empty_certs_never_dials() {
        let (client, transport) = client();

        let err = client
            .open(URL, ConnectOptions::with_certs(Vec::<String>::new()))
            .unwrap_err();

        assert!(matches!(err, Error::EmptyCertificateSet));
        assert_eq!(transport.dial_count(), 0);
        assert_eq!(client.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_open_configuration_errors() {
        let (client, transport) = client();

        assert!(matches!(
            client.open(URL, ConnectOptions::new()),
            Err(Error::MissingPinningConfig)
        ));
        assert!(matches!(
            client.open(URL, ConnectOptions::from_json(r#"{"sslPinning":{}}"#).unwrap()),
            Err(Error::MissingCertsField)
        ));
        assert!(matches!(
            client.open("not a url", pinned()),
            Err(Error::MalformedUrl { .. })
        ));
        assert!(matches!(
            client.open("https://example.com", pinned()),
            Err(Error::UnsupportedScheme { .. })
        ));
        assert!(matches!(
            client.open("ws://example.com", pinned()),
            Err(Error::UnsupportedScheme { .. })
        ));
        assert!(matches!(
            client.open(URL, pinned().header("bad header", "v")),
            Err(Error::InvalidHeader { .. })
        ));
        assert_eq!(transport.dial_count(), 0);
    }

    #[tokio::test]
    async fn test_open_plain_ws_when_security_disabled() {
        let (client, transport) = client();

        let insecure = ConnectOptions::with_certs(Vec::<String>::new()).disable_all_security();
        let _pending = client.open("ws://127.0.0.1:9000", insecure).unwrap();

        assert_eq!(transport.dial_count(), 1);
        assert!(transport.last_request().policy.disable_all_security());
    }

    #[tokio::test]
    async fn test_security_override_needs_pinning_section() {
        let (client, transport) = client();

        assert!(matches!(
            client.open("ws://127.0.0.1:9000", ConnectOptions::new().disable_all_security()),
            Err(Error::MissingPinningConfig)
        ));
        assert_eq!(transport.dial_count(), 0);
    }

    #[tokio::test]
    async fn test_open_failure_reports_connect_failure() {
        let (client, transport) = client();

        let pending = client.open(URL, pinned()).unwrap();
        transport.emit(TransportEvent::Failed {
            message: "certificate pin mismatch".to_string(),
        });

        let err = pending.await.unwrap_err();
        assert!(matches!(err, Error::ConnectFailure { .. }));
        assert!(err.to_string().contains("certificate pin mismatch"));
        assert_eq!(client.state(), SessionState::Failed);
    }

    #[tokio::test]
    async fn test_dial_request_carries_options() {
        let (client, transport) = client();

        let _pending = client
            .open(
                URL,
                pinned()
                    .timeout(std::time::Duration::from_millis(750))
                    .header("X-Token", "abc"),
            )
            .unwrap();

        let request = transport.last_request();
        assert_eq!(request.url.as_str(), URL);
        assert_eq!(request.policy.domain().as_str(), "example.com");
        assert!(request.policy.pins().contains("sha256/AAAA"));
        assert_eq!(request.timeout, Some(std::time::Duration::from_millis(750)));
        assert_eq!(request.headers[0].0.as_str(), "x-token");
    }

    // ------------------------------------------------------------------------
    // Reuse
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_reopen_after_close() {
        let (client, transport) = client();

        let pending = client.open(URL, pinned()).unwrap();
        transport.open(&[]);
        pending.await.unwrap();

        client.close("done").unwrap();
        assert_eq!(client.state(), SessionState::Closed);

        let pending = client.open(URL, pinned()).unwrap();
        assert_eq!(transport.dial_count(), 2);
        assert_eq!(client.state(), SessionState::Connecting);

        transport.open(&[]);
        assert_eq!(pending.await.unwrap().code, 101);
        assert_eq!(client.state(), SessionState::Open);
    }

    #[tokio::test]
    async fn test_reopen_after_failure() {
        let (client, transport) = client();

        let pending = client.open(URL, pinned()).unwrap();
        transport.emit(TransportEvent::Failed {
            message: "refused".to_string(),
        });
        assert!(pending.await.is_err());

        let _pending = client.open(URL, pinned()).unwrap();
        assert_eq!(transport.dial_count(), 2);
    }

    // ------------------------------------------------------------------------
    // send()
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_send_requires_open_session() {
        let (client, transport) = client();

        assert!(matches!(client.send("ping"), Err(Error::NotInitialized)));

        let pending = client.open(URL, pinned()).unwrap();
        assert!(matches!(client.send("ping"), Err(Error::NotInitialized)));

        let socket = transport.open(&[]);
        pending.await.unwrap();

        client.send("ping").unwrap();
        assert_eq!(*socket.writes.lock(), vec!["ping".to_string()]);
    }

    #[tokio::test]
    async fn test_send_failure_fails_session() {
        let (client, transport) = client();

        let pending = client.open(URL, pinned()).unwrap();
        let socket = transport.open(&[]);
        pending.await.unwrap();

        socket.fail_writes.store(true, Ordering::SeqCst);
        let err = client.send("ping").unwrap_err();
        assert!(matches!(err, Error::Send { .. }));
        assert_eq!(client.state(), SessionState::Failed);

        assert!(matches!(client.send("again"), Err(Error::NotInitialized)));
        assert!(client.open(URL, pinned()).is_ok());
    }

    // ------------------------------------------------------------------------
    // close()
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_close_requires_live_session() {
        let (client, transport) = client();

        assert!(matches!(client.close("x"), Err(Error::NotInitialized)));

        let pending = client.open(URL, pinned()).unwrap();
        let socket = transport.open(&[]);
        pending.await.unwrap();

        client.close("bye").unwrap();
        assert_eq!(*socket.closes.lock(), vec![(1000, "bye".to_string())]);
        assert!(matches!(client.close("again"), Err(Error::NotInitialized)));
        assert!(matches!(client.send("late"), Err(Error::NotInitialized)));
        assert_eq!(socket.closes.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_close_while_connecting_cancels_open() {
        let (client, transport) = client();
        let mut events = client.subscribe();

        let pending = client.open(URL, pinned()).unwrap();
        assert!(!transport.last_request().cancel.is_cancelled());

        client.close("abort").unwrap();
        assert_eq!(client.state(), SessionState::Closed);
        assert!(transport.last_request().cancel.is_cancelled());
        assert!(matches!(pending.await, Err(Error::OpenCancelled)));

        // A handshake that still completes is closed with the caller's reason.
        let socket = transport.open(&[]);
        assert_eq!(client.state(), SessionState::Closed);
        assert_eq!(*socket.closes.lock(), vec![(1000, "abort".to_string())]);
        assert!(events.try_recv().is_err());

        // A late failure is ignored too.
        transport.emit(TransportEvent::Failed {
            message: "late".to_string(),
        });
        assert_eq!(client.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_stale_events_do_not_reach_new_session() {
        let (client, transport) = client();

        let _first = client.open(URL, pinned()).unwrap();
        client.close("abort").unwrap();

        let second = client.open(URL, pinned()).unwrap();
        transport.emit_to(
            0,
            TransportEvent::Failed {
                message: "stale".to_string(),
            },
        );
        assert_eq!(client.state(), SessionState::Connecting);

        transport.open(&[]);
        assert_eq!(second.await.unwrap().code, 101);
    }

    // ------------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_inbound_message_event() {
        let (client, transport) = client();
        let mut events = client.subscribe();

        let pending = client.open(URL, pinned()).unwrap();
        transport.open(&[]);
        pending.await.unwrap();

        transport.emit(TransportEvent::Message {
            text: "hello".to_string(),
        });

        let event = events.recv().await.unwrap();
        assert_eq!(
            event,
            SocketEvent::Message {
                text: "hello".to_string()
            }
        );
        assert_eq!(client.state(), SessionState::Open);
    }

    #[tokio::test]
    async fn test_peer_close_is_acknowledged() {
        let (client, transport) = client();
        let mut events = client.subscribe();

        let pending = client.open(URL, pinned()).unwrap();
        let socket = transport.open(&[]);
        pending.await.unwrap();

        transport.emit(TransportEvent::Closing {
            code: 1001,
            reason: "going away".to_string(),
        });
        assert_eq!(client.state(), SessionState::Closing);
        assert_eq!(*socket.closes.lock(), vec![(1000, String::new())]);
        assert!(matches!(client.send("x"), Err(Error::NotInitialized)));

        transport.emit(TransportEvent::Closed {
            code: 1001,
            reason: "going away".to_string(),
        });
        assert_eq!(client.state(), SessionState::Closed);

        let event = events.recv().await.unwrap();
        assert_eq!(
            event,
            SocketEvent::Closed {
                code: 1001,
                reason: "going away".to_string()
            }
        );

        assert!(client.open(URL, pinned()).is_ok());
    }

    #[tokio::test]
    async fn test_failure_after_open_emits_failure_event() {
        let (client, transport) = client();
        let mut events = client.subscribe();

        let pending = client.open(URL, pinned()).unwrap();
        transport.open(&[]);
        pending.await.unwrap();

        transport.emit(TransportEvent::Failed {
            message: "connection reset".to_string(),
        });

        assert_eq!(client.state(), SessionState::Failed);
        assert_eq!(
            events.recv().await.unwrap(),
            SocketEvent::Failure {
                message: "connection reset".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_failure_while_closing_reports_abnormal_close() {
        let (client, transport) = client();
        let mut events = client.subscribe();

        let pending = client.open(URL, pinned()).unwrap();
        transport.open(&[]);
        pending.await.unwrap();

        transport.emit(TransportEvent::Closing {
            code: 1000,
            reason: String::new(),
        });
        transport.emit(TransportEvent::Failed {
            message: "eof".to_string(),
        });

        assert_eq!(client.state(), SessionState::Closed);
        assert_eq!(
            events.recv().await.unwrap(),
            SocketEvent::Closed {
                code: 1006,
                reason: "eof".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_closed_during_handshake_fails_open() {
        let (client, transport) = client();

        let pending = client.open(URL, pinned()).unwrap();
        transport.emit(TransportEvent::Closed {
            code: 1006,
            reason: String::new(),
        });

        assert!(matches!(pending.await, Err(Error::ConnectFailure { .. })));
        assert_eq!(client.state(), SessionState::Failed);
    }

    // ------------------------------------------------------------------------
    // Cookies
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_handshake_cookies_are_stored_and_readable() {
        let (client, transport) = client();

        let pending = client.open(URL, pinned()).unwrap();
        transport.open(&["sid=abc; Path=/", "theme=dark"]);
        pending.await.unwrap();

        let cookies = client.get_cookies("example.com").unwrap();
        assert_eq!(cookies.get("sid").map(String::as_str), Some("abc"));
        assert_eq!(cookies.get("theme").map(String::as_str), Some("dark"));
        assert_eq!(client.get_cookies("https://example.com/x").unwrap().len(), 2);

        client.remove_cookie_by_name("sid");
        let cookies = client.get_cookies("example.com").unwrap();
        assert!(!cookies.contains_key("sid"));
        assert_eq!(cookies.len(), 1);
    }

    /// Sink that reads the client state back while persisting.
    #[derive(Default)]
    struct StateReadingSink {
        client: Mutex<Option<Client>>,
        seen: Mutex<Vec<SessionState>>,
    }

    impl CookieSink for StateReadingSink {
        fn persist(&self, _uri: &str, _set_cookie: &str) {
            let client = self.client.lock().clone();
            if let Some(client) = client {
                self.seen.lock().push(client.state());
            }
        }
    }

    #[test]
    fn test_cookie_sink_may_query_client() {
        init_tracing();
        let transport = Arc::new(MockTransport::default());
        let sink = Arc::new(StateReadingSink::default());
        let client = Client::builder()
            .transport(Arc::clone(&transport))
            .cookie_sink(Arc::clone(&sink))
            .build()
            .unwrap();
        *sink.client.lock() = Some(client.clone());

        let pending = client.open(URL, pinned()).unwrap();

        let (done_tx, done_rx) = std::sync::mpsc::channel();
        let opener = Arc::clone(&transport);
        std::thread::spawn(move || {
            opener.open(&["sid=abc"]);
            let _ = done_tx.send(());
        });
        assert!(
            done_rx
                .recv_timeout(std::time::Duration::from_secs(3))
                .is_ok(),
            "cookie sink blocked on the session lock"
        );

        let response = tokio_test::block_on(pending).unwrap();
        assert_eq!(response.code, 101);
        assert_eq!(*sink.seen.lock(), vec![SessionState::Open]);
        assert_eq!(client.get_cookies("example.com").unwrap().len(), 1);

        sink.client.lock().take();
    }

    #[tokio::test]
    async fn test_pinned_open_with_no_cookies() {
        let (client, transport) = client();

        let pending = client.open(URL, pinned()).unwrap();
        transport.emit(TransportEvent::Opened {
            socket: Arc::new(crate::transport::mock::MockSocket::default()),
            response: HandshakeResponse::switching_protocols(),
        });

        let response = pending.await.unwrap();
        assert_eq!((response.code, response.message.as_str()), (101, "Switching Protocols"));
        assert_eq!(client.state(), SessionState::Open);
        assert!(client.get_cookies("example.com").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stored_cookies_attach_to_next_dial() {
        let (client, transport) = client();

        let pending = client.open(URL, pinned()).unwrap();
        transport.open(&["sid=abc"]);
        pending.await.unwrap();
        client.close("done").unwrap();

        let _pending = client.open(URL, pinned()).unwrap();
        let request = transport.last_request();
        assert_eq!(request.cookies.len(), 1);
        assert_eq!(request.cookies[0].pair(), "sid=abc");
    }

    #[tokio::test]
    async fn test_cookies_keyed_by_raw_host() {
        let (client, transport) = client();

        let pending = client.open("wss://www.example.com/ws", pinned()).unwrap();
        transport.open(&["sid=abc"]);
        pending.await.unwrap();

        assert_eq!(client.cookie_jar().load_for_request("www.example.com").len(), 1);
        assert!(client.cookie_jar().load_for_request("example.com").is_empty());
        assert!(client.get_cookies("www.example.com").unwrap().is_empty());
    }
}
