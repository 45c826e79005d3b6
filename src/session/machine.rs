//! Single-connection session state machine.
//!
//! A [`Session`] is created per connection attempt and reconciles caller
//! commands (`send`, `close`) with transport events (open, failure,
//! message, close) under one per-session lock. Once it reaches `Closed` or
//! `Failed` its socket handle is released and every command is rejected.
//!
//! # Thread Safety
//!
//! Transport events arrive on the transport's I/O task while commands arrive
//! from the caller. State changes happen under the lock; calls into the
//! [`Socket`], the cookie sink and the `open()` waiter are made after the
//! lock is released, so a transport may deliver events synchronously from
//! inside `write` or `close`, and a sink may query the client.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::cookie::{CookieJar, CookieRecord};
use crate::domain::DomainKey;
use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::pinning::PinningPolicy;
use crate::protocol::{OpenResponse, SocketEvent};
use crate::transport::{
    ABNORMAL_CLOSURE, HandshakeResponse, NORMAL_CLOSURE, Socket, TransportEvent,
};

use super::SessionState;

// ============================================================================
// Types
// ============================================================================

/// Sender half of the one-shot `open()` result.
type OpenSender = oneshot::Sender<Result<OpenResponse>>;

/// Mutable session state, guarded by the session lock.
struct SessionInner {
    /// Current lifecycle state.
    state: SessionState,
    /// Socket handle, present only while `Open` or `Closing`.
    socket: Option<Arc<dyn Socket>>,
    /// Pending `open()` result, present only while `Connecting`.
    open_tx: Option<OpenSender>,
    /// Reason given to `close()`, reused for a socket that opens late.
    close_reason: Option<String>,
}

/// Work to do once the lock is released.
enum Deferred {
    /// Close a socket with code 1000.
    Close {
        socket: Arc<dyn Socket>,
        reason: String,
    },
    /// Stop the in-flight dial.
    Abort,
    /// Store handshake cookies, then resolve `open()`.
    Opened {
        tx: Option<OpenSender>,
        response: OpenResponse,
        cookies: Vec<CookieRecord>,
    },
}

// ============================================================================
// Session
// ============================================================================

/// One connection attempt and the socket it becomes.
pub(crate) struct Session {
    /// Unique identifier.
    id: SessionId,
    /// Target URL.
    url: Url,
    /// Normalized domain of `url`.
    domain: DomainKey,
    /// Trust policy the socket was dialed with.
    policy: PinningPolicy,
    /// Jar receiving handshake cookies.
    jar: Arc<CookieJar>,
    /// Many-shot event channel.
    events: broadcast::Sender<SocketEvent>,
    /// Cancels the dial when the attempt is abandoned.
    cancel: CancellationToken,
    /// Guarded state.
    inner: Mutex<SessionInner>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("domain", &self.domain)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Session - Constructor
// ============================================================================

impl Session {
    /// Creates an idle session.
    pub(crate) fn new(
        url: Url,
        domain: DomainKey,
        policy: PinningPolicy,
        jar: Arc<CookieJar>,
        events: broadcast::Sender<SocketEvent>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: SessionId::generate(),
            url,
            domain,
            policy,
            jar,
            events,
            cancel: CancellationToken::new(),
            inner: Mutex::new(SessionInner {
                state: SessionState::Idle,
                socket: None,
                open_tx: None,
                close_reason: None,
            }),
        })
    }

    /// Moves `Idle` to `Connecting` and returns the `open()` result channel.
    pub(crate) fn begin_connect(&self) -> oneshot::Receiver<Result<OpenResponse>> {
        let (tx, rx) = oneshot::channel();
        let mut inner = self.inner.lock();
        debug_assert_eq!(inner.state, SessionState::Idle);
        inner.state = SessionState::Connecting;
        inner.open_tx = Some(tx);

        debug!(session_id = %self.id, domain = %self.domain, "Session connecting");
        rx
    }
}

// ============================================================================
// Session - Accessors
// ============================================================================

impl Session {
    #[inline]
    pub(crate) fn id(&self) -> SessionId {
        self.id
    }

    #[inline]
    pub(crate) fn domain(&self) -> &DomainKey {
        &self.domain
    }

    #[inline]
    pub(crate) fn policy(&self) -> &PinningPolicy {
        &self.policy
    }

    /// Returns the token the transport watches while dialing.
    pub(crate) fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Returns the current state.
    #[inline]
    pub(crate) fn state(&self) -> SessionState {
        self.inner.lock().state
    }
}

// ============================================================================
// Session - Commands
// ============================================================================

impl Session {
    /// Writes `message` to the open socket.
    ///
    /// A local write failure fails the session.
    ///
    /// # Errors
    ///
    /// - [`Error::NotInitialized`] unless the session is `Open`
    /// - [`Error::Send`] if the transport rejects the write
    pub(crate) fn send(&self, message: &str) -> Result<()> {
        let socket = {
            let inner = self.inner.lock();
            if !inner.state.can_send() {
                return Err(Error::NotInitialized);
            }
            inner.socket.clone().ok_or(Error::NotInitialized)?
        };

        match socket.write(message) {
            Ok(()) => {
                trace!(session_id = %self.id, len = message.len(), "Message sent");
                Ok(())
            }
            Err(e) => {
                let err = match e {
                    Error::Send { .. } => e,
                    other => Error::send(other.to_string()),
                };
                warn!(session_id = %self.id, error = %err, "Write failed");

                let mut inner = self.inner.lock();
                let same_socket = inner
                    .socket
                    .as_ref()
                    .is_some_and(|current| Arc::ptr_eq(current, &socket));
                if inner.state == SessionState::Open && same_socket {
                    inner.state = SessionState::Failed;
                    inner.socket = None;
                }
                Err(err)
            }
        }
    }

    /// Closes the session with code 1000 and `reason`.
    ///
    /// Accepted while `Connecting`, `Open` or `Closing`. Closing a
    /// `Connecting` session abandons the attempt: the dial is cancelled, its
    /// `open()` result resolves to [`Error::OpenCancelled`], and a socket
    /// that still opens is closed with the same `reason`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] in any other state.
    pub(crate) fn close(&self, reason: &str) -> Result<()> {
        let deferred = {
            let mut inner = self.inner.lock();
            if !inner.state.can_close() {
                return Err(Error::NotInitialized);
            }

            let previous = inner.state;
            inner.state = SessionState::Closed;
            inner.close_reason = Some(reason.to_string());
            // Dropping the sender resolves `open()` as cancelled.
            inner.open_tx = None;

            info!(session_id = %self.id, from = %previous, "Session closed by caller");

            match inner.socket.take() {
                Some(socket) => Deferred::Close {
                    socket,
                    reason: reason.to_string(),
                },
                None => Deferred::Abort,
            }
        };

        self.finish(deferred);
        Ok(())
    }
}

// ============================================================================
// Session - Transport Events
// ============================================================================

impl Session {
    /// Applies one transport event.
    pub(crate) fn handle(&self, event: TransportEvent) {
        let kind = event.kind();
        let deferred = {
            let mut inner = self.inner.lock();
            let state = inner.state;

            let deferred = match event {
                TransportEvent::Opened { socket, response } => {
                    self.on_opened(&mut inner, socket, response)
                }
                TransportEvent::Failed { message } => {
                    self.on_failed(&mut inner, message);
                    None
                }
                TransportEvent::Message { text } => {
                    if inner.state == SessionState::Open {
                        self.emit(SocketEvent::Message { text });
                    } else {
                        trace!(session_id = %self.id, state = %inner.state, "Message dropped");
                    }
                    None
                }
                TransportEvent::Closing { code, reason } => {
                    self.on_closing(&mut inner, code, reason)
                }
                TransportEvent::Closed { code, reason } => {
                    self.on_closed(&mut inner, code, reason);
                    None
                }
            };

            if state != inner.state {
                debug!(
                    session_id = %self.id,
                    event = kind,
                    from = %state,
                    to = %inner.state,
                    "Session transition"
                );
            }
            deferred
        };

        if let Some(deferred) = deferred {
            self.finish(deferred);
        }
    }

    /// Runs work collected under the lock.
    fn finish(&self, deferred: Deferred) {
        match deferred {
            Deferred::Close { socket, reason } => socket.close(NORMAL_CLOSURE, &reason),
            Deferred::Abort => self.cancel.cancel(),
            Deferred::Opened {
                tx,
                response,
                cookies,
            } => {
                if let Some(host) = self.url.host_str().filter(|_| !cookies.is_empty()) {
                    self.jar.save_from_response(host, cookies);
                }
                if let Some(tx) = tx {
                    let _ = tx.send(Ok(response));
                }
            }
        }
    }

    fn on_opened(
        &self,
        inner: &mut SessionInner,
        socket: Arc<dyn Socket>,
        response: HandshakeResponse,
    ) -> Option<Deferred> {
        if inner.state != SessionState::Connecting {
            debug!(
                session_id = %self.id,
                state = %inner.state,
                "Releasing socket of abandoned attempt"
            );
            return Some(Deferred::Close {
                socket,
                reason: inner.close_reason.clone().unwrap_or_default(),
            });
        }

        let cookies = self.handshake_cookies(&response);

        inner.state = SessionState::Open;
        inner.socket = Some(socket);

        info!(
            session_id = %self.id,
            domain = %self.domain,
            code = response.code,
            "WebSocket opened"
        );

        Some(Deferred::Opened {
            tx: inner.open_tx.take(),
            response: OpenResponse::opened(response.code, response.message),
            cookies,
        })
    }

    fn on_failed(&self, inner: &mut SessionInner, message: String) {
        match inner.state {
            SessionState::Connecting => {
                warn!(session_id = %self.id, error = %message, "WebSocket failed to open");
                inner.state = SessionState::Failed;
                if let Some(tx) = inner.open_tx.take() {
                    let _ = tx.send(Err(Error::connect_failure(message)));
                }
            }
            SessionState::Open => {
                warn!(session_id = %self.id, error = %message, "WebSocket failed");
                inner.state = SessionState::Failed;
                inner.socket = None;
                self.emit(SocketEvent::Failure { message });
            }
            SessionState::Closing => {
                debug!(session_id = %self.id, error = %message, "WebSocket failed while closing");
                inner.state = SessionState::Closed;
                inner.socket = None;
                self.emit(SocketEvent::Closed {
                    code: ABNORMAL_CLOSURE,
                    reason: message,
                });
            }
            _ => trace!(session_id = %self.id, state = %inner.state, "Failure ignored"),
        }
    }

    fn on_closing(
        &self,
        inner: &mut SessionInner,
        code: u16,
        reason: String,
    ) -> Option<Deferred> {
        if inner.state != SessionState::Open {
            trace!(session_id = %self.id, state = %inner.state, "Closing ignored");
            return None;
        }

        debug!(session_id = %self.id, code, reason = %reason, "Peer is closing");
        inner.state = SessionState::Closing;

        // Acknowledge with a normal closure.
        inner.socket.clone().map(|socket| Deferred::Close {
            socket,
            reason: String::new(),
        })
    }

    fn on_closed(&self, inner: &mut SessionInner, code: u16, reason: String) {
        match inner.state {
            SessionState::Open | SessionState::Closing => {
                info!(session_id = %self.id, code, reason = %reason, "WebSocket closed");
                inner.state = SessionState::Closed;
                inner.socket = None;
                self.emit(SocketEvent::Closed { code, reason });
            }
            SessionState::Connecting => {
                warn!(session_id = %self.id, code, "WebSocket closed during handshake");
                inner.state = SessionState::Failed;
                if let Some(tx) = inner.open_tx.take() {
                    let _ = tx.send(Err(Error::connect_failure(format!(
                        "closed during handshake ({code}): {reason}"
                    ))));
                }
            }
            _ => trace!(session_id = %self.id, state = %inner.state, "Closed ignored"),
        }
    }

    /// Parses the handshake's `Set-Cookie` headers for the raw request host.
    fn handshake_cookies(&self, response: &HandshakeResponse) -> Vec<CookieRecord> {
        let Some(host) = self.url.host_str() else {
            return Vec::new();
        };

        response
            .set_cookies
            .iter()
            .filter_map(|header| CookieRecord::parse_set_cookie(header, host, self.url.path()))
            .collect()
    }

    fn emit(&self, event: SocketEvent) {
        let name = event.name();
        if self.events.send(event).is_err() {
            trace!(session_id = %self.id, event = name, "No event subscribers");
        }
    }
}
