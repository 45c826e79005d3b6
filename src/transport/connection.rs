//! `tokio-tungstenite` transport and its event loop.
//!
//! Each dial spawns one tokio task that performs the pinned TLS handshake
//! and then owns the socket:
//!
//! - Inbound frames become [`TransportEvent`]s
//! - Outbound writes and close requests arrive over an unbounded channel
//! - The task ends after the close handshake, a read error, or when every
//!   [`Socket`] handle has been dropped

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::{Request, Response};
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::{COOKIE, SET_COOKIE};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream, connect_async_tls_with_config};
use tracing::{debug, error, info, trace, warn};

use crate::cookie::cookie_header;
use crate::error::{Error, Result};
use crate::pinning::client_config;

use super::{
    ABNORMAL_CLOSURE, DialRequest, EventHandler, HandshakeResponse, NO_STATUS_RECEIVED,
    NORMAL_CLOSURE, Socket, Transport, TransportEvent,
};

// ============================================================================
// Constants
// ============================================================================

/// How long to wait for the peer to finish the close handshake.
const DEFAULT_CLOSE_GRACE: Duration = Duration::from_secs(5);

// ============================================================================
// Types
// ============================================================================

/// Stream produced by the handshake.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Write half of the stream.
type WsWrite = SplitSink<WsStream, Message>;

/// Read half of the stream.
type WsRead = SplitStream<WsStream>;

// ============================================================================
// SocketCommand
// ============================================================================

/// Internal commands for the event loop.
enum SocketCommand {
    /// Send a text frame.
    Write(String),
    /// Send a close frame and finish the close handshake.
    Close { code: u16, reason: String },
}

// ============================================================================
// TungsteniteSocket
// ============================================================================

/// [`Socket`] handle feeding the event loop.
struct TungsteniteSocket {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<SocketCommand>,
}

impl Socket for TungsteniteSocket {
    fn write(&self, text: &str) -> Result<()> {
        self.command_tx
            .send(SocketCommand::Write(text.to_string()))
            .map_err(|_| Error::send("socket event loop has stopped"))
    }

    fn close(&self, code: u16, reason: &str) {
        if self
            .command_tx
            .send(SocketCommand::Close {
                code,
                reason: reason.to_string(),
            })
            .is_err()
        {
            trace!(code, "Close requested after event loop stopped");
        }
    }
}

// ============================================================================
// TungsteniteTransport
// ============================================================================

/// Transport dialing real `wss://` endpoints.
///
/// Must be used from within a tokio runtime; a dial outside one is reported
/// as a failure.
#[derive(Debug, Clone)]
pub struct TungsteniteTransport {
    /// Close handshake grace period.
    close_grace: Duration,
}

impl Default for TungsteniteTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl TungsteniteTransport {
    /// Creates a transport with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            close_grace: DEFAULT_CLOSE_GRACE,
        }
    }

    /// Sets how long a closing socket waits for the peer's close frame.
    #[inline]
    #[must_use]
    pub const fn with_close_grace(mut self, grace: Duration) -> Self {
        self.close_grace = grace;
        self
    }

    /// Returns the close handshake grace period.
    #[inline]
    #[must_use]
    pub const fn close_grace(&self) -> Duration {
        self.close_grace
    }
}

impl Transport for TungsteniteTransport {
    fn dial(&self, request: DialRequest, handler: EventHandler) {
        let Ok(runtime) = Handle::try_current() else {
            error!(session_id = %request.session_id, "Dial outside of a tokio runtime");
            handler(TransportEvent::Failed {
                message: "no tokio runtime available".to_string(),
            });
            return;
        };

        let close_grace = self.close_grace;
        runtime.spawn(async move {
            let session_id = request.session_id;

            let dialed = tokio::select! {
                () = request.cancel.cancelled() => {
                    debug!(%session_id, "Dial cancelled");
                    return;
                }
                dialed = connect(&request) => dialed,
            };

            match dialed {
                Ok((ws_stream, response)) => {
                    info!(%session_id, url = %request.url, "WebSocket connection established");

                    let (command_tx, command_rx) = mpsc::unbounded_channel();
                    let socket: Arc<dyn Socket> = Arc::new(TungsteniteSocket { command_tx });

                    handler(TransportEvent::Opened {
                        socket,
                        response: handshake_response(&response),
                    });

                    run_event_loop(ws_stream, command_rx, handler, close_grace).await;
                    debug!(%session_id, "Event loop terminated");
                }
                Err(e) => {
                    warn!(%session_id, error = %e, "WebSocket dial failed");
                    handler(TransportEvent::Failed {
                        message: e.to_string(),
                    });
                }
            }
        });
    }
}

// ============================================================================
// Handshake
// ============================================================================

/// Performs the TCP, TLS and WebSocket handshakes.
async fn connect(request: &DialRequest) -> Result<(WsStream, Response)> {
    let client_request = build_request(request)?;

    let connector = if request.url.scheme() == "wss" {
        Connector::Rustls(Arc::new(client_config(&request.policy)?))
    } else {
        Connector::Plain
    };

    let handshake = connect_async_tls_with_config(client_request, None, false, Some(connector));

    let (ws_stream, response) = match request.timeout {
        Some(limit) => timeout(limit, handshake).await.map_err(|_| {
            Error::connect_failure(format!("Connection timeout after {}ms", limit.as_millis()))
        })??,
        None => handshake.await?,
    };

    Ok((ws_stream, response))
}

/// Builds the handshake request with cookies and extra headers attached.
fn build_request(request: &DialRequest) -> Result<Request> {
    let mut client_request = request.url.as_str().into_client_request()?;
    let headers = client_request.headers_mut();

    for (name, value) in &request.headers {
        headers.insert(name.clone(), value.clone());
    }

    if let Some(cookie) = cookie_header(&request.cookies) {
        let value = HeaderValue::from_str(&cookie)
            .map_err(|e| Error::invalid_header(COOKIE.as_str(), e.to_string()))?;
        headers.insert(COOKIE, value);
        trace!(count = request.cookies.len(), "Attached cookies to handshake");
    }

    Ok(client_request)
}

/// Extracts the parts of the handshake response the session needs.
fn handshake_response(response: &Response) -> HandshakeResponse {
    let status = response.status();

    HandshakeResponse {
        code: status.as_u16(),
        message: status.canonical_reason().unwrap_or_default().to_string(),
        set_cookies: response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect(),
    }
}

// ============================================================================
// Event Loop
// ============================================================================

/// Event loop that handles WebSocket I/O for one socket.
async fn run_event_loop(
    ws_stream: WsStream,
    mut command_rx: mpsc::UnboundedReceiver<SocketCommand>,
    handler: EventHandler,
    close_grace: Duration,
) {
    let (mut ws_write, mut ws_read) = ws_stream.split();
    // Close frame received from the peer, if any.
    let mut peer_close: Option<(u16, String)> = None;

    loop {
        tokio::select! {
            // Incoming frames from the peer
            message = ws_read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        handler(TransportEvent::Message {
                            text: text.as_str().to_owned(),
                        });
                    }

                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = close_parts(frame);
                        debug!(code, reason = %reason, "WebSocket closing by remote");
                        peer_close = Some((code, reason.clone()));
                        handler(TransportEvent::Closing { code, reason });
                    }

                    Some(Err(e)) => {
                        error!(error = %e, "WebSocket error");
                        handler(TransportEvent::Failed {
                            message: e.to_string(),
                        });
                        return;
                    }

                    None => {
                        debug!("WebSocket stream ended");
                        let (code, reason) = peer_close
                            .take()
                            .unwrap_or((ABNORMAL_CLOSURE, String::new()));
                        handler(TransportEvent::Closed { code, reason });
                        return;
                    }

                    // Ignore Binary, Ping, Pong
                    _ => {}
                }
            }

            // Commands from the session
            command = command_rx.recv() => {
                match command {
                    Some(SocketCommand::Write(text)) => {
                        if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                            warn!(error = %e, "Failed to write message");
                            handler(TransportEvent::Failed {
                                message: e.to_string(),
                            });
                            return;
                        }
                        trace!("Message written");
                    }

                    Some(SocketCommand::Close { code, reason }) => {
                        send_close(&mut ws_write, code, &reason).await;
                        drain(&mut ws_read, close_grace).await;

                        let (code, reason) = peer_close.take().unwrap_or((code, reason));
                        handler(TransportEvent::Closed { code, reason });
                        return;
                    }

                    None => {
                        debug!("All socket handles dropped");
                        send_close(&mut ws_write, NORMAL_CLOSURE, "").await;
                        return;
                    }
                }
            }
        }
    }
}

/// Sends a close frame, ignoring a connection that is already closing.
async fn send_close(ws_write: &mut WsWrite, code: u16, reason: &str) {
    let frame = CloseFrame {
        code: CloseCode::from(code),
        reason: reason.to_string().into(),
    };

    if let Err(e) = ws_write.send(Message::Close(Some(frame))).await {
        debug!(error = %e, "Close frame not sent");
    }
}

/// Reads until the peer finishes the close handshake or `grace` elapses.
async fn drain(ws_read: &mut WsRead, grace: Duration) {
    let finished = timeout(grace, async {
        while let Some(Ok(message)) = ws_read.next().await {
            trace!(?message, "Discarding frame while closing");
        }
    })
    .await;

    if finished.is_err() {
        let grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX);
        warn!(grace_ms, "Peer did not complete close handshake");
    }
}

/// Splits an optional close frame into code and reason.
fn close_parts(frame: Option<CloseFrame>) -> (u16, String) {
    frame
        .map(|f| (u16::from(f.code), f.reason.as_str().to_owned()))
        .unwrap_or((NO_STATUS_RECEIVED, String::new()))
}

// ============================================================================
// Tests
// ============================================================================
