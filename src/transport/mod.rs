//! WebSocket transport layer.
//!
//! The session state machine never touches sockets directly. It hands a
//! [`DialRequest`] to a [`Transport`], receives a [`Socket`] handle once the
//! handshake succeeds, and is told about everything else through
//! [`TransportEvent`]s delivered to its [`EventHandler`].
//!
//! # Event Flow
//!
//! ```text
//! ┌─────────────┐   dial(request, handler)   ┌──────────────┐
//! │   Session   │ ─────────────────────────► │  Transport   │
//! │             │                            │              │
//! │  handle()   │ ◄───────────────────────── │  I/O task    │
//! └─────────────┘  Opened | Failed | Message └──────────────┘
//!                  Closing | Closed
//! ```
//!
//! Events may arrive on any thread, concurrently with caller commands.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | `tokio-tungstenite` transport and its event loop |

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::cookie::CookieRecord;
use crate::error::Result;
use crate::identifiers::SessionId;
use crate::pinning::PinningPolicy;

// ============================================================================
// Submodules
// ============================================================================

/// `tokio-tungstenite` transport.
pub mod connection;

#[cfg(test)]
pub(crate) mod mock;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::TungsteniteTransport;

// ============================================================================
// Constants
// ============================================================================

/// Close code for an orderly shutdown.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Close code reported when the peer sent no status.
pub const NO_STATUS_RECEIVED: u16 = 1005;

/// Close code reported when the connection dropped without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

// ============================================================================
// Types
// ============================================================================

/// Callback receiving every event of one dial attempt.
pub type EventHandler = Arc<dyn Fn(TransportEvent) + Send + Sync>;

// ============================================================================
// DialRequest
// ============================================================================

/// Everything the transport needs to open one socket.
#[derive(Debug, Clone)]
pub struct DialRequest {
    /// Session the attempt belongs to.
    pub session_id: SessionId,
    /// Target URL (`wss://` or, without security, `ws://`).
    pub url: Url,
    /// Trust policy for the TLS handshake.
    pub policy: PinningPolicy,
    /// Stored cookies to attach to the handshake request.
    pub cookies: Vec<CookieRecord>,
    /// Extra handshake headers.
    pub headers: Vec<(HeaderName, HeaderValue)>,
    /// Handshake timeout.
    pub timeout: Option<Duration>,
    /// Cancelled when the session abandons the attempt.
    pub cancel: CancellationToken,
}

// ============================================================================
// HandshakeResponse
// ============================================================================

/// The HTTP side of a completed WebSocket handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeResponse {
    /// HTTP status code (101 on success).
    pub code: u16,
    /// HTTP reason phrase.
    pub message: String,
    /// Raw `Set-Cookie` header values.
    pub set_cookies: Vec<String>,
}

impl HandshakeResponse {
    /// Creates the standard `101 Switching Protocols` response.
    #[must_use]
    pub fn switching_protocols() -> Self {
        Self {
            code: 101,
            message: "Switching Protocols".to_string(),
            set_cookies: Vec::new(),
        }
    }
}

// ============================================================================
// TransportEvent
// ============================================================================

/// Asynchronous notification from the transport.
pub enum TransportEvent {
    /// Handshake completed; the socket is ready.
    Opened {
        /// Handle for writes and close.
        socket: Arc<dyn Socket>,
        /// Handshake response.
        response: HandshakeResponse,
    },
    /// Dial or connection failure.
    Failed {
        /// Failure detail.
        message: String,
    },
    /// Inbound text message.
    Message {
        /// Message text.
        text: String,
    },
    /// The peer asked to close.
    Closing {
        /// Peer close code.
        code: u16,
        /// Peer close reason.
        reason: String,
    },
    /// The connection is fully closed.
    Closed {
        /// Close code.
        code: u16,
        /// Close reason.
        reason: String,
    },
}

impl TransportEvent {
    /// Short name for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Opened { .. } => "opened",
            Self::Failed { .. } => "failed",
            Self::Message { .. } => "message",
            Self::Closing { .. } => "closing",
            Self::Closed { .. } => "closed",
        }
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Opens sockets.
pub trait Transport: Send + Sync {
    /// Starts an asynchronous dial.
    ///
    /// Must not block on the handshake. Exactly one of `Opened` or `Failed`
    /// is eventually delivered to `handler`, followed by any number of
    /// further events for an opened socket.
    fn dial(&self, request: DialRequest, handler: EventHandler);
}

/// An open socket, exclusively owned by one session.
pub trait Socket: Send + Sync {
    /// Queues a text message.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Send`] if the write fails locally.
    fn write(&self, text: &str) -> Result<()>;

    /// Starts the close handshake.
    fn close(&self, code: u16, reason: &str);
}
