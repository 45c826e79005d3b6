//! WebSocket client core with certificate pinning and a host-scoped cookie jar.
//!
//! This library opens one `wss://` connection at a time, trusting only the
//! server certificates whose SHA-256 fingerprints the caller pins, and keeps
//! the cookies the handshake sets for later requests.
//!
//! # Architecture
//!
//! - **Client**: owning context; holds at most one live session, the cookie
//!   jar and the event channel
//! - **Session**: per-connection state machine
//!   (`Idle → Connecting → Open → Closing → Closed`, or `Failed`)
//! - **Transport**: dials sockets and reports events back to the session
//!
//! Command results are one-shot: `open()` resolves a [`PendingOpen`] exactly
//! once. Unsolicited traffic (messages, peer close, late failures) arrives on
//! a separate many-shot [`SocketEvent`] stream from [`Client::subscribe`].
//!
//! # Quick Start
//!
//! ```no_run
//! use websocket_ssl_pinning::{Client, ConnectOptions, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Client::new();
//!     let mut events = client.subscribe();
//!
//!     let options = ConnectOptions::with_certs([
//!         "sha256/47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=",
//!     ]);
//!     let opened = client.open("wss://example.com/socket", options)?.await?;
//!     println!("{} ({})", opened.status, opened.code);
//!
//!     client.send("ping")?;
//!     if let Ok(event) = events.recv().await {
//!         println!("{}: {}", event.name(), event.payload());
//!     }
//!
//!     client.close("bye")?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cookie`] | [`CookieJar`] and [`CookieRecord`] |
//! | [`domain`] | [`DomainKey`] normalization |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`pinning`] | [`ConnectOptions`], [`PinningPolicy`] and the rustls verifier |
//! | [`protocol`] | One-shot results and named events |
//! | [`session`] | [`Client`], [`ClientBuilder`] and [`SessionState`] |
//! | [`transport`] | [`Transport`] seam and the `tokio-tungstenite` implementation |

// ============================================================================
// Modules
// ============================================================================

/// Host-scoped cookie storage.
///
/// Cookies are filed under the raw request host and read back through the
/// normalized [`DomainKey`].
pub mod cookie;

/// Domain normalization.
pub mod domain;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Certificate pinning configuration and enforcement.
pub mod pinning;

/// Payloads delivered to callers.
pub mod protocol;

/// Sessions and their owning client.
///
/// Use [`Client::new()`] or [`Client::builder()`] to create a client.
pub mod session;

/// WebSocket transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Session types
pub use session::{Client, ClientBuilder, PendingOpen, SessionState};

// Cookie types
pub use cookie::{CookieJar, CookieRecord, CookieSink};

// Domain types
pub use domain::DomainKey;

// Pinning types
pub use pinning::{ConnectOptions, PinningPolicy};

// Protocol types
pub use protocol::{OpenResponse, SocketEvent};

// Transport types
pub use transport::{Socket, Transport, TransportEvent, TungsteniteTransport};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::SessionId;
