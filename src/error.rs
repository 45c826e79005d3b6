//! Error types for the pinned WebSocket client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use websocket_ssl_pinning::{Client, ConnectOptions, Result};
//!
//! async fn example(client: &Client) -> Result<()> {
//!     let options = ConnectOptions::with_certs(["sha256/AAAA"]);
//!     client.open("wss://example.com/socket", options)?.await?;
//!     client.send("ping")?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::MalformedUrl`], [`Error::MissingPinningConfig`], [`Error::MissingCertsField`], [`Error::EmptyCertificateSet`], [`Error::UnsupportedScheme`], [`Error::InvalidHeader`] |
//! | Session | [`Error::AlreadyOpen`], [`Error::NotInitialized`], [`Error::OpenCancelled`] |
//! | Connection | [`Error::ConnectFailure`], [`Error::Send`] |
//! | External | [`Error::Json`], [`Error::WebSocket`], [`Error::Tls`] |
//!
//! Configuration errors are always detected before any network I/O.

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Client configuration error.
    ///
    /// Returned when a [`crate::ClientBuilder`] setting is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// URL could not be parsed into a host component.
    #[error("Malformed URL '{input}': {message}")]
    MalformedUrl {
        /// The rejected input.
        input: String,
        /// Why parsing failed.
        message: String,
    },

    /// Connect options have no pinning section.
    #[error("sslPinning key was not added")]
    MissingPinningConfig,

    /// Pinning section has no `certs` field.
    #[error("key certs was not found")]
    MissingCertsField,

    /// `certs` is present but empty and security was not disabled.
    #[error("certs array is empty")]
    EmptyCertificateSet,

    /// URL scheme is not usable with a pinned connection.
    #[error("Unsupported scheme '{scheme}': pinned connections require wss://")]
    UnsupportedScheme {
        /// The rejected scheme.
        scheme: String,
    },

    /// A caller-supplied handshake header is not valid HTTP.
    #[error("Invalid header '{name}': {message}")]
    InvalidHeader {
        /// Header name as supplied.
        name: String,
        /// Why the header was rejected.
        message: String,
    },

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// `open()` while a session is connecting or open.
    #[error("WebSocket is already open")]
    AlreadyOpen,

    /// Command issued without a live socket.
    #[error("WebSocket not initialized")]
    NotInitialized,

    /// The open attempt was abandoned by `close()` before it completed.
    #[error("Open attempt cancelled by close")]
    OpenCancelled,

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// The transport could not establish the connection.
    #[error("Connection failed: {message}")]
    ConnectFailure {
        /// Transport failure detail.
        message: String,
    },

    /// The transport rejected an outbound message.
    #[error("Failed to send message: {message}")]
    Send {
        /// Transport failure detail.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// TLS configuration error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a malformed URL error.
    #[inline]
    pub fn malformed_url(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedUrl {
            input: input.into(),
            message: message.into(),
        }
    }

    /// Creates an unsupported scheme error.
    #[inline]
    pub fn unsupported_scheme(scheme: impl Into<String>) -> Self {
        Self::UnsupportedScheme {
            scheme: scheme.into(),
        }
    }

    /// Creates an invalid header error.
    #[inline]
    pub fn invalid_header(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidHeader {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates a connect failure error.
    #[inline]
    pub fn connect_failure(message: impl Into<String>) -> Self {
        Self::ConnectFailure {
            message: message.into(),
        }
    }

    /// Creates a send error.
    #[inline]
    pub fn send(message: impl Into<String>) -> Self {
        Self::Send {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this error was raised while validating a request,
    /// before any network I/O.
    #[inline]
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::Config { .. }
                | Self::MalformedUrl { .. }
                | Self::MissingPinningConfig
                | Self::MissingCertsField
                | Self::EmptyCertificateSet
                | Self::UnsupportedScheme { .. }
                | Self::InvalidHeader { .. }
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectFailure { .. } | Self::Send { .. } | Self::WebSocket(_) | Self::Tls(_)
        )
    }

    /// Stable error code handed to the bridging layer.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "CONFIG_ERROR",
            Self::MalformedUrl { .. } => "MALFORMED_URL",
            Self::MissingPinningConfig => "MISSING_PINNING_CONFIG",
            Self::MissingCertsField => "MISSING_CERTS_FIELD",
            Self::EmptyCertificateSet => "EMPTY_CERTIFICATE_SET",
            Self::UnsupportedScheme { .. } => "UNSUPPORTED_SCHEME",
            Self::InvalidHeader { .. } => "INVALID_HEADER",
            Self::AlreadyOpen => "ALREADY_OPEN",
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::OpenCancelled => "OPEN_CANCELLED",
            Self::ConnectFailure { .. } => "CONNECT_FAILURE",
            Self::Send { .. } => "SEND_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WebSocket(_) => "WEBSOCKET_ERROR",
            Self::Tls(_) => "TLS_ERROR",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
