//! One-shot command results.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

// ============================================================================
// OpenResponse
// ============================================================================

/// Successful outcome of `open()`.
///
/// # Format
///
/// ```json
/// { "status": "WebSocket Opened", "code": 101, "message": "Switching Protocols" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenResponse {
    /// Fixed status line.
    pub status: String,
    /// HTTP status code of the handshake response.
    pub code: u16,
    /// HTTP reason phrase of the handshake response.
    pub message: String,
}

impl OpenResponse {
    /// Status reported for every opened socket.
    pub const OPENED: &'static str = "WebSocket Opened";

    /// Creates the response for a completed handshake.
    #[must_use]
    pub fn opened(code: u16, message: impl Into<String>) -> Self {
        Self {
            status: Self::OPENED.to_string(),
            code,
            message: message.into(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
