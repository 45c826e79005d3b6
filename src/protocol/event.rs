//! Named, many-shot socket events.
//!
//! Events are unsolicited notifications about the live connection. They are
//! not correlated with any command and need no acknowledgment.
//!
//! # Event Types
//!
//! | Name | Trigger |
//! |------|---------|
//! | `onMessage` | Text frame received |
//! | `onClosed` | Peer-initiated close completed |
//! | `onFailure` | Transport failed after the socket opened |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

// ============================================================================
// SocketEvent
// ============================================================================

/// An event emitted on the session's event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum SocketEvent {
    /// Text message from the peer, delivered verbatim.
    #[serde(rename = "onMessage")]
    Message {
        /// Message text.
        text: String,
    },

    /// The connection closed after the peer asked for it.
    #[serde(rename = "onClosed")]
    Closed {
        /// Close code supplied by the peer.
        code: u16,
        /// Close reason supplied by the peer.
        reason: String,
    },

    /// The transport failed while the socket was open.
    #[serde(rename = "onFailure")]
    Failure {
        /// Transport failure detail.
        message: String,
    },
}

impl SocketEvent {
    /// Returns the channel name the event is emitted under.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Message { .. } => "onMessage",
            Self::Closed { .. } => "onClosed",
            Self::Failure { .. } => "onFailure",
        }
    }

    /// Returns the string payload handed to listeners.
    ///
    /// Message text for `onMessage`, the close reason for `onClosed`, the
    /// failure detail for `onFailure`.
    #[must_use]
    pub fn payload(&self) -> &str {
        match self {
            Self::Message { text } => text,
            Self::Closed { reason, .. } => reason,
            Self::Failure { message } => message,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
