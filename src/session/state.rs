//! Session lifecycle states.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::Serialize;

// ============================================================================
// SessionState
// ============================================================================

/// Lifecycle of one WebSocket session.
///
/// ```text
/// Idle ─► Connecting ─► Open ─► Closing ─► Closed
///              │          │
///              └──────────┴──► Failed
/// ```
///
/// `close()` moves `Connecting`, `Open` and `Closing` straight to `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    /// No connection attempt made.
    #[default]
    Idle,
    /// Dial in progress.
    Connecting,
    /// Socket open.
    Open,
    /// Peer asked to close; waiting for the transport to finish.
    Closing,
    /// Closed normally.
    Closed,
    /// Dial or connection failed.
    Failed,
}

impl SessionState {
    /// Returns `true` for `Closed` and `Failed`.
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }

    /// Returns `true` while the session blocks a new `open()`.
    #[inline]
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Connecting | Self::Open | Self::Closing)
    }

    /// Returns `true` if `close()` is accepted in this state.
    #[inline]
    #[must_use]
    pub const fn can_close(self) -> bool {
        self.is_live()
    }

    /// Returns `true` if `send()` is accepted in this state.
    #[inline]
    #[must_use]
    pub const fn can_send(self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Tests
// ============================================================================
