//! Payloads delivered to the bridging layer.
//!
//! # Channels
//!
//! | Payload | Channel | Occurrences |
//! |---------|---------|-------------|
//! | [`OpenResponse`] | one-shot result of `open()` | exactly once |
//! | [`SocketEvent`] | named event stream | zero or more |
//!
//! Keeping the two apart lets a caller tell "my `open()` failed" from "the
//! connection failed later".

// ============================================================================
// Submodules
// ============================================================================

/// Named, many-shot socket events.
pub mod event;

/// One-shot command results.
pub mod response;

// ============================================================================
// Re-exports
// ============================================================================

pub use event::SocketEvent;
pub use response::OpenResponse;
