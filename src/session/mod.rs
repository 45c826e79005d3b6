//! WebSocket sessions and their owning client.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | [`ClientBuilder`] configuration |
//! | `client` | [`Client`] owning context and [`PendingOpen`] |
//! | `machine` | Per-connection state machine |
//! | `state` | [`SessionState`] lifecycle |

// ============================================================================
// Submodules
// ============================================================================

/// Builder pattern for client configuration.
pub mod builder;

/// Owning context for sessions.
pub mod client;

/// Per-connection state machine.
mod machine;

/// Session lifecycle states.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ClientBuilder;
pub use client::{Client, PendingOpen};
pub use state::SessionState;
