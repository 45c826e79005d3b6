//! Certificate pinning configuration and enforcement.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `options` | [`ConnectOptions`] supplied by the caller |
//! | `policy` | [`PinningPolicy`] resolution, [`PinMode`] and fingerprints |
//! | `verifier` | rustls verifier enforcing a policy |

// ============================================================================
// Submodules
// ============================================================================

/// Caller-supplied connect options.
pub mod options;

/// Pinning policy resolution.
pub mod policy;

/// rustls verifier.
pub mod verifier;

// ============================================================================
// Re-exports
// ============================================================================

pub use options::{ConnectOptions, PinningOptions};
pub use policy::{PinMode, PinningPolicy, SHA256_PREFIX, fingerprint, public_key_fingerprint};
pub use verifier::{PinnedCertVerifier, client_config};
