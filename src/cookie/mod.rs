//! Host-scoped cookie handling.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `jar` | [`CookieJar`] store and the [`CookieSink`] persistence seam |
//! | `record` | [`CookieRecord`], `Set-Cookie` parsing, `Cookie` header rendering |

// ============================================================================
// Submodules
// ============================================================================

/// Cookie jar and persistence seam.
pub mod jar;

/// Cookie records and their wire forms.
pub mod record;

// ============================================================================
// Re-exports
// ============================================================================

pub use jar::{CookieJar, CookieSink, DiscardSink};
pub use record::{CookieRecord, cookie_header};
