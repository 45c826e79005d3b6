//! Domain-name normalization.
//!
//! A [`DomainKey`] is the host of a URL with a leading `www.` removed. It keys
//! the cookie lookups done by [`CookieJar::get_cookies`] and the pinning policy.
//!
//! The host keeps the case it was written in, and only a lowercase `www.` is
//! stripped. Validation still goes through [`Url::parse`].
//!
//! ```ignore
//! use websocket_ssl_pinning::DomainKey;
//!
//! let key = DomainKey::parse("https://www.example.com/path")?;
//! assert_eq!(key.as_str(), "example.com");
//! ```
//!
//! [`CookieJar::get_cookies`]: crate::cookie::CookieJar::get_cookies

// ============================================================================
// Imports
// ============================================================================

use std::borrow::Cow;
use std::fmt;

use serde::Serialize;
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Prefix stripped from hosts during normalization.
const WWW_PREFIX: &str = "www.";

/// Scheme assumed for inputs that are a bare host.
const DEFAULT_SCHEME: &str = "https://";

// ============================================================================
// DomainKey
// ============================================================================

/// Normalized host string.
///
/// Normalization is deterministic and idempotent: parsing the string form of
/// a key yields the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DomainKey(String);

impl DomainKey {
    /// Normalizes a URL (or a bare host) into a domain key.
    ///
    /// Inputs without a `scheme://` part are treated as a host, so that an
    /// existing key normalizes to itself.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedUrl`] if no host can be extracted.
    pub fn parse(input: &str) -> Result<Self> {
        let source = with_scheme(input);
        let url = Url::parse(&source).map_err(|e| Error::malformed_url(input, e.to_string()))?;
        let parsed = url
            .host_str()
            .ok_or_else(|| Error::malformed_url(input, "URL has no host"))?;

        // Hosts the parser rewrote beyond case (IDN, IPv4 forms) use its form.
        let host = raw_host(&source)
            .filter(|raw| raw.eq_ignore_ascii_case(parsed))
            .unwrap_or(parsed);

        Self::from_host(host).ok_or_else(|| Error::malformed_url(input, "URL has no host"))
    }

    /// Derives the key from an already parsed URL.
    ///
    /// The host comes out lowercased, as [`Url`] stores it. Returns `None`
    /// for URLs without a host (e.g. `file:///tmp`).
    #[must_use]
    pub fn from_url(url: &Url) -> Option<Self> {
        Self::from_host(url.host_str()?)
    }

    fn from_host(mut host: &str) -> Option<Self> {
        // Repeated prefixes are stripped too, otherwise "www.www.a.com" would
        // normalize to a key that normalizes differently again.
        while let Some(rest) = host.strip_prefix(WWW_PREFIX) {
            host = rest;
        }
        (!host.is_empty()).then(|| Self(host.to_string()))
    }

    /// Returns the key as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DomainKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DomainKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Trims `input`, assuming `https://` when no scheme is present.
fn with_scheme(input: &str) -> Cow<'_, str> {
    let trimmed = input.trim();
    if trimmed.contains("://") {
        Cow::Borrowed(trimmed)
    } else {
        Cow::Owned(format!("{DEFAULT_SCHEME}{trimmed}"))
    }
}

/// Returns the host part of `url` as written, without userinfo or port.
fn raw_host(url: &str) -> Option<&str> {
    let (_, rest) = url.split_once("://")?;
    let authority = rest.split(['/', '\\', '?', '#']).next()?;
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, host)| host);

    if host_port.starts_with('[') {
        return host_port.find(']').map(|end| &host_port[..=end]);
    }
    Some(host_port.split_once(':').map_or(host_port, |(host, _)| host))
}

// ============================================================================
// Tests
// ============================================================================
