//! Caller-supplied connect options.
//!
//! Mirrors the option object the host application passes to `open()`:
//!
//! ```json
//! {
//!   "sslPinning": { "certs": ["sha256/AAAA..."] },
//!   "pkPinning": false,
//!   "disableAllSecurity": false,
//!   "timeoutInterval": 10000,
//!   "headers": { "Authorization": "Bearer ..." }
//! }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use websocket_ssl_pinning::ConnectOptions;
//!
//! let options = ConnectOptions::with_certs(["sha256/AAAA"])
//!     .timeout(Duration::from_secs(10))
//!     .header("Authorization", "Bearer token");
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};

use crate::error::{Error, Result};

// ============================================================================
// PinningOptions
// ============================================================================

/// The `sslPinning` section of [`ConnectOptions`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinningOptions {
    /// Pinned certificate fingerprints. `None` means the field was absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certs: Option<Vec<String>>,

    /// Pins are SubjectPublicKeyInfo hashes checked on top of system trust.
    #[serde(default)]
    pub pk_pinning: bool,

    /// Accept any server certificate.
    #[serde(default)]
    pub disable_all_security: bool,
}

// ============================================================================
// ConnectOptions
// ============================================================================

/// Configuration for one `open()` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectOptions {
    /// Pinning section. `None` means the key was absent.
    #[serde(alias = "pinning", skip_serializing_if = "Option::is_none")]
    pub ssl_pinning: Option<PinningOptions>,

    /// Public-key pinning (top-level form).
    #[serde(default)]
    pub pk_pinning: bool,

    /// Accept any server certificate (top-level form).
    #[serde(default)]
    pub disable_all_security: bool,

    /// Handshake timeout in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_interval: Option<u64>,

    /// Extra handshake request headers.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

// ============================================================================
// Constructors
// ============================================================================

impl ConnectOptions {
    /// Creates options with no pinning section.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options pinning the given certificate fingerprints.
    #[must_use]
    pub fn with_certs<I, S>(certs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ssl_pinning: Some(PinningOptions {
                certs: Some(certs.into_iter().map(Into::into).collect()),
                ..PinningOptions::default()
            }),
            ..Self::default()
        }
    }

    /// Parses options from the bridge's JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the document does not match.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ConnectOptions {
    /// Disables certificate validation entirely.
    #[inline]
    #[must_use]
    pub fn disable_all_security(mut self) -> Self {
        self.disable_all_security = true;
        self
    }

    /// Treats the pins as public-key hashes.
    #[inline]
    #[must_use]
    pub fn public_key_pinning(mut self) -> Self {
        self.pk_pinning = true;
        self
    }

    /// Sets the handshake timeout.
    #[inline]
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_interval = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Adds a handshake request header.
    #[inline]
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl ConnectOptions {
    /// Returns `true` if either form of the override is set.
    #[must_use]
    pub fn security_disabled(&self) -> bool {
        self.disable_all_security
            || self
                .ssl_pinning
                .as_ref()
                .is_some_and(|p| p.disable_all_security)
    }

    /// Returns `true` if either form of `pkPinning` is set.
    #[must_use]
    pub fn public_key_pinning_enabled(&self) -> bool {
        self.pk_pinning || self.ssl_pinning.as_ref().is_some_and(|p| p.pk_pinning)
    }

    /// Returns the handshake timeout, if any.
    #[inline]
    #[must_use]
    pub fn timeout_duration(&self) -> Option<Duration> {
        self.timeout_interval.map(Duration::from_millis)
    }

    /// Validates and converts the extra headers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeader`] for a name or value that is not
    /// valid HTTP.
    pub fn validated_headers(&self) -> Result<Vec<(HeaderName, HeaderValue)>> {
        self.headers
            .iter()
            .map(|(name, value)| {
                let header_name = HeaderName::from_bytes(name.to_ascii_lowercase().as_bytes())
                    .map_err(|e| Error::invalid_header(name, e.to_string()))?;
                let header_value = HeaderValue::from_str(value)
                    .map_err(|e| Error::invalid_header(name, e.to_string()))?;
                Ok((header_name, header_value))
            })
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_full() {
        let options = ConnectOptions::from_json(
            r#"{
                "sslPinning": { "certs": ["sha256/AAAA"] },
                "timeoutInterval": 1500,
                "headers": { "X-Token": "t" }
            }"#,
        )
        .unwrap();

        let pinning = options.ssl_pinning.as_ref().unwrap();
        assert_eq!(pinning.certs.as_deref(), Some(&["sha256/AAAA".to_string()][..]));
        assert_eq!(options.timeout_duration(), Some(Duration::from_millis(1500)));
        assert_eq!(options.headers.get("X-Token").map(String::as_str), Some("t"));
        assert!(!options.security_disabled());
    }

    #[test]
    fn test_from_json_pinning_alias() {
        let options =
            ConnectOptions::from_json(r#"{"pinning":{"certs":[],"disableAllSecurity":true}}"#)
                .unwrap();
        assert!(options.security_disabled());
        assert_eq!(options.ssl_pinning.unwrap().certs, Some(vec![]));
    }

    #[test]
    fn test_from_json_pk_pinning() {
        let nested =
            ConnectOptions::from_json(r#"{"sslPinning":{"certs":["sha256/a"],"pkPinning":true}}"#)
                .unwrap();
        assert!(nested.public_key_pinning_enabled());

        let top_level =
            ConnectOptions::from_json(r#"{"sslPinning":{"certs":["sha256/a"]},"pkPinning":true}"#)
                .unwrap();
        assert!(top_level.public_key_pinning_enabled());

        assert!(!ConnectOptions::with_certs(["sha256/a"]).public_key_pinning_enabled());
        assert!(
            ConnectOptions::with_certs(["sha256/a"])
                .public_key_pinning()
                .public_key_pinning_enabled()
        );
    }

    #[test]
    fn test_from_json_missing_sections() {
        let options = ConnectOptions::from_json("{}").unwrap();
        assert!(options.ssl_pinning.is_none());

        let options = ConnectOptions::from_json(r#"{"sslPinning":{}}"#).unwrap();
        assert!(options.ssl_pinning.unwrap().certs.is_none());
    }

    #[test]
    fn test_from_json_invalid() {
        assert!(matches!(
            ConnectOptions::from_json("not json"),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_builders() {
        let options = ConnectOptions::with_certs(["sha256/a", "sha256/b"])
            .timeout(Duration::from_secs(2))
            .header("Origin", "https://app.example")
            .disable_all_security();

        assert_eq!(options.timeout_interval, Some(2000));
        assert!(options.security_disabled());
        assert_eq!(options.ssl_pinning.unwrap().certs.unwrap().len(), 2);
    }

    #[test]
    fn test_validated_headers() {
        let options = ConnectOptions::new().header("X-Custom", "v");
        let headers = options.validated_headers().unwrap();
        assert_eq!(headers[0].0.as_str(), "x-custom");
        assert_eq!(headers[0].1, "v");

        let bad_name = ConnectOptions::new().header("bad header", "v");
        assert!(matches!(
            bad_name.validated_headers(),
            Err(Error::InvalidHeader { .. })
        ));

        let bad_value = ConnectOptions::new().header("x", "line\nbreak");
        assert!(matches!(
            bad_value.validated_headers(),
            Err(Error::InvalidHeader { .. })
        ));
    }
}
