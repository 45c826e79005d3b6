//! Cookie records and their wire forms.
//!
//! Parses the subset of RFC 6265 `Set-Cookie` syntax that handshake responses
//! carry, and renders the `Cookie` request header.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

// ============================================================================
// CookieRecord
// ============================================================================

/// A cookie received from, and replayed to, a single host.
///
/// Identity within a host's list is the `(name, path)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieRecord {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
    /// Path attribute (or the default path of the request).
    pub path: String,
    /// Raw request host the cookie came from.
    #[serde(rename = "originHost")]
    pub origin_host: String,
    /// Domain attribute, leading dot stripped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Expires attribute, kept verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<String>,
    /// Max-Age attribute in seconds.
    #[serde(rename = "maxAge", skip_serializing_if = "Option::is_none")]
    pub max_age: Option<i64>,
    /// Secure flag.
    #[serde(default)]
    pub secure: bool,
    /// HttpOnly flag.
    #[serde(rename = "httpOnly", default)]
    pub http_only: bool,
    /// SameSite attribute (`Strict`, `Lax` or `None`).
    #[serde(rename = "sameSite", skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
    /// The `Set-Cookie` value this record was parsed from.
    #[serde(default)]
    pub raw: String,
}

impl CookieRecord {
    /// Creates a record with no attributes beyond its path.
    #[must_use]
    pub fn new(
        origin_host: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let value = value.into();
        let path = path.into();
        let raw = format!("{name}={value}; Path={path}");
        Self {
            name,
            value,
            path,
            origin_host: origin_host.into(),
            domain: None,
            expires: None,
            max_age: None,
            secure: false,
            http_only: false,
            same_site: None,
            raw,
        }
    }

    /// Parses one `Set-Cookie` header value.
    ///
    /// `request_path` supplies the default path when the header has no
    /// `Path` attribute. Returns `None` for headers without `name=value`.
    #[must_use]
    pub fn parse_set_cookie(header: &str, origin_host: &str, request_path: &str) -> Option<Self> {
        let mut parts = header.split(';');
        let (name, value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut record = Self {
            name: name.to_string(),
            value: strip_quotes(value.trim()).to_string(),
            path: default_path(request_path),
            origin_host: origin_host.to_string(),
            domain: None,
            expires: None,
            max_age: None,
            secure: false,
            http_only: false,
            same_site: None,
            raw: header.trim().to_string(),
        };

        for part in parts {
            let part = part.trim();
            let (key, val) = match part.split_once('=') {
                Some((k, v)) => (k.trim(), v.trim()),
                None => (part, ""),
            };

            match key.to_ascii_lowercase().as_str() {
                "path" if val.starts_with('/') => record.path = val.to_string(),
                "domain" if !val.is_empty() => {
                    record.domain = Some(val.trim_start_matches('.').to_ascii_lowercase());
                }
                "expires" if !val.is_empty() => record.expires = Some(val.to_string()),
                "max-age" => record.max_age = val.parse().ok(),
                "secure" => record.secure = true,
                "httponly" => record.http_only = true,
                "samesite" => record.same_site = normalize_same_site(val),
                _ => {}
            }
        }

        Some(record)
    }

    /// Returns `true` if `other` has the same `(name, path)` identity.
    #[inline]
    #[must_use]
    pub fn same_identity(&self, other: &Self) -> bool {
        self.name == other.name && self.path == other.path
    }

    /// URI the record is filed under in the persistence sink.
    #[must_use]
    pub fn uri(&self) -> String {
        format!("https://{}{}", self.origin_host, self.path)
    }

    /// Renders the `name=value` pair sent back in requests.
    #[inline]
    #[must_use]
    pub fn pair(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

/// Renders the `Cookie` request header for `records`.
///
/// Returns `None` when there is nothing to send.
#[must_use]
pub fn cookie_header(records: &[CookieRecord]) -> Option<String> {
    if records.is_empty() {
        return None;
    }
    Some(
        records
            .iter()
            .map(CookieRecord::pair)
            .collect::<Vec<_>>()
            .join("; "),
    )
}

/// RFC 6265 section 5.1.4 default-path of a request path.
fn default_path(request_path: &str) -> String {
    if !request_path.starts_with('/') {
        return "/".to_string();
    }
    match request_path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => request_path[..idx].to_string(),
    }
}

fn strip_quotes(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn normalize_same_site(value: &str) -> Option<String> {
    ["Strict", "Lax", "None"]
        .into_iter()
        .find(|candidate| value.eq_ignore_ascii_case(candidate))
        .map(str::to_string)
}

// ============================================================================
// Tests
// ============================================================================
