//! Pinning policy resolution.
//!
//! Turns caller [`ConnectOptions`] into an immutable [`PinningPolicy`] bound
//! to the connection's [`DomainKey`]. Resolution is pure: it never touches
//! the network, so a rejected configuration cannot leave a half-open socket.

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeSet;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};
use tracing::debug;
use x509_parser::parse_x509_certificate;

use crate::domain::DomainKey;
use crate::error::{Error, Result};

use super::ConnectOptions;

// ============================================================================
// Constants
// ============================================================================

/// Prefix of a SHA-256 pin.
pub const SHA256_PREFIX: &str = "sha256/";

// ============================================================================
// PinMode
// ============================================================================

/// What a pin is a hash of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PinMode {
    /// Hash of the whole DER certificate. A pinned certificate presented by
    /// the server acts as a trust anchor for the end entity.
    #[default]
    Certificate,
    /// Hash of the DER `SubjectPublicKeyInfo`, checked after the chain is
    /// validated against the system roots (the OkHttp `CertificatePinner`
    /// format).
    PublicKey,
}

// ============================================================================
// PinningPolicy
// ============================================================================

/// Trust configuration handed to the transport for one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinningPolicy {
    /// Domain the policy is bound to.
    domain: DomainKey,
    /// Accepted fingerprints.
    pins: BTreeSet<String>,
    /// Hash input of the pins.
    mode: PinMode,
    /// Skip certificate validation.
    disable_all_security: bool,
}

impl PinningPolicy {
    /// Resolves `options` into a policy for `domain`.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingPinningConfig`] if there is no pinning section
    /// - [`Error::MissingCertsField`] if the section has no `certs` field
    /// - [`Error::EmptyCertificateSet`] if `certs` is empty and security was
    ///   not disabled
    pub fn resolve(domain: DomainKey, options: &ConnectOptions) -> Result<Self> {
        let pinning = options
            .ssl_pinning
            .as_ref()
            .ok_or(Error::MissingPinningConfig)?;
        let certs = pinning.certs.as_ref().ok_or(Error::MissingCertsField)?;

        let pins: BTreeSet<String> = certs
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();
        let disable_all_security = options.security_disabled();
        let mode = if options.public_key_pinning_enabled() {
            PinMode::PublicKey
        } else {
            PinMode::Certificate
        };

        if pins.is_empty() && !disable_all_security {
            return Err(Error::EmptyCertificateSet);
        }

        debug!(
            domain = %domain,
            pins = pins.len(),
            ?mode,
            disable_all_security,
            "Pinning policy resolved"
        );

        Ok(Self {
            domain,
            pins,
            mode,
            disable_all_security,
        })
    }

    /// Returns the domain the policy is bound to.
    #[inline]
    #[must_use]
    pub fn domain(&self) -> &DomainKey {
        &self.domain
    }

    /// Returns the pinned fingerprints.
    #[inline]
    #[must_use]
    pub fn pins(&self) -> &BTreeSet<String> {
        &self.pins
    }

    /// Returns what the pins are hashes of.
    #[inline]
    #[must_use]
    pub fn mode(&self) -> PinMode {
        self.mode
    }

    /// Returns `true` if certificate validation is disabled.
    #[inline]
    #[must_use]
    pub fn disable_all_security(&self) -> bool {
        self.disable_all_security
    }

    /// Returns `true` if the DER-encoded certificate matches a pin under
    /// the policy's mode.
    ///
    /// A certificate that cannot be parsed never matches in public-key mode.
    #[must_use]
    pub fn pins_certificate(&self, der: &[u8]) -> bool {
        let pin = match self.mode {
            PinMode::Certificate => Some(fingerprint(der)),
            PinMode::PublicKey => public_key_fingerprint(der),
        };
        pin.is_some_and(|pin| self.pins.contains(&pin))
    }
}

/// Computes the `sha256/<base64>` fingerprint of a DER certificate.
#[must_use]
pub fn fingerprint(der: &[u8]) -> String {
    encode_pin(der)
}

/// Computes the `sha256/<base64>` hash of a certificate's public key.
///
/// Returns `None` if `der` is not an X.509 certificate.
#[must_use]
pub fn public_key_fingerprint(der: &[u8]) -> Option<String> {
    let (_, cert) = parse_x509_certificate(der).ok()?;
    Some(encode_pin(cert.public_key().raw))
}

fn encode_pin(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("{SHA256_PREFIX}{}", STANDARD.encode(digest))
}

// ============================================================================
// Tests
// ============================================================================
