//! rustls certificate verifier enforcing a [`PinningPolicy`].
//!
//! # Modes
//!
//! | Mode | Pin hashes | Trust |
//! |------|------------|-------|
//! | [`PinMode::Certificate`] | DER certificate | the leaf, or a presented cert it chains to |
//! | [`PinMode::PublicKey`] | DER `SubjectPublicKeyInfo` | system roots, then a pin on the path |
//!
//! A pin on a certificate other than the end entity only counts once the end
//! entity is proven to be signed through it, so replaying a public pinned
//! intermediate next to a self-made leaf is rejected. The server name must
//! belong to the policy's domain and be valid for the end entity.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::{
    WebPkiServerVerifier, verify_server_cert_signed_by_trust_anchor, verify_server_name,
};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::server::ParsedCertificate;
use rustls::{CertificateError, ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tracing::{debug, warn};

use crate::domain::DomainKey;
use crate::error::{Error, Result};

use super::{PinMode, PinningPolicy};

// ============================================================================
// Types
// ============================================================================

/// Result type of the rustls verifier callbacks.
type VerifyResult<T> = std::result::Result<T, rustls::Error>;

// ============================================================================
// PinnedCertVerifier
// ============================================================================

/// Server certificate verifier backed by a pinned fingerprint set.
#[derive(Debug)]
pub struct PinnedCertVerifier {
    /// Policy to enforce.
    policy: PinningPolicy,
    /// Provider used for signature checks.
    provider: Arc<CryptoProvider>,
    /// Root validation run before the pin check in public-key mode.
    roots: Option<Arc<WebPkiServerVerifier>>,
}

impl PinnedCertVerifier {
    /// Creates a verifier for `policy`.
    ///
    /// Public-key mode validates chains against the bundled Mozilla roots.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the root verifier cannot be built.
    pub fn new(policy: PinningPolicy, provider: Arc<CryptoProvider>) -> Result<Self> {
        let roots = RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };
        Self::with_roots(policy, provider, roots)
    }

    /// Creates a verifier that validates public-key mode chains against
    /// `roots`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the root verifier cannot be built.
    pub fn with_roots(
        policy: PinningPolicy,
        provider: Arc<CryptoProvider>,
        roots: RootCertStore,
    ) -> Result<Self> {
        let roots = match policy.mode() {
            PinMode::Certificate => None,
            PinMode::PublicKey => Some(
                WebPkiServerVerifier::builder_with_provider(Arc::new(roots), Arc::clone(&provider))
                    .build()
                    .map_err(|e| Error::config(format!("Invalid trust roots: {e}")))?,
            ),
        };

        Ok(Self {
            policy,
            provider,
            roots,
        })
    }

    /// Checks that a DNS server name belongs to the policy's domain.
    fn check_domain(&self, server_name: &ServerName<'_>) -> VerifyResult<()> {
        let ServerName::DnsName(dns) = server_name else {
            return Ok(());
        };
        match DomainKey::parse(dns.as_ref()) {
            Ok(key) if key.as_str().eq_ignore_ascii_case(self.policy.domain().as_str()) => Ok(()),
            _ => {
                warn!(
                    server = dns.as_ref(),
                    domain = %self.policy.domain(),
                    "Server name outside pinned domain"
                );
                Err(rustls::Error::InvalidCertificate(
                    CertificateError::NotValidForName,
                ))
            }
        }
    }

    /// Returns `true` if `leaf` chains to `anchor` through `intermediates`.
    fn chains_to(
        &self,
        leaf: &ParsedCertificate<'_>,
        anchor: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        now: UnixTime,
    ) -> bool {
        let mut roots = RootCertStore::empty();
        if roots.add(anchor.clone()).is_err() {
            return false;
        }

        match verify_server_cert_signed_by_trust_anchor(
            leaf,
            &roots,
            intermediates,
            now,
            self.provider.signature_verification_algorithms.all,
        ) {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "End entity does not chain to pinned certificate");
                false
            }
        }
    }

    /// Accepts the end entity if it is pinned or chains to a pinned
    /// certificate of the presented chain.
    fn check_pins(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        now: UnixTime,
    ) -> VerifyResult<ServerCertVerified> {
        let leaf = ParsedCertificate::try_from(end_entity)?;

        let pinned = self.policy.pins_certificate(end_entity.as_ref())
            || intermediates
                .iter()
                .filter(|cert| self.policy.pins_certificate(cert.as_ref()))
                .any(|anchor| self.chains_to(&leaf, anchor, intermediates, now));

        if pinned {
            debug!(
                domain = %self.policy.domain(),
                mode = ?self.policy.mode(),
                "Pinned certificate matched"
            );
            Ok(ServerCertVerified::assertion())
        } else {
            warn!(
                domain = %self.policy.domain(),
                mode = ?self.policy.mode(),
                chain_len = intermediates.len() + 1,
                "No pinned certificate on the end entity's path"
            );
            Err(rustls::Error::InvalidCertificate(
                CertificateError::ApplicationVerificationFailure,
            ))
        }
    }
}

impl ServerCertVerifier for PinnedCertVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> VerifyResult<ServerCertVerified> {
        if self.policy.disable_all_security() {
            debug!(domain = %self.policy.domain(), "Certificate validation disabled");
            return Ok(ServerCertVerified::assertion());
        }

        self.check_domain(server_name)?;

        match &self.roots {
            Some(roots) => {
                roots.verify_server_cert(
                    end_entity,
                    intermediates,
                    server_name,
                    ocsp_response,
                    now,
                )?;
            }
            None => {
                let leaf = ParsedCertificate::try_from(end_entity)?;
                verify_server_name(&leaf, server_name)?;
            }
        }

        self.check_pins(end_entity, intermediates, now)
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> VerifyResult<HandshakeSignatureValid> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> VerifyResult<HandshakeSignatureValid> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Builds the TLS client configuration for `policy`.
///
/// # Errors
///
/// - [`Error::Tls`] if the provider offers no usable protocol version
/// - [`Error::Config`] if the root verifier cannot be built
pub fn client_config(policy: &PinningPolicy) -> Result<ClientConfig> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let verifier = PinnedCertVerifier::new(policy.clone(), Arc::clone(&provider))?;

    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(verifier))
        .with_no_client_auth();

    Ok(config)
}

// ============================================================================
// Tests
// ============================================================================
