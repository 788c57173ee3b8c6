//! Signed tokens: certificates, CRLs, OCSP responses and timestamps.
//!
//! Every object whose trust has to be established is a [`SignedToken`]. The
//! variants share the [`SignedObject`] capability surface used by the
//! [`ValidationContext`](crate::context::ValidationContext) to find issuers:
//!
//! - **signer_subject_name**: the subject name the issuer certificate must carry
//! - **is_signed_by**: cryptographic check against a candidate issuer
//! - **wrapped_certificate_source**: certificates bundled inside the token itself
//!
//! Tokens never check revocation themselves.

mod certificate;
mod crl;
mod name;
mod ocsp;
mod timestamp;

pub use certificate::{Certificate, QC_COMPLIANCE, QC_SSCD};
pub use crl::{Crl, RevokedEntry};
pub use name::{DistinguishedName, SerialNumber};
pub use ocsp::{OcspCertStatus, OcspResponse, ResponderId, SingleResponse};
pub use timestamp::{MessageImprint, TimestampToken};

use crate::crypto::CryptoProvider;
use crate::sources::{CertificateSourceType, ListCertificateSource};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

/// Capabilities shared by every signed token.
pub trait SignedObject {
    /// Subject name of the certificate that signed this object.
    fn signer_subject_name(&self) -> Option<DistinguishedName>;

    /// Whether `candidate` holds the key that signed this object.
    fn is_signed_by(&self, candidate: &Certificate, crypto: &dyn CryptoProvider) -> bool;

    /// Extra certificates carried only inside this token.
    fn wrapped_certificate_source(&self) -> ListCertificateSource {
        ListCertificateSource::new(CertificateSourceType::Embedded)
    }
}

impl SignedObject for Certificate {
    fn signer_subject_name(&self) -> Option<DistinguishedName> {
        Some(self.issuer.clone())
    }

    fn is_signed_by(&self, candidate: &Certificate, crypto: &dyn CryptoProvider) -> bool {
        candidate.subject == self.issuer
            && crypto.verify_signature(
                candidate,
                &self.signature_algorithm,
                &self.tbs,
                &self.signature,
            )
    }
}

impl SignedObject for Crl {
    fn signer_subject_name(&self) -> Option<DistinguishedName> {
        Some(self.issuer.clone())
    }

    fn is_signed_by(&self, candidate: &Certificate, crypto: &dyn CryptoProvider) -> bool {
        candidate.subject == self.issuer
            && crypto.verify_signature(
                candidate,
                &self.signature_algorithm,
                &self.tbs,
                &self.signature,
            )
    }
}

impl SignedObject for OcspResponse {
    fn signer_subject_name(&self) -> Option<DistinguishedName> {
        self.responder_name()
    }

    fn is_signed_by(&self, candidate: &Certificate, crypto: &dyn CryptoProvider) -> bool {
        self.responder_is(candidate)
            && crypto.verify_signature(
                candidate,
                &self.signature_algorithm,
                &self.tbs,
                &self.signature,
            )
    }

    fn wrapped_certificate_source(&self) -> ListCertificateSource {
        ListCertificateSource::from_certificates(
            CertificateSourceType::Embedded,
            self.certificates.iter().cloned(),
        )
    }
}

impl SignedObject for TimestampToken {
    fn signer_subject_name(&self) -> Option<DistinguishedName> {
        self.signer_certificate().map(|c| c.subject.clone())
    }

    fn is_signed_by(&self, candidate: &Certificate, crypto: &dyn CryptoProvider) -> bool {
        candidate.issuer == self.signer_issuer
            && candidate.serial == self.signer_serial
            && crypto.verify_signature(
                candidate,
                &self.signature_algorithm,
                &self.signed_attributes,
                &self.signature,
            )
    }

    fn wrapped_certificate_source(&self) -> ListCertificateSource {
        ListCertificateSource::from_certificates(
            CertificateSourceType::Embedded,
            self.certificates.iter().cloned(),
        )
    }
}

/// A certificate, CRL, OCSP response or timestamp whose trust is being established.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignedToken {
    /// X.509 certificate
    Certificate(Arc<Certificate>),
    /// Certificate revocation list
    Crl(Arc<Crl>),
    /// OCSP response
    Ocsp(Arc<OcspResponse>),
    /// Timestamp token
    Timestamp(Arc<TimestampToken>),
}

impl SignedToken {
    /// Content-derived identity used to deduplicate tokens.
    pub fn key(&self) -> TokenKey {
        match self {
            SignedToken::Certificate(cert) => TokenKey::Certificate {
                issuer: cert.issuer.normalized().into_owned(),
                serial: cert.serial.clone(),
            },
            SignedToken::Crl(crl) => TokenKey::Crl {
                issuer: crl.issuer.normalized().into_owned(),
                number: match &crl.number {
                    Some(number) => number.as_bytes().to_vec(),
                    None => Sha256::digest(&crl.der).to_vec(),
                },
            },
            SignedToken::Ocsp(ocsp) => TokenKey::Ocsp {
                responder: ocsp.responder_label(),
                produced_at: ocsp.produced_at.timestamp(),
                digest: Sha256::digest(&ocsp.der).to_vec(),
            },
            SignedToken::Timestamp(ts) => TokenKey::Timestamp {
                digest: Sha256::digest(&ts.der).to_vec(),
            },
        }
    }

    /// Short label for the token kind.
    pub fn kind(&self) -> &'static str {
        match self {
            SignedToken::Certificate(_) => "certificate",
            SignedToken::Crl(_) => "CRL",
            SignedToken::Ocsp(_) => "OCSP response",
            SignedToken::Timestamp(_) => "timestamp",
        }
    }

    /// The certificate, if this token is one.
    pub fn as_certificate(&self) -> Option<&Arc<Certificate>> {
        match self {
            SignedToken::Certificate(cert) => Some(cert),
            _ => None,
        }
    }

    fn as_signed_object(&self) -> &dyn SignedObject {
        match self {
            SignedToken::Certificate(cert) => cert.as_ref(),
            SignedToken::Crl(crl) => crl.as_ref(),
            SignedToken::Ocsp(ocsp) => ocsp.as_ref(),
            SignedToken::Timestamp(ts) => ts.as_ref(),
        }
    }
}

impl SignedObject for SignedToken {
    fn signer_subject_name(&self) -> Option<DistinguishedName> {
        self.as_signed_object().signer_subject_name()
    }

    fn is_signed_by(&self, candidate: &Certificate, crypto: &dyn CryptoProvider) -> bool {
        self.as_signed_object().is_signed_by(candidate, crypto)
    }

    fn wrapped_certificate_source(&self) -> ListCertificateSource {
        self.as_signed_object().wrapped_certificate_source()
    }
}

impl fmt::Display for SignedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignedToken::Certificate(cert) => {
                write!(f, "certificate '{}' (serial {})", cert.subject, cert.serial)
            },
            SignedToken::Crl(crl) => {
                write!(f, "CRL of '{}' ({})", crl.issuer, crl.this_update.to_rfc3339())
            },
            SignedToken::Ocsp(ocsp) => write!(
                f,
                "OCSP response of '{}' ({})",
                ocsp.responder_label(),
                ocsp.produced_at.to_rfc3339()
            ),
            SignedToken::Timestamp(ts) => write!(f, "timestamp ({})", ts.gen_time.to_rfc3339()),
        }
    }
}

/// Content-derived key of a token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TokenKey {
    /// Issuer name + serial number
    Certificate {
        /// Normalized issuer name
        issuer: String,
        /// Serial number
        serial: SerialNumber,
    },
    /// Issuer name + CRL number (or DER digest when unnumbered)
    Crl {
        /// Normalized issuer name
        issuer: String,
        /// CRL number bytes
        number: Vec<u8>,
    },
    /// Responder + producedAt, DER digest as tiebreaker
    Ocsp {
        /// Responder label
        responder: String,
        /// producedAt (seconds since epoch)
        produced_at: i64,
        /// SHA-256 of the response encoding
        digest: Vec<u8>,
    },
    /// DER digest
    Timestamp {
        /// SHA-256 of the token encoding
        digest: Vec<u8>,
    },
}
