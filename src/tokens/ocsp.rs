//! OCSP responses.
//!
//! Responses are produced by an external ASN.1 layer; this module only models the
//! fields that revocation checking and token discovery consume.

use super::certificate::Certificate;
use super::name::{DistinguishedName, SerialNumber};
use crate::crypto::SignatureAlgorithm;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// ResponderID of a basic OCSP response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResponderId {
    /// byName
    ByName(DistinguishedName),
    /// byKey: SHA-1 of the responder public key
    ByKeyHash(Vec<u8>),
}

/// Status of a certificate in a single OCSP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OcspCertStatus {
    /// Not revoked
    Good,
    /// Revoked at the given time
    Revoked(DateTime<Utc>),
    /// Responder does not know the certificate
    Unknown,
}

/// A SingleResponse entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleResponse {
    /// Serial number of the certificate this entry reports on
    pub serial: SerialNumber,
    /// Reported status
    pub status: OcspCertStatus,
    /// thisUpdate
    pub this_update: DateTime<Utc>,
    /// nextUpdate
    pub next_update: Option<DateTime<Utc>>,
}

/// A basic OCSP response.
#[derive(Debug, Clone)]
pub struct OcspResponse {
    /// DER encoding of the whole response
    pub der: Vec<u8>,
    /// Responder identifier
    pub responder: ResponderId,
    /// producedAt
    pub produced_at: DateTime<Utc>,
    /// Single responses
    pub responses: Vec<SingleResponse>,
    /// DER-encoded ResponseData (the signed portion)
    pub tbs: Vec<u8>,
    /// Signature algorithm
    pub signature_algorithm: SignatureAlgorithm,
    /// Signature value
    pub signature: Vec<u8>,
    /// Certificates embedded in the response (delegated responder chain)
    pub certificates: Vec<Arc<Certificate>>,
}

impl OcspResponse {
    /// Single response for `serial`, if present.
    pub fn find_response(&self, serial: &SerialNumber) -> Option<&SingleResponse> {
        self.responses.iter().find(|r| &r.serial == serial)
    }

    /// Name of the responder, resolving `byKey` against the embedded certificates.
    pub fn responder_name(&self) -> Option<DistinguishedName> {
        match &self.responder {
            ResponderId::ByName(name) => Some(name.clone()),
            ResponderId::ByKeyHash(hash) => self
                .certificates
                .iter()
                .find(|c| c.public_key_sha1().as_deref() == Some(hash.as_slice()))
                .map(|c| c.subject.clone()),
        }
    }

    /// Whether the responder identifier designates `certificate`.
    pub fn responder_is(&self, certificate: &Certificate) -> bool {
        match &self.responder {
            ResponderId::ByName(name) => &certificate.subject == name,
            ResponderId::ByKeyHash(hash) => {
                certificate.public_key_sha1().as_deref() == Some(hash.as_slice())
            },
        }
    }

    /// Embedded certificate the responder identifier designates.
    pub fn responder_certificate(&self) -> Option<&Arc<Certificate>> {
        self.certificates.iter().find(|c| self.responder_is(c))
    }

    /// Whether this response comes from `issuer` itself or from a responder
    /// certificate carried in the response and issued under `issuer`'s name.
    ///
    /// Serial numbers are only unique per issuer, so a response is only
    /// considered for certificates of the CA it speaks for.
    pub fn is_responder_for(&self, issuer: &Certificate) -> bool {
        self.responder_is(issuer)
            || self
                .responder_certificate()
                .is_some_and(|responder| responder.issuer == issuer.subject)
    }

    /// String form of the responder identifier.
    pub fn responder_label(&self) -> String {
        match &self.responder {
            ResponderId::ByName(name) => name.normalized().into_owned(),
            ResponderId::ByKeyHash(hash) => hash.iter().map(|b| format!("{:02x}", b)).collect(),
        }
    }
}

impl PartialEq for OcspResponse {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for OcspResponse {}
